use serde::Deserialize;
use config::{Config, File};
use anyhow::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedCategory {
    pub title: String,
    pub sources: Vec<FeedSource>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    pub feed_retries: u32,
    pub retry_delay_sec: u64,
    pub max_entries_per_source: usize,
    pub article_char_cap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardConfig {
    /// 市值上限（元）。0 表示不启用该检查
    pub market_cap_ceiling: f64,
    pub price_tolerance_pct: f64,
    pub price_floor_ratio: f64,
    pub history_probe_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub fetch: FetchConfig,
    pub guard: GuardConfig,
    pub feeds: Vec<FeedCategory>,
}

impl BotConfig {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("bot_config"))
            .build()?;

        let cfg: BotConfig = settings.try_deserialize()?;
        Ok(cfg)
    }
}
