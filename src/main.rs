mod config;
mod utils;
mod modules;

use std::env;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use tracing::info;

use crate::config::bot_config::BotConfig;
use crate::utils::http_client::HttpClientFactory;
use crate::utils::notifier::{DingTalkNotifier, ServerChanNotifier};
use crate::modules::perception::{hours, sentiment, EastMoneyClient, NewsCollector};
use crate::modules::brain::Summarizer;
use crate::modules::guard::RecommendationValidator;
use crate::modules::action::report;

/// 单次运行的日报管线（由外部 cron 调度）：
/// 采集 RSS → AI 摘要 → 推荐清洗 → 拼报告 → 推送
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("Starting FinanceBot V2.3 (Daily Digest)...");

    // 1. 必需配置缺失直接终止，不做半截运行
    let deepseek_key = env::var("DEEPSEEK_API_KEY")
        .context("环境变量 DEEPSEEK_API_KEY 未设置，请在运行环境中设置此变量！")?;
    let keys_raw = env::var("SERVER_CHAN_KEYS")
        .context("环境变量 SERVER_CHAN_KEYS 未设置，请在运行环境中设置此变量！")?;
    let server_chan_keys: Vec<String> = keys_raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if server_chan_keys.is_empty() {
        bail!("SERVER_CHAN_KEYS 为空，没有可用的推送 key");
    }

    let cfg = BotConfig::load().context("读取 bot_config 失败")?;

    // 2. 模块初始化
    let std_client = HttpClientFactory::create()?;
    let llm_client = HttpClientFactory::create_llm()?;

    let market = EastMoneyClient::new(std_client.clone());
    let collector = NewsCollector::new(std_client.clone(), cfg.feeds.clone(), cfg.fetch.clone());
    let brain = Summarizer::new(llm_client, deepseek_key);
    let validator = RecommendationValidator::new(market.clone(), cfg.guard.clone());
    let wechat = ServerChanNotifier::new(std_client.clone(), server_chan_keys);
    let dingtalk = DingTalkNotifier::from_env(std_client.clone());

    let today_str = hours::beijing_today().format("%Y-%m-%d").to_string();

    // 3. 采集新闻与正文语料
    let digest = collector.collect().await;
    info!(
        "📰 语料就绪: {} 字符，{} 个分类",
        digest.corpus.chars().count(),
        digest.sections.len()
    );

    // 4. 全球联动与行业检测
    let global_events = sentiment::detect_global_events(&digest.corpus);
    if !global_events.is_empty() {
        let names: Vec<&str> = global_events.iter().map(|e| e.event).collect();
        info!("🌍 检测到全球联动事件: {:?}", names);
    }
    let industries = sentiment::extract_industries(&digest.corpus, &global_events);
    if !industries.is_empty() {
        info!("🔍 检测到相关行业: {:?}", industries);
    }

    // 5. AI 摘要（失败自动降级为截断摘要）
    let summary = brain.summarize(&digest.corpus, &global_events).await;

    // 6. 推荐清洗：ST/退市/市值/建议价逐条核验
    let vetted = validator.validate(&summary).await;

    // 7. 指数快照 + 报告拼装
    let indices = market.market_indices().await;
    let body = report::build(&today_str, &indices, &global_events, &vetted, &digest.sections);

    // 8. 推送。各通道独立，互不阻塞
    let title = format!("📌 {} 财经新闻摘要", today_str);
    wechat.send(&title, &body).await;
    if let Some(ding) = &dingtalk {
        ding.send_markdown(&title, &body).await;
    }

    info!("✅ Digest run complete.");
    Ok(())
}
