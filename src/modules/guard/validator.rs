use std::collections::HashMap;

use regex::Regex;
use tracing::info;

use crate::config::bot_config::GuardConfig;
use crate::modules::perception::{EastMoneyClient, StockQuote};
use super::lines::{drop_empty_headings, parse_blocks, render_blocks, Block};

// "等大跌再买"式话术，出现即整条剔除
const RED_FLAGS: &[&str] = &["大幅回调", "大跌", "暴跌", "深度回调", "腰斩"];

/// 单只候选股票的核验快照
#[derive(Debug, Clone)]
pub struct TickerFacts {
    pub is_st: bool,
    pub delisted: bool,
    pub quote: Option<StockQuote>,
}

#[derive(Debug)]
pub struct ScrubOutcome {
    pub text: String,
    pub kept: usize,
    pub removed: usize,
}

enum Verdict {
    Keep,
    Remove(&'static str),
}

/// 推荐清洗器：AI 输出是不受控黑盒，这里是推送前的最后一道业务闸门。
/// 口径保守——数据拿不到一律按不可信剔除，
/// 仅"无建议价且无红旗话术"的普通行默认放行
pub struct RecommendationValidator {
    market: EastMoneyClient,
    cfg: GuardConfig,
}

impl RecommendationValidator {
    pub fn new(market: EastMoneyClient, cfg: GuardConfig) -> Self {
        Self { market, cfg }
    }

    /// 扫描全文候选代码，逐个拉行情核验后清洗文本
    pub async fn validate(&self, text: &str) -> ScrubOutcome {
        let codes = extract_tickers(text);
        if codes.is_empty() {
            return ScrubOutcome {
                text: text.to_string(),
                kept: 0,
                removed: 0,
            };
        }
        info!("🔎 检出 {} 个候选代码: {:?}", codes.len(), codes);

        let mut facts = HashMap::new();
        for code in &codes {
            facts.insert(code.clone(), self.lookup_facts(code).await);
        }

        let outcome = scrub_with_facts(text, &facts, &self.cfg);
        info!("🧹 推荐清洗完成: 保留 {} 条，剔除 {} 条", outcome.kept, outcome.removed);
        outcome
    }

    // 三项核验各自独立拉数，不做合并缓存
    async fn lookup_facts(&self, code: &str) -> TickerFacts {
        let is_st = self.market.is_st_stock(code).await;
        let delisted = self.market.is_delisted(code, self.cfg.history_probe_days).await;
        let quote = self.market.get_quote(code).await;
        TickerFacts { is_st, delisted, quote }
    }
}

/// 纯文本清洗：解析成行块 → 逐块裁决 → 注现价 → 清空小节 → 回写。
/// 与行情查询解耦，便于用固定事实做测试
pub fn scrub_with_facts(
    text: &str,
    facts: &HashMap<String, TickerFacts>,
    cfg: &GuardConfig,
) -> ScrubOutcome {
    let blocks = parse_blocks(text);
    let mut kept_blocks: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut kept = 0usize;
    let mut removed = 0usize;

    for block in blocks {
        let mut lines = match block {
            Block::ListItem { lines } => lines,
            other => {
                kept_blocks.push(other);
                continue;
            }
        };

        let joined = lines.join("\n");
        let codes = extract_tickers(&joined);
        if codes.is_empty() {
            // 不含代码的普通列表行不参与清洗
            kept_blocks.push(Block::ListItem { lines });
            continue;
        }

        match judge_item(&joined, &codes, facts, cfg) {
            Verdict::Remove(reason) => {
                removed += 1;
                info!("🗑️ 剔除推荐 {:?}: {}", codes, reason);
            }
            Verdict::Keep => {
                for code in &codes {
                    if let Some(TickerFacts { quote: Some(q), .. }) = facts.get(code) {
                        annotate_lines(&mut lines, code, q);
                    }
                }
                kept += 1;
                kept_blocks.push(Block::ListItem { lines });
            }
        }
    }

    let cleaned = drop_empty_headings(kept_blocks);
    ScrubOutcome {
        text: render_blocks(&cleaned),
        kept,
        removed,
    }
}

fn judge_item(
    text: &str,
    codes: &[String],
    facts: &HashMap<String, TickerFacts>,
    cfg: &GuardConfig,
) -> Verdict {
    for code in codes {
        let Some(f) = facts.get(code) else {
            return Verdict::Remove("无核验数据");
        };

        if f.is_st {
            return Verdict::Remove("ST/风险警示股");
        }

        if let Some(q) = &f.quote {
            if cfg.market_cap_ceiling > 0.0 && q.market_cap > cfg.market_cap_ceiling {
                return Verdict::Remove("市值超出上限");
            }
        }

        // 行情拿不到按不可信处理，而不是"当它没问题"
        let Some(q) = &f.quote else {
            return Verdict::Remove("行情不可用");
        };
        if f.delisted || q.price <= 0.0 {
            return Verdict::Remove("行情不可用");
        }

        if RED_FLAGS.iter().any(|flag| text.contains(flag)) {
            return Verdict::Remove("等待大跌买入话术");
        }

        let prices = extract_candidate_prices(text);
        if !prices.is_empty() && prices.iter().all(|p| !price_in_band(*p, q.price, cfg)) {
            return Verdict::Remove("建议价偏离现价");
        }
    }
    Verdict::Keep
}

/// 严格 6 位数字（不允许嵌在更长的数字串里），按出现顺序去重
pub fn extract_tickers(text: &str) -> Vec<String> {
    let digits = Regex::new(r"[0-9]+").unwrap();
    let mut out: Vec<String> = Vec::new();
    for m in digits.find_iter(text) {
        let token = m.as_str();
        if token.len() == 6 && !out.iter().any(|c| c == token) {
            out.push(token.to_string());
        }
    }
    out
}

/// 抓"买入/建仓/低吸/支撑/回调"后面跟的价位数字。
/// 纯 6 位整数按股票代码跳过，不当价格
fn extract_candidate_prices(text: &str) -> Vec<f64> {
    let re = Regex::new(r"(?:买入|建仓|低吸|支撑|回调)[^0-9]{0,10}([0-9]+(?:\.[0-9]+)?)").unwrap();
    let mut out = Vec::new();
    for caps in re.captures_iter(text) {
        let token = &caps[1];
        if !token.contains('.') && token.len() == 6 {
            continue;
        }
        if let Ok(v) = token.parse::<f64>() {
            if v > 0.0 {
                out.push(v);
            }
        }
    }
    out
}

fn price_in_band(p: f64, live: f64, cfg: &GuardConfig) -> bool {
    if live <= 0.0 {
        return false;
    }
    let deviation_ok = (p - live).abs() / live <= cfg.price_tolerance_pct;
    let floor_ok = p >= live * cfg.price_floor_ratio;
    deviation_ok && floor_ok
}

/// 在代码所在行末尾追加现价标注；该行已有"现价"则跳过，保证幂等
fn annotate_lines(lines: &mut [String], code: &str, quote: &StockQuote) {
    let Some(line) = lines.iter_mut().find(|l| l.contains(code)) else {
        return;
    };
    if line.contains("现价") {
        return;
    }
    let emoji = if quote.change_percent > 0.0 {
        "📈"
    } else if quote.change_percent < 0.0 {
        "📉"
    } else {
        "➡️"
    };
    line.push_str(&format!(
        "（现价 ¥{:.2} {} {:+.2}%）",
        quote.price, emoji, quote.change_percent
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(code: &str, name: &str, price: f64, pct: f64, cap: f64) -> StockQuote {
        StockQuote {
            code: code.to_string(),
            name: name.to_string(),
            price,
            open: price,
            high: price,
            low: price,
            prev_close: price,
            change_amount: 0.0,
            change_percent: pct,
            volume: 1_000_000.0,
            turnover: 1_000_000.0,
            market_cap: cap,
            pe_ratio: Some(10.0),
            is_trading_hours: true,
        }
    }

    fn ok_facts(code: &str, name: &str, price: f64, pct: f64, cap: f64) -> (String, TickerFacts) {
        (
            code.to_string(),
            TickerFacts {
                is_st: false,
                delisted: false,
                quote: Some(quote(code, name, price, pct, cap)),
            },
        )
    }

    fn cfg() -> GuardConfig {
        GuardConfig::test_default()
    }

    #[test]
    fn extracts_strict_six_digit_codes_in_order() {
        let text = "关注 300750 和 000001，日期 20250806 不算，300750 不重复";
        assert_eq!(extract_tickers(text), vec!["300750", "000001"]);
    }

    #[test]
    fn extracts_prices_after_buy_keywords() {
        let prices = extract_candidate_prices("建议买入价 ¥11.80，支撑位11.5元，回调至10.8附近");
        assert_eq!(prices, vec![11.80, 11.5, 10.8]);
    }

    #[test]
    fn six_digit_integers_after_keywords_are_codes_not_prices() {
        assert!(extract_candidate_prices("建议买入 300750").is_empty());
    }

    #[test]
    fn band_check_covers_deviation_and_floor() {
        let c = cfg();
        assert!(price_in_band(11.80, 12.0, &c));
        assert!(price_in_band(13.0, 12.0, &c));
        // 偏离超过 15%
        assert!(!price_in_band(14.0, 12.0, &c));
        assert!(!price_in_band(9.0, 12.0, &c));
    }

    #[test]
    fn over_cap_line_is_removed_but_sibling_survives() {
        // 宁德时代市值 9000 亿，远超 500 亿上限
        let facts: HashMap<_, _> = [
            ok_facts("300750", "宁德时代", 180.50, 2.31, 900_000_000_000.0),
            ok_facts("000001", "平安银行", 12.00, 1.20, 20_000_000_000.0),
        ]
        .into_iter()
        .collect();

        let text = "### 📈 推荐板块\n- **300750 宁德时代**：动力电池龙头\n- **000001 平安银行**：零售银行领先\n";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert!(!out.text.contains("300750"));
        assert!(out.text.contains("000001"));
        assert_eq!(out.kept, 1);
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn in_band_price_is_kept_and_annotated() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, 1.20, 20_000_000_000.0)]
                .into_iter()
                .collect();
        let text = "- **000001 平安银行**：建议买入价 ¥11.80";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.kept, 1);
        assert!(out.text.contains("000001"));
        assert!(out.text.contains("现价 ¥12.00"));
        assert!(out.text.contains("+1.20%"));
        assert!(out.text.contains("📈"));
    }

    #[test]
    fn out_of_band_price_is_removed() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, 0.0, 20_000_000_000.0)]
                .into_iter()
                .collect();
        let text = "- **000001 平安银行**：建议买入价 ¥8.00";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.removed, 1);
        assert!(!out.text.contains("000001"));
    }

    #[test]
    fn one_in_band_price_among_extracted_is_enough() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, 0.0, 20_000_000_000.0)]
                .into_iter()
                .collect();
        // 支撑位离谱，但买入价贴近现价：整条保留
        let text = "- **000001 平安银行**：建议买入价 ¥11.90，支撑位 5.0";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.kept, 1);
    }

    #[test]
    fn annotation_is_idempotent() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, 1.20, 20_000_000_000.0)]
                .into_iter()
                .collect();
        let text = "- **000001 平安银行**：建议买入价 ¥11.80";
        let once = scrub_with_facts(text, &facts, &cfg());
        let twice = scrub_with_facts(&once.text, &facts, &cfg());
        assert_eq!(once.text, twice.text);
        assert_eq!(twice.text.matches("现价").count(), 1);
    }

    #[test]
    fn st_stock_line_is_removed() {
        let mut facts = HashMap::new();
        facts.insert(
            "600000".to_string(),
            TickerFacts {
                is_st: true,
                delisted: false,
                quote: Some(quote("600000", "*ST某某", 3.20, -4.9, 1_000_000_000.0)),
            },
        );
        let text = "- **600000 某某股份**：困境反转可期";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.removed, 1);
        assert!(!out.text.contains("600000"));
    }

    #[test]
    fn unavailable_quote_means_removal_not_pass() {
        let mut facts = HashMap::new();
        facts.insert(
            "600001".to_string(),
            TickerFacts { is_st: false, delisted: true, quote: None },
        );
        let text = "- **600001 某某退**：低价博弈";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn red_flag_phrase_is_removed_even_without_price() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, 0.0, 20_000_000_000.0)]
                .into_iter()
                .collect();
        let text = "- **000001 平安银行**：等待大幅回调后再介入";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn no_price_and_no_red_flag_passes_by_default() {
        let facts: HashMap<_, _> =
            [ok_facts("000001", "平安银行", 12.00, -0.50, 20_000_000_000.0)]
                .into_iter()
                .collect();
        let text = "- **000001 平安银行**：零售银行龙头，基本面稳健";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert_eq!(out.kept, 1);
        assert!(out.text.contains("📉"));
    }

    #[test]
    fn emptied_subsection_heading_is_dropped() {
        let facts: HashMap<_, _> = [
            (
                "300750".to_string(),
                TickerFacts {
                    is_st: false,
                    delisted: false,
                    quote: Some(quote("300750", "宁德时代", 180.0, 0.0, 900_000_000_000.0)),
                },
            ),
            ok_facts("000001", "平安银行", 12.00, 0.0, 20_000_000_000.0),
        ]
        .into_iter()
        .collect();

        let text = "## 🎯 A股投资机会\n### 📈 新能源板块\n- **300750 宁德时代**：龙头\n### 📊 银行板块\n- **000001 平安银行**：稳健\n";
        let out = scrub_with_facts(text, &facts, &cfg());
        assert!(!out.text.contains("新能源板块"));
        assert!(out.text.contains("银行板块"));
        assert!(out.text.contains("A股投资机会"));
    }

    #[test]
    fn text_without_codes_is_untouched() {
        let out = scrub_with_facts("## 总结\n今日市场平稳。", &HashMap::new(), &cfg());
        assert_eq!(out.text, "## 总结\n今日市场平稳。");
        assert_eq!(out.kept, 0);
        assert_eq!(out.removed, 0);
    }
}
