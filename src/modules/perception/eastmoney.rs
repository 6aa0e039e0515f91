use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::hours;
use super::structs::{HistoryBar, StockQuote};

const QUOTE_URL: &str = "http://push2.eastmoney.com/api/qt/stock/get";
const KLINE_URL: &str = "http://push2his.eastmoney.com/api/qt/stock/kline/get";
const QUOTE_FIELDS: &str = "f2,f3,f4,f5,f6,f15,f16,f17,f18,f45,f57,f58,f162";
const QUOTE_UT: &str = "fa5fd1943c7b386f172d6893dbfba10b";

// 三大指数的 secid 是固定口径，不走个股的前缀启发式
// （上证指数 000001 在市场 1，与平安银行 0.000001 区分）
const INDICES: [(&str, &str); 3] = [
    ("上证指数", "1.000001"),
    ("深证成指", "0.399001"),
    ("创业板指", "0.399006"),
];

/// 东方财富行情客户端。所有接口"尽力而为"：
/// 网络或解析失败只记 warn 并返回 None，绝不向上抛错
#[derive(Clone)]
pub struct EastMoneyClient {
    client: Client,
}

impl EastMoneyClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 6 开头 → 沪市（市场 1），其余 → 深市（市场 0）。启发式，不再校验
    fn market_id(code: &str) -> u8 {
        if code.starts_with('6') { 1 } else { 0 }
    }

    fn secid(code: &str) -> String {
        format!("{}.{}", Self::market_id(code), code)
    }

    pub async fn get_quote(&self, code: &str) -> Option<StockQuote> {
        let secid = Self::secid(code);
        let mut quote = self.fetch_quote_raw(&secid, code).await?;

        if quote.price <= 0.0 && quote.prev_close > 0.0 {
            let bars = self.get_history(code, 2).await;
            apply_offhours_fallback(&mut quote, bars.as_deref());
        }

        Some(quote)
    }

    async fn fetch_quote_raw(&self, secid: &str, label: &str) -> Option<StockQuote> {
        let params = [
            ("secid", secid),
            ("fields", QUOTE_FIELDS),
            ("ut", QUOTE_UT),
            ("fltt", "1"),
            ("invt", "2"),
        ];

        let resp = match self.client.get(QUOTE_URL).query(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("⚠️ 行情请求失败 {}: {}", label, e);
                return None;
            }
        };

        let json: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️ 行情响应解析失败 {}: {}", label, e);
                return None;
            }
        };

        if json["rc"].as_i64().unwrap_or(-1) != 0 || !json["data"].is_object() {
            warn!("❌ 获取 {} 行情失败", label);
            return None;
        }

        Some(decode_quote(label, &json["data"]))
    }

    /// 最近 days 个交易日的日 K，从旧到新。失败或空数据 → None
    pub async fn get_history(&self, code: &str, days: u32) -> Option<Vec<HistoryBar>> {
        let secid = Self::secid(code);
        let limit = days.to_string();
        let params = [
            ("secid", secid.as_str()),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
            ("klt", "101"),
            ("fqt", "1"),
            ("beg", "0"),
            ("end", "20500101"),
            ("lmt", limit.as_str()),
            ("ut", QUOTE_UT),
        ];

        let resp = match self.client.get(KLINE_URL).query(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("⚠️ 历史数据请求失败 {}: {}", code, e);
                return None;
            }
        };

        let json: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️ 历史数据解析失败 {}: {}", code, e);
                return None;
            }
        };

        if json["rc"].as_i64().unwrap_or(-1) != 0 {
            warn!("❌ 获取 {} 历史数据失败", code);
            return None;
        }

        let klines = json["data"]["klines"].as_array()?;
        let bars: Vec<HistoryBar> = klines
            .iter()
            .filter_map(|l| l.as_str())
            .filter_map(HistoryBar::parse)
            .collect();

        if bars.is_empty() { None } else { Some(bars) }
    }

    /// 名称含 "ST"（含 *ST）即视为风险警示股
    pub async fn is_st_stock(&self, code: &str) -> bool {
        match self.get_quote(code).await {
            Some(q) => name_is_st(&q.name),
            None => false,
        }
    }

    /// 完全取不到行情 → 退市；有行情但零成交时再探一眼短历史：
    /// 历史也没有 → 退市，有历史 → 多半只是非交易时段
    pub async fn is_delisted(&self, code: &str, probe_days: u32) -> bool {
        let quote = match self.get_quote(code).await {
            Some(q) => q,
            None => {
                warn!("❌ {} 无法获取数据，可能已退市", code);
                return true;
            }
        };

        if quote.volume <= 0.0 {
            if self.get_history(code, probe_days).await.is_none() {
                warn!("❌ {} 无历史数据，可能已退市", code);
                return true;
            }
            warn!("⚠️ {} 当前无成交量，可能是非交易时间", code);
        }

        false
    }

    /// 三大指数快照，单个失败降级为占位文案。三路并发，互不拖累
    pub async fn market_indices(&self) -> Vec<(String, String)> {
        let (sh, sz, cyb) = tokio::join!(
            self.index_line(INDICES[0]),
            self.index_line(INDICES[1]),
            self.index_line(INDICES[2]),
        );
        vec![sh, sz, cyb]
    }

    async fn index_line(&self, (name, secid): (&str, &str)) -> (String, String) {
        match self.fetch_quote_raw(secid, name).await {
            Some(q) if q.price > 0.0 => {
                let emoji = if q.change_percent > 0.0 {
                    "📈"
                } else if q.change_percent < 0.0 {
                    "📉"
                } else {
                    "➡️"
                };
                (
                    name.to_string(),
                    format!("{} {:.2} ({:+.2}%)", emoji, q.price, q.change_percent),
                )
            }
            _ => (name.to_string(), "📊 数据获取中".to_string()),
        }
    }
}

/// 源端数字字段偶尔以字符串形式出现，统一转 f64；转不动算 0
fn num(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

// 价格类字段 ÷100；非正值是"无数据"哨兵，解码为 0.0
fn scaled_price(data: &Value, key: &str) -> f64 {
    let raw = num(&data[key]);
    if raw > 0.0 { raw / 100.0 } else { 0.0 }
}

fn decode_quote(fallback_code: &str, data: &Value) -> StockQuote {
    // 市值原始单位是万元，换算成元；非数字/非正值归 0
    let cap_wan = num(&data["f45"]);
    let market_cap = if cap_wan > 0.0 { cap_wan * 10_000.0 } else { 0.0 };

    let pe_raw = num(&data["f162"]);
    let pe_ratio = if pe_raw > 0.0 { Some(pe_raw / 100.0) } else { None };

    StockQuote {
        code: data["f57"].as_str().unwrap_or(fallback_code).to_string(),
        name: data["f58"].as_str().unwrap_or("").to_string(),
        price: scaled_price(data, "f2"),
        // 涨跌额/涨跌幅允许为负，只做缩放不做哨兵
        change_percent: num(&data["f3"]) / 100.0,
        change_amount: num(&data["f4"]) / 100.0,
        volume: num(&data["f5"]),
        turnover: num(&data["f6"]),
        high: scaled_price(data, "f15"),
        low: scaled_price(data, "f16"),
        open: scaled_price(data, "f17"),
        prev_close: scaled_price(data, "f18"),
        market_cap,
        pe_ratio,
        is_trading_hours: hours::is_trading_hours(),
    }
}

/// 纯子串匹配；名称恰好含 "ST" 的误报属于已知口径，不做白名单
fn name_is_st(name: &str) -> bool {
    name.to_uppercase().contains("ST")
}

/// 盘后/停牌兜底：现价哨兵 0 时退回昨收，
/// 并用最近两根日 K 估算前一交易日涨跌；估算不了就记 0 涨跌。
/// 昨收存在时绝不把哨兵 0 当真实价格透出
fn apply_offhours_fallback(quote: &mut StockQuote, bars: Option<&[HistoryBar]>) {
    if quote.price > 0.0 || quote.prev_close <= 0.0 {
        return;
    }
    quote.price = quote.prev_close;
    let (amount, percent) = bars.map(change_from_bars).unwrap_or((0.0, 0.0));
    quote.change_amount = amount;
    quote.change_percent = percent;
}

/// 用最近两根日 K 的收盘差估算前一交易日涨跌
fn change_from_bars(bars: &[HistoryBar]) -> (f64, f64) {
    if bars.len() < 2 {
        return (0.0, 0.0);
    }
    let prev = &bars[bars.len() - 2];
    let last = &bars[bars.len() - 1];
    if prev.close <= 0.0 {
        return (0.0, 0.0);
    }
    let amount = last.close - prev.close;
    let percent = amount / prev.close * 100.0;
    (amount, percent)
}
