use serde::{Serialize, Deserialize};

/// 东方财富行情快照。所有缩放字段均已还原为真实单位：
/// 价格类 ÷100，市值（万元）×10000，PE ÷100
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub code: String,
    pub name: String,
    /// 现价。源端 0 为"无数据"哨兵，盘后会回退到昨收
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub turnover: f64,
    /// 总市值（元）。0 表示源端无数据
    pub market_cap: f64,
    /// 市盈率。源端非正值视为"不适用"
    pub pe_ratio: Option<f64>,
    pub is_trading_hours: bool,
}

/// 单个交易日的日 K 记录，按时间从旧到新排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBar {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub turnover: f64,
}

impl HistoryBar {
    /// 解析 K 线接口的逗号串："日期,开,收,高,低,量,额"
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 7 {
            return None;
        }
        Some(Self {
            date: parts[0].to_string(),
            open: parts[1].parse().ok()?,
            close: parts[2].parse().ok()?,
            high: parts[3].parse().ok()?,
            low: parts[4].parse().ok()?,
            volume: parts[5].parse().ok()?,
            turnover: parts[6].parse().ok()?,
        })
    }
}

/// 采集产物：展示用的分类链接列表 + 分析用的正文语料
#[derive(Debug, Default)]
pub struct FeedDigest {
    pub sections: Vec<(String, String)>,
    pub corpus: String,
}
