use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};

// 北京时间无夏令时，固定偏移即可
const CST_OFFSET_SECS: i32 = 8 * 3600;

fn beijing(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let cst = FixedOffset::east_opt(CST_OFFSET_SECS).expect("CST offset is valid");
    now.with_timezone(&cst)
}

/// A股连续竞价时段：周一至周五 09:30-11:30 / 13:00-15:00（北京时间）
/// 与运行机器所在时区无关
pub fn is_trading_hours_at(now: DateTime<Utc>) -> bool {
    let local = beijing(now);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let hm = (local.hour(), local.minute());
    let morning = hm >= (9, 30) && hm <= (11, 30);
    let afternoon = hm >= (13, 0) && hm <= (15, 0);
    morning || afternoon
}

pub fn is_trading_hours() -> bool {
    is_trading_hours_at(Utc::now())
}

pub fn beijing_today() -> NaiveDate {
    beijing(Utc::now()).date_naive()
}
