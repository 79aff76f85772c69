//! 时间工具函数 — 营业日时区转换
//!
//! 所有日期→时间戳转换统一在这里完成，
//! repository 层只接收 `i64` Unix millis。

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 当前时间 Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 解析 IANA 时区字符串 (如 "Asia/Karachi")
pub fn parse_timezone(tz: &str) -> AppResult<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| AppError::validation(format!("Invalid timezone: {}", tz)))
}

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Unix millis → 该时刻在业务时区的日期
pub fn millis_to_business_date(millis: i64, tz: Tz) -> NaiveDate {
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&tz).date_naive(),
        _ => Utc::now().with_timezone(&tz).date_naive(),
    }
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期结束 → 次日 00:00:00 的 Unix millis (业务时区)
///
/// 返回次日零点时间戳，调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day, tz)
}

/// 给定时刻所在营业日的 [start, end) 毫秒区间 (业务时区)
pub fn business_day_bounds(millis: i64, tz: Tz) -> (i64, i64) {
    let date = millis_to_business_date(millis, tz);
    (day_start_millis(date, tz), day_end_millis(date, tz))
}
