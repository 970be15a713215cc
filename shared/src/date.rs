//! 时间类型模块
//!
//! - `Timestamp`: 可序列化的毫秒时间戳，用于排序和时间窗口过滤
//! - 日志时间字符串的解析（后端会下发 `YYYY-MM-DD HH:MM:SS` 这种非 ISO 格式）

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Sub;
use std::time::Duration;

// =========================================================
// Timestamp - 可传输的时间戳类型
// =========================================================

/// 毫秒时间戳
///
/// 内部存储为 `i64`，表示自 Unix 纪元以来的毫秒数（UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    #[inline]
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    /// 当前时间（wasm 下由 `js_sys::Date` 提供）
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// 往前推若干个日历月（月末自动对齐，如 3/31 -> 2/29）
    pub fn months_before(self, months: u32) -> Option<Self> {
        self.to_datetime()?
            .checked_sub_months(Months::new(months))
            .map(|dt| Self(dt.timestamp_millis()))
    }

    /// 格式化为 `HH:MM`，用于图表横轴标签
    pub fn clock_label(self) -> String {
        self.to_datetime()
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Self(ms)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs.as_millis() as i64)
    }
}

// =========================================================
// 日志时间解析
// =========================================================

/// 把 `YYYY-MM-DD HH:MM:SS` 规整为 ISO 8601 (`YYYY-MM-DDTHH:MM:SS`)
///
/// 已经包含 `T` 的字符串原样返回。
pub fn normalize_iso(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains(' ') && !raw.contains('T') {
        raw.replacen(' ', "T", 1)
    } else {
        raw.to_string()
    }
}

/// 解析日志时间
///
/// 支持 RFC 3339、无时区的 ISO 日期时间（按 UTC 处理）以及纯日期。
/// 无法解析时返回 `None`。
pub fn parse_log_timestamp(raw: &str) -> Option<Timestamp> {
    let iso = normalize_iso(raw);
    if iso.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&iso) {
        return Some(Timestamp(dt.timestamp_millis()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Timestamp(naive.and_utc().timestamp_millis()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M") {
        return Some(Timestamp(naive.and_utc().timestamp_millis()));
    }

    NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Timestamp(dt.and_utc().timestamp_millis()))
}
