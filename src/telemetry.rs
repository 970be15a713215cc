//! 遥测数据整形
//!
//! 把 `/datalogs` 原始行整理成面板、图表和表格可以直接使用的形式。
//! 全部是纯函数，`now` 由调用方传入。

use std::borrow::Cow;
use std::fmt::Write;
use std::time::Duration;

use battwatch_shared::date::{Timestamp, normalize_iso, parse_log_timestamp};
use battwatch_shared::{DataLog, FILTER_ALL, GraphData};

pub const CSV_HEADER: &str = "Timestamp,Current (A),Temperature (°C),Voltage (V),Battery ID";

// =========================================================
// TelemetryPoint
// =========================================================

/// 规整后的一行读数
///
/// 缺失或无法解析的读数按 0 处理；时间无法解析时 `at` 为 `None`。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryPoint {
    /// ISO 形式的原始时间
    pub timestamp: String,
    pub at: Option<Timestamp>,
    pub current: f64,
    pub temperature: f64,
    pub voltage: f64,
    pub battery_id: Option<String>,
}

impl From<&DataLog> for TelemetryPoint {
    fn from(log: &DataLog) -> Self {
        Self {
            timestamp: normalize_iso(&log.timestamp),
            at: parse_log_timestamp(&log.timestamp),
            current: log.current.unwrap_or(0.0),
            temperature: log.temperature.unwrap_or(0.0),
            voltage: log.voltage.unwrap_or(0.0),
            battery_id: log.battery_id.clone(),
        }
    }
}

impl TelemetryPoint {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Voltage => self.voltage,
            Metric::Current => self.current,
            Metric::Temperature => self.temperature,
        }
    }
}

/// 规整并按时间升序排序，无法解析的时间排在最后
pub fn normalize(logs: &[DataLog]) -> Vec<TelemetryPoint> {
    let mut points: Vec<TelemetryPoint> = logs.iter().map(TelemetryPoint::from).collect();
    // 稳定排序，时间相同或都无效时保持原顺序
    points.sort_by_key(|p| (p.at.is_none(), p.at));
    points
}

// =========================================================
// 指标
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Voltage,
    Current,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Voltage, Metric::Current, Metric::Temperature];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Voltage => "Voltage",
            Metric::Current => "Current",
            Metric::Temperature => "Temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Voltage => "V",
            Metric::Current => "A",
            Metric::Temperature => "°C",
        }
    }

    /// `Current (A)` 形式的标题
    pub fn title(&self) -> String {
        format!("{} ({})", self.label(), self.unit())
    }

    /// 图表线条颜色
    pub fn color(&self) -> &'static str {
        match self {
            Metric::Voltage => "#10b981",
            Metric::Current => "#3b82f6",
            Metric::Temperature => "#ef4444",
        }
    }
}

// =========================================================
// 时间窗口
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    OneMinute,
    ThirtyMinutes,
    #[default]
    OneHour,
    OneDay,
    OneMonth,
    SixMonths,
    OneYear,
    All,
}

impl TimeRange {
    /// 面板上可选的窗口
    pub const CHOICES: [TimeRange; 7] = [
        TimeRange::OneMinute,
        TimeRange::ThirtyMinutes,
        TimeRange::OneHour,
        TimeRange::OneDay,
        TimeRange::OneMonth,
        TimeRange::SixMonths,
        TimeRange::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneMinute => "1min",
            TimeRange::ThirtyMinutes => "30min",
            TimeRange::OneHour => "1hr",
            TimeRange::OneDay => "1day",
            TimeRange::OneMonth => "1month",
            TimeRange::SixMonths => "6months",
            TimeRange::OneYear => "1year",
            TimeRange::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::CHOICES
            .into_iter()
            .chain([TimeRange::All])
            .find(|r| r.as_str() == s)
    }

    /// 窗口起点；月、年按日历计算
    pub fn cutoff(&self, now: Timestamp) -> Option<Timestamp> {
        const MINUTE: u64 = 60;
        match self {
            TimeRange::OneMinute => Some(now - Duration::from_secs(MINUTE)),
            TimeRange::ThirtyMinutes => Some(now - Duration::from_secs(30 * MINUTE)),
            TimeRange::OneHour => Some(now - Duration::from_secs(60 * MINUTE)),
            TimeRange::OneDay => Some(now - Duration::from_secs(24 * 60 * MINUTE)),
            TimeRange::OneMonth => now.months_before(1),
            TimeRange::SixMonths => now.months_before(6),
            TimeRange::OneYear => now.months_before(12),
            TimeRange::All => None,
        }
    }
}

/// 按时间窗口过滤
///
/// 有窗口时，时间无效的行一并剔除。结果为空就返回空，不回退到全量数据。
pub fn filter_window(
    points: &[TelemetryPoint],
    range: TimeRange,
    now: Timestamp,
) -> Vec<TelemetryPoint> {
    match range.cutoff(now) {
        None => points.to_vec(),
        Some(cutoff) => points
            .iter()
            .filter(|p| p.at.is_some_and(|at| at >= cutoff))
            .cloned()
            .collect(),
    }
}

/// 按电池过滤；空值和 `all` 表示不过滤
pub fn filter_battery(points: &[TelemetryPoint], battery: &str) -> Vec<TelemetryPoint> {
    if battery.is_empty() || battery.eq_ignore_ascii_case(FILTER_ALL) {
        return points.to_vec();
    }
    points
        .iter()
        .filter(|p| p.battery_id.as_deref() == Some(battery))
        .cloned()
        .collect()
}

/// 出现过的电池编号，保持首次出现的顺序
pub fn battery_ids(points: &[TelemetryPoint]) -> Vec<String> {
    unique_ids(points.iter().map(|p| p.battery_id.as_deref()))
}

/// 去重并跳过缺失/空值，保持首次出现的顺序
pub fn unique_ids<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut out: Vec<String> = Vec::new();
    for id in ids.into_iter().flatten() {
        if !id.is_empty() && !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    out
}

/// 最新一行，作为面板上的实时快照
pub fn latest(points: &[TelemetryPoint]) -> Option<&TelemetryPoint> {
    points.iter().rev().find(|p| p.at.is_some()).or(points.last())
}

// =========================================================
// 图表
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub voltage: Vec<f64>,
}

impl ChartSeries {
    pub fn from_points(points: &[TelemetryPoint]) -> Self {
        let mut series = Self::default();
        for p in points {
            let label = p.at.map(Timestamp::clock_label).unwrap_or_default();
            series.labels.push(label);
            series.current.push(p.current);
            series.temperature.push(p.temperature);
            series.voltage.push(p.voltage);
        }
        series
    }

    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Voltage => &self.voltage,
            Metric::Current => &self.current,
            Metric::Temperature => &self.temperature,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<GraphData> for ChartSeries {
    fn from(g: GraphData) -> Self {
        Self {
            labels: g.labels,
            current: g.current,
            temperature: g.temperature,
            voltage: g.voltage,
        }
    }
}

/// 把序列缩放到 `width x height` 的画布坐标（y 轴向下）
///
/// 所有值相同时画在中线上；单个点放在最左侧。
pub fn plot_points(values: &[f64], width: f64, height: f64) -> Vec<(f64, f64)> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let span = max - min;
    let step = if values.len() > 1 {
        width / (values.len() - 1) as f64
    } else {
        0.0
    };

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let ratio = if span > 0.0 && v.is_finite() {
                (v - min) / span
            } else {
                0.5
            };
            (i as f64 * step, height - ratio * height)
        })
        .collect()
}

// =========================================================
// 分页
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 从 1 开始
    pub number: usize,
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// 取第 `number` 页（从 1 开始），越界时夹到最后一页
pub fn paginate<T>(items: &[T], number: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let number = number.clamp(1, total_pages);
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Page {
        items: &items[start.min(items.len())..end],
        number,
        total_pages,
    }
}

// =========================================================
// CSV
// =========================================================

/// 含逗号、引号或换行的字段用双引号包起来，内部引号加倍
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// 数据日志导出为 CSV
pub fn datalogs_csv(points: &[TelemetryPoint]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for p in points {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            csv_field(&p.timestamp),
            p.current,
            p.temperature,
            p.voltage,
            csv_field(p.battery_id.as_deref().unwrap_or_default())
        );
    }
    out
}
