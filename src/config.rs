//! 运行时配置
//!
//! 后端地址在编译期通过 `BATTWATCH_API_URL` 注入，未设置时使用默认值。

use std::time::Duration;

use battwatch_shared::protocol::{FAULT_LOGS_CSV_PATH, GOOGLE_START_PATH};

// =========================================================
// 默认值
// =========================================================

const DEFAULT_API_URL: &str = "http://localhost:8000";
const API_PREFIX: &str = "/api";

/// OAuth 可恢复错误的重试预算（一次性，不做指数退避）
pub const DEFAULT_OAUTH_MAX_RETRIES: u32 = 1;
pub const DEFAULT_OAUTH_RETRY_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SENSOR_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_PAGE_SIZE: usize = 25;

// =========================================================
// Backend Locator
// =========================================================

/// 后端地址
///
/// 只保存规整后的 origin，API 前缀统一追加。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    origin: String,
}

impl BackendConfig {
    /// 规整配置值：去空白、去掉一个结尾 `/`、去掉结尾的 `/api`
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let no_slash = raw.strip_suffix('/').unwrap_or(raw);
        let origin = no_slash.strip_suffix(API_PREFIX).unwrap_or(no_slash);
        Self {
            origin: origin.to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn api_base(&self) -> String {
        format!("{}{}", self.origin, API_PREFIX)
    }

    /// 拼接 API 路径，兼容有无前导 `/`
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base(), path)
        } else {
            format!("{}/{}", self.api_base(), path)
        }
    }

    pub fn google_start_url(&self) -> String {
        self.api_url(GOOGLE_START_PATH)
    }

    pub fn fault_logs_csv_url(&self) -> String {
        self.api_url(FAULT_LOGS_CSV_PATH)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

// =========================================================
// 运行时配置
// =========================================================

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: BackendConfig,
    pub oauth_max_retries: u32,
    pub oauth_retry_delay: Duration,
    pub sensor_poll_interval: Duration,
    pub page_size: usize,
}

impl RuntimeConfig {
    /// 读取编译期环境变量，读不到就用默认值
    pub fn from_env() -> Self {
        Self::with_api_url(option_env!("BATTWATCH_API_URL").unwrap_or(DEFAULT_API_URL))
    }

    pub fn with_api_url(raw: &str) -> Self {
        Self {
            backend: BackendConfig::new(raw),
            oauth_max_retries: DEFAULT_OAUTH_MAX_RETRIES,
            oauth_retry_delay: DEFAULT_OAUTH_RETRY_DELAY,
            sensor_poll_interval: DEFAULT_SENSOR_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_strips_slash_and_api_suffix() {
        for raw in [
            "http://host:8000",
            "http://host:8000/",
            "http://host:8000/api",
            "http://host:8000/api/",
            "  http://host:8000/api  ",
        ] {
            let cfg = BackendConfig::new(raw);
            assert_eq!(cfg.origin(), "http://host:8000", "raw = {raw:?}");
            assert_eq!(cfg.api_base(), "http://host:8000/api");
        }
    }

    #[test]
    fn test_api_url_join() {
        let cfg = BackendConfig::new("https://b.example");
        assert_eq!(cfg.api_url("/datalogs"), "https://b.example/api/datalogs");
        assert_eq!(cfg.api_url("sensor"), "https://b.example/api/sensor");
        assert_eq!(cfg.google_start_url(), "https://b.example/api/auth/google");
        assert_eq!(
            cfg.fault_logs_csv_url(),
            "https://b.example/api/fault-logs/csv"
        );
    }

    #[test]
    fn test_runtime_defaults() {
        let cfg = RuntimeConfig::with_api_url("http://x");
        assert_eq!(cfg.oauth_max_retries, 1);
        assert_eq!(cfg.oauth_retry_delay, Duration::from_millis(1500));
    }
}
