//! BattWatch 核心库
//!
//! 与平台无关的业务逻辑：会话、路由守卫、OAuth 回调状态机、REST 客户端和遥测整形。
//! 浏览器相关的实现（fetch、LocalStorage、History）在 `frontend` crate 里注入。

#[macro_use]
pub mod log;

pub mod api;
pub mod claims;
pub mod config;
pub mod error;
pub mod oauth;
pub mod request;
pub mod route;
pub mod session;
pub mod telemetry;

pub use api::BatteryApi;
pub use config::{BackendConfig, RuntimeConfig};
pub use error::{AppError, AppResult};
pub use route::{AppLocation, AppRoute, GuardDecision};
pub use session::{KeyValueStore, SessionStore};

// =========================================================
// 组装 (Wiring)
// =========================================================

/// 按运行时配置组装会话存储和 API 客户端
pub fn build_services<S, C>(
    config: &RuntimeConfig,
    storage: S,
    client: C,
) -> (SessionStore<S>, BatteryApi<C>)
where
    S: KeyValueStore,
    C: request::HttpClient,
{
    let session = SessionStore::new(storage, config.oauth_max_retries);
    let api = BatteryApi::new(config.backend.clone(), client);
    (session, api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use crate::session::MemoryStorage;

    #[test]
    fn test_build_services_uses_config() {
        let config = RuntimeConfig::with_api_url("https://battery.example.com/api/");
        let (session, api) = build_services(&config, MemoryStorage::new(), MockHttpClient::new());

        assert_eq!(session.max_retries(), 1);
        assert_eq!(api.backend().api_base(), "https://battery.example.com/api");
    }
}
