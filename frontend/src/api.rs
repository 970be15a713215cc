//! 浏览器侧服务组装
//!
//! 把核心库的 `SessionStore` / `BatteryApi` 绑定到 LocalStorage 和 fetch，
//! 通过 Context 提供给所有页面。

use battwatch::claims::JwtClaimsDecoder;
use battwatch::oauth::{OAuthSequencer, Outcome, RedirectParams, RetryPolicy};
use battwatch::{BatteryApi, RuntimeConfig, SessionStore, build_services};
use leptos::prelude::*;

use crate::web::{FetchClient, LocalStorage};

pub type Api = BatteryApi<FetchClient>;
pub type Session = SessionStore<LocalStorage>;

#[derive(Clone)]
pub struct Services {
    pub config: RuntimeConfig,
    pub session: Session,
    pub api: Api,
}

impl Services {
    pub fn from_env() -> Self {
        let config = RuntimeConfig::from_env();
        let (session, api) = build_services(&config, LocalStorage, FetchClient);
        battwatch::log_info!("[App] Backend: {}", api.backend().api_base());
        Self {
            config,
            session,
            api,
        }
    }

    /// 处理一次 OAuth 回调
    pub async fn run_oauth(&self, params: &RedirectParams) -> Outcome {
        let sequencer = OAuthSequencer::new(
            &self.session,
            &self.api,
            JwtClaimsDecoder,
            RetryPolicy::from_config(&self.config),
        );
        sequencer.run(params).await
    }
}

pub fn provide_services() -> Services {
    let services = Services::from_env();
    provide_context(services.clone());
    services
}

/// 从 Context 获取服务
pub fn use_services() -> Services {
    use_context::<Services>().expect("Services should be provided")
}
