//! OAuth 回调状态机
//!
//! 每次回调都从零开始判断，跨次携带的只有存储里的重试计数。
//! `plan` 是纯函数，`OAuthSequencer::run` 负责执行副作用。

use std::time::Duration;

use url::form_urlencoded;

use crate::api::BatteryApi;
use crate::claims::ClaimsDecoder;
use crate::config::RuntimeConfig;
use crate::request::HttpClient;
use crate::route::AppLocation;
use crate::session::{KEY_OAUTH_RETRY_COUNT, KeyValueStore, SessionStore};

/// 可以通过重新发起授权恢复的错误码
pub const RECOVERABLE_ERRORS: [&str; 2] = ["oauth_state_mismatch", "auth_failed"];

pub const MSG_GIVE_UP: &str = "Authentication failed. Please try signing in again.";
pub const MSG_EXISTING_ACCOUNT: &str = "Please log in with your existing account.";
pub const MSG_CHECK_EMAIL_FAILED: &str = "Authentication failed. Please try again later.";
pub const MSG_UNEXPECTED: &str = "Authentication failed. Please try again.";

// =========================================================
// 回调参数
// =========================================================

/// 回调地址上的查询参数
///
/// 后端会把未设置的模板值原样转发成 `"null"` / `"undefined"`，按缺失处理。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub token: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl RedirectParams {
    /// 解析 `location.search`，允许带 `?`
    pub fn from_query(search: &str) -> Self {
        let search = search.strip_prefix('?').unwrap_or(search);
        Self::from_pairs(form_urlencoded::parse(search.as_bytes()))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let Some(value) = present(value.as_ref()) else {
                continue;
            };
            let slot = match key.as_ref() {
                "token" => &mut params.token,
                "error" => &mut params.error,
                "message" => &mut params.message,
                "email" => &mut params.email,
                "name" => &mut params.name,
                _ => continue,
            };
            // 重复的键取第一个
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

fn present(value: &str) -> Option<String> {
    let value = value.trim();
    match value {
        "" | "null" | "undefined" => None,
        v => Some(v.to_string()),
    }
}

// =========================================================
// 重试策略
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            max_retries: config.oauth_max_retries,
            delay: config.oauth_retry_delay,
        }
    }

    pub fn is_recoverable(error: &str) -> bool {
        RECOVERABLE_ERRORS.contains(&error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

// =========================================================
// 纯决策
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 拿到令牌
    Finalize { token: String },
    /// 可恢复错误，计数写为 `next_count` 后重新发起授权
    Retry { next_count: u32 },
    /// 放弃，带着提示回到登录页
    GiveUp { message: String },
    /// 没有令牌也没有错误，只有邮箱
    CheckEmail { email: String, name: Option<String> },
    Unexpected,
}

/// 由参数和当前重试计数决定下一步
///
/// 令牌优先于错误和邮箱。
pub fn plan(params: &RedirectParams, stored_count: u32, policy: &RetryPolicy) -> Step {
    if let Some(token) = &params.token {
        return Step::Finalize {
            token: token.clone(),
        };
    }

    if let Some(error) = &params.error {
        if RetryPolicy::is_recoverable(error) && stored_count < policy.max_retries {
            return Step::Retry {
                next_count: stored_count + 1,
            };
        }
        let message = params
            .message
            .clone()
            .unwrap_or_else(|| MSG_GIVE_UP.to_string());
        return Step::GiveUp { message };
    }

    if let Some(email) = &params.email {
        return Step::CheckEmail {
            email: email.clone(),
            name: params.name.clone(),
        };
    }

    Step::Unexpected
}

// =========================================================
// 执行
// =========================================================

/// 回调处理的终点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 应用内导航，总是替换当前历史记录
    Navigate(AppLocation),
    /// 延迟后整页跳转到授权入口
    ProviderRedirect { url: String, delay: Duration },
}

pub struct OAuthSequencer<'a, S, C, D> {
    session: &'a SessionStore<S>,
    api: &'a BatteryApi<C>,
    decoder: D,
    policy: RetryPolicy,
}

impl<'a, S, C, D> OAuthSequencer<'a, S, C, D>
where
    S: KeyValueStore,
    C: HttpClient,
    D: ClaimsDecoder,
{
    pub fn new(
        session: &'a SessionStore<S>,
        api: &'a BatteryApi<C>,
        decoder: D,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            session,
            api,
            decoder,
            policy,
        }
    }

    pub async fn run(&self, params: &RedirectParams) -> Outcome {
        let stored = self.session.retry_count();
        match plan(params, stored, &self.policy) {
            Step::Finalize { token } => self.finalize(&token),
            Step::Retry { next_count } => self.retry(next_count),
            Step::GiveUp { message } => {
                crate::log_warn!(
                    "[OAuth] giving up: error={:?} retries={}",
                    params.error,
                    stored
                );
                self.drop_stale_session();
                self.session.clear_retry_count();
                Outcome::Navigate(AppLocation::login_with_error(&message))
            }
            Step::CheckEmail { email, name } => {
                self.drop_stale_session();
                self.check_email(&email, name.as_deref()).await
            }
            Step::Unexpected => {
                crate::log_warn!("[OAuth] callback without token, error or email");
                self.drop_stale_session();
                Outcome::Navigate(AppLocation::login_with_error(MSG_UNEXPECTED))
            }
        }
    }

    /// 回调没有带来新令牌时，旧会话一律作废
    ///
    /// 否则守卫会把登录/注册页的跳转改写到仪表盘，提示信息随之丢失。
    fn drop_stale_session(&self) {
        if self.session.is_authenticated() {
            crate::log_info!("[OAuth] discarding previous session");
        }
        self.session.clear_session(&[KEY_OAUTH_RETRY_COUNT]);
    }

    fn finalize(&self, token: &str) -> Outcome {
        let user = self
            .decoder
            .decode_display_claims(token)
            .map(|claims| claims.into_profile());
        self.session.set_session(token, user.as_ref());
        self.session.clear_retry_count();
        crate::log_info!("[OAuth] session established");
        Outcome::Navigate(AppLocation::dashboard())
    }

    fn retry(&self, next_count: u32) -> Outcome {
        // 先写计数再清理，保证计数不会被一起清掉
        self.session.set_retry_count(next_count);
        self.session.clear_session(&[KEY_OAUTH_RETRY_COUNT]);
        crate::log_info!(
            "[OAuth] recoverable error, retry {}/{} in {}ms",
            next_count,
            self.policy.max_retries,
            self.policy.delay.as_millis()
        );
        Outcome::ProviderRedirect {
            url: self.api.google_start_url(),
            delay: self.policy.delay,
        }
    }

    async fn check_email(&self, email: &str, name: Option<&str>) -> Outcome {
        match self.api.check_email(email).await {
            Ok(true) => {
                crate::log_info!("[OAuth] email already registered");
                Outcome::Navigate(AppLocation::login_with_notice(MSG_EXISTING_ACCOUNT, email))
            }
            Ok(false) => {
                crate::log_info!("[OAuth] new email, continuing to registration");
                Outcome::Navigate(AppLocation::register_with(email, name))
            }
            Err(e) => {
                crate::log_error!("[OAuth] email check failed: {}", e);
                Outcome::Navigate(AppLocation::login_with_error(MSG_CHECK_EMAIL_FAILED))
            }
        }
    }
}

#[cfg(test)]
mod tests;
