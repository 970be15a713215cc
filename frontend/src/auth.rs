//! 认证模块
//!
//! 管理用户认证状态，与路由系统解耦。
//! 路由服务通过注入的认证信号来检查认证状态。
//! 持久化状态全部在 `Session`（LocalStorage）里，这里的信号只是它的镜像。

use battwatch::AppResult;
use battwatch_shared::protocol::{LoginRequest, RegisterRequest};
use battwatch_shared::{Role, UserProfile};
use leptos::prelude::*;

use crate::api::Services;

/// 认证状态
#[derive(Clone, Default)]
pub struct AuthState {
    /// 是否已认证
    pub is_authenticated: bool,
    /// 缓存的用户资料（仅用于展示）
    pub user: Option<UserProfile>,
    pub role: Option<Role>,
}

/// 认证上下文
///
/// 包含读写信号，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 认证状态（只读）
    pub state: ReadSignal<AuthState>,
    /// 设置认证状态（写入）
    pub set_state: WriteSignal<AuthState>,
}

impl AuthContext {
    /// 创建新的认证上下文
    pub fn new() -> Self {
        let (state, set_state) = signal(AuthState::default());
        Self { state, set_state }
    }

    /// 获取认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_authenticated)
    }

    /// 从会话存储重新读取状态
    pub fn refresh(&self, services: &Services) {
        let session = &services.session;
        self.set_state.set(AuthState {
            is_authenticated: session.is_authenticated(),
            user: session.user(),
            role: session.role(),
        });
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 初始化认证状态
///
/// 每次页面加载都从 LocalStorage 恢复，不访问后端。
pub fn init_auth(ctx: &AuthContext, services: &Services) {
    ctx.refresh(services);
}

/// 密码登录
///
/// 成功时写入会话；导航由路由服务的认证状态监听处理。
pub async fn login(ctx: &AuthContext, services: &Services, req: LoginRequest) -> AppResult<()> {
    let resp = services.api.login(&req).await?;
    let session = &services.session;
    session.set_session(&resp.token, Some(&resp.user));
    if let Some(role) = Role::parse(&req.role) {
        session.set_role(role);
    }
    battwatch::log_info!("[Auth] Logged in as {}", req.role);
    ctx.refresh(services);
    Ok(())
}

/// 注册，成功后直接进入已登录状态
pub async fn register(
    ctx: &AuthContext,
    services: &Services,
    req: RegisterRequest,
) -> AppResult<()> {
    let resp = services.api.register(&req).await?;
    let session = &services.session;
    session.set_session(&resp.token, Some(&resp.user));
    if let Some(role) = Role::parse(&req.role) {
        session.set_role(role);
    }
    battwatch::log_info!("[Auth] Registered new account");
    ctx.refresh(services);
    Ok(())
}

/// 更新缓存的用户资料
pub fn cache_user(ctx: &AuthContext, services: &Services, user: &UserProfile) {
    services.session.set_user(user);
    ctx.refresh(services);
}

/// 注销并清除状态
///
/// 导航将由路由服务的认证状态监听自动处理。
pub fn logout(ctx: &AuthContext, services: &Services) {
    services.session.clear();
    battwatch::log_info!("[Auth] Logged out");
    ctx.refresh(services);
    // 注意：不需要手动导航，路由服务会监听认证状态变化并自动重定向
}
