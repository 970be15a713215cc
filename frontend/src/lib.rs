//! BattWatch 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `battwatch::route`: 路由定义与守卫（领域模型，位于核心库）
//! - `web::router`: 路由服务（核心引擎）
//! - `auth`: 认证状态管理
//! - `api`: 会话存储与后端客户端的组装
//! - `components`: UI 组件层

mod api;
mod auth;
mod components {
    pub mod chart;
    pub mod dashboard;
    pub mod data_logs;
    pub mod fault_logs;
    pub mod forgot_password;
    pub mod layout;
    pub mod login;
    pub mod oauth_callback;
    pub mod profile;
    pub mod register;
}

use crate::api::provide_services;
use crate::auth::{AuthContext, init_auth};
use crate::components::dashboard::DashboardPage;
use crate::components::data_logs::DataLogsPage;
use crate::components::fault_logs::FaultLogsPage;
use crate::components::forgot_password::ForgotPasswordPage;
use crate::components::layout::AppShell;
use crate::components::login::LoginPage;
use crate::components::oauth_callback::OAuthCallbackPage;
use crate::components::profile::ProfilePage;
use crate::components::register::RegisterPage;

use battwatch::AppRoute;
use leptos::prelude::*;

// 原生 Web API 封装模块
// 此模块提供对浏览器原生 API 的轻量级封装，
// 同时实现核心库的 `HttpClient` / `KeyValueStore` 接口。
pub(crate) mod web {
    mod download;
    mod http;
    pub mod router;
    mod storage;
    mod timer;

    pub use download::download_text;
    pub use http::FetchClient;
    pub use storage::LocalStorage;
    pub use timer::Interval;
}

use web::router::{Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件。受保护页面包在应用外壳里。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Register => view! { <RegisterPage /> }.into_any(),
        AppRoute::ForgotPassword => view! { <ForgotPasswordPage /> }.into_any(),
        AppRoute::OAuthCallback => view! { <OAuthCallbackPage /> }.into_any(),
        AppRoute::Dashboard => view! { <AppShell><DashboardPage /></AppShell> }.into_any(),
        AppRoute::DataLogs => view! { <AppShell><DataLogsPage /></AppShell> }.into_any(),
        AppRoute::FaultLogs => view! { <AppShell><FaultLogsPage /></AppShell> }.into_any(),
        AppRoute::Profile => view! { <AppShell><ProfilePage /></AppShell> }.into_any(),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-screen bg-base-200">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"Page not found"</p>
                    <a href="/" class="btn btn-primary mt-6">"Back to dashboard"</a>
                </div>
            </div>
        }
        .into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 组装会话存储和 API 客户端
    let services = provide_services();

    // 2. 创建认证上下文
    let auth_ctx = AuthContext::new();
    provide_context(auth_ctx);

    // 3. 初始化认证状态（从 LocalStorage 恢复）
    init_auth(&auth_ctx, &services);

    // 4. 获取认证状态信号，用于注入路由服务（解耦！）
    let is_authenticated = auth_ctx.is_authenticated_signal();

    view! {
        // 5. 路由器组件：注入认证信号实现守卫
        <Router is_authenticated=is_authenticated>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
