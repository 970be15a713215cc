//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，实现高内聚：
//! 所有对 window.history 的操作都集中在此模块。
//! 实现了"监听 -> 验证 -> 处理 -> 加载"的导航流程，验证逻辑来自 `battwatch::route::guard`。

use std::time::Duration;

use battwatch::route::{AppLocation, AppRoute, GuardDecision, guard};
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

/// 获取当前浏览器位置（path + query）
fn current_location() -> AppLocation {
    let Some(location) = web_sys::window().map(|w| w.location()) else {
        return AppLocation::new(AppRoute::Dashboard);
    };
    let pathname = location.pathname().unwrap_or_else(|_| "/".to_string());
    let search = location.search().unwrap_or_default();
    AppLocation::from_parts(&pathname, &search)
}

/// 写入 History 状态（内部工具函数）
fn write_history_state(href: &str, use_push: bool) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = if use_push {
                history.push_state_with_url(&JsValue::NULL, "", Some(href))
            } else {
                history.replace_state_with_url(&JsValue::NULL, "", Some(href))
            };
        }
    }
}

/// 整页跳转到应用外的地址
pub fn redirect_external(url: &str) {
    battwatch::log_info!("[Router] Leaving app for {}", url);
    if let Some(window) = web_sys::window() {
        if window.location().set_href(url).is_err() {
            battwatch::log_error!("[Router] Failed to redirect to {}", url);
        }
    }
}

/// 延迟后整页跳转；页面卸载时定时器随之失效
pub fn schedule_external_redirect(url: String, delay: Duration) {
    set_timeout(move || redirect_external(&url), delay);
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
/// 通过注入认证检查信号实现与认证系统的解耦。
#[derive(Clone, Copy)]
pub struct RouterService {
    /// 当前位置（只读信号）
    current: ReadSignal<AppLocation>,
    /// 设置当前位置（写入信号）
    set_current: WriteSignal<AppLocation>,
    /// 认证状态检查（注入的信号，实现解耦）
    is_authenticated: Signal<bool>,
}

impl RouterService {
    /// 创建新的路由服务
    ///
    /// 首次加载的地址同样要经过守卫。
    fn new(is_authenticated: Signal<bool>) -> Self {
        let decision = guard(current_location(), is_authenticated.get_untracked());
        if let GuardDecision::Redirect(loc) = &decision {
            battwatch::log_info!("[Router] Initial access redirected to {}", loc);
            write_history_state(&loc.href(), false);
        }
        let (current, set_current) = signal(decision.location().clone());

        Self {
            current,
            set_current,
            is_authenticated,
        }
    }

    /// 获取当前位置信号
    pub fn current(&self) -> ReadSignal<AppLocation> {
        self.current
    }

    /// 当前路由（派生）
    pub fn current_route(&self) -> Signal<AppRoute> {
        let current = self.current;
        Signal::derive(move || current.get().route)
    }

    /// **核心方法：导航与守卫**
    ///
    /// 流程：请求 -> 验证(Guard) -> 处理 -> 加载
    pub fn navigate(&self, href: &str) {
        self.navigate_to(AppLocation::parse(href), true);
    }

    /// 替换当前历史记录的导航（重定向、回调结果）
    pub fn replace(&self, target: AppLocation) {
        self.navigate_to(target, false);
    }

    /// 导航到指定位置
    ///
    /// # Arguments
    /// * `target` - 目标位置
    /// * `use_push` - true 使用 pushState, false 使用 replaceState
    pub fn navigate_to(&self, target: AppLocation, use_push: bool) {
        let is_auth = self.is_authenticated.get_untracked();

        // --- Step 1: 验证目标位置 ---
        let location = match guard(target, is_auth) {
            GuardDecision::Render(loc) => loc,
            GuardDecision::Redirect(loc) => {
                battwatch::log_info!("[Router] Access redirected to {}", loc);
                // 重定向不应在历史中留下被拒绝的地址
                write_history_state(&loc.href(), false);
                self.set_current.set(loc);
                return;
            }
        };

        // --- Step 2: 加载页面 (更新状态) ---
        write_history_state(&location.href(), use_push);
        self.set_current.set(location);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let set_current = self.set_current;
        let is_authenticated = self.is_authenticated;

        let closure = Closure::<dyn Fn()>::new(move || {
            // popstate 时也执行守卫逻辑
            match guard(current_location(), is_authenticated.get_untracked()) {
                GuardDecision::Render(loc) => set_current.set(loc),
                GuardDecision::Redirect(loc) => {
                    write_history_state(&loc.href(), false);
                    set_current.set(loc);
                }
            }
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 设置认证状态变化时的自动重定向
    fn setup_auth_redirect(&self) {
        let current = self.current;
        let set_current = self.set_current;
        let is_authenticated = self.is_authenticated;

        // 使用 Effect 监听认证状态变化
        Effect::new(move |_| {
            let is_auth = is_authenticated.get();
            let location = current.get_untracked();

            if is_auth {
                // 用户刚登录，如果在登录/注册页则回到之前想去的页面
                if location.route.should_redirect_when_authenticated() {
                    let target = location.return_target();
                    battwatch::log_info!("[Router] Logged in, redirecting to {}", target);
                    write_history_state(&target.href(), false);
                    set_current.set(target);
                }
            } else if location.route.requires_auth() {
                // 用户登出，如果在受保护页面则重定向到登录
                let target = AppLocation::new(AppRoute::auth_failure_redirect());
                battwatch::log_info!("[Router] Logged out, redirecting to login");
                write_history_state(&target.href(), false);
                set_current.set(target);
            }
        });
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router(is_authenticated: Signal<bool>) -> RouterService {
    let router = RouterService::new(is_authenticated);

    // 初始化监听器
    router.init_popstate_listener();
    router.setup_auth_redirect();

    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    /// 认证状态信号
    is_authenticated: Signal<bool>,
    /// 子组件
    children: Children,
) -> impl IntoView {
    // 提供路由服务到 Context
    provide_router(is_authenticated);

    children()
}

/// 路由出口组件
///
/// 根据当前路由状态渲染对应的组件。只在路由变化时重建页面，查询参数变化不会。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();
    let route = Memo::new(move |_| router.current().get().route);

    move || matcher(route.get())
}

/// 应用内链接
///
/// 拦截点击，走路由服务导航而不是整页刷新。
#[component]
pub fn Link(
    /// 目标地址
    #[prop(into)]
    to: String,
    #[prop(optional, into)] class: String,
    /// 子内容
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class=class on:click=on_click>
            {children()}
        </a>
    }
}
