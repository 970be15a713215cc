//! 路由定义模块 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。
//! 定义了应用的所有路由、带查询参数的位置，以及导航守卫。

use std::fmt::Display;

use url::form_urlencoded;

/// 守卫重定向时记录原始位置的查询参数名
pub const QUERY_FROM: &str = "from";
/// 登录页展示的错误信息
pub const QUERY_ERROR: &str = "error";
/// 登录页展示的提示信息
pub const QUERY_NOTICE: &str = "notice";
pub const QUERY_EMAIL: &str = "email";
pub const QUERY_NAME: &str = "name";

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 登录页面
    #[default]
    Login,
    Register,
    ForgotPassword,
    /// OAuth 回调（`/qauth`，兼容旧地址 `/oauth-callback`）
    OAuthCallback,
    /// 控制面板 (需要认证)
    Dashboard,
    DataLogs,
    FaultLogs,
    Profile,
    /// 页面未找到
    NotFound,
}

impl AppRoute {
    /// 需要认证的全部路由
    pub const PROTECTED: [AppRoute; 4] = [
        AppRoute::Dashboard,
        AppRoute::DataLogs,
        AppRoute::FaultLogs,
        AppRoute::Profile,
    ];

    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match path {
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/forgot-password" => Self::ForgotPassword,
            "/qauth" | "/oauth-callback" => Self::OAuthCallback,
            "/" | "/dashboard" => Self::Dashboard,
            "/data-logs" => Self::DataLogs,
            "/fault-logs" => Self::FaultLogs,
            "/profile" => Self::Profile,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::ForgotPassword => "/forgot-password",
            Self::OAuthCallback => "/qauth",
            Self::Dashboard => "/",
            Self::DataLogs => "/data-logs",
            Self::FaultLogs => "/fault-logs",
            Self::Profile => "/profile",
            Self::NotFound => "/404",
        }
    }

    /// **核心守卫逻辑：定义该路由是否需要认证**
    pub fn requires_auth(&self) -> bool {
        Self::PROTECTED.contains(self)
    }

    /// 已认证用户是否应该离开此路由（登录、注册页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// 认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 认证成功时的重定向目标
    pub fn auth_success_redirect() -> Self {
        Self::Dashboard
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

// =========================================================
// AppLocation - 路由 + 查询参数
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppLocation {
    pub route: AppRoute,
    pub query: Vec<(String, String)>,
}

impl AppLocation {
    pub fn new(route: AppRoute) -> Self {
        Self {
            route,
            query: Vec::new(),
        }
    }

    /// 追加查询参数；空值跳过
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.query.push((key.to_string(), value));
        }
        self
    }

    /// 解析 `path?query`，也接受单独的 path
    pub fn parse(href: &str) -> Self {
        let (path, search) = href.split_once('?').unwrap_or((href, ""));
        Self::from_parts(path, search)
    }

    /// 由 `location.pathname` 和 `location.search` 构造
    pub fn from_parts(pathname: &str, search: &str) -> Self {
        let search = search.strip_prefix('?').unwrap_or(search);
        let query = form_urlencoded::parse(search.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            route: AppRoute::from_path(pathname),
            query,
        }
    }

    /// 第一个同名参数的值
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn href(&self) -> String {
        if self.query.is_empty() {
            return self.route.to_path().to_string();
        }
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.query {
            ser.append_pair(k, v);
        }
        format!("{}?{}", self.route.to_path(), ser.finish())
    }

    pub fn dashboard() -> Self {
        Self::new(AppRoute::Dashboard)
    }

    /// 登录页 + 错误信息
    pub fn login_with_error(message: &str) -> Self {
        Self::new(AppRoute::Login).with(QUERY_ERROR, message)
    }

    /// 登录页 + 提示信息，邮箱预填
    pub fn login_with_notice(notice: &str, email: &str) -> Self {
        Self::new(AppRoute::Login)
            .with(QUERY_NOTICE, notice)
            .with(QUERY_EMAIL, email)
    }

    /// 注册页，预填邮箱和姓名
    pub fn register_with(email: &str, name: Option<&str>) -> Self {
        Self::new(AppRoute::Register)
            .with(QUERY_EMAIL, email)
            .with(QUERY_NAME, name.unwrap_or_default())
    }

    /// 登录成功后的返回地址：只接受受保护路由，否则回到面板
    pub fn return_target(&self) -> AppLocation {
        self.query_value(QUERY_FROM)
            .map(AppLocation::parse)
            .filter(|loc| loc.route.requires_auth())
            .unwrap_or_else(|| AppLocation::new(AppRoute::auth_success_redirect()))
    }
}

impl From<AppRoute> for AppLocation {
    fn from(route: AppRoute) -> Self {
        Self::new(route)
    }
}

impl Display for AppLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.href())
    }
}

// =========================================================
// Route Guard
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render(AppLocation),
    Redirect(AppLocation),
}

impl GuardDecision {
    /// 最终要展示的位置
    pub fn location(&self) -> &AppLocation {
        match self {
            GuardDecision::Render(loc) | GuardDecision::Redirect(loc) => loc,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GuardDecision::Redirect(_))
    }
}

/// 导航守卫
///
/// 同步执行，不访问后端；每次导航都重新判断。
pub fn guard(target: AppLocation, is_authenticated: bool) -> GuardDecision {
    if target.route.requires_auth() && !is_authenticated {
        let redirect = AppLocation::new(AppRoute::auth_failure_redirect())
            .with(QUERY_FROM, target.href());
        return GuardDecision::Redirect(redirect);
    }

    if target.route.should_redirect_when_authenticated() && is_authenticated {
        return GuardDecision::Redirect(AppLocation::new(AppRoute::auth_success_redirect()));
    }

    GuardDecision::Render(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_round_trip() {
        for route in [
            AppRoute::Login,
            AppRoute::Register,
            AppRoute::ForgotPassword,
            AppRoute::OAuthCallback,
            AppRoute::Dashboard,
            AppRoute::DataLogs,
            AppRoute::FaultLogs,
            AppRoute::Profile,
        ] {
            assert_eq!(AppRoute::from_path(route.to_path()), route);
        }
        assert_eq!(AppRoute::from_path("/oauth-callback"), AppRoute::OAuthCallback);
        assert_eq!(AppRoute::from_path("/dashboard"), AppRoute::Dashboard);
        assert_eq!(AppRoute::from_path("/data-logs/"), AppRoute::DataLogs);
        assert_eq!(AppRoute::from_path("/admin"), AppRoute::NotFound);
    }

    #[test]
    fn test_unauthenticated_protected_redirects_to_login() {
        for route in AppRoute::PROTECTED {
            let target = AppLocation::new(route).with("page", "2");
            let decision = guard(target.clone(), false);
            let GuardDecision::Redirect(loc) = decision else {
                panic!("expected redirect for {route}");
            };
            assert_eq!(loc.route, AppRoute::Login);
            assert_eq!(loc.query_value(QUERY_FROM), Some(target.href().as_str()));
        }
    }

    #[test]
    fn test_authenticated_protected_renders() {
        for route in AppRoute::PROTECTED {
            let target = AppLocation::new(route);
            assert_eq!(guard(target.clone(), true), GuardDecision::Render(target));
        }
    }

    #[test]
    fn test_public_routes_render_without_auth() {
        for route in [
            AppRoute::Login,
            AppRoute::Register,
            AppRoute::ForgotPassword,
            AppRoute::OAuthCallback,
            AppRoute::NotFound,
        ] {
            assert!(!guard(AppLocation::new(route), false).is_redirect());
        }
    }

    #[test]
    fn test_authenticated_login_goes_to_dashboard() {
        let decision = guard(AppLocation::new(AppRoute::Login), true);
        assert_eq!(
            decision,
            GuardDecision::Redirect(AppLocation::new(AppRoute::Dashboard))
        );
        // 回调页即使已登录也要处理新的令牌
        assert!(!guard(AppLocation::new(AppRoute::OAuthCallback), true).is_redirect());
    }

    #[test]
    fn test_location_parse_and_href() {
        let loc = AppLocation::parse("/register?email=a%40b.com&name=Amy+Lee");
        assert_eq!(loc.route, AppRoute::Register);
        assert_eq!(loc.query_value("email"), Some("a@b.com"));
        assert_eq!(loc.query_value("name"), Some("Amy Lee"));
        assert_eq!(loc.href(), "/register?email=a%40b.com&name=Amy+Lee");

        let bare = AppLocation::from_parts("/qauth", "?token=abc");
        assert_eq!(bare.query_value("token"), Some("abc"));
    }

    #[test]
    fn test_constructors_skip_empty_values() {
        let reg = AppLocation::register_with("a@b.com", None);
        assert_eq!(reg.href(), "/register?email=a%40b.com");

        let login = AppLocation::login_with_notice("Please log in.", "");
        assert_eq!(login.query.len(), 1);
        assert_eq!(login.query_value(QUERY_NOTICE), Some("Please log in."));
    }

    #[test]
    fn test_return_target_only_accepts_protected() {
        let login = AppLocation::new(AppRoute::Login).with(QUERY_FROM, "/fault-logs");
        assert_eq!(login.return_target().route, AppRoute::FaultLogs);

        let sneaky = AppLocation::new(AppRoute::Login).with(QUERY_FROM, "/qauth?token=x");
        assert_eq!(sneaky.return_target().route, AppRoute::Dashboard);

        assert_eq!(
            AppLocation::new(AppRoute::Login).return_target().route,
            AppRoute::Dashboard
        );
    }
}
