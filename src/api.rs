use battwatch_shared::protocol::{
    ApiRequest, CheckEmailRequest, DataLogQuery, FaultLogQuery, ForgotPasswordRequest, GraphQuery,
    HttpMethod, LoginRequest, MeRequest, RegisterRequest, ResetPasswordRequest, SensorLogsRequest,
    SensorRequest,
};
use battwatch_shared::{
    AuthResponse, CONTENT_TYPE_JSON, DataLog, ErrorBody, FaultLog, GraphData, HEADER_AUTHORIZATION,
    HEADER_CONTENT_TYPE, MessageResponse, SensorSnapshot, UserProfile,
};
use url::form_urlencoded;

use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpRequest, HttpResponse};

/// 后端 REST 客户端
///
/// 具体的 HTTP 实现通过 `HttpClient` 注入，浏览器里是 fetch，测试里是 Mock。
#[derive(Debug, Clone)]
pub struct BatteryApi<C> {
    backend: BackendConfig,
    client: C,
}

impl<C: HttpClient> BatteryApi<C> {
    pub fn new(backend: BackendConfig, client: C) -> Self {
        Self { backend, client }
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 请求的完整 URL（含查询参数）
    pub fn url_for<R: ApiRequest>(&self, req: &R) -> String {
        let base = self.backend.api_url(R::PATH);
        let query = req.query();
        if query.is_empty() {
            return base;
        }
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &query {
            ser.append_pair(k, v);
        }
        format!("{}?{}", base, ser.finish())
    }

    fn build<R: ApiRequest>(&self, req: &R, token: Option<&str>) -> AppResult<HttpRequest> {
        let mut http = HttpRequest::new(&self.url_for(req), R::METHOD)
            .with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);

        if let Some(token) = token {
            http = http.with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", token));
        }

        if R::METHOD == HttpMethod::Post {
            let body =
                serde_json::to_string(req).map_err(|e| AppError::Serialization(e.to_string()))?;
            http = http.with_body(body);
        }
        Ok(http)
    }

    async fn send_raw<R: ApiRequest>(&self, req: &R, token: Option<&str>) -> AppResult<HttpResponse> {
        let http = self.build(req, token)?;
        let resp = self.client.send(http).await?;
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp))
        }
    }

    /// 发送请求并解析为该请求声明的响应类型
    pub async fn send<R: ApiRequest>(&self, req: &R, token: Option<&str>) -> AppResult<R::Response> {
        self.send_raw(req, token).await?.json::<R::Response>()
    }

    // =========================================================
    // 认证
    // =========================================================

    pub async fn login(&self, req: &LoginRequest) -> AppResult<AuthResponse> {
        self.send(req, None).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> AppResult<AuthResponse> {
        self.send(req, None).await
    }

    /// 当前用户资料
    ///
    /// 后端有时返回 `{ "user": {...} }`，有时直接返回资料对象。
    pub async fn me(&self, token: &str) -> AppResult<UserProfile> {
        let resp = self.send_raw(&MeRequest, Some(token)).await?;
        let value: serde_json::Value = resp.json()?;
        let profile = match value.get("user") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => value,
        };
        serde_json::from_value(profile).map_err(AppError::from)
    }

    /// 邮箱是否已注册
    pub async fn check_email(&self, email: &str) -> AppResult<bool> {
        let req = CheckEmailRequest {
            email: email.to_string(),
        };
        Ok(self.send(&req, None).await?.exists)
    }

    /// 返回该邮箱的安全问题
    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };
        Ok(self.send(&req, None).await?.security_qn)
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> AppResult<MessageResponse> {
        self.send(req, None).await
    }

    pub fn google_start_url(&self) -> String {
        self.backend.google_start_url()
    }

    // =========================================================
    // 遥测
    // =========================================================

    pub async fn datalogs(&self, query: &DataLogQuery) -> AppResult<Vec<DataLog>> {
        self.send(query, None).await
    }

    pub async fn sensor(&self) -> AppResult<SensorSnapshot> {
        self.send(&SensorRequest, None).await
    }

    pub async fn sensor_logs(&self) -> AppResult<Vec<SensorSnapshot>> {
        self.send(&SensorLogsRequest, None).await
    }

    pub async fn fault_logs(&self, query: &FaultLogQuery) -> AppResult<Vec<FaultLog>> {
        self.send(query, None).await
    }

    pub fn fault_logs_csv_url(&self) -> String {
        self.backend.fault_logs_csv_url()
    }

    pub async fn graph(&self, query: &GraphQuery) -> AppResult<GraphData> {
        self.send(query, None).await
    }
}

fn error_from_response(resp: HttpResponse) -> AppError {
    match serde_json::from_str::<ErrorBody>(&resp.body) {
        Ok(body) => AppError::Backend(body.error),
        Err(_) => AppError::Status {
            status: resp.status,
            body: resp.body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use serde_json::json;

    const BASE: &str = "http://backend.test/api";

    fn api() -> BatteryApi<MockHttpClient> {
        BatteryApi::new(BackendConfig::new("http://backend.test/"), MockHttpClient::new())
    }

    #[tokio::test]
    async fn test_login_posts_json_body() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/login"),
            200,
            json!({"message": "Login successful", "token": "tok", "u_id": 1, "username": "amy", "email": "a@b.com"}),
        );

        let req = LoginRequest {
            email: "a@b.com".into(),
            password: "pw".into(),
            role: "user".into(),
        };
        let resp = api.login(&req).await.unwrap();
        assert_eq!(resp.token, "tok");
        assert_eq!(resp.user.username, "amy");

        let requests = api.client.requests.borrow();
        let (url, method, headers, body) = &requests[0];
        assert_eq!(url, &format!("{BASE}/auth/login"));
        assert_eq!(*method, HttpMethod::Post);
        assert_eq!(headers.get("Content-Type").unwrap(), "application/json");
        let sent: serde_json::Value = serde_json::from_str(body.as_ref().unwrap()).unwrap();
        assert_eq!(sent, json!({"email": "a@b.com", "password": "pw", "role": "user"}));
    }

    #[tokio::test]
    async fn test_backend_error_body_is_verbatim() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/login"),
            401,
            json!({"error": "Invalid credentials"}),
        );
        let req = LoginRequest {
            email: "a@b.com".into(),
            password: "bad".into(),
            role: "user".into(),
        };
        let err = api.login(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Backend(ref m) if m == "Invalid credentials"));
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_non_json_error_is_status() {
        let api = api();
        api.client
            .mock_raw(&format!("{BASE}/sensor"), 500, "Internal Server Error");
        let err = api.sensor().await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let api = api();
        api.client.mock_network_failure(&format!("{BASE}/sensor/logs"));
        let err = api.sensor_logs().await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn test_me_sends_bearer_and_unwraps_user() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/me"),
            200,
            json!({"user": {"username": "amy", "email": "a@b.com", "role": "admin",
                            "company": {"company_name": "Acme", "is_active": true}}}),
        );
        let profile = api.me("tok").await.unwrap();
        assert_eq!(profile.role.as_deref(), Some("admin"));
        assert_eq!(
            profile.company.unwrap().company_name.as_deref(),
            Some("Acme")
        );

        let requests = api.client.requests.borrow();
        assert_eq!(requests[0].2.get("Authorization").unwrap(), "Bearer tok");
        assert!(requests[0].3.is_none());
    }

    #[tokio::test]
    async fn test_me_accepts_bare_profile() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/me"),
            200,
            json!({"username": "bob", "email": "b@c.com"}),
        );
        let profile = api.me("tok").await.unwrap();
        assert_eq!(profile.username, "bob");
    }

    #[tokio::test]
    async fn test_check_email_encodes_query() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/check-email?email=a%40b.com"),
            200,
            json!({"exists": true}),
        );
        assert!(api.check_email("a@b.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_datalogs_query_and_lenient_rows() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/datalogs?start=2024-01-01&battery_id=2"),
            200,
            json!([{"timestamp": "2024-01-01 10:00:00", "current": "1.2", "temperature": "25",
                    "voltage": "3.7", "batteryId": "2"}]),
        );
        let query = DataLogQuery {
            start: Some("2024-01-01".into()),
            end: None,
            battery_id: Some("2".into()),
        };
        let logs = api.datalogs(&query).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].voltage, Some(3.7));
    }

    #[tokio::test]
    async fn test_forgot_password_returns_question() {
        let api = api();
        api.client.mock_response(
            &format!("{BASE}/auth/forgot-password"),
            200,
            json!({"security_qn": "First pet?"}),
        );
        assert_eq!(api.forgot_password("a@b.com").await.unwrap(), "First pet?");

        api.client.mock_response(
            &format!("{BASE}/auth/forgot-password"),
            404,
            json!({"error": "User not found"}),
        );
        let err = api.forgot_password("x@y.com").await.unwrap_err();
        assert_eq!(err.user_message(), "User not found");
    }

    #[test]
    fn test_url_builders() {
        let api = api();
        assert_eq!(api.google_start_url(), format!("{BASE}/auth/google"));
        assert_eq!(api.fault_logs_csv_url(), format!("{BASE}/fault-logs/csv"));
        let q = FaultLogQuery {
            fault_type: Some("Low Voltage".into()),
            ..Default::default()
        };
        assert_eq!(api.url_for(&q), format!("{BASE}/fault-logs?fault_type=Low+Voltage"));
    }
}
