use crate::{
    AuthResponse, CheckEmailResponse, DataLog, FILTER_ALL, FaultLog, GraphData, MessageResponse,
    SecurityQuestion, SensorSnapshot, UserProfile,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
///
/// `POST` requests send `self` as the JSON body; `GET` requests send `query()`.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path, relative to the API base.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;

    /// Query parameters, in order. Empty by default.
    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Pushes a filter value unless it is blank or the "all" sentinel.
fn push_filter(query: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        let v = v.trim();
        if !v.is_empty() && !v.eq_ignore_ascii_case(FILTER_ALL) {
            query.push((key, v.to_string()));
        }
    }
}

// =========================================================
// Auth
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

impl ApiRequest for LoginRequest {
    type Response = AuthResponse;
    const PATH: &'static str = "/auth/login";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Empty means "use the default company".
    pub company_id: String,
    pub ph_no: String,
    pub security_qn: String,
    /// Checked case-insensitively by `/auth/reset-password`.
    pub security_ans: String,
    pub role: String,
}

impl ApiRequest for RegisterRequest {
    type Response = AuthResponse;
    const PATH: &'static str = "/auth/register";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Profile of the bearer of the token. Sent with an `Authorization` header.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeRequest;

impl ApiRequest for MeRequest {
    type Response = UserProfile;
    const PATH: &'static str = "/auth/me";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckEmailRequest {
    pub email: String,
}

impl ApiRequest for CheckEmailRequest {
    type Response = CheckEmailResponse;
    const PATH: &'static str = "/auth/check-email";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.clone())]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl ApiRequest for ForgotPasswordRequest {
    type Response = SecurityQuestion;
    const PATH: &'static str = "/auth/forgot-password";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub security_ans: String,
    pub new_password: String,
}

impl ApiRequest for ResetPasswordRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/auth/reset-password";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Telemetry
// =========================================================

/// Data log query. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataLogQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub battery_id: Option<String>,
}

impl ApiRequest for DataLogQuery {
    type Response = Vec<DataLog>;
    const PATH: &'static str = "/datalogs";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        push_filter(&mut q, "start", &self.start);
        push_filter(&mut q, "end", &self.end);
        push_filter(&mut q, "battery_id", &self.battery_id);
        q
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensorRequest;

impl ApiRequest for SensorRequest {
    type Response = SensorSnapshot;
    const PATH: &'static str = "/sensor";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensorLogsRequest;

impl ApiRequest for SensorLogsRequest {
    type Response = Vec<SensorSnapshot>;
    const PATH: &'static str = "/sensor/logs";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaultLogQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub battery_id: Option<String>,
    pub fault_type: Option<String>,
}

impl ApiRequest for FaultLogQuery {
    type Response = Vec<FaultLog>;
    const PATH: &'static str = "/fault-logs";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        push_filter(&mut q, "start", &self.start);
        push_filter(&mut q, "end", &self.end);
        push_filter(&mut q, "battery_id", &self.battery_id);
        push_filter(&mut q, "fault_type", &self.fault_type);
        q
    }
}

/// Path of the fault log CSV download. Used as an anchor href, never fetched.
pub const FAULT_LOGS_CSV_PATH: &str = "/fault-logs/csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQuery {
    pub battery_id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ApiRequest for GraphQuery {
    type Response = GraphData;
    const PATH: &'static str = "/graph";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        push_filter(&mut q, "battery_id", &self.battery_id);
        push_filter(&mut q, "start", &self.start);
        push_filter(&mut q, "end", &self.end);
        q
    }
}

/// Browser redirect target that starts the Google OAuth flow.
pub const GOOGLE_START_PATH: &str = "/auth/google";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datalog_query_skips_blank_and_all() {
        let q = DataLogQuery {
            start: Some("2024-01-01".into()),
            end: Some("  ".into()),
            battery_id: Some("All".into()),
        };
        assert_eq!(q.query(), vec![("start", "2024-01-01".to_string())]);
    }

    #[test]
    fn test_fault_log_query_order() {
        let q = FaultLogQuery {
            start: None,
            end: Some("2024-02-01".into()),
            battery_id: Some("2".into()),
            fault_type: Some("Low Voltage".into()),
        };
        assert_eq!(
            q.query(),
            vec![
                ("end", "2024-02-01".to_string()),
                ("battery_id", "2".to_string()),
                ("fault_type", "Low Voltage".to_string()),
            ]
        );
    }
}
