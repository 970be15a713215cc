use serde::{Deserialize, Deserializer, Serialize};

pub mod date;
pub mod protocol;

pub use chrono;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// 过滤器中表示"全部"的哨兵值（大小写不敏感）
pub const FILTER_ALL: &str = "all";

// =========================================================
// 用户与认证 (Accounts)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

/// 用户资料快照
///
/// 后端返回的字段并不稳定（登录、注册、`/auth/me` 各不相同），
/// 因此所有字段都有默认值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub u_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub ph_no: Option<String>,
    pub role: Option<String>,
    pub security_qn: Option<String>,
    pub ip: Option<String>,
    pub company_id: Option<i64>,
    pub company: Option<Company>,
}

/// 登录 / 注册成功后的响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub user: UserProfile,
}

/// 后端以 `{ "error": "..." }` 形式返回的业务错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEmailResponse {
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestion {
    pub security_qn: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub message: Option<String>,
}

// =========================================================
// 遥测数据 (Telemetry)
// =========================================================

/// `/datalogs` 的一行
///
/// 读数可能以字符串形式下发，解析失败时为 `None`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataLog {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "reading")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "reading")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "reading")]
    pub voltage: Option<f64>,
    #[serde(rename = "batteryId", default, deserialize_with = "identifier")]
    pub battery_id: Option<String>,
}

/// `/sensor` 与 `/sensor/logs` 的快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    #[serde(default, deserialize_with = "reading")]
    pub voltage: Option<f64>,
    #[serde(default, deserialize_with = "reading")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "reading")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "identifier")]
    pub battery_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultLog {
    #[serde(default, deserialize_with = "identifier")]
    pub fault_id: Option<String>,
    #[serde(default)]
    pub detected_at: String,
    #[serde(default, deserialize_with = "identifier")]
    pub battery_id: Option<String>,
    #[serde(default)]
    pub fault_type: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub predicted_by: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub resolve_text: Option<String>,
}

/// `/graph` 聚合数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphData {
    pub labels: Vec<String>,
    pub current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub voltage: Vec<f64>,
}

// =========================================================
// 宽松反序列化 (Lenient Deserializers)
// =========================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// 接受数字、数字字符串或 null
fn reading<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Number(n) => Some(n),
        Loose::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Loose::Other(_) => None,
    })
}

/// 接受字符串或整数形式的 ID
fn identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Text(s) if !s.is_empty() => Some(s),
        Loose::Text(_) => None,
        Loose::Number(n) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
        Loose::Number(n) => Some(n.to_string()),
        Loose::Other(serde_json::Value::Number(n)) => Some(n.to_string()),
        Loose::Other(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datalog_accepts_string_readings() {
        let raw = r#"{"timestamp":"2024-05-01 10:00:00","current":"1.5","temperature":"30","voltage":"bad","batteryId":"2"}"#;
        let log: DataLog = serde_json::from_str(raw).unwrap();
        assert_eq!(log.current, Some(1.5));
        assert_eq!(log.temperature, Some(30.0));
        assert_eq!(log.voltage, None);
        assert_eq!(log.battery_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_fault_log_numeric_ids() {
        let raw = r#"{"fault_id":7,"detected_at":"2024-05-01","battery_id":1,"fault_type":"Overheating"}"#;
        let log: FaultLog = serde_json::from_str(raw).unwrap();
        assert_eq!(log.fault_id.as_deref(), Some("7"));
        assert_eq!(log.battery_id.as_deref(), Some("1"));
        assert!(log.note.is_none());
    }

    #[test]
    fn test_auth_response_flattens_profile() {
        let raw = r#"{"message":"Login successful","token":"t","u_id":3,"username":"amy","email":"a@b.com","company":null}"#;
        let resp: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.token, "t");
        assert_eq!(resp.user.u_id, Some(3));
        assert_eq!(resp.user.username, "amy");
        assert!(resp.user.company.is_none());
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse(Role::Admin.as_str()), Some(Role::Admin));
        assert_eq!(Role::parse("root"), None);
    }
}
