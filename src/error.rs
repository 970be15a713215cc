//! 错误类型
//!
//! 所有网络调用在页面内部就地处理，这里只负责分类和给出用户可读的提示。

use thiserror::Error;

pub const GENERIC_NETWORK_MESSAGE: &str = "Server error. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    /// 请求没有拿到响应（fetch reject、CORS、断网）
    #[error("network error: {0}")]
    Network(String),
    /// 非 2xx 且响应体不是 `{error}` 格式
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// 后端返回的 `{error: "..."}`
    #[error("{0}")]
    Backend(String),
    /// 响应体无法解析为期望的类型
    #[error("decode error: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// 面向用户的提示：后端的校验信息原样展示，其他一律给通用提示
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend(msg) => msg.clone(),
            _ => GENERIC_NETWORK_MESSAGE.to_string(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decode(e.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
