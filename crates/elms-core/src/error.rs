use thiserror::Error;

/// 登录失败且服务端未给出原因时的提示
pub const GENERIC_LOGIN_FAILURE: &str = "Invalid credentials";

/// ELMS 客户端统一错误类型
#[derive(Error, Debug)]
pub enum ElmsError {
    /// 401：会话已被网关清除
    #[error("{0}")]
    Unauthorized(String),

    /// 其他非 2xx 响应；`message` 优先取响应体中的结构化 message
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Access policy error: {0}")]
    Policy(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ElmsError>;

impl ElmsError {
    /// 非 2xx 响应且响应体没有 message 时的通用提示
    pub fn status_message(status: u16) -> String {
        format!("Request failed with status code {}", status)
    }

    /// 由状态码与可选的结构化 message 构造错误
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::status_message(status));

        if status == 401 {
            ElmsError::Unauthorized(message)
        } else {
            ElmsError::Api { status, message }
        }
    }

    /// 展示给用户的文本
    pub fn message(&self) -> String {
        match self {
            ElmsError::Unauthorized(msg) => msg.clone(),
            ElmsError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ElmsError::Unauthorized(_) => Some(401),
            ElmsError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ElmsError::Unauthorized(_))
    }

    /// 4xx（401 除外）
    pub fn is_validation(&self) -> bool {
        matches!(self, ElmsError::Api { status, .. } if (400..500).contains(status))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ElmsError::Transport(_))
    }
}

impl From<anyhow::Error> for ElmsError {
    fn from(err: anyhow::Error) -> Self {
        ElmsError::Internal(err.to_string())
    }
}
