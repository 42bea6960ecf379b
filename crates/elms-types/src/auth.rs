use serde::{Deserialize, Serialize};
use std::fmt;

use crate::role::Role;

/// 当前登录用户身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userId")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// 登录凭证
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// 密码不进入日志
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// `POST /auth/login` 成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl LoginResponse {
    /// 拆分为 token 与身份
    pub fn into_parts(self) -> (String, Identity) {
        let identity = Identity {
            id: self.user_id,
            name: self.name,
            email: self.email,
            role: self.role,
        };
        (self.token, identity)
    }
}

/// 服务端错误响应体，`message` 字段可选
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
