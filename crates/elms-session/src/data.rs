use elms_types::{Identity, Role};
use std::fmt;

/// 当前会话：token 与身份总是同时存在
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    identity: Identity,
}

impl Session {
    /// token 为空时返回 None
    pub fn new(token: impl Into<String>, identity: Identity) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self { token, identity })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    /// `Authorization` 头的值
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// token 不进入日志
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"***")
            .field("identity", &self.identity)
            .finish()
    }
}

/// 请求发出时的 token 快照，附带会话代数
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveToken {
    pub token: String,
    pub generation: u64,
}

impl fmt::Debug for ActiveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveToken")
            .field("token", &"***")
            .field("generation", &self.generation)
            .finish()
    }
}
