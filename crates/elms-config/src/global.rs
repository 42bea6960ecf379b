use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 客户端配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
    pub events: EventsConfig,
}

/// 远程 API 配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 请求超时（秒）；不设置则使用传输层默认值
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// 会话持久化后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// 策略运行模式：开发模式下配置错误直接报错，生产模式下回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_mode")]
    pub mode: PolicyMode,

    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// 无需登录即可访问的路由
    #[serde(default = "default_public_routes")]
    pub public_routes: Vec<String>,

    /// 角色缺少首页配置时（生产模式）使用的首页
    #[serde(default = "default_fallback_home")]
    pub fallback_home: String,

    /// 角色首页覆盖，键为角色标识（大小写不敏感）
    #[serde(default)]
    pub homes: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    #[serde(default = "default_events_capacity")]
    pub capacity: usize,
}

// 默认值函数
fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_user_agent() -> String {
    concat!("elms-client/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./.elms/session.json")
}

fn default_policy_mode() -> PolicyMode {
    PolicyMode::Production
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_public_routes() -> Vec<String> {
    vec![default_login_route()]
}

fn default_fallback_home() -> String {
    "/dashboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_events_capacity() -> usize {
    64
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: default_policy_mode(),
            login_route: default_login_route(),
            public_routes: default_public_routes(),
            fallback_home: default_fallback_home(),
            homes: std::collections::HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_events_capacity(),
        }
    }
}
