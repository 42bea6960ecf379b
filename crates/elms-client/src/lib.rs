pub mod logging;

use elms_access::{AccessDecision, AccessPolicy, Navigator};
use elms_config::{validate_config, ClientConfig, ConfigLoader, StorageBackend};
use elms_core::{EventBus, Result};
use elms_gateway::ApiClient;
use elms_session::{FileSessionStorage, MemorySessionStorage, Session, SessionStorage, SessionStore};
use elms_types::Credentials;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

pub use elms_access as access;
pub use elms_config as config;
pub use elms_core::{ElmsError, SessionEvent};
pub use elms_gateway as gateway;
pub use elms_session as session;
pub use elms_types as types;
pub use logging::init_logging;

/// 客户端：会话存储、API 网关、访问策略与导航器的组合
pub struct ElmsClient {
    pub config: ClientConfig,
    pub session: Arc<SessionStore>,
    pub api: Arc<ApiClient>,
    pub policy: Arc<AccessPolicy>,
    pub navigator: Arc<Navigator>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ElmsClient {
    /// 从配置目录加载：`client.toml` 与 `ELMS__*` 环境变量
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::new(config_dir)
            .load()
            .map_err(|e| ElmsError::Config(e.to_string()))?;
        Self::from_config(config)
    }

    /// 按配置创建，存储后端由 `storage.backend` 决定
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemorySessionStorage::new()),
            StorageBackend::File => Arc::new(FileSessionStorage::new(config.storage.path.clone())),
        };
        Self::with_storage(config, storage)
    }

    /// 使用指定的存储后端
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        validate_config(&config).map_err(|e| ElmsError::Config(e.to_string()))?;

        let events = EventBus::new(config.events.capacity);
        let session = Arc::new(SessionStore::new(storage, events));
        let api = Arc::new(ApiClient::from_config(&config.api, session.clone())?);
        let policy = Arc::new(AccessPolicy::from_config(&config.policy)?);
        let navigator = Arc::new(Navigator::new(policy.clone(), session.clone()));

        Ok(Self {
            config,
            session,
            api,
            policy,
            navigator,
            listener: Mutex::new(None),
        })
    }

    /// 启动：订阅会话事件并恢复持久化会话
    pub async fn start(&self) -> Option<Session> {
        if let Ok(mut listener) = self.listener.lock() {
            if listener.is_none() {
                *listener = Some(self.navigator.start());
            }
        }

        let restored = self.session.restore().await;
        let landing = self.policy.landing_for(restored.as_ref()).to_string();
        self.navigator.navigate(&landing).await;

        info!(
            base_url = %self.api.base_url(),
            authenticated = restored.is_some(),
            "ELMS client started"
        );
        restored
    }

    /// 登录并跳转到角色首页
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.api.login(credentials).await?;
        self.navigator
            .navigate(self.policy.landing_for(Some(&session)))
            .await;
        Ok(session)
    }

    /// 登出并回到登录页
    pub async fn logout(&self) -> Result<()> {
        self.api.logout().await?;
        self.navigator.navigate(self.policy.login_route()).await;
        Ok(())
    }

    pub async fn navigate(&self, path: &str) -> AccessDecision {
        self.navigator.navigate(path).await
    }

    pub async fn current(&self) -> Option<Session> {
        self.session.current().await
    }
}

impl Drop for ElmsClient {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elms_config::PolicyMode;

    fn memory_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_start_without_persisted_session() {
        let client = ElmsClient::from_config(memory_config()).unwrap();

        assert!(client.start().await.is_none());
        assert!(client.current().await.is_none());
        assert_eq!(client.navigator.location(), "/login");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = memory_config();
        config.api.base_url = "localhost".to_string();
        let err = ElmsClient::from_config(config).err().unwrap();
        assert!(matches!(err, ElmsError::Config(_)));
    }

    #[test]
    fn test_load_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(elms_config::CONFIG_FILE),
            r#"
[storage]
backend = "memory"

[policy]
mode = "development"

[policy.homes]
ADMIN = "/admin/overview"
"#,
        )
        .unwrap();

        let client = ElmsClient::load(dir.path()).unwrap();
        assert_eq!(client.config.storage.backend, StorageBackend::Memory);
        assert_eq!(client.policy.mode(), PolicyMode::Development);
        assert_eq!(client.policy.home_of(elms_types::Role::Admin), "/admin/overview");
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = memory_config();
        config.policy.mode = PolicyMode::Development;
        let client = ElmsClient::from_config(config).unwrap();
        assert_eq!(client.policy.mode(), PolicyMode::Development);
        assert_eq!(client.policy.login_route(), "/login");
    }
}
