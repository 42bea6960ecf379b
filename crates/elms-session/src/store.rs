use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// token 条目键
pub const TOKEN_KEY: &str = "token";

/// 序列化身份条目键
pub const USER_KEY: &str = "user";

/// 持久化的两个条目，读取时可能只存在其一
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntries {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl StoredEntries {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

/// 会话持久化 trait
///
/// `save` 与 `clear` 必须同时作用于两个条目。
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// 读取条目
    async fn load(&self) -> Result<StoredEntries>;

    /// 同时写入 token 与序列化身份
    async fn save(&self, token: &str, user: &str) -> Result<()>;

    /// 同时删除两个条目；条目不存在时不报错
    async fn clear(&self) -> Result<()>;
}

/// 内存存储（用于开发和测试）
pub struct MemorySessionStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 预置任意条目，可用于模拟损坏数据
    pub async fn insert_raw(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Result<StoredEntries> {
        let entries = self.entries.read().await;
        Ok(StoredEntries {
            token: entries.get(TOKEN_KEY).cloned(),
            user: entries.get(USER_KEY).cloned(),
        })
    }

    async fn save(&self, token: &str, user: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_KEY.to_string(), user.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        Ok(())
    }
}

/// 文件存储：两个条目保存在同一个 JSON 文件中，写入经由临时文件重命名
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> Result<StoredEntries> {
        debug!("Loading session from file: {:?}", self.path);

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredEntries::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, token: &str, user: &str) -> Result<()> {
        debug!("Saving session to file: {:?}", self.path);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let entries = StoredEntries {
            token: Some(token.to_string()),
            user: Some(user.to_string()),
        };
        let content = serde_json::to_string_pretty(&entries)?;

        let temp = self.temp_path();
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed session file: {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemorySessionStorage::new();

        // 初始为空
        assert!(storage.load().await.unwrap().is_empty());

        storage.save("abc", r#"{"userId":1}"#).await.unwrap();
        let loaded = storage.load().await.unwrap();
        assert_eq!(loaded.token.as_deref(), Some("abc"));
        assert_eq!(loaded.user.as_deref(), Some(r#"{"userId":1}"#));
        assert_eq!(storage.len().await, 2);

        storage.clear().await.unwrap();
        assert!(storage.is_empty().await);

        // 重复清除不报错
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_storage_partial_entries() {
        let storage = MemorySessionStorage::new();
        storage.insert_raw(TOKEN_KEY, "orphan").await;

        let loaded = storage.load().await.unwrap();
        assert_eq!(loaded.token.as_deref(), Some("orphan"));
        assert!(loaded.user.is_none());
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("nested").join("session.json"));

        // 文件不存在视为空
        assert!(storage.load().await.unwrap().is_empty());

        storage.save("tok", r#"{"userId":2}"#).await.unwrap();
        assert!(storage.path().exists());

        let loaded = storage.load().await.unwrap();
        assert_eq!(loaded.token.as_deref(), Some("tok"));
        assert_eq!(loaded.user.as_deref(), Some(r#"{"userId":2}"#));

        storage.clear().await.unwrap();
        assert!(!storage.path().exists());
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = FileSessionStorage::new(&path);
        assert!(storage.load().await.is_err());

        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_empty());
    }
}
