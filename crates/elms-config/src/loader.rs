use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use elms_types::Role;
use std::path::{Path, PathBuf};

use crate::{normalize_path, ClientConfig};

/// 配置文件名
pub const CONFIG_FILE: &str = "client.toml";

/// 直接覆盖 API 基础地址的环境变量
pub const BASE_URL_ENV: &str = "ELMS_API_BASE_URL";

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
    use_env: bool,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            use_env: true,
        }
    }

    /// 忽略环境变量（测试使用）
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// 加载客户端配置；文件不存在时使用默认值
    pub fn load(&self) -> Result<ClientConfig> {
        let config_path = self.config_path();

        let mut builder = Config::builder().add_source(
            File::new(
                config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            )
            .required(false),
        );

        if self.use_env {
            // ELMS__API__BASE_URL -> api.base_url
            builder = builder.add_source(
                Environment::with_prefix("ELMS")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: ClientConfig = builder.build()?.try_deserialize()?;

        if self.use_env {
            apply_base_url_override(&mut config, std::env::var(BASE_URL_ENV).ok());
        }

        Ok(config)
    }

    /// 加载并验证配置
    pub fn validate(&self) -> Result<()> {
        let config = self.load()?;
        validate_config(&config)
    }
}

/// 用环境变量中的地址覆盖配置（空值忽略）
pub fn apply_base_url_override(config: &mut ClientConfig, base_url: Option<String>) {
    if let Some(url) = base_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        config.api.base_url = url;
    }
}

/// 验证配置
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    let base_url = url::Url::parse(&config.api.base_url)
        .map_err(|e| anyhow!("api.base_url '{}' is invalid: {}", config.api.base_url, e))?;

    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "api.base_url must use http or https, got '{}'",
            base_url.scheme()
        ));
    }

    if config.api.timeout_secs == Some(0) {
        return Err(anyhow!("api.timeout_secs must be greater than 0"));
    }

    if config.events.capacity == 0 {
        return Err(anyhow!("events.capacity must be greater than 0"));
    }

    let policy = &config.policy;
    if !policy.login_route.starts_with('/') {
        return Err(anyhow!(
            "policy.login_route '{}' must be an absolute path",
            policy.login_route
        ));
    }

    let login_route = normalize_path(&policy.login_route);
    if !policy
        .public_routes
        .iter()
        .any(|r| normalize_path(r) == login_route)
    {
        return Err(anyhow!(
            "policy.login_route '{}' must be listed in policy.public_routes",
            policy.login_route
        ));
    }

    if !policy.fallback_home.starts_with('/') {
        return Err(anyhow!(
            "policy.fallback_home '{}' must be an absolute path",
            policy.fallback_home
        ));
    }

    for (role, home) in &policy.homes {
        role.parse::<Role>()
            .map_err(|e| anyhow!("policy.homes: {}", e))?;

        if !home.starts_with('/') {
            return Err(anyhow!(
                "policy.homes.{} '{}' must be an absolute path",
                role,
                home
            ));
        }
    }

    Ok(())
}
