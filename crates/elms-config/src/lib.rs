pub mod global;
pub mod loader;
pub mod path;

pub use global::{
    ApiConfig, ClientConfig, EventsConfig, LoggingConfig, PolicyConfig, PolicyMode,
    StorageBackend, StorageConfig,
};
pub use loader::{apply_base_url_override, validate_config, ConfigLoader, BASE_URL_ENV, CONFIG_FILE};
pub use path::normalize_path;
