//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PORTAL_*`, read by the binary's CLI parser)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Missing TOML files are not an error: the portal starts with defaults and logs a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
const APP_DIR: &str = "speaker-portal";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "portal.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5740;

/// 50 MiB per uploaded presentation file
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Base URL of the external backend-as-a-service instance
    pub external_url: Option<String>,
    /// Service key sent to the external instance
    pub external_service_key: Option<String>,
    /// Shared secret expected in the `x-webhook-secret` header
    pub webhook_secret: Option<String>,
    /// Plain admin key; hashed into the settings table at startup
    pub admin_key: Option<String>,
    pub max_upload_bytes: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load the config file
    ///
    /// An explicit path must exist. Without one, the platform locations are searched and a
    /// missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Read config {} failed: {}", path.display(), e))
            })?;
            info!("Loaded config file: {}", path.display());
            return Self::from_toml_str(&content);
        }

        match find_config_file() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded config file: {}", path.display());
                Self::from_toml_str(&content)
            }
            None => {
                warn!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub external_url: Option<String>,
    pub external_service_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub admin_key: Option<String>,
    pub max_upload_bytes: Option<u64>,
    pub log_level: Option<String>,
}

/// Connection details for the external datastore
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalConfig {
    pub url: String,
    pub service_key: String,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    /// None when the external datastore is not configured; sync routes then fail with 502
    pub external: Option<ExternalConfig>,
    pub webhook_secret: Option<String>,
    pub admin_key: Option<String>,
    pub max_upload_bytes: u64,
    pub log_level: String,
}

impl PortalConfig {
    /// Merge overrides over the TOML file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Self {
        let root_folder = overrides
            .root_folder
            .or(toml.root_folder)
            .unwrap_or_else(default_root_folder);

        let external_url = non_blank(overrides.external_url).or(non_blank(toml.external_url));
        let service_key =
            non_blank(overrides.external_service_key).or(non_blank(toml.external_service_key));

        let external = match (external_url, service_key) {
            (Some(url), Some(service_key)) => Some(ExternalConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
            }),
            (Some(_), None) => {
                warn!("external_url is set but external_service_key is missing; sync disabled");
                None
            }
            _ => None,
        };

        Self {
            root_folder,
            bind: non_blank(overrides.bind)
                .or(non_blank(toml.bind))
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            external,
            webhook_secret: non_blank(overrides.webhook_secret).or(non_blank(toml.webhook_secret)),
            admin_key: non_blank(overrides.admin_key).or(non_blank(toml.admin_key)),
            max_upload_bytes: overrides
                .max_upload_bytes
                .or(toml.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: non_blank(overrides.log_level).unwrap_or(toml.logging.level),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }

    /// Create the root folder and upload directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Locate the config file for the platform
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR))
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./portal_data"))
    } else {
        PathBuf::from("./portal_data")
    }
}
