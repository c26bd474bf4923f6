use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Where session entries (CSRF bindings, share contexts, cached user records) live.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Shared table reachable through `database_url`.
    #[default]
    Database,
    /// Process-local map. Only useful when this process also writes the entries.
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HydraConfig {
    /// Base URL of the authorization server's admin API, e.g. `http://127.0.0.1:4445`.
    pub admin_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HydraConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session key namespaces and lifetimes.
///
/// Every key template must contain exactly one `{}` placeholder. The login component that
/// writes share contexts and user records has to be configured with the same templates.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_csrf_key")]
    pub csrf_key: String,
    #[serde(default = "default_share_context_key")]
    pub share_context_key: String,
    #[serde(default = "default_userinfo_key")]
    pub userinfo_key: String,
    /// How long a rendered consent form stays submittable.
    #[serde(default = "default_csrf_ttl_secs")]
    pub csrf_ttl_secs: u64,
    /// How long the authorization server should remember a granted consent.
    #[serde(default = "default_consent_remember_for_secs")]
    pub consent_remember_for_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            csrf_key: default_csrf_key(),
            share_context_key: default_share_context_key(),
            userinfo_key: default_userinfo_key(),
            csrf_ttl_secs: default_csrf_ttl_secs(),
            consent_remember_for_secs: default_consent_remember_for_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Shown in the page title of rendered HTML.
    #[serde(default = "default_site_name")]
    pub site_name: String,
    pub hydra: HydraConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_site_name() -> String {
    "Misso".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_csrf_key() -> String {
    "misso:consent:csrf:{}".to_string()
}

fn default_share_context_key() -> String {
    "misso:share:context:{}".to_string()
}

fn default_userinfo_key() -> String {
    "misso:user:info:{}".to_string()
}

fn default_csrf_ttl_secs() -> u64 {
    600
}

fn default_consent_remember_for_secs() -> i64 {
    86400 * 7
}

impl AppConfig {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, template) in [
            ("session.csrf_key", &self.session.csrf_key),
            ("session.share_context_key", &self.session.share_context_key),
            ("session.userinfo_key", &self.session.userinfo_key),
        ] {
            if template.matches("{}").count() != 1 {
                return Err(ConfigError::Validation(format!(
                    "{name} must contain exactly one '{{}}' placeholder"
                )));
            }
        }
        if self.session.csrf_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "session.csrf_ttl_secs must be > 0".into(),
            ));
        }
        if self.session.consent_remember_for_secs <= 0 {
            return Err(ConfigError::Validation(
                "session.consent_remember_for_secs must be > 0".into(),
            ));
        }
        if self.hydra.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hydra.request_timeout_secs must be > 0".into(),
            ));
        }
        if url::Url::parse(&self.hydra.admin_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "hydra.admin_url is not a valid URL: {}",
                self.hydra.admin_url
            )));
        }
        if self.session.backend == SessionBackend::Database && self.database_url.is_none() {
            return Err(ConfigError::Validation(
                "database_url is required when session.backend is 'database'".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double underscores
/// (e.g. `HYDRA__ADMIN_URL`, `SESSION__BACKEND`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from("config.yaml")
}

/// Same as [`load_config`] but reads the given file. A missing file is not an error so a
/// deployment may be configured purely through the environment.
pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
