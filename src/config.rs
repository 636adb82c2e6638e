use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub lifecycle: LifecycleConfig,

    pub bootstrap: BootstrapConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/roster.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Login throttling and lockout policy.
    pub auth_throttle: AuthThrottleConfig,

    /// How a login against a soft-deleted identifier is answered.
    pub deleted_login_policy: DeletedLoginPolicy,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            auth_throttle: AuthThrottleConfig::default(),
            deleted_login_policy: DeletedLoginPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthThrottleConfig {
    /// Failed attempts per identifier before the identifier is locked.
    pub max_attempts: u32,

    /// Lifetime of the failed-attempt counter, refreshed on every failure.
    pub attempt_window_seconds: u64,

    /// Lockout duration once `max_attempts` is reached.
    pub lockout_seconds: u64,
}

impl Default for AuthThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            attempt_window_seconds: 60 * 60,
            lockout_seconds: 60,
        }
    }
}

/// Whether credential resolution may fall back to the newest soft-deleted
/// account sharing the submitted identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedLoginPolicy {
    /// Soft-deleted accounts are never consulted; the caller sees
    /// "invalid credentials".
    #[default]
    Indistinguishable,

    /// The newest soft-deleted account is verified and, on a match, reported
    /// as deleted.
    ReportDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Soft-deleted accounts older than this are purged by maintenance.
    pub purge_retention_days: u32,

    pub purge_enabled: bool,

    /// Six-field cron expression (seconds first).
    pub purge_cron: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            purge_retention_days: 90,
            purge_enabled: true,
            purge_cron: "0 30 3 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Create an administrator when the account table is empty.
    pub enabled: bool,

    pub identifier: String,

    pub display_name: String,

    /// When unset a random password is generated and logged once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            identifier: "9999".to_string(),
            display_name: "Administrator".to_string(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies the externally supplied settings on top of the file values.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_env(&lookup, "MAX_LOGIN_ATTEMPTS") {
            self.security.auth_throttle.max_attempts = v;
        }
        if let Some(v) = parse_env(&lookup, "LOCKOUT_DURATION_SECONDS") {
            self.security.auth_throttle.lockout_seconds = v;
        }
        if let Some(v) = parse_env(&lookup, "PURGE_RETENTION_DAYS") {
            self.lifecycle.purge_retention_days = v;
        }
        if let Some(url) = lookup("ROSTER_DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(password) = lookup("ROSTER_BOOTSTRAP_PASSWORD") {
            self.bootstrap.password = Some(password);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("roster").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".roster").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let throttle = &self.security.auth_throttle;
        if throttle.max_attempts == 0 {
            anyhow::bail!("security.auth_throttle.max_attempts must be > 0");
        }
        if throttle.lockout_seconds == 0 {
            anyhow::bail!("security.auth_throttle.lockout_seconds must be > 0");
        }
        if throttle.attempt_window_seconds == 0 {
            anyhow::bail!("security.auth_throttle.attempt_window_seconds must be > 0");
        }

        if self.lifecycle.purge_retention_days == 0 {
            anyhow::bail!("lifecycle.purge_retention_days must be > 0");
        }

        if self.bootstrap.enabled && self.bootstrap.identifier.trim().is_empty() {
            anyhow::bail!("bootstrap.identifier cannot be empty when bootstrap is enabled");
        }

        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {key}={raw}: not a valid number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.auth_throttle.max_attempts, 10);
        assert_eq!(config.security.auth_throttle.lockout_seconds, 60);
        assert_eq!(config.security.auth_throttle.attempt_window_seconds, 3600);
        assert_eq!(config.lifecycle.purge_retention_days, 90);
        assert_eq!(
            config.security.deleted_login_policy,
            DeletedLoginPolicy::Indistinguishable
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security.auth_throttle]"));
        assert!(toml_str.contains("[lifecycle]"));
        assert!(toml_str.contains("deleted_login_policy = \"indistinguishable\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security]
            deleted_login_policy = "report_deleted"

            [security.auth_throttle]
            max_attempts = 3
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.auth_throttle.max_attempts, 3);
        assert_eq!(config.security.auth_throttle.lockout_seconds, 60);
        assert_eq!(
            config.security.deleted_login_policy,
            DeletedLoginPolicy::ReportDeleted
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MAX_LOGIN_ATTEMPTS", "4"),
            ("LOCKOUT_DURATION_SECONDS", "120"),
            ("PURGE_RETENTION_DAYS", "not-a-number"),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.security.auth_throttle.max_attempts, 4);
        assert_eq!(config.security.auth_throttle.lockout_seconds, 120);
        assert_eq!(config.lifecycle.purge_retention_days, 90);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.security.auth_throttle.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
