//! Configuration types and loading
//!
//! Precedence: CLI args > env vars > config file > defaults.
//! Passwords never live in the TOML; they come from env vars or password
//! files at command time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_auth::{DEFAULT_TIMEOUT_SECS, StoreBackend};
use serde::Deserialize;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "fleetctl.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Where tokens are kept between invocations
#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Token file for the file backend. Defaults to the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields defaults unless it was
    /// requested explicitly.
    pub fn load_or_default(path: &Path, explicit: bool) -> common::Result<Self> {
        if explicit || path.exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Resolve config file path from the CLI arg or FLEETCTL_CONFIG env var.
    ///
    /// The flag is true when the path was named by the user.
    pub fn resolve_path(cli_path: Option<&Path>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (p.to_path_buf(), true);
        }
        if let Ok(p) = std::env::var("FLEETCTL_CONFIG") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_FILE), false)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("FLEET_API_URL") {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api.base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Token file location for the file backend.
    pub fn token_path(&self) -> common::Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("", "", "fleetctl")
            .map(|dirs| dirs.data_dir().join("tokens.json"))
            .ok_or_else(|| {
                common::Error::Config(
                    "no home directory found; set store.path in the config file".into(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("fleetctl.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("FLEET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://fleet.example.com"
timeout_secs = 30

[store]
backend = "memory"
path = "/var/lib/fleetctl/tokens.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://fleet.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(
            config.token_path().unwrap(),
            PathBuf::from("/var/lib/fleetctl/tokens.json")
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("FLEET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn env_overrides_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"http://from-file:8000\"\n");

        unsafe { set_env("FLEET_API_URL", "https://from-env.example.com") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("FLEET_API_URL") };

        assert_eq!(config.api.base_url, "https://from-env.example.com");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("FLEET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"fleet.example.com\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("FLEET_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\ntimeout_secs = 0\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn rejects_unknown_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[store]\nbackend = \"redis\"\n");

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("FLEET_API_URL") };
        let config = Config::load_or_default(Path::new("/nonexistent/fleetctl.toml"), false)
            .unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = Config::load_or_default(Path::new("/nonexistent/fleetctl.toml"), true);
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn resolve_path_prefers_cli_then_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe { set_env("FLEETCTL_CONFIG", "/etc/fleetctl/env.toml") };
        let (path, explicit) = Config::resolve_path(Some(Path::new("/tmp/cli.toml")));
        assert_eq!(path, PathBuf::from("/tmp/cli.toml"));
        assert!(explicit);

        let (path, explicit) = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/etc/fleetctl/env.toml"));
        assert!(explicit);

        unsafe { remove_env("FLEETCTL_CONFIG") };
        let (path, explicit) = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("fleetctl.toml"));
        assert!(!explicit);
    }
}
