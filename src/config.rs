//! Configuration management for netcheck

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{NetcheckError, NetcheckResult};
use crate::hostname::BUS_ADDRESS_FILE;
use crate::profile::{NM_SYSTEM_CONNECTIONS_PATH, SYSROOT_PATH};

/// Main netcheck configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetcheckConfig {
    /// Machine under test
    #[serde(default)]
    pub target: TargetConfig,
    /// Well-known paths on the machine under test
    #[serde(default)]
    pub paths: PathsConfig,
    /// Poll budgets
    #[serde(default)]
    pub wait: WaitConfig,
    /// Browser automation endpoint
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// SSH host of the test VM
    #[serde(default = "default_host")]
    pub host: String,
    /// SSH user
    #[serde(default = "default_user")]
    pub user: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Private key passed to ssh with -i
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    /// Run commands on this host instead of over ssh
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// File holding the installer bus address
    #[serde(default = "default_bus_address_file")]
    pub bus_address_file: String,
    /// Mount point of the installed system
    #[serde(default = "default_sysroot")]
    pub sysroot: String,
    /// Persistent NetworkManager profile directory
    #[serde(default = "default_nm_connections_dir")]
    pub nm_connections_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Delay between profile file polls (milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Number of profile file polls
    #[serde(default = "default_tries")]
    pub tries: u32,
    /// Browser condition timeout (milliseconds)
    #[serde(default = "default_browser_timeout_ms")]
    pub browser_timeout_ms: u64,
    /// Browser condition poll interval (milliseconds)
    #[serde(default = "default_browser_poll_ms")]
    pub browser_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server URL
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Installer web UI URL opened at session start
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Run the browser headless
    #[serde(default = "default_headless")]
    pub headless: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_bus_address_file() -> String {
    BUS_ADDRESS_FILE.to_string()
}

fn default_sysroot() -> String {
    SYSROOT_PATH.to_string()
}

fn default_nm_connections_dir() -> String {
    NM_SYSTEM_CONNECTIONS_PATH.to_string()
}

fn default_delay_ms() -> u64 {
    300
}

fn default_tries() -> u32 {
    5
}

fn default_browser_timeout_ms() -> u64 {
    15_000
}

fn default_browser_poll_ms() -> u64 {
    200
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:9090/cockpit/@localhost/anaconda-webui/index.html".to_string()
}

fn default_headless() -> bool {
    true
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            port: default_port(),
            identity_file: None,
            local: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            bus_address_file: default_bus_address_file(),
            sysroot: default_sysroot(),
            nm_connections_dir: default_nm_connections_dir(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            tries: default_tries(),
            browser_timeout_ms: default_browser_timeout_ms(),
            browser_poll_ms: default_browser_poll_ms(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            base_url: default_base_url(),
            headless: default_headless(),
        }
    }
}

impl WaitConfig {
    pub fn profile_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    pub fn browser_poll(&self) -> Duration {
        Duration::from_millis(self.browser_poll_ms)
    }
}

impl NetcheckConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> NetcheckResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NetcheckError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| NetcheckError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> NetcheckResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NetcheckError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| NetcheckError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NetcheckConfig::default();
        assert_eq!(config.target.user, "root");
        assert_eq!(config.target.port, 22);
        assert_eq!(config.paths.bus_address_file, "/run/anaconda/bus.address");
        assert_eq!(config.paths.sysroot, "/mnt/sysimage");
        assert_eq!(config.paths.nm_connections_dir, "/etc/NetworkManager/system-connections");
        assert_eq!(config.wait.profile_delay(), Duration::from_millis(300));
        assert_eq!(config.wait.tries, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netcheck.toml");
        std::fs::write(&path, "[target]\nhost = \"10.0.0.5\"\nport = 2222\n\n[wait]\ntries = 10\n").unwrap();

        let config = NetcheckConfig::load(&path).unwrap();
        assert_eq!(config.target.host, "10.0.0.5");
        assert_eq!(config.target.port, 2222);
        assert_eq!(config.target.user, "root");
        assert_eq!(config.wait.tries, 10);
        assert_eq!(config.wait.delay_ms, 300);
        assert_eq!(config.browser.webdriver_url, "http://localhost:4444");
    }

    #[test]
    fn test_profile_dir_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netcheck.toml");
        std::fs::write(&path, "[paths]\nnm_connections_dir = \"/srv/nm\"\n").unwrap();

        let config = NetcheckConfig::load(&path).unwrap();
        assert_eq!(config.paths.nm_connections_dir, "/srv/nm");
        assert_eq!(config.paths.sysroot, "/mnt/sysimage");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = NetcheckConfig::default();
        config.target.local = true;
        config.target.identity_file = Some(PathBuf::from("/root/.ssh/id_test"));
        config.save(&path).unwrap();

        let loaded = NetcheckConfig::load(&path).unwrap();
        assert!(loaded.target.local);
        assert_eq!(loaded.target.identity_file, Some(PathBuf::from("/root/.ssh/id_test")));
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[target\nhost = ").unwrap();
        assert!(matches!(NetcheckConfig::load(&path), Err(NetcheckError::ConfigError(_))));
        assert!(matches!(
            NetcheckConfig::load(dir.path().join("missing.toml")),
            Err(NetcheckError::ConfigError(_))
        ));
    }
}
