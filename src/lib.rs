//! netcheck - installer network test helpers
//!
//! Helpers for end-to-end tests of the installer's network configuration:
//! - Remote command execution on the machine under test (ssh or local shell)
//! - Installer network module hostname over D-Bus (busctl)
//! - NetworkManager device/connection assertions (nmcli)
//! - Connection profile file checks and staging from an installed root
//! - Browser automation of the network panel (WebDriver)
//! - Installer wizard navigation and end-to-end scenarios

pub mod error;
pub mod config;
pub mod validation;
pub mod wait;
pub mod machine;
pub mod browser;
pub mod webdriver;
pub mod hostname;
pub mod profile;
pub mod network;
pub mod panel;
pub mod installer;
pub mod scenario;
pub mod cleanup;

// Re-export commonly used types
pub use error::{NetcheckError, NetcheckResult};
pub use config::NetcheckConfig;
pub use machine::{LocalMachine, Machine, SshMachine};
pub use browser::Browser;
pub use webdriver::WebDriverBrowser;
pub use hostname::{
    HostnameClient, BUS_ADDRESS_FILE, NETWORK_INTERFACE, NETWORK_OBJECT_PATH, NETWORK_SERVICE,
};
pub use profile::{
    ConnectionSetting, MatchMode, ProfileLocation, NM_SYSTEM_CONNECTIONS_PATH, SYSROOT_PATH,
    WIRED_CONNECTION_NAME,
};
pub use network::NetworkUiDriver;
pub use installer::{Installer, InstallerStep, WizardInstaller};
pub use cleanup::{remove_default_connections, remove_default_connections_in};
