//! NetworkManager connection profile locations and output parsing

use crate::error::{NetcheckError, NetcheckResult};
use crate::validation::{validate_connection_name, validate_property_key, validate_root};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mount point of the installed system
pub const SYSROOT_PATH: &str = "/mnt/sysimage";
/// Persistent NetworkManager profile directory
pub const NM_SYSTEM_CONNECTIONS_PATH: &str = "/etc/NetworkManager/system-connections";
/// Transient NetworkManager profile directory
pub const NM_RUNTIME_CONNECTIONS_PATH: &str = "/run/NetworkManager/system-connections";
/// Profile file extension
pub const PROFILE_EXTENSION: &str = "nmconnection";
/// Name NetworkManager gives default wired profiles
pub const WIRED_CONNECTION_NAME: &str = "Wired Connection";

/// Directory holding a set of profile files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLocation {
    /// Profile directory on the live system
    pub base: String,
    /// Alternate root prefix, `""` for the live system
    pub root: String,
}

impl Default for ProfileLocation {
    fn default() -> Self {
        Self::persistent()
    }
}

impl ProfileLocation {
    /// `/etc` profiles, surviving reboot
    pub fn persistent() -> Self {
        Self::at(NM_SYSTEM_CONNECTIONS_PATH)
    }

    /// `/run` profiles, gone after reboot
    pub fn transient() -> Self {
        Self::at(NM_RUNTIME_CONNECTIONS_PATH)
    }

    /// Profiles in a configured directory
    pub fn at(base: impl Into<String>) -> Self {
        Self { base: base.into(), root: String::new() }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn validate(&self) -> NetcheckResult<()> {
        if self.base.is_empty() {
            return Err(NetcheckError::InvalidParameter(
                "Profile directory cannot be empty".to_string()
            ));
        }
        validate_root(&self.base)?;
        validate_root(&self.root)
    }

    pub fn dir(&self) -> String {
        format!("{}{}", self.root, self.base.trim_end_matches('/'))
    }

    /// Path of the profile file named `name`
    pub fn file(&self, name: &str) -> String {
        format!("{}/{}.{}", self.dir(), name, PROFILE_EXTENSION)
    }
}

/// Connection id prefix for profiles staged from `root`
///
/// `/mnt/sysimage` becomes `_mnt_sysimage.`
pub fn staging_prefix(root: &str) -> String {
    format!("{}.", root.replace('/', "_"))
}

/// How an observed value is compared with the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    /// Expected value must occur in the observed one
    Substring,
}

impl MatchMode {
    pub fn matches(self, expected: &str, actual: &str) -> bool {
        match self {
            MatchMode::Exact => expected == actual,
            MatchMode::Substring => actual.contains(expected),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "=="),
            MatchMode::Substring => write!(f, "contained in"),
        }
    }
}

/// Expected value of one connection property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSetting {
    pub connection: String,
    pub key: String,
    pub expected: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl ConnectionSetting {
    pub fn new(connection: impl Into<String>, key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            key: key.into(),
            expected: expected.into(),
            mode: MatchMode::Exact,
        }
    }

    pub fn substring(mut self) -> Self {
        self.mode = MatchMode::Substring;
        self
    }

    pub fn validate(&self) -> NetcheckResult<()> {
        validate_connection_name(&self.connection)?;
        validate_property_key(&self.key)
    }
}

/// Number of files listed by `grep -l ... || true`
///
/// The output of a search with no hits is a single empty line once split,
/// which counts as zero.
pub fn count_listed_files(output: &str) -> usize {
    let lines: Vec<&str> = output.trim().split('\n').collect();
    if lines.len() == 1 && lines[0].is_empty() {
        0
    } else {
        lines.len()
    }
}

/// Connection ids from `grep ^id= <files>` output
///
/// Accepts both bare `id=<name>` lines and the `<file>:id=<name>` form grep
/// prints when searching several files.
pub fn parse_connection_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let rest = match line.find(":id=") {
                Some(pos) if !line.starts_with("id=") => &line[pos + 1..],
                _ => line,
            };
            rest.strip_prefix("id=")
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check `expected` against `actual`
pub fn check_value(what: &str, expected: &str, actual: &str, mode: MatchMode) -> NetcheckResult<()> {
    if mode.matches(expected, actual) {
        Ok(())
    } else {
        Err(NetcheckError::AssertionFailed(format!(
            "{}: expected '{}' {} '{}'",
            what, expected, mode, actual
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dirs() {
        assert_eq!(ProfileLocation::persistent().dir(), "/etc/NetworkManager/system-connections");
        assert_eq!(ProfileLocation::transient().dir(), "/run/NetworkManager/system-connections");
        assert_eq!(
            ProfileLocation::persistent().with_root(SYSROOT_PATH).dir(),
            "/mnt/sysimage/etc/NetworkManager/system-connections"
        );
        assert_eq!(
            ProfileLocation::transient().file("ens3"),
            "/run/NetworkManager/system-connections/ens3.nmconnection"
        );
    }

    #[test]
    fn test_configured_profile_dir() {
        let location = ProfileLocation::at("/var/lib/nm/profiles/").with_root("/mnt/sysimage");
        assert_eq!(location.dir(), "/mnt/sysimage/var/lib/nm/profiles");
        assert!(location.validate().is_ok());

        assert!(ProfileLocation::at("").validate().is_err());
        assert!(ProfileLocation::at("profiles").validate().is_err());
        assert!(ProfileLocation::at("/etc/x y").validate().is_err());
    }

    #[test]
    fn test_staging_prefix() {
        assert_eq!(staging_prefix("/mnt/sysimage"), "_mnt_sysimage.");
        assert_eq!(staging_prefix("/"), "_.");
    }

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Exact.matches("yes", "yes"));
        assert!(!MatchMode::Exact.matches("yes", "yes "));
        assert!(MatchMode::Substring.matches("connected", "100 (connected)"));
        assert!(!MatchMode::Substring.matches("connected", "20 (unavailable)"));
    }

    #[test]
    fn test_count_listed_files() {
        assert_eq!(count_listed_files(""), 0);
        assert_eq!(count_listed_files("\n"), 0);
        assert_eq!(count_listed_files("/etc/NetworkManager/system-connections/ens3.nmconnection\n"), 1);
        assert_eq!(
            count_listed_files("/etc/a.nmconnection\n/etc/b.nmconnection\n/etc/c.nmconnection\n"),
            3
        );
    }

    #[test]
    fn test_parse_connection_ids() {
        let single = "id=ens3\n";
        assert_eq!(parse_connection_ids(single), vec!["ens3"]);

        let multi = "/etc/NetworkManager/system-connections/ens3.nmconnection:id=ens3\n\
                     /etc/NetworkManager/system-connections/w.nmconnection:id=Wired Connection\n";
        assert_eq!(parse_connection_ids(multi), vec!["ens3", "Wired Connection"]);

        assert!(parse_connection_ids("").is_empty());
        assert!(parse_connection_ids("id=\n").is_empty());
    }

    #[test]
    fn test_check_value() {
        assert!(check_value("ens3 GENERAL.STATE", "connected", "100 (connected)", MatchMode::Substring).is_ok());
        match check_value("autoconnect", "yes", "no", MatchMode::Exact) {
            Err(NetcheckError::AssertionFailed(msg)) => {
                assert_eq!(msg, "autoconnect: expected 'yes' == 'no'");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_setting_validation() {
        assert!(ConnectionSetting::new("ens3", "connection.autoconnect", "yes").validate().is_ok());
        assert!(ConnectionSetting::new("ens3", "bad key", "yes").validate().is_err());
        assert_eq!(ConnectionSetting::new("a", "b", "c").substring().mode, MatchMode::Substring);
    }
}
