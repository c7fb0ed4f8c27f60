//! NetworkManager state checks for installer network tests
//!
//! `NetworkUiDriver` pairs the machine under test with the browser showing
//! the installer. This module holds the NetworkManager side: interface
//! discovery, device and connection property assertions, and checks on
//! profile files. The browser side lives in `panel`.

use crate::config::{NetcheckConfig, WaitConfig};
use crate::error::{ensure, NetcheckError, NetcheckResult};
use crate::machine::Machine;
use crate::profile::{
    check_value, count_listed_files, staging_prefix, ConnectionSetting, MatchMode,
    ProfileLocation, NM_SYSTEM_CONNECTIONS_PATH,
};
use crate::validation::{
    shell_quote, shell_word, validate_connection_name, validate_interface_name, validate_property_key,
    validate_root,
};
use crate::wait::wait_until;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Entries of `/sys/class/net` that are never the interface under test
const IGNORED_NET_ENTRIES: [&str; 2] = ["lo", "bonding_masters"];

/// Drives the installer network configuration and checks its effect
pub struct NetworkUiDriver<B, M> {
    pub(crate) browser: B,
    pub(crate) machine: M,
    profile_delay: Duration,
    profile_tries: u32,
    connections_dir: String,
}

impl<B, M: Machine> NetworkUiDriver<B, M> {
    pub fn new(browser: B, machine: M) -> Self {
        Self::with_wait_config(browser, machine, &WaitConfig::default())
    }

    pub fn with_wait_config(browser: B, machine: M, wait: &WaitConfig) -> Self {
        Self {
            browser,
            machine,
            profile_delay: wait.profile_delay(),
            profile_tries: wait.tries,
            connections_dir: NM_SYSTEM_CONNECTIONS_PATH.to_string(),
        }
    }

    /// Poll budget and profile directory from `config`
    pub fn from_config(browser: B, machine: M, config: &NetcheckConfig) -> Self {
        Self::with_wait_config(browser, machine, &config.wait)
            .with_connections_dir(config.paths.nm_connections_dir.clone())
    }

    /// Use another persistent profile directory
    pub fn with_connections_dir(mut self, dir: impl Into<String>) -> Self {
        self.connections_dir = dir.into();
        self
    }

    /// Persistent profiles of the live system
    pub fn persistent_location(&self) -> ProfileLocation {
        ProfileLocation::at(self.connections_dir.as_str())
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Name of the only network interface of the machine
    pub async fn discover_interface(&self) -> NetcheckResult<String> {
        let out = self.machine.execute("ls /sys/class/net/").await?;
        let mut ifaces: BTreeSet<&str> = out.split_whitespace().collect();
        for ignored in IGNORED_NET_ENTRIES {
            ifaces.remove(ignored);
        }

        ensure(ifaces.len() == 1, || {
            format!("expected exactly one network interface, found {:?}", ifaces)
        })?;

        let iface = ifaces
            .into_iter()
            .next()
            .map(str::to_string)
            .ok_or_else(|| NetcheckError::InvalidState("interface set emptied".to_string()))?;
        debug!("Interface under test: {}", iface);
        Ok(iface)
    }

    /// Read one device property with `nmcli -g`
    pub async fn device_property(&self, iface: &str, key: &str) -> NetcheckResult<String> {
        validate_interface_name(iface)?;
        validate_property_key(key)?;
        let out = self
            .machine
            .execute(&format!("nmcli -g {} device show {}", shell_word(key), iface))
            .await?;
        Ok(out.trim().to_string())
    }

    pub async fn assert_device_state(
        &self,
        iface: &str,
        key: &str,
        expected: &str,
        mode: MatchMode,
    ) -> NetcheckResult<()> {
        let actual = self.device_property(iface, key).await?;
        check_value(&format!("{} {}", iface, key), expected, &actual, mode)
    }

    /// Read one connection property with `nmcli -g`
    pub async fn connection_property(&self, connection: &str, key: &str) -> NetcheckResult<String> {
        validate_connection_name(connection)?;
        validate_property_key(key)?;
        let out = self
            .machine
            .execute(&format!(
                "nmcli -g {} connection show {}",
                shell_word(key),
                shell_quote(connection)
            ))
            .await?;
        Ok(out.trim().to_string())
    }

    /// Check connection properties, optionally against profiles of another root
    ///
    /// With `root`, every profile in the persistent profile directory under
    /// `root` is copied into the live one under a prefixed id and a new
    /// uuid, NetworkManager reloads, the properties are read, and the copies are
    /// removed again before any value is compared.
    pub async fn assert_connection_settings(
        &self,
        settings: &[ConnectionSetting],
        root: Option<&str>,
    ) -> NetcheckResult<()> {
        for setting in settings {
            setting.validate()?;
        }

        let Some(root) = root else {
            let values = self.read_settings(settings, "").await?;
            return compare_settings(settings, &values);
        };

        validate_root(root)?;
        self.persistent_location().validate()?;
        let prefix = staging_prefix(root);

        let read = match self.stage_profiles(root, &prefix).await {
            Ok(()) => self.read_settings(settings, &prefix).await,
            Err(e) => Err(e),
        };

        let unstaged = self.unstage_profiles(&prefix).await;
        let values = match (read, unstaged) {
            (Ok(values), unstaged) => {
                unstaged?;
                values
            }
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(cleanup)) => {
                warn!("Removing staged profiles failed after an earlier error: {}", cleanup);
                return Err(e);
            }
        };

        compare_settings(settings, &values)
    }

    async fn read_settings(
        &self,
        settings: &[ConnectionSetting],
        prefix: &str,
    ) -> NetcheckResult<Vec<String>> {
        let mut values = Vec::with_capacity(settings.len());
        for setting in settings {
            let name = format!("{}{}", prefix, setting.connection);
            values.push(self.connection_property(&name, &setting.key).await?);
        }
        Ok(values)
    }

    async fn stage_profiles(&self, root: &str, prefix: &str) -> NetcheckResult<()> {
        let live = self.persistent_location();
        let source = live.clone().with_root(root);
        let listing = self
            .machine
            .execute(&format!(
                "for f in {}/*; do [ -f \"$f\" ] && basename \"$f\"; done; true",
                shell_quote(&source.dir())
            ))
            .await?;

        for file in listing.lines().map(str::trim).filter(|f| !f.is_empty()) {
            let src = format!("{}/{}", source.dir(), file);
            let dst = format!("{}/{}{}", live.dir(), prefix, file);
            let uuid = Uuid::new_v4();
            debug!("Staging {} as {} (uuid {})", src, dst, uuid);

            let script = format!("s/^id=/id={}/; s/^uuid=.*/uuid={}/", prefix, uuid);
            self.machine
                .execute(&format!(
                    "sed -e {} {} > {} && chmod 0600 {}",
                    shell_quote(&script),
                    shell_quote(&src),
                    shell_quote(&dst),
                    shell_quote(&dst)
                ))
                .await?;
        }

        info!("Staged profiles from {} with prefix {}", root, prefix);
        self.machine.execute("nmcli connection reload").await?;
        Ok(())
    }

    async fn unstage_profiles(&self, prefix: &str) -> NetcheckResult<()> {
        let live = self.persistent_location();
        info!("Removing staged profiles {}/{}*", live.dir(), prefix);
        self.machine
            .execute(&format!(
                "rm -f {}/{}*",
                shell_quote(&live.dir()),
                shell_quote(prefix)
            ))
            .await?;
        self.machine.execute("nmcli connection reload").await?;
        Ok(())
    }

    /// Poll until the profile file for `name` exists
    pub async fn wait_for_profile_file(&self, name: &str, location: &ProfileLocation) -> NetcheckResult<()> {
        validate_connection_name(name)?;
        location.validate()?;

        let path = location.file(name);
        let cmd = &format!("test -f {} && echo found || true", shell_quote(&path));
        wait_until(&format!("profile file {}", path), self.profile_delay, self.profile_tries, move || async move {
            Ok(self.machine.execute(cmd).await?.trim() == "found")
        })
        .await
    }

    /// Number of profile files carrying `id=<name>`
    ///
    /// An empty `name` matches every connection. With `file_name`, only
    /// `<file_name>.nmconnection` is searched.
    pub async fn profile_file_count(
        &self,
        name: &str,
        location: &ProfileLocation,
        file_name: Option<&str>,
    ) -> NetcheckResult<usize> {
        validate_connection_name(name)?;
        location.validate()?;

        let pattern = shell_quote(&format!("id={}", name));
        let cmd = match file_name {
            Some(file_name) => {
                validate_connection_name(file_name)?;
                format!("grep -l {} {} || true", pattern, shell_quote(&location.file(file_name)))
            }
            None => format!("grep -l {} {}/* || true", pattern, shell_quote(&location.dir())),
        };

        let out = self.machine.execute(&cmd).await?;
        Ok(count_listed_files(&out))
    }

    pub async fn count_profile_files(
        &self,
        name: &str,
        expected: usize,
        location: &ProfileLocation,
        file_name: Option<&str>,
    ) -> NetcheckResult<()> {
        let found = self.profile_file_count(name, location, file_name).await?;
        ensure(found == expected, || {
            format!(
                "expected {} profile file(s) with id={} in {}, found {}",
                expected,
                name,
                location.dir(),
                found
            )
        })
    }
}

fn compare_settings(settings: &[ConnectionSetting], values: &[String]) -> NetcheckResult<()> {
    for (setting, actual) in settings.iter().zip(values) {
        check_value(
            &format!("{} {}", setting.connection, setting.key),
            &setting.expected,
            actual,
            setting.mode,
        )?;
    }
    Ok(())
}
