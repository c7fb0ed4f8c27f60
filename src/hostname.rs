//! Installer network module hostname over D-Bus
//!
//! The installer runs its modules on a private bus whose address it writes
//! to `/run/anaconda/bus.address`. `busctl` is pointed at that bus to read
//! and write the `Hostname` property of the network module.

use crate::error::NetcheckResult;
use crate::machine::Machine;
use crate::validation::shell_quote;
use tracing::{debug, info};

/// Network module service name
pub const NETWORK_SERVICE: &str = "org.fedoraproject.Anaconda.Modules.Network";
/// Network module interface name
pub const NETWORK_INTERFACE: &str = NETWORK_SERVICE;
/// Network module object path
pub const NETWORK_OBJECT_PATH: &str = "/org/fedoraproject/Anaconda/Modules/Network";
/// File holding the installer bus address
pub const BUS_ADDRESS_FILE: &str = "/run/anaconda/bus.address";

/// Reads and writes the installer's hostname property
pub struct HostnameClient<M> {
    machine: M,
    bus_address: String,
}

impl<M: Machine> HostnameClient<M> {
    /// Read the bus address from the default location
    pub async fn new(machine: M) -> NetcheckResult<Self> {
        Self::with_bus_address_file(machine, BUS_ADDRESS_FILE).await
    }

    /// Read the bus address from `path`
    pub async fn with_bus_address_file(machine: M, path: &str) -> NetcheckResult<Self> {
        let bus_address = machine
            .execute(&format!("cat {}", shell_quote(path)))
            .await?
            .trim()
            .to_string();
        debug!("Installer bus address: {}", bus_address);
        Ok(Self { machine, bus_address })
    }

    pub fn bus_address(&self) -> &str {
        &self.bus_address
    }

    fn busctl(&self, verb: &str, tail: &str) -> String {
        format!(
            "busctl --address={} {} {} {} {} {}",
            shell_quote(&self.bus_address),
            verb,
            NETWORK_SERVICE,
            NETWORK_OBJECT_PATH,
            NETWORK_INTERFACE,
            tail
        )
    }

    /// Current hostname in busctl's encoding, e.g. `s "installer"`
    pub async fn get_hostname(&self) -> NetcheckResult<String> {
        let out = self.machine.execute(&self.busctl("get-property", "Hostname")).await?;
        Ok(out.trim().to_string())
    }

    pub async fn set_hostname(&self, hostname: &str) -> NetcheckResult<()> {
        info!("Setting installer hostname to '{}'", hostname);
        let cmd = self.busctl("set-property", &format!("Hostname s {}", shell_quote(hostname)));
        self.machine.execute(&cmd).await?;
        Ok(())
    }

    /// Clear the hostname property
    pub async fn reset_hostname(&self) -> NetcheckResult<()> {
        self.set_hostname("").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetcheckError;
    use crate::machine::MockMachine;
    use mockall::Sequence;
    use std::sync::{Arc, Mutex};

    const ADDRESS: &str = "unix:path=/run/anaconda/dbus/bus,guid=0123abcd";

    fn machine_with_bus() -> MockMachine {
        let mut machine = MockMachine::new();
        machine
            .expect_execute()
            .withf(|cmd| cmd == "cat '/run/anaconda/bus.address'")
            .times(1)
            .returning(|_| Ok(format!("{}\n", ADDRESS)));
        machine
    }

    #[tokio::test]
    async fn test_reads_bus_address() {
        let client = HostnameClient::new(machine_with_bus()).await.unwrap();
        assert_eq!(client.bus_address(), ADDRESS);
    }

    #[tokio::test]
    async fn test_missing_bus_address_propagates() {
        let mut machine = MockMachine::new();
        machine.expect_execute().returning(|cmd| {
            Err(NetcheckError::CommandFailed {
                cmd: cmd.to_string(),
                code: Some(1),
                stderr: "cat: /run/anaconda/bus.address: No such file or directory".to_string(),
            })
        });

        let result = HostnameClient::new(machine).await;
        assert!(matches!(result, Err(NetcheckError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn test_get_hostname() {
        let mut machine = machine_with_bus();
        machine
            .expect_execute()
            .withf(|cmd| {
                cmd == format!(
                    "busctl --address='{}' get-property {} {} {} Hostname",
                    ADDRESS, NETWORK_SERVICE, NETWORK_OBJECT_PATH, NETWORK_INTERFACE
                )
            })
            .times(1)
            .returning(|_| Ok("s \"installer\"\n".to_string()));

        let client = HostnameClient::new(machine).await.unwrap();
        assert_eq!(client.get_hostname().await.unwrap(), "s \"installer\"");
    }

    #[tokio::test]
    async fn test_set_and_reset_hostname() {
        let mut machine = machine_with_bus();
        let mut seq = Sequence::new();
        machine
            .expect_execute()
            .withf(|cmd| cmd.starts_with("busctl") && cmd.ends_with("set-property org.fedoraproject.Anaconda.Modules.Network /org/fedoraproject/Anaconda/Modules/Network org.fedoraproject.Anaconda.Modules.Network Hostname s 'my-host'"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::new()));
        machine
            .expect_execute()
            .withf(|cmd| cmd.ends_with("Hostname s ''"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::new()));

        let client = HostnameClient::new(machine).await.unwrap();
        tokio_test::assert_ok!(client.set_hostname("my-host").await);
        tokio_test::assert_ok!(client.reset_hostname().await);
    }

    /// Bus that keeps the last value set and reports it in busctl's encoding
    fn stateful_bus() -> MockMachine {
        let hostname = Arc::new(Mutex::new("installer".to_string()));
        let mut machine = machine_with_bus();

        let stored = hostname.clone();
        machine
            .expect_execute()
            .withf(|cmd| cmd.contains(" set-property ") && cmd.contains(" Hostname s "))
            .returning(move |cmd| {
                let (_, value) = cmd.rsplit_once(" Hostname s ").unwrap();
                *stored.lock().unwrap() = value.trim_matches('\'').to_string();
                Ok(String::new())
            });
        machine
            .expect_execute()
            .withf(|cmd| cmd.contains(" get-property ") && cmd.ends_with(" Hostname"))
            .returning(move |_| Ok(format!("s \"{}\"\n", hostname.lock().unwrap())));
        machine
    }

    #[tokio::test]
    async fn test_hostname_round_trip() {
        let client = HostnameClient::new(stateful_bus()).await.unwrap();
        assert_eq!(client.get_hostname().await.unwrap(), "s \"installer\"");

        client.set_hostname("my-host").await.unwrap();
        assert_eq!(client.get_hostname().await.unwrap(), "s \"my-host\"");

        client.reset_hostname().await.unwrap();
        assert_eq!(client.get_hostname().await.unwrap(), "s \"\"");
    }
}
