//! Removal of the installer's default connection profiles

use crate::error::NetcheckResult;
use crate::machine::Machine;
use crate::profile::{parse_connection_ids, ProfileLocation};
use crate::validation::shell_quote;
use tracing::{debug, info};

/// Delete the default profiles unless the network is configured on the boot
/// command line
///
/// Returns the ids of the deleted connections.
pub async fn remove_default_connections<M: Machine + ?Sized>(machine: &M) -> NetcheckResult<Vec<String>> {
    remove_default_connections_in(machine, &ProfileLocation::persistent()).await
}

/// [`remove_default_connections`] for profiles kept in `location`
pub async fn remove_default_connections_in<M: Machine + ?Sized>(
    machine: &M,
    location: &ProfileLocation,
) -> NetcheckResult<Vec<String>> {
    location.validate()?;
    let bootopts = machine.execute("grep ip= /proc/cmdline || true").await?;
    if !bootopts.trim().is_empty() {
        debug!("Network configured by boot options, keeping default profiles");
        return Ok(Vec::new());
    }

    let dir = location.dir();
    let out = machine
        .execute(&format!("grep ^id= {}/* || true", shell_quote(&dir)))
        .await?;
    let ids = parse_connection_ids(&out);
    if ids.is_empty() {
        debug!("No default profiles in {}", dir);
        return Ok(ids);
    }

    let quoted: Vec<String> = ids.iter().map(|id| shell_quote(id)).collect();
    info!("Removing default connections: {}", ids.join(", "));
    machine
        .execute(&format!("nmcli connection delete {}", quoted.join(" ")))
        .await?;
    Ok(ids)
}
