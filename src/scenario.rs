//! End-to-end installer network scenarios

use crate::browser::Browser;
use crate::error::NetcheckResult;
use crate::installer::{Installer, InstallerStep};
use crate::machine::Machine;
use crate::network::NetworkUiDriver;
use crate::profile::{ConnectionSetting, MatchMode, ProfileLocation};
use tracing::info;

const AUTOCONNECT: &str = "connection.autoconnect";

impl<B: Browser, M: Machine> NetworkUiDriver<B, M> {
    /// Edit a connection activated from the initramfs before installation
    ///
    /// `con_name` must be active on `iface` through a single transient profile.
    /// Turning autoreconnect off in the UI has to write exactly one persistent
    /// profile with `connection.autoconnect=no`; turning it back on later in
    /// the wizard restores `yes`.
    pub async fn run_preinstall_connection_scenario<I>(
        &self,
        installer: &I,
        iface: &str,
        con_name: &str,
    ) -> NetcheckResult<()>
    where
        I: Installer + ?Sized,
    {
        info!("Pre-install connection scenario for '{}' on {}", con_name, iface);
        let persistent = self.persistent_location();
        let autoconnect = |value: &str| [ConnectionSetting::new(con_name, AUTOCONNECT, value)];

        // Connection from the initramfs is active on the interface
        self.assert_device_state(iface, "GENERAL.CONNECTION", con_name, MatchMode::Exact)
            .await?;
        self.assert_device_state(iface, "GENERAL.STATE", "connected", MatchMode::Substring)
            .await?;

        // Single transient profile, nothing persistent yet.
        // The installer's default profile is removed beforehand, hence 0 and not 1.
        self.count_profile_files(con_name, 1, &ProfileLocation::transient(), None)
            .await?;
        self.count_profile_files("", 0, &persistent, None).await?;

        self.assert_connection_settings(&autoconnect("yes"), None).await?;

        self.open_network_panel().await?;
        self.select_interface(iface).await?;
        self.set_autoreconnect(false).await?;
        self.close_network_panel().await?;

        self.wait_for_profile_file(con_name, &persistent).await?;
        self.assert_connection_settings(&autoconnect("no"), None).await?;

        // Editing made the connection persistent, as the only persistent profile
        self.count_profile_files(con_name, 1, &persistent, Some(con_name))
            .await?;
        self.count_profile_files("", 1, &persistent, None).await?;

        installer.reach(InstallerStep::Review).await?;

        self.open_network_panel().await?;
        self.select_interface(iface).await?;
        self.set_autoreconnect(true).await?;
        self.close_network_panel().await?;
        self.assert_connection_settings(&autoconnect("yes"), None).await?;

        info!("Pre-install connection scenario passed");
        Ok(())
    }
}
