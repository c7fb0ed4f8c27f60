//! Network configuration panel of the installer UI
//!
//! The panel is the Cockpit networking page embedded in an iframe inside a
//! modal opened from the installer's kebab menu.

use crate::browser::Browser;
use crate::error::NetcheckResult;
use crate::network::NetworkUiDriver;
use crate::validation::validate_interface_name;
use tracing::info;

/// Name of the iframe hosting the Cockpit networking page
pub const NETWORK_FRAME: &str = "cockpit-network";

const KEBAB_TOGGLE: &str = "#toggle-kebab";
const NETWORK_MENU_ITEM: &str = "#about-modal-dropdown-item-network";
const NETWORK_MODAL: &str = "#cockpit-network-configuration-modal";
const INTERFACES_TABLE: &str = "#networking-interfaces";
const INTERFACE_DETAILS: &str = "#network-interface";
const AUTORECONNECT: &str = "#autoreconnect";

impl<B: Browser, M> NetworkUiDriver<B, M> {
    /// Open the network modal and enter its iframe
    pub async fn open_network_panel(&self) -> NetcheckResult<()> {
        info!("Opening network configuration panel");
        self.browser.click(KEBAB_TOGGLE).await?;
        self.browser.click(NETWORK_MENU_ITEM).await?;
        self.browser
            .wait_present(&format!("iframe[name='{}']", NETWORK_FRAME))
            .await?;
        self.browser.switch_to_frame(NETWORK_FRAME).await?;
        self.browser.wait_visible(INTERFACES_TABLE).await
    }

    /// Leave the iframe and close the network modal
    pub async fn close_network_panel(&self) -> NetcheckResult<()> {
        info!("Closing network configuration panel");
        self.browser.switch_to_top().await?;
        self.browser
            .click(&format!("{} button:contains('Close')", NETWORK_MODAL))
            .await?;
        self.browser.wait_not_present(NETWORK_MODAL).await
    }

    /// Open the details page of `iface`
    pub async fn select_interface(&self, iface: &str) -> NetcheckResult<()> {
        validate_interface_name(iface)?;
        self.browser
            .click(&format!("{} tr[data-interface='{}'] button", INTERFACES_TABLE, iface))
            .await?;
        self.browser.wait_visible(INTERFACE_DETAILS).await
    }

    /// Toggle "Connect automatically" on the interface details page
    pub async fn set_autoreconnect(&self, enabled: bool) -> NetcheckResult<()> {
        info!("Setting autoreconnect to {}", enabled);
        self.browser.set_checked(AUTORECONNECT, enabled).await?;
        let state = if enabled { ":checked" } else { ":not(:checked)" };
        self.browser
            .wait_visible(&format!("{}{}", AUTORECONNECT, state))
            .await
    }
}
