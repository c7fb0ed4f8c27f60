//! Installer wizard navigation

use crate::browser::Browser;
use crate::error::{NetcheckError, NetcheckResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const NEXT_BUTTON: &str = "#installation-next-btn";

/// Wizard steps in the order the installer shows them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstallerStep {
    Language,
    InstallationMethod,
    DiskEncryption,
    Accounts,
    Review,
    Progress,
}

impl InstallerStep {
    pub const ALL: [InstallerStep; 6] = [
        InstallerStep::Language,
        InstallerStep::InstallationMethod,
        InstallerStep::DiskEncryption,
        InstallerStep::Accounts,
        InstallerStep::Review,
        InstallerStep::Progress,
    ];

    /// DOM id of the step page
    pub fn id(self) -> &'static str {
        match self {
            InstallerStep::Language => "installation-language",
            InstallerStep::InstallationMethod => "installation-method",
            InstallerStep::DiskEncryption => "disk-encryption",
            InstallerStep::Accounts => "accounts",
            InstallerStep::Review => "installation-review",
            InstallerStep::Progress => "installation-progress",
        }
    }

    pub fn next(self) -> Option<InstallerStep> {
        let pos = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(pos + 1).copied()
    }
}

impl FromStr for InstallerStep {
    type Err = NetcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.id() == s)
            .ok_or_else(|| NetcheckError::InvalidParameter(format!("Unknown installer step: {}", s)))
    }
}

impl fmt::Display for InstallerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Moves the installer forward to a given step
#[async_trait]
pub trait Installer: Send + Sync {
    async fn reach(&self, step: InstallerStep) -> NetcheckResult<()>;
}

/// Walks the wizard with its "Next" button
pub struct WizardInstaller<B> {
    browser: B,
    current: tokio::sync::Mutex<InstallerStep>,
}

impl<B: Browser> WizardInstaller<B> {
    pub fn new(browser: B) -> Self {
        Self::starting_at(browser, InstallerStep::Language)
    }

    pub fn starting_at(browser: B, step: InstallerStep) -> Self {
        Self {
            browser,
            current: tokio::sync::Mutex::new(step),
        }
    }

    pub async fn current_step(&self) -> InstallerStep {
        *self.current.lock().await
    }
}

#[async_trait]
impl<B: Browser> Installer for WizardInstaller<B> {
    async fn reach(&self, step: InstallerStep) -> NetcheckResult<()> {
        let mut current = self.current.lock().await;
        if step < *current {
            return Err(NetcheckError::InvalidState(format!(
                "cannot go back from {} to {}",
                *current, step
            )));
        }

        while *current < step {
            let next = current
                .next()
                .ok_or_else(|| NetcheckError::InvalidState(format!("no step after {}", *current)))?;
            info!("Installer: {} -> {}", *current, next);
            self.browser.click(NEXT_BUTTON).await?;
            self.browser.wait_visible(&format!("#{}", next.id())).await?;
            *current = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowser;
    use mockall::predicate::eq;
    use mockall::Sequence;

    #[test]
    fn test_step_order() {
        assert!(InstallerStep::Language < InstallerStep::Review);
        assert_eq!(InstallerStep::Accounts.next(), Some(InstallerStep::Review));
        assert_eq!(InstallerStep::Progress.next(), None);
        assert_eq!(InstallerStep::Review.to_string(), "installation-review");
    }

    #[test]
    fn test_step_from_id() {
        assert_eq!("installation-method".parse::<InstallerStep>().unwrap(), InstallerStep::InstallationMethod);
        assert!("storage".parse::<InstallerStep>().is_err());
    }

    #[tokio::test]
    async fn test_reach_review_from_accounts() {
        let mut browser = MockBrowser::new();
        let mut seq = Sequence::new();
        browser
            .expect_click()
            .with(eq("#installation-next-btn"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        browser
            .expect_wait_visible()
            .with(eq("#installation-review"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let installer = WizardInstaller::starting_at(browser, InstallerStep::Accounts);
        tokio_test::assert_ok!(installer.reach(InstallerStep::Review).await);
        assert_eq!(installer.current_step().await, InstallerStep::Review);

        // Already there: no clicks
        tokio_test::assert_ok!(installer.reach(InstallerStep::Review).await);
    }

    #[tokio::test]
    async fn test_reach_walks_every_step() {
        let mut browser = MockBrowser::new();
        browser.expect_click().times(4).returning(|_| Ok(()));
        browser.expect_wait_visible().times(4).returning(|_| Ok(()));

        let installer = WizardInstaller::new(browser);
        tokio_test::assert_ok!(installer.reach(InstallerStep::Review).await);
    }

    #[tokio::test]
    async fn test_reach_backwards_is_rejected() {
        let installer = WizardInstaller::starting_at(MockBrowser::new(), InstallerStep::Review);
        let result = installer.reach(InstallerStep::Language).await;
        assert!(matches!(result, Err(NetcheckError::InvalidState(_))));
    }
}
