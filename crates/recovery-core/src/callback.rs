//! Recovery callback collaborator
//!
//! The controller decides *which* action to run; the callback is what
//! actually reconnects the data network, power-cycles the radio (via the
//! service-state tracker) or reboots the modem (via the phone).

use async_trait::async_trait;

use crate::action::RecoveryAction;
use crate::error::{RecoveryError, Result};

/// Executes recovery actions on behalf of the controller
///
/// Each call runs on its own task, so an action may take as long as the
/// hardware needs without delaying validation events or re-checks.
#[async_trait]
pub trait RecoveryCallback: Send + Sync {
    /// Tear down and re-establish the internet-providing data network
    async fn reestablish_internet(&self) -> Result<()>;

    /// Ask the service-state tracker to power-cycle the radio
    async fn power_cycle_radio(&self) -> Result<()>;

    /// Ask the phone to reboot the baseband
    async fn reboot_modem(&self) -> Result<()>;

    /// Failures the controller cannot handle itself (misconfiguration,
    /// rejected dispatches)
    async fn on_failure(&self, _error: RecoveryError) {}
}

/// Route an action to the matching callback method
pub(crate) async fn dispatch(callback: &dyn RecoveryCallback, action: RecoveryAction) -> Result<()> {
    match action {
        RecoveryAction::None => Ok(()),
        RecoveryAction::ReestablishInternet => callback.reestablish_internet().await,
        RecoveryAction::RadioPowerCycle => callback.power_cycle_radio().await,
        RecoveryAction::ModemReboot => callback.reboot_modem().await,
    }
}
