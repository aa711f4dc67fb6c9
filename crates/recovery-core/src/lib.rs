//! # Stallguard Recovery Core
//!
//! Data-connectivity stall recovery for cellular modems.
//!
//! The controller watches validation transitions of the internet-providing
//! data network. When validation fails it escalates through an ordered list
//! of increasingly disruptive remedies, waiting a configured delay between
//! steps:
//!
//! 1. re-establish the data network
//! 2. power-cycle the radio
//! 3. reboot the modem
//!
//! Each step is guarded. A signal level below the poor-signal threshold
//! resets recovery (the stall is the radio's fault, not the data path's),
//! and an active voice call holds it (radio actions would drop the call).
//! A successful validation ends the episode and cancels any pending
//! re-check.
//!
//! ## Architecture
//!
//! - `action`: the ordered [`RecoveryAction`] levels
//! - `config`: raw [`RecoverySettings`] and the validated [`RecoveryConfig`]
//! - `guard`: signal quality and call state collaborators
//! - `machine`: the pure [`RecoveryStateMachine`]
//! - `controller`: the queue-driven [`RecoveryController`] that owns the machine
//! - `monitor`, `callback`, `events`: the remaining collaborator seams
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use stallguard_recovery_core::prelude::*;
//!
//! struct Radio;
//!
//! impl SignalQualityProvider for Radio {
//!     fn current_level(&self) -> Result<SignalLevel> {
//!         Ok(SignalLevel(4))
//!     }
//! }
//!
//! impl CallStateProvider for Radio {
//!     fn current_state(&self) -> Result<CallState> {
//!         Ok(CallState::Idle)
//!     }
//! }
//!
//! #[async_trait]
//! impl RecoveryCallback for Radio {
//!     async fn reestablish_internet(&self) -> Result<()> { Ok(()) }
//!     async fn power_cycle_radio(&self) -> Result<()> { Ok(()) }
//!     async fn reboot_modem(&self) -> Result<()> { Ok(()) }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let monitor = Arc::new(LocalConnectivityMonitor::new());
//! let radio = Arc::new(Radio);
//!
//! let controller = RecoveryController::builder()
//!     .config(RecoveryConfig::default())
//!     .monitor(monitor.clone())
//!     .signal_quality(radio.clone())
//!     .call_state(radio.clone())
//!     .callback(radio)
//!     .start()?;
//!
//! // The data network stopped validating: re-establish it right away
//! monitor.set_validated(false);
//!
//! controller.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod callback;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod guard;
pub mod machine;
pub mod monitor;

pub use action::RecoveryAction;
pub use callback::RecoveryCallback;
pub use config::{CallGuardPolicy, RecoveryConfig, RecoverySettings, RecoveryStep};
pub use controller::{RecoveryController, RecoveryControllerBuilder};
pub use error::{RecoveryError, Result};
pub use events::{HoldReason, NoopMetrics, RecoveryEvent, RecoveryMetrics, ResetReason};
pub use guard::{CallState, CallStateProvider, SignalLevel, SignalQualityProvider};
pub use machine::{ControllerSnapshot, ControllerState, RecoveryStateMachine};
pub use monitor::{ConnectivityMonitor, LocalConnectivityMonitor, RegistrationId, ValidationSink};

/// Re-export of common types
pub mod prelude {
    pub use super::{
        CallGuardPolicy, CallState, CallStateProvider, ConnectivityMonitor, ControllerSnapshot,
        LocalConnectivityMonitor, RecoveryAction, RecoveryCallback, RecoveryConfig,
        RecoveryController, RecoveryError, RecoveryEvent, RecoveryMetrics, RecoverySettings,
        Result, SignalLevel, SignalQualityProvider,
    };
}
