//! Connectivity monitor collaborator
//!
//! The monitor pushes validation transitions for the active data network
//! into the controller through a [`ValidationSink`]. The controller
//! registers once when it starts and un-registers at teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::controller::Command;
use crate::error::{RecoveryError, Result};

/// Handle returned by [`ConnectivityMonitor::register`]
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct RegistrationId(pub u64);

/// Entry point for validation transitions into a controller queue
///
/// Sending never blocks; transitions are queued in arrival order.
#[derive(Debug, Clone)]
pub struct ValidationSink {
    tx: mpsc::UnboundedSender<Command>,
}

impl ValidationSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Report that internet reachability of the active network changed
    pub fn on_validation_status_changed(&self, valid: bool) -> Result<()> {
        self.tx
            .send(Command::Validation(valid))
            .map_err(|_| RecoveryError::ControllerStopped)
    }

    /// True once the controller behind this sink has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Source of validation transitions
pub trait ConnectivityMonitor: Send + Sync {
    /// Start delivering transitions to `sink`
    fn register(&self, sink: ValidationSink) -> Result<RegistrationId>;

    /// Stop delivering transitions for `id`; unknown ids are ignored
    fn unregister(&self, id: RegistrationId);
}

/// In-process monitor that fans a validation status out to registered sinks
///
/// Only transitions are forwarded; reporting the same status twice is a no-op.
#[derive(Debug)]
pub struct LocalConnectivityMonitor {
    next_id: AtomicU64,
    sinks: Mutex<HashMap<RegistrationId, ValidationSink>>,
    validated: Mutex<Option<bool>>,
}

impl LocalConnectivityMonitor {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sinks: Mutex::new(HashMap::new()),
            validated: Mutex::new(None),
        }
    }

    /// Publish the current validation status
    ///
    /// Returns the number of sinks that received a transition.
    pub fn set_validated(&self, valid: bool) -> usize {
        {
            let mut validated = self.validated.lock();
            if *validated == Some(valid) {
                return 0;
            }
            *validated = Some(valid);
        }

        let mut delivered = 0;
        self.sinks.lock().retain(|id, sink| match sink.on_validation_status_changed(valid) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                warn!("Dropping closed validation sink {:?}", id);
                false
            }
        });
        delivered
    }

    /// Number of registered sinks
    pub fn registered(&self) -> usize {
        self.sinks.lock().len()
    }
}

impl Default for LocalConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor for LocalConnectivityMonitor {
    fn register(&self, sink: ValidationSink) -> Result<RegistrationId> {
        if sink.is_closed() {
            return Err(RecoveryError::registration("sink already closed"));
        }
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Registered validation sink {:?}", id);
        self.sinks.lock().insert(id, sink);
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) {
        if self.sinks.lock().remove(&id).is_some() {
            debug!("Unregistered validation sink {:?}", id);
        }
    }
}
