//! Error types for the recovery controller

use thiserror::Error;

use crate::action::RecoveryAction;

/// Result type for recovery operations
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Errors that can occur in the recovery controller and its collaborators
///
/// Guard outcomes (weak signal, active call) are policy decisions and never
/// show up here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecoveryError {
    /// Delay/skip tables are empty, mismatched, or otherwise unusable
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A guard collaborator (signal quality, call state) could not answer
    #[error("Collaborator unavailable: {collaborator}: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },

    /// The recovery callback could not perform the requested action
    #[error("Failed to dispatch {action}: {reason}")]
    Dispatch {
        action: RecoveryAction,
        reason: String,
    },

    /// Registration with the connectivity monitor failed
    #[error("Registration error: {message}")]
    Registration { message: String },

    /// The controller task is no longer running
    #[error("Recovery controller stopped")]
    ControllerStopped,
}

impl RecoveryError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a collaborator-unavailable error
    pub fn unavailable(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            reason: reason.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(action: RecoveryAction, reason: impl Into<String>) -> Self {
        Self::Dispatch {
            action,
            reason: reason.into(),
        }
    }

    /// Create a registration error
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }
}
