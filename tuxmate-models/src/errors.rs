use std::time::Duration;

use thiserror::Error;

/// Result alias for scheduler operations across the Tuxmate crates.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Common error representation for scheduler operations.
///
/// Every failure keeps its own kind; nothing is ever folded into a false
/// success, and a timed-out external call is never reported as a plain
/// persistence failure.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task field is malformed or out of range.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// No scheduled task with this id exists in the backend store.
    #[error("no scheduled task with id '{0}'")]
    NotFound(String),

    /// Neither systemd user timers nor cron are usable on this host.
    #[error("no usable scheduling backend on this host")]
    BackendUnavailable,

    /// Reading or rewriting backend state failed; `step` names the exact
    /// operation so a retry knows where it stopped.
    #[error("persistence failure during {step}: {message}")]
    Persistence { step: String, message: String },

    /// A bounded external call exceeded its deadline.
    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Insufficient rights over the user's scheduler state.
    #[error("insufficient rights over user scheduler state: {0}")]
    Permission(String),
}

impl SchedulerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        SchedulerError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn persistence(step: impl Into<String>, message: impl ToString) -> Self {
        SchedulerError::Persistence {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Stable tag identifying the error kind in CLI failure payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::Validation { .. } => "validation",
            SchedulerError::NotFound(_) => "not_found",
            SchedulerError::BackendUnavailable => "backend_unavailable",
            SchedulerError::Persistence { .. } => "persistence",
            SchedulerError::Timeout { .. } => "timeout",
            SchedulerError::Permission(_) => "permission",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_tags() {
        assert_eq!(
            SchedulerError::NotFound("x".to_string()).kind(),
            "not_found"
        );
        assert_eq!(SchedulerError::BackendUnavailable.kind(), "backend_unavailable");
        assert_eq!(
            SchedulerError::persistence("crontab-install", "denied").kind(),
            "persistence"
        );
    }

    #[test]
    fn persistence_message_names_the_step() {
        let err = SchedulerError::persistence("daemon-reload", "exit status 1");
        assert!(err.to_string().contains("daemon-reload"));
    }
}
