//! Deployment run state and apply reporting
//!
//! A run moves through a small state machine while a plan is executed:
//! `Planned -> Applying -> Completed | PartiallyFailed`. The apply report
//! records the fate of every operation so a partial failure is fully
//! accountable: what ran, what failed, and what was never attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{DevicePath, RunId};

// ============================================================================
// RunState
// ============================================================================

/// State of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Plan computed, nothing executed yet
    Planned,
    /// Operations are being executed
    Applying,
    /// Every operation succeeded and the device was restarted
    Completed,
    /// At least one operation failed; the rest were not attempted
    PartiallyFailed,
}

impl RunState {
    /// Attempt a state transition
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` for any transition other than
    /// `Planned -> Applying` and `Applying -> Completed | PartiallyFailed`.
    pub fn transition(self, to: RunState) -> Result<RunState, DomainError> {
        let valid = matches!(
            (self, to),
            (RunState::Planned, RunState::Applying)
                | (RunState::Applying, RunState::Completed)
                | (RunState::Applying, RunState::PartiallyFailed)
        );

        if valid {
            Ok(to)
        } else {
            Err(DomainError::InvalidState {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Whether the run has finished, successfully or not
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::PartiallyFailed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Planned => write!(f, "planned"),
            RunState::Applying => write!(f, "applying"),
            RunState::Completed => write!(f, "completed"),
            RunState::PartiallyFailed => write!(f, "partially_failed"),
        }
    }
}

// ============================================================================
// Operation
// ============================================================================

/// A single device operation within an apply sequence
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum Operation {
    /// Ensure a directory exists on the device
    MakeDir(DevicePath),
    /// Remove a file from the device
    Delete(DevicePath),
    /// Copy a local file onto the device
    Copy(DevicePath),
    /// Restart the device runtime
    Restart,
}

impl Operation {
    /// The path this operation touches, if any
    #[must_use]
    pub fn path(&self) -> Option<&DevicePath> {
        match self {
            Operation::MakeDir(p) | Operation::Delete(p) | Operation::Copy(p) => Some(p),
            Operation::Restart => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::MakeDir(p) => write!(f, "mkdir {p}"),
            Operation::Delete(p) => write!(f, "delete {p}"),
            Operation::Copy(p) => write!(f, "copy {p}"),
            Operation::Restart => write!(f, "restart"),
        }
    }
}

/// An operation that failed, with the transport's error text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    /// The operation that failed
    pub operation: Operation,
    /// Error message from the transport
    pub message: String,
    /// When the failure occurred
    pub timestamp: DateTime<Utc>,
}

impl OperationFailure {
    /// Create a new failure record stamped with the current time
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// ApplyReport
// ============================================================================

/// Full account of an apply attempt
///
/// The three operation lists partition the executable plan: every planned
/// operation ends up in exactly one of `completed`, `failed`, or
/// `not_attempted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Identifier of the run this report describes
    pub run_id: RunId,
    /// When the apply started
    pub started_at: DateTime<Utc>,
    /// When the apply finished
    pub finished_at: DateTime<Utc>,
    /// Terminal state of the run
    pub state: RunState,
    /// Operations that succeeded, in execution order
    pub completed: Vec<Operation>,
    /// Operations that failed
    pub failed: Vec<OperationFailure>,
    /// Operations abandoned after the first failure
    pub not_attempted: Vec<Operation>,
    /// Remote-only files left in place by the protected-file policy
    pub skipped_protected: Vec<DevicePath>,
    /// Whether the device restart was issued and succeeded
    pub restarted: bool,
}

impl ApplyReport {
    /// Whether every planned operation succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod run_state_tests {
        use super::*;

        #[test]
        fn test_valid_transitions() {
            let s = RunState::Planned.transition(RunState::Applying).unwrap();
            assert_eq!(s, RunState::Applying);

            assert_eq!(
                s.transition(RunState::Completed).unwrap(),
                RunState::Completed
            );
            assert_eq!(
                RunState::Applying
                    .transition(RunState::PartiallyFailed)
                    .unwrap(),
                RunState::PartiallyFailed
            );
        }

        #[test]
        fn test_invalid_transitions() {
            assert!(RunState::Planned.transition(RunState::Completed).is_err());
            assert!(RunState::Completed.transition(RunState::Applying).is_err());
            assert!(RunState::PartiallyFailed
                .transition(RunState::Completed)
                .is_err());
        }

        #[test]
        fn test_terminal_states() {
            assert!(!RunState::Planned.is_terminal());
            assert!(!RunState::Applying.is_terminal());
            assert!(RunState::Completed.is_terminal());
            assert!(RunState::PartiallyFailed.is_terminal());
        }
    }

    mod operation_tests {
        use super::*;

        fn path(s: &str) -> DevicePath {
            DevicePath::new(s).unwrap()
        }

        #[test]
        fn test_display() {
            assert_eq!(Operation::Copy(path("main.py")).to_string(), "copy main.py");
            assert_eq!(
                Operation::Delete(path("old.py")).to_string(),
                "delete old.py"
            );
            assert_eq!(Operation::Restart.to_string(), "restart");
        }

        #[test]
        fn test_path_accessor() {
            assert_eq!(
                Operation::MakeDir(path("lib")).path().unwrap().as_str(),
                "lib"
            );
            assert!(Operation::Restart.path().is_none());
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_report_serializes() {
            let now = Utc::now();
            let report = ApplyReport {
                run_id: RunId::new(),
                started_at: now,
                finished_at: now,
                state: RunState::Completed,
                completed: vec![Operation::Restart],
                failed: vec![],
                not_attempted: vec![],
                skipped_protected: vec![],
                restarted: true,
            };

            let json = serde_json::to_string(&report).unwrap();
            assert!(json.contains("\"state\":\"completed\""));
            assert!(report.is_success());
        }
    }
}
