//! Error taxonomy and structured error reports.
//!
//! Validation failures are recoverable: the session is untouched and an
//! [`ErrorReport`] is pushed onto the notification queue. State and
//! serialization failures propagate to the caller.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::CatalogError;
use crate::economy::{ActionPoints, ResourceKind, Resources};
use crate::state::Phase;

/// Rejected player input. Never leaves partial effects behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{operation} is only valid during {expected} (current phase: {actual})")]
    WrongPhase {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },
    #[error("{count} event(s) must be resolved first")]
    EventsPending { count: usize },
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("event `{0}` is not pending")]
    EventNotPending(String),
    #[error("event `{event}` has no option `{option}`")]
    UnknownOption { event: String, option: String },
    #[error("needs {needed} AP but only {available} available")]
    InsufficientActionPoints { needed: u32, available: u32 },
    #[error("needs {needed:.1} {resource} but only {available:.1} available")]
    InsufficientResource {
        resource: ResourceKind,
        needed: f64,
        available: f64,
    },
    #[error("no actions queued")]
    EmptyQueue,
    #[error("invalid parameters for `{action}`: {reason}")]
    InvalidParams { action: String, reason: String },
    #[error("no queued action at position {0}")]
    NoQueuedAction(usize),
    #[error("no staff available for `{0}`")]
    StaffUnavailable(String),
    #[error("unknown researcher #{0}")]
    UnknownResearcher(u32),
    #[error("requirement not met: {0}")]
    RequirementNotMet(String),
    #[error("the game is over")]
    GameOver,
}

/// Operation attempted against a session that cannot serve it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no session has been started")]
    NotInitialized,
}

/// Malformed or incompatible persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("record JSON error: {0}")]
    Json(String),
    #[error("record schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("record violates invariant: {0}")]
    Invariant(String),
    #[error("record references unknown catalog entry `{0}`")]
    UnknownReference(String),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Top-level error for simulation calls.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SimError {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::State(_) => ErrorCategory::State,
            Self::Serialization(_) | Self::Config(_) | Self::Catalog(_) => {
                ErrorCategory::Serialization
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    State,
    Serialization,
}

impl ErrorCategory {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Validation => Severity::Warning,
            Self::State => Severity::Error,
            Self::Serialization => Severity::Fatal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// Snapshot of the values relevant to a rejected call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Offending action, event, or option id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub resources: Resources,
    pub action_points: ActionPoints,
    pub phase: Phase,
    pub turn: u32,
}

/// Structured error emitted on the notification queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,
    pub context: ErrorContext,
}

impl ErrorReport {
    #[must_use]
    pub fn validation(err: &ValidationError, context: ErrorContext) -> Self {
        let category = ErrorCategory::Validation;
        Self {
            category,
            severity: category.severity(),
            message: err.to_string(),
            context,
        }
    }
}
