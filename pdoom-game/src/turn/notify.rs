//! Outward notifications drained by the caller after each call.
use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;
use crate::events::EventPresentation;
use crate::state::{Ending, Phase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Full persistence record after a successful mutation.
    StateChanged { snapshot: serde_json::Value },
    PhaseChanged { from: Phase, to: Phase },
    ActionsAvailable { turn: u32, available_ap: u32 },
    EventTriggered { event: EventPresentation },
    Error { report: ErrorReport },
    GameOver { ending: Ending },
}

impl Notification {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::ActionsAvailable { .. } => "actions_available",
            Self::EventTriggered { .. } => "event_triggered",
            Self::Error { .. } => "error",
            Self::GameOver { .. } => "game_over",
        }
    }
}
