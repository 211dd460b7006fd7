use std::sync::Arc;

use super::{Notification, RivalModel, TurnController, TurnReport, TurnStartReport};
use crate::config::SimConfig;
use crate::data::{ActionDef, GameData};
use crate::effects::ActionParams;
use crate::error::{SerializationError, ValidationError};
use crate::events::Resolution;
use crate::state::{QueuedAction, SessionState};

/// Session wrapper that owns the controller and the state it drives.
#[derive(Debug)]
pub struct GameSession {
    controller: TurnController,
    state: SessionState,
}

impl GameSession {
    /// Construct a fresh session for `seed`.
    #[must_use]
    pub fn new(
        seed: &str,
        data: Arc<GameData>,
        config: SimConfig,
        rival: Box<dyn RivalModel>,
    ) -> Self {
        let state = SessionState::new(seed, &config);
        let controller = TurnController::with_rival(data, config, rival);
        Self { controller, state }
    }

    /// Restore a session from a persistence record.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the record fails schema, invariant,
    /// or catalog checks.
    pub fn from_record(
        record: &serde_json::Value,
        data: Arc<GameData>,
        config: SimConfig,
        rival: Box<dyn RivalModel>,
    ) -> Result<Self, SerializationError> {
        let state = SessionState::from_record(record, &data, &config)?;
        let controller = TurnController::with_rival(data, config, rival);
        Ok(Self { controller, state })
    }

    /// # Errors
    ///
    /// See [`TurnController::start_turn`].
    pub fn start_turn(&mut self) -> Result<TurnStartReport, ValidationError> {
        self.controller.start_turn(&mut self.state)
    }

    /// # Errors
    ///
    /// See [`TurnController::select_action`].
    pub fn select_action(
        &mut self,
        action_id: &str,
        params: ActionParams,
    ) -> Result<(), ValidationError> {
        self.controller
            .select_action(&mut self.state, action_id, params)
    }

    /// # Errors
    ///
    /// See [`TurnController::reserve_action_points`].
    pub fn reserve_action_points(&mut self, n: u32) -> Result<(), ValidationError> {
        self.controller.reserve_action_points(&mut self.state, n)
    }

    /// # Errors
    ///
    /// See [`TurnController::cancel_action`].
    pub fn cancel_action(&mut self, index: usize) -> Result<QueuedAction, ValidationError> {
        self.controller.cancel_action(&mut self.state, index)
    }

    /// # Errors
    ///
    /// See [`TurnController::execute_turn`].
    pub fn execute_turn(&mut self) -> Result<TurnReport, ValidationError> {
        self.controller.execute_turn(&mut self.state)
    }

    /// Alias for [`Self::execute_turn`].
    ///
    /// # Errors
    ///
    /// See [`TurnController::execute_turn`].
    pub fn end_turn(&mut self) -> Result<TurnReport, ValidationError> {
        self.execute_turn()
    }

    /// # Errors
    ///
    /// See [`TurnController::resolve_event`].
    pub fn resolve_event(
        &mut self,
        event_id: &str,
        option_id: &str,
    ) -> Result<Resolution, ValidationError> {
        self.controller
            .resolve_event(&mut self.state, event_id, option_id)
    }

    #[must_use]
    pub fn available_actions(&self) -> Vec<&ActionDef> {
        self.controller.available_actions(&self.state)
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.controller.drain_notifications()
    }

    /// # Errors
    ///
    /// Returns an error if the state cannot be represented as JSON.
    pub fn to_record(&self) -> Result<serde_json::Value, SerializationError> {
        self.state.to_record()
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn controller(&self) -> &TurnController {
        &self.controller
    }

    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }
}
