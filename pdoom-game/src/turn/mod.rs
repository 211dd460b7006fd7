//! Turn orchestrator.
//!
//! The controller owns the catalog, configuration, rival model, and the
//! outward notification queue. It borrows a [`SessionState`] for the duration
//! of each call and never retains it.
//!
//! Phases: `TurnStart -> (EventResolution ->) ActionSelection -> TurnProcessing
//! -> TurnStart`, with `GameOver` terminal.
//!
//! RNG order per turn: one skill roll per researcher, one roll per risk pool,
//! one selection roll per risk trigger, one roll per eligible random event,
//! then whatever the rival model draws during `execute_turn`.
mod notify;
mod rival;
mod session;

pub use notify::Notification;
pub use rival::{NoRivals, RivalContribution, RivalLab, RivalLabs, RivalModel};
pub use session::GameSession;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::actions::{apply_action, available_actions, validate_selection};
use crate::config::SimConfig;
use crate::constants::{
    DOOM_MAX, DOOM_MIN, LOG_ACTION_APPLIED, LOG_ACTION_FAILED, LOG_BANKRUPT, LOG_DOOM_RECOMPUTE,
    LOG_EVENT_RESOLVED, LOG_GAME_OVER, LOG_SALARIES, LOG_TURN_START,
};
use crate::data::{ActionDef, GameData};
use crate::doom::{DoomInputs, DoomTurnReport};
use crate::effects::ActionParams;
use crate::error::{ErrorReport, ValidationError};
use crate::events::{
    EventPresentation, Resolution, SelectionTrace, enqueue_risk_events, evaluate_catalog_events,
    resolve_option,
};
use crate::researcher::{StaffTurnReport, apply_turn_drift, payroll};
use crate::state::{Ending, Phase, QueuedAction, SessionState};

/// Outcome of `start_turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnStartReport {
    pub turn: u32,
    pub action_points: u32,
    pub salaries: f64,
    pub staff: StaffTurnReport,
    pub risk_selections: Vec<SelectionTrace>,
    pub catalog_events: Vec<String>,
    pub phase: Phase,
}

/// A queued action that failed validation at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAction {
    pub action_id: String,
    pub reason: String,
}

/// Outcome of `execute_turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub applied: Vec<String>,
    pub failed: Vec<FailedAction>,
    pub rival: RivalContribution,
    /// Absent when an action effect ended the game before the recompute.
    pub doom: Option<DoomTurnReport>,
    pub ending: Option<Ending>,
}

/// Drives one session through its phases. Holds no session data of its own;
/// every call borrows the [`SessionState`] it mutates.
#[derive(Debug)]
pub struct TurnController {
    data: Arc<GameData>,
    config: SimConfig,
    rival: Box<dyn RivalModel>,
    notifications: VecDeque<Notification>,
}

impl TurnController {
    #[must_use]
    pub fn new(data: Arc<GameData>, config: SimConfig) -> Self {
        Self::with_rival(data, config, Box::new(NoRivals))
    }

    #[must_use]
    pub fn with_rival(data: Arc<GameData>, config: SimConfig, rival: Box<dyn RivalModel>) -> Self {
        Self {
            data,
            config,
            rival,
            notifications: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn data(&self) -> &GameData {
        &self.data
    }

    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Take every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    #[must_use]
    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    fn notify_state(&mut self, state: &SessionState) {
        match state.to_record() {
            Ok(snapshot) => self.notify(Notification::StateChanged { snapshot }),
            Err(err) => log::warn!("snapshot failed: {err}"),
        }
    }

    fn set_phase(&mut self, state: &mut SessionState, to: Phase) {
        let from = state.phase;
        if from == to {
            return;
        }
        state.phase = to;
        log::debug!("turn {}: phase {from} -> {to}", state.turn);
        self.notify(Notification::PhaseChanged { from, to });
    }

    /// Emit an error report and hand the error back.
    fn reject<T>(
        &mut self,
        state: &SessionState,
        id: Option<&str>,
        err: ValidationError,
    ) -> Result<T, ValidationError> {
        log::info!("rejected on turn {}: {err}", state.turn);
        self.notify(Notification::Error {
            report: ErrorReport::validation(&err, state.error_context(id)),
        });
        Err(err)
    }

    fn require_phase(
        state: &SessionState,
        operation: &'static str,
        expected: Phase,
    ) -> Result<(), ValidationError> {
        if state.phase == Phase::GameOver {
            return Err(ValidationError::GameOver);
        }
        if state.phase != expected {
            return Err(ValidationError::WrongPhase {
                operation,
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn finish(&mut self, state: &mut SessionState, ending: Ending) {
        if state.ending.is_none() {
            state.ending = Some(ending);
        }
        if let Some(ending) = state.ending.clone() {
            log::info!("game over on turn {}: {}", state.turn, ending.key());
            state.push_log(format!("{LOG_GAME_OVER}:{}", ending.key()));
            state.queued_actions.clear();
            self.set_phase(state, Phase::GameOver);
            self.notify(Notification::GameOver { ending });
        }
    }

    fn enter_action_selection(&mut self, state: &mut SessionState) {
        state.action_points.forfeit_reserve();
        self.set_phase(state, Phase::ActionSelection);
        self.notify(Notification::ActionsAvailable {
            turn: state.turn,
            available_ap: state.action_points.available(),
        });
    }

    /// Begin a new turn: AP, salaries, staff drift, risk, then events.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WrongPhase`] outside `TurnStart`.
    pub fn start_turn(&mut self, state: &mut SessionState) -> Result<TurnStartReport, ValidationError> {
        if let Err(err) = Self::require_phase(state, "start_turn", Phase::TurnStart) {
            return self.reject(state, None, err);
        }
        let cfg = self.config.clone();
        state.turn = state.turn.saturating_add(1);
        let total = state.action_point_total(&cfg);
        state.action_points.begin_turn(total);
        log::debug!("turn {} starts with {total} AP", state.turn);
        state.push_log(format!("{LOG_TURN_START}:{}", state.turn));

        let salaries = payroll(&state.researchers);
        state.resources.money -= salaries;
        state.push_log(format!("{LOG_SALARIES}:{salaries:.0}"));
        let mut report = TurnStartReport {
            turn: state.turn,
            action_points: total,
            salaries,
            staff: StaffTurnReport::default(),
            risk_selections: Vec::new(),
            catalog_events: Vec::new(),
            phase: state.phase,
        };
        if state.resources.money < 0.0 {
            state.push_log(LOG_BANKRUPT);
            let money = state.resources.money;
            self.finish(state, Ending::Bankrupt { money });
            report.phase = state.phase;
            self.notify_state(state);
            return Ok(report);
        }

        let compute = state.resources.compute;
        report.staff = apply_turn_drift(&mut state.researchers, compute, &cfg.staff, &mut state.rng);
        state.resources.research += report.staff.research;

        state.risk.apply_decay(cfg.risk.passive_decay);
        let triggers = state.risk.evaluate(&mut state.rng);
        let data = Arc::clone(&self.data);
        report.risk_selections = enqueue_risk_events(state, &data, &triggers);
        report.catalog_events = evaluate_catalog_events(state, &data, &cfg);
        state.risk.record_history(state.turn, cfg.risk.history_window);

        if state.pending_events.is_empty() {
            self.enter_action_selection(state);
        } else {
            self.set_phase(state, Phase::EventResolution);
            let view: &SessionState = state;
            let presentations: Vec<EventPresentation> = view
                .pending_events
                .iter()
                .filter_map(|p| {
                    data.event(&p.event_id)
                        .map(|e| EventPresentation::new(view, e, p.source.clone()))
                })
                .collect();
            for event in presentations {
                log::debug!("event pending: {}", event.event_id);
                self.notify(Notification::EventTriggered { event });
            }
        }
        report.phase = state.phase;
        self.notify_state(state);
        Ok(report)
    }

    /// Validate and queue an action, committing its AP immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] (and emits an error notification) when the
    /// phase, AP, resources, requirements, or parameters do not allow it.
    pub fn select_action(
        &mut self,
        state: &mut SessionState,
        action_id: &str,
        params: ActionParams,
    ) -> Result<(), ValidationError> {
        if let Err(err) = self.check_selection(state, action_id, &params) {
            return self.reject(state, Some(action_id), err);
        }
        let Some(action) = self.data.action(action_id) else {
            return self.reject(
                state,
                Some(action_id),
                ValidationError::UnknownAction(action_id.to_string()),
            );
        };
        let ap_cost = action.ap_cost;
        if let Err(short) = state.action_points.commit(ap_cost) {
            return self.reject(
                state,
                Some(action_id),
                ValidationError::InsufficientActionPoints {
                    needed: short.needed,
                    available: short.available,
                },
            );
        }
        state.queued_actions.push(QueuedAction {
            action_id: action_id.to_string(),
            params,
            ap_cost,
        });
        log::debug!("queued {action_id} ({ap_cost} AP)");
        self.notify_state(state);
        Ok(())
    }

    fn check_selection(
        &self,
        state: &SessionState,
        action_id: &str,
        params: &ActionParams,
    ) -> Result<(), ValidationError> {
        Self::require_phase(state, "select_action", Phase::ActionSelection)?;
        if !state.pending_events.is_empty() {
            return Err(ValidationError::EventsPending {
                count: state.pending_events.len(),
            });
        }
        let action = self
            .data
            .action(action_id)
            .ok_or_else(|| ValidationError::UnknownAction(action_id.to_string()))?;
        validate_selection(state, &self.data, action, params, &self.config)
    }

    /// Hold AP back for the next event window.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] outside `ActionSelection` or when not
    /// enough AP is available.
    pub fn reserve_action_points(
        &mut self,
        state: &mut SessionState,
        n: u32,
    ) -> Result<(), ValidationError> {
        if let Err(err) = Self::require_phase(state, "reserve_action_points", Phase::ActionSelection)
        {
            return self.reject(state, None, err);
        }
        if let Err(short) = state.action_points.reserve(n) {
            return self.reject(
                state,
                None,
                ValidationError::InsufficientActionPoints {
                    needed: short.needed,
                    available: short.available,
                },
            );
        }
        self.notify_state(state);
        Ok(())
    }

    /// Remove a queued action and refund its AP.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] outside `ActionSelection` or for an
    /// out-of-range index.
    pub fn cancel_action(
        &mut self,
        state: &mut SessionState,
        index: usize,
    ) -> Result<QueuedAction, ValidationError> {
        if let Err(err) = Self::require_phase(state, "cancel_action", Phase::ActionSelection) {
            return self.reject(state, None, err);
        }
        if index >= state.queued_actions.len() {
            return self.reject(state, None, ValidationError::NoQueuedAction(index));
        }
        let removed = state.queued_actions.remove(index);
        state.action_points.refund(removed.ap_cost);
        self.notify_state(state);
        Ok(removed)
    }

    /// Catalog actions affordable right now.
    #[must_use]
    pub fn available_actions(&self, state: &SessionState) -> Vec<&ActionDef> {
        if state.phase != Phase::ActionSelection {
            return Vec::new();
        }
        available_actions(state, &self.data, &self.config)
    }

    /// Apply queued actions FIFO, add the rival contribution, recompute doom,
    /// and check end conditions.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] outside `ActionSelection` or with an
    /// empty queue. Individual action failures are reported, not returned.
    pub fn execute_turn(&mut self, state: &mut SessionState) -> Result<TurnReport, ValidationError> {
        if let Err(err) = Self::require_phase(state, "execute_turn", Phase::ActionSelection) {
            return self.reject(state, None, err);
        }
        if state.queued_actions.is_empty() {
            return self.reject(state, None, ValidationError::EmptyQueue);
        }
        self.set_phase(state, Phase::TurnProcessing);
        let data = Arc::clone(&self.data);
        let cfg = self.config.clone();
        let queue = std::mem::take(&mut state.queued_actions);
        let mut report = TurnReport {
            turn: state.turn,
            applied: Vec::new(),
            failed: Vec::new(),
            rival: RivalContribution::default(),
            doom: None,
            ending: None,
        };

        for queued in queue {
            let result = match data.action(&queued.action_id) {
                Some(action) => transact(state, |scratch| {
                    apply_action(scratch, action, &queued.params, &cfg)
                }),
                None => Err(ValidationError::UnknownAction(queued.action_id.clone())),
            };
            match result {
                Ok(_) => {
                    state.push_log(format!("{LOG_ACTION_APPLIED}:{}", queued.action_id));
                    report.applied.push(queued.action_id);
                }
                Err(err) => {
                    state.push_log(format!("{LOG_ACTION_FAILED}:{}", queued.action_id));
                    log::info!("action {} failed: {err}", queued.action_id);
                    self.notify(Notification::Error {
                        report: ErrorReport::validation(
                            &err,
                            state.error_context(Some(&queued.action_id)),
                        ),
                    });
                    report.failed.push(FailedAction {
                        action_id: queued.action_id,
                        reason: err.to_string(),
                    });
                }
            }
            if state.ending.is_some() {
                break;
            }
        }

        if let Some(ending) = state.ending.clone() {
            self.finish(state, ending.clone());
            report.ending = Some(ending);
            self.notify_state(state);
            return Ok(report);
        }

        let mut rng = state.rng.clone();
        report.rival = self.rival.compute_rival_contribution(state, &mut rng);
        state.rng = rng;
        for note in &report.rival.notes {
            state.push_log(note.clone());
        }

        let staff = state.staff_summary(&cfg.staff);
        let inputs = DoomInputs::from_staff(&staff, report.rival.doom);
        let doom = state.doom.recompute(&inputs, &cfg.doom);
        log::debug!(
            "turn {}: doom {:.2} -> {:.2} (raw {:+.2}, momentum {:+.2})",
            state.turn,
            doom.doom_before,
            doom.doom_after,
            doom.raw_change,
            doom.momentum_after
        );
        state.push_log(format!("{LOG_DOOM_RECOMPUTE}:{:.2}", doom.doom_after));
        report.doom = Some(doom);

        if doom.doom_after <= DOOM_MIN {
            self.finish(state, Ending::DoomAverted);
        } else if doom.doom_after >= DOOM_MAX {
            self.finish(state, Ending::DoomReached);
        } else {
            self.set_phase(state, Phase::TurnStart);
        }
        report.ending = state.ending.clone();
        self.notify_state(state);
        Ok(report)
    }

    /// Resolve one pending event with the given option.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] outside `EventResolution`, for unknown or
    /// non-pending ids, or when the option cannot be paid for.
    pub fn resolve_event(
        &mut self,
        state: &mut SessionState,
        event_id: &str,
        option_id: &str,
    ) -> Result<Resolution, ValidationError> {
        let data = Arc::clone(&self.data);
        let checked = Self::require_phase(state, "resolve_event", Phase::EventResolution)
            .and_then(|()| {
                data.event(event_id)
                    .ok_or_else(|| ValidationError::UnknownEvent(event_id.to_string()))
            })
            .and_then(|event| {
                let position = state
                    .pending_events
                    .iter()
                    .position(|p| p.event_id == event_id)
                    .ok_or_else(|| ValidationError::EventNotPending(event_id.to_string()))?;
                let option = event.option(option_id).ok_or_else(|| ValidationError::UnknownOption {
                    event: event_id.to_string(),
                    option: option_id.to_string(),
                })?;
                Ok((event, option, position))
            });
        let (event, option, position) = match checked {
            Ok(found) => found,
            Err(err) => return self.reject(state, Some(event_id), err),
        };

        let resolution = match transact(state, |scratch| {
            let resolution = resolve_option(scratch, event, option)?;
            scratch.pending_events.remove(position);
            Ok(resolution)
        }) {
            Ok(resolution) => resolution,
            Err(err) => return self.reject(state, Some(event_id), err),
        };
        state.push_log(format!("{LOG_EVENT_RESOLVED}:{event_id}.{option_id}"));
        log::debug!("resolved {event_id} with {option_id}: {}", resolution.message);

        if let Some(ending) = state.ending.clone() {
            self.finish(state, ending);
        } else if state.pending_events.is_empty() {
            self.enter_action_selection(state);
        }
        self.notify_state(state);
        Ok(resolution)
    }
}

/// Run `f` on a copy of the state and commit only on success.
fn transact<T>(
    state: &mut SessionState,
    f: impl FnOnce(&mut SessionState) -> Result<T, ValidationError>,
) -> Result<T, ValidationError> {
    let mut scratch = state.clone();
    let value = f(&mut scratch)?;
    *state = scratch;
    Ok(value)
}
