use std::hash::Hasher;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use pdoom_game::{
    ActionParams, EventPresentation, GameData, GameSession, Phase, RivalLabs, SessionState,
    SimConfig,
};
use twox_hash::XxHash64;

use crate::logic::policy::{GameplayStrategy, PlayerPolicy, PolicyDecision};

/// Zero-cost action queued when a policy leaves the turn empty.
const HOLD_ACTION: &str = "hold_position";

/// Configuration for a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: String,
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            strategy,
            max_turns: 60,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Snapshot of a resolved event.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub turn: u32,
    pub event_id: String,
    pub event_name: String,
    pub option_id: String,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Result of advancing the simulation by one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: u32,
    pub doom: f64,
    /// Doom change applied by the recompute, absent when the turn ended early.
    pub doom_change: Option<f64>,
    pub money: f64,
    pub staff: usize,
    pub applied: Vec<String>,
    pub failed: Vec<String>,
    /// Selections the controller refused.
    pub rejected: usize,
    pub decisions: Vec<DecisionRecord>,
    pub game_ended: bool,
    /// xxhash64 of the persistence record after the turn.
    pub digest: u64,
    /// Invariant violation reported by state validation, if any.
    pub violation: Option<String>,
}

/// Hash of a persistence record, used to compare runs cheaply.
#[must_use]
pub fn record_digest(record: &serde_json::Value) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(record.to_string().as_bytes());
    hasher.finish()
}

/// Core deterministic simulation harness used by the tester.
#[derive(Debug)]
pub struct SimulationSession {
    session: GameSession,
    max_turns: u32,
}

impl SimulationSession {
    #[must_use]
    pub fn new(config: &SimulationConfig, data: Arc<GameData>, sim: SimConfig) -> Self {
        let session =
            GameSession::new(&config.seed, data, sim, Box::new(RivalLabs::default()));
        Self {
            session,
            max_turns: config.max_turns,
        }
    }

    /// Rebuild a session from a persistence record taken earlier.
    ///
    /// # Errors
    ///
    /// Returns an error when the record fails schema or invariant checks.
    pub fn restore(
        config: &SimulationConfig,
        record: &serde_json::Value,
        data: Arc<GameData>,
        sim: SimConfig,
    ) -> Result<Self> {
        let session = GameSession::from_record(record, data, sim, Box::new(RivalLabs::default()))
            .context("restoring session record")?;
        Ok(Self {
            session,
            max_turns: config.max_turns,
        })
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.session.into_state()
    }

    /// # Errors
    ///
    /// Returns an error when the state cannot be serialised.
    pub fn to_record(&self) -> Result<serde_json::Value> {
        Ok(self.session.to_record()?)
    }

    /// Play one full turn: start, resolve events, queue the policy's plan,
    /// execute.
    ///
    /// # Errors
    ///
    /// Returns an error when the controller refuses a call the harness
    /// relies on, or when no option of a pending event can be resolved.
    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> Result<TurnOutcome> {
        let turn = self.session.start_turn()?.turn;
        let mut decisions = Vec::new();
        self.resolve_events(turn, policy, &mut decisions)?;

        if self.session.state().is_over() {
            self.session.drain_notifications();
            return self.outcome(turn, decisions, None, Vec::new(), Vec::new(), 0);
        }

        let plan = {
            let available = self.session.available_actions();
            policy.plan_turn(self.session.state(), &available)
        };
        let mut rejected = 0;
        for (action_id, params) in plan.actions {
            if self.session.select_action(&action_id, params).is_err() {
                rejected += 1;
            }
        }
        if plan.reserve > 0 && self.session.reserve_action_points(plan.reserve).is_err() {
            rejected += 1;
        }
        if self.session.state().queued_actions.is_empty() {
            self.session
                .select_action(HOLD_ACTION, ActionParams::default())
                .with_context(|| format!("turn {turn}: cannot queue {HOLD_ACTION}"))?;
        }

        let report = self.session.execute_turn()?;
        self.session.drain_notifications();
        let failed = report.failed.into_iter().map(|f| f.action_id).collect();
        self.outcome(
            turn,
            decisions,
            report.doom.map(|d| d.total_change),
            report.applied,
            failed,
            rejected,
        )
    }

    fn resolve_events(
        &mut self,
        turn: u32,
        policy: &mut dyn PlayerPolicy,
        decisions: &mut Vec<DecisionRecord>,
    ) -> Result<()> {
        while self.session.state().phase == Phase::EventResolution {
            let Some(pending) = self.session.state().pending_events.front().cloned() else {
                break;
            };
            let event = self
                .session
                .controller()
                .data()
                .event(&pending.event_id)
                .cloned()
                .with_context(|| format!("pending event {} is not in the catalog", pending.event_id))?;
            let presentation = EventPresentation::new(self.session.state(), &event, pending.source);
            let mut decision = policy.pick_option(self.session.state(), &event, &presentation);

            if self
                .session
                .resolve_event(&event.id, &decision.option_id)
                .is_err()
            {
                let fallback = event
                    .options
                    .iter()
                    .find(|option| self.session.resolve_event(&event.id, &option.id).is_ok());
                let Some(option) = fallback else {
                    bail!("turn {turn}: no option of {} could be resolved", event.id);
                };
                log::debug!(
                    "{} picked unresolvable {}.{}, fell back to {}",
                    policy.name(),
                    event.id,
                    decision.option_id,
                    option.id
                );
                decision = PolicyDecision::new(option.id.clone(), Some(String::from("fallback")));
            }

            decisions.push(DecisionRecord {
                turn,
                event_id: event.id.clone(),
                event_name: event.name.clone(),
                option_id: decision.option_id,
                policy_name: policy.name().to_string(),
                rationale: decision.rationale,
            });
        }
        Ok(())
    }

    fn outcome(
        &self,
        turn: u32,
        decisions: Vec<DecisionRecord>,
        doom_change: Option<f64>,
        applied: Vec<String>,
        failed: Vec<String>,
        rejected: usize,
    ) -> Result<TurnOutcome> {
        let state = self.session.state();
        let controller = self.session.controller();
        let violation = state
            .validate(controller.data(), controller.config())
            .err()
            .map(|err| err.to_string());
        Ok(TurnOutcome {
            turn,
            doom: state.doom(),
            doom_change,
            money: state.resources.money,
            staff: state.researchers.len(),
            applied,
            failed,
            rejected,
            decisions,
            game_ended: state.is_over() || turn >= self.max_turns,
            digest: record_digest(&self.to_record()?),
            violation,
        })
    }
}
