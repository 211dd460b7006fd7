//! Session aggregate root and its persistence record.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use crate::config::{SimConfig, StaffConfig};
use crate::constants::{RECORD_SCHEMA_VERSION, TURN_LOG_WINDOW};
use crate::data::{Condition, GameData, StateField};
use crate::doom::DoomModel;
use crate::economy::{ActionPoints, ResourceKind, Resources};
use crate::effects::ActionParams;
use crate::error::{ErrorContext, SerializationError};
use crate::events::PendingEvent;
use crate::numbers::count_to_f64;
use crate::researcher::{Researcher, Specialization, StaffSummary, staff_action_points};
use crate::risk::RiskPools;
use crate::rng::GameRng;
use crate::seed::normalize_seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    TurnStart,
    ActionSelection,
    TurnProcessing,
    EventResolution,
    GameOver,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TurnStart => "turn_start",
            Self::ActionSelection => "action_selection",
            Self::TurnProcessing => "turn_processing",
            Self::EventResolution => "event_resolution",
            Self::GameOver => "game_over",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ending {
    /// Doom fell to zero.
    DoomAverted,
    /// Doom reached one hundred.
    DoomReached,
    Bankrupt { money: f64 },
    Victory { reason: String },
    Defeat { reason: String },
}

impl Ending {
    #[must_use]
    pub const fn is_victory(&self) -> bool {
        matches!(self, Self::DoomAverted | Self::Victory { .. })
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::DoomAverted => "doom_averted",
            Self::DoomReached => "doom_reached",
            Self::Bankrupt { .. } => "bankrupt",
            Self::Victory { .. } => "victory",
            Self::Defeat { .. } => "defeat",
        }
    }
}

/// Action waiting for turn execution. AP was committed at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action_id: String,
    #[serde(default)]
    pub params: ActionParams,
    pub ap_cost: u32,
}

/// Everything one game needs to continue: resources, staff, doom model, risk
/// pools, the RNG stream, and where the turn stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub seed: String,
    pub turn: u32,
    pub phase: Phase,
    pub resources: Resources,
    pub action_points: ActionPoints,
    #[serde(default)]
    pub queued_actions: Vec<QueuedAction>,
    #[serde(default)]
    pub pending_events: VecDeque<PendingEvent>,
    #[serde(default)]
    pub researchers: Vec<Researcher>,
    /// Non-repeatable event ids that have already been enqueued once.
    #[serde(default)]
    pub triggered_events: BTreeSet<String>,
    pub doom: DoomModel,
    pub risk: RiskPools,
    pub rng: GameRng,
    pub next_researcher_id: u32,
    #[serde(default)]
    pub ending: Option<Ending>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl SessionState {
    /// Fresh session at turn zero, waiting for the first `start_turn`.
    #[must_use]
    pub fn new(seed: &str, cfg: &SimConfig) -> Self {
        let seed = normalize_seed(seed);
        let start = &cfg.start;
        let mut state = Self {
            rng: GameRng::from_seed_str(&seed),
            seed,
            turn: 0,
            phase: Phase::TurnStart,
            resources: Resources {
                money: start.money,
                compute: start.compute,
                research: start.research,
                papers: start.papers,
                reputation: start.reputation,
            },
            action_points: ActionPoints::default(),
            queued_actions: Vec::new(),
            pending_events: VecDeque::new(),
            researchers: Vec::new(),
            triggered_events: BTreeSet::new(),
            doom: DoomModel::new(&cfg.doom),
            risk: RiskPools::default(),
            next_researcher_id: 1,
            ending: None,
            logs: vec![String::from("log.session.created")],
        };
        for block in &start.staff {
            for _ in 0..block.count {
                state.hire(block.specialization, None);
            }
        }
        state.action_points.total = state.action_point_total(cfg);
        state
    }

    /// Current doom, mirrored from the doom model.
    #[must_use]
    pub const fn doom(&self) -> f64 {
        self.doom.doom
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.ending.is_some()
    }

    #[must_use]
    pub fn staff_summary(&self, cfg: &StaffConfig) -> StaffSummary {
        StaffSummary::compute(&self.researchers, self.resources.compute, cfg)
    }

    /// Head count for one specialization, derived from the roster.
    #[must_use]
    pub fn count(&self, specialization: Specialization) -> usize {
        self.researchers
            .iter()
            .filter(|r| r.specialization == specialization)
            .count()
    }

    #[must_use]
    pub fn action_point_total(&self, cfg: &SimConfig) -> u32 {
        cfg.economy.base_ap.saturating_add(staff_action_points(
            self.researchers.len(),
            cfg.economy.ap_per_staff,
        ))
    }

    pub fn hire(&mut self, specialization: Specialization, name: Option<&str>) -> u32 {
        let id = self.next_researcher_id;
        self.next_researcher_id = self.next_researcher_id.saturating_add(1);
        self.researchers
            .push(Researcher::hire(id, specialization, name, self.turn));
        id
    }

    pub fn dismiss(&mut self, id: u32) -> Option<Researcher> {
        let idx = self.researchers.iter().position(|r| r.id == id)?;
        Some(self.researchers.remove(idx))
    }

    #[must_use]
    pub fn researcher(&self, id: u32) -> Option<&Researcher> {
        self.researchers.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn is_pending(&self, event_id: &str) -> bool {
        self.pending_events.iter().any(|p| p.event_id == event_id)
    }

    /// Append to the bounded turn log.
    pub fn push_log(&mut self, entry: impl Into<String>) {
        self.logs.push(entry.into());
        if self.logs.len() > TURN_LOG_WINDOW {
            let excess = self.logs.len() - TURN_LOG_WINDOW;
            self.logs.drain(..excess);
        }
    }

    #[must_use]
    pub fn field_value(&self, field: StateField, staff: &StaffSummary) -> f64 {
        match field {
            StateField::Turn => f64::from(self.turn),
            StateField::Resource(kind) => self.resources.get(kind),
            StateField::Doom => self.doom(),
            StateField::Staff => count_to_f64(staff.total),
            StateField::SafetyStaff => count_to_f64(staff.safety),
            StateField::CapabilityStaff => count_to_f64(staff.capability),
            StateField::Managers => count_to_f64(staff.managers),
            StateField::UnproductiveStaff => count_to_f64(staff.unproductive()),
            StateField::MaxBurnout => staff.max_burnout,
            StateField::MinLoyalty => staff.min_loyalty,
            StateField::Risk(pool) => self.risk.value(pool),
        }
    }

    /// First condition that does not hold, if any.
    ///
    /// Conditions on roster aggregates never hold while the roster is empty.
    #[must_use]
    pub fn failed_condition<'a>(
        &self,
        conditions: &'a [Condition],
        cfg: &StaffConfig,
    ) -> Option<&'a Condition> {
        if conditions.is_empty() {
            return None;
        }
        let staff = self.staff_summary(cfg);
        conditions
            .iter()
            .find(|cond| {
                (staff.total == 0 && cond.field.is_roster_aggregate())
                    || !cond.evaluate(|field| self.field_value(field, &staff))
            })
    }

    #[must_use]
    pub fn error_context(&self, id: Option<&str>) -> ErrorContext {
        ErrorContext {
            id: id.map(ToString::to_string),
            resources: self.resources,
            action_points: self.action_points,
            phase: self.phase,
            turn: self.turn,
        }
    }

    /// Serialize into the versioned persistence record.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be represented as JSON.
    pub fn to_record(&self) -> Result<serde_json::Value, SerializationError> {
        let mut record = serde_json::to_value(self)?;
        let object = record
            .as_object_mut()
            .ok_or_else(|| SerializationError::Invariant(String::from("state is not an object")))?;
        object.insert(
            String::from("schema_version"),
            serde_json::Value::from(RECORD_SCHEMA_VERSION),
        );
        Ok(record)
    }

    /// Restore a session from a record, checking schema, invariants, and
    /// catalog references.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] on any mismatch.
    pub fn from_record(
        record: &serde_json::Value,
        data: &GameData,
        cfg: &SimConfig,
    ) -> Result<Self, SerializationError> {
        let found = record
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| SerializationError::Json(String::from("missing schema_version")))?;
        if found != u64::from(RECORD_SCHEMA_VERSION) {
            return Err(SerializationError::SchemaVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: RECORD_SCHEMA_VERSION,
            });
        }
        let state: Self = serde_json::from_value(record.clone())?;
        state.validate(data, cfg)?;
        Ok(state)
    }

    /// Check every invariant a restored record must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant or unknown catalog reference.
    pub fn validate(&self, data: &GameData, cfg: &SimConfig) -> Result<(), SerializationError> {
        let invariant = |msg: &str| Err(SerializationError::Invariant(msg.to_string()));
        if !self.doom.is_within_bounds(&cfg.doom) {
            return invariant("doom or momentum out of range");
        }
        if !self.risk.is_within_bounds() {
            return invariant("risk pool out of range");
        }
        if !self.action_points.is_consistent() {
            return invariant("action points are inconsistent");
        }
        if ResourceKind::ALL.iter().any(|k| !self.resources.get(*k).is_finite()) {
            return invariant("resource is not finite");
        }
        if self.rng.seed() != self.seed {
            return invariant("rng seed does not match session seed");
        }
        let mut ids = BTreeSet::new();
        for researcher in &self.researchers {
            if !researcher.is_within_bounds() {
                return invariant("researcher field out of range");
            }
            if researcher.id >= self.next_researcher_id || !ids.insert(researcher.id) {
                return invariant("researcher ids are not unique");
            }
        }
        if self.phase == Phase::ActionSelection && !self.pending_events.is_empty() {
            return invariant("action selection with pending events");
        }
        if !self.queued_actions.is_empty() && self.phase != Phase::ActionSelection {
            return invariant("queued actions outside action selection");
        }
        if (self.phase == Phase::GameOver) != self.ending.is_some() {
            return invariant("ending and phase disagree");
        }
        for queued in &self.queued_actions {
            if data.action(&queued.action_id).is_none() {
                return Err(SerializationError::UnknownReference(queued.action_id.clone()));
            }
        }
        let event_refs = self
            .pending_events
            .iter()
            .map(|p| &p.event_id)
            .chain(self.triggered_events.iter());
        for id in event_refs {
            if data.event(id).is_none() {
                return Err(SerializationError::UnknownReference(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_uses_start_config() {
        let cfg = SimConfig::default();
        let state = SessionState::new("pd-oracle42", &cfg);
        assert_eq!(state.seed, "PD-ORACLE42");
        assert_eq!(state.turn, 0);
        assert_eq!(state.phase, Phase::TurnStart);
        assert_eq!(state.count(Specialization::Safety), 2);
        assert_eq!(state.count(Specialization::Capability), 1);
        assert_eq!(state.next_researcher_id, 4);
        assert_eq!(state.action_points.total, 4);
        assert!((state.doom() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn roster_conditions_fail_without_staff() {
        let mut cfg = SimConfig::default();
        cfg.start.staff.clear();
        let state = SessionState::new("S1", &cfg);
        let conditions: Vec<Condition> = ["min_loyalty < 30", "max_burnout < 50", "min_loyalty > 0"]
            .into_iter()
            .map(|raw| Condition::try_from(raw.to_string()).unwrap())
            .collect();
        for cond in &conditions {
            let failed = state.failed_condition(std::slice::from_ref(cond), &cfg.staff);
            assert_eq!(failed, Some(cond));
        }
        let staff_count = Condition::try_from("staff < 1".to_string()).unwrap();
        assert!(state.failed_condition(&[staff_count], &cfg.staff).is_none());
    }

    #[test]
    fn derived_counts_follow_the_roster() {
        let cfg = SimConfig::default();
        let mut state = SessionState::new("S1", &cfg);
        let id = state.hire(Specialization::Safety, Some("Ada"));
        assert_eq!(state.count(Specialization::Safety), 3);
        assert_eq!(state.researcher(id).map(|r| r.name.as_str()), Some("Ada"));
        state.dismiss(id);
        assert_eq!(state.count(Specialization::Safety), 2);
        assert_eq!(state.staff_summary(&cfg.staff).safety, 2);
        assert!(state.dismiss(999).is_none());
    }

    #[test]
    fn record_roundtrip_preserves_state() {
        let cfg = SimConfig::default();
        let data = GameData::empty();
        let mut state = SessionState::new("S1", &cfg);
        state.resources.money = 1234.567_891_234;
        let _ = state.rng.roll();
        let record = state.to_record().unwrap();
        assert_eq!(record["schema_version"], 1);
        let restored = SessionState::from_record(&record, &data, &cfg).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn record_rejects_bad_versions_and_ranges() {
        let cfg = SimConfig::default();
        let data = GameData::empty();
        let state = SessionState::new("S1", &cfg);

        let mut record = state.to_record().unwrap();
        record["schema_version"] = serde_json::json!(7);
        assert_eq!(
            SessionState::from_record(&record, &data, &cfg),
            Err(SerializationError::SchemaVersion {
                found: 7,
                expected: 1
            })
        );

        let mut record = state.to_record().unwrap();
        record["doom"]["doom"] = serde_json::json!(140.0);
        assert!(matches!(
            SessionState::from_record(&record, &data, &cfg),
            Err(SerializationError::Invariant(_))
        ));

        let mut record = state.to_record().unwrap();
        record["triggered_events"] = serde_json::json!(["ghost_event"]);
        assert_eq!(
            SessionState::from_record(&record, &data, &cfg),
            Err(SerializationError::UnknownReference("ghost_event".into()))
        );

        assert!(matches!(
            SessionState::from_record(&serde_json::json!({"schema_version": 1}), &data, &cfg),
            Err(SerializationError::Json(_))
        ));
    }

    #[test]
    fn turn_log_is_bounded() {
        let cfg = SimConfig::default();
        let mut state = SessionState::new("S1", &cfg);
        for idx in 0..200 {
            state.push_log(format!("entry {idx}"));
        }
        assert_eq!(state.logs.len(), TURN_LOG_WINDOW);
        assert_eq!(state.logs.last().map(String::as_str), Some("entry 199"));
    }
}
