//! Catalog records: player actions, events, and per-pool risk event tables.
//!
//! Catalogs are plain JSON validated once at load time; the engine only ever
//! sees the typed records below.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::economy::{ResourceCost, ResourceKind};
use crate::researcher::{ResearcherTrait, Specialization};
use crate::risk::{RiskPoolId, RiskSeverity};

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

const fn default_ap_cost() -> u32 {
    1
}

/// Errors found while loading or validating a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog JSON error: {0}")]
    Parse(String),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("event `{0}` has no options")]
    NoOptions(String),
    #[error("event `{event}` repeats option id `{option}`")]
    DuplicateOption { event: String, option: String },
    #[error("`{0}` declares a negative or non-finite cost")]
    InvalidCost(String),
    #[error("event `{0}` has a random chance outside [0, 1]")]
    InvalidChance(String),
    #[error("risk table `{pool}` references unknown event `{id}`")]
    UnknownTableEvent { pool: RiskPoolId, id: String },
    #[error("risk table `{pool}` references `{id}`, which is not a risk event")]
    NotRiskEvent { pool: RiskPoolId, id: String },
}

/// Live session value a condition can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Turn,
    Resource(ResourceKind),
    Doom,
    Staff,
    SafetyStaff,
    CapabilityStaff,
    Managers,
    UnproductiveStaff,
    MaxBurnout,
    MinLoyalty,
    Risk(RiskPoolId),
}

impl StateField {
    /// Fields read off individual researchers. They have no value for an
    /// empty roster.
    #[must_use]
    pub const fn is_roster_aggregate(self) -> bool {
        matches!(self, Self::MaxBurnout | Self::MinLoyalty)
    }

    fn parse(name: &str) -> Option<Self> {
        if let Some(pool) = name.strip_prefix("risk.") {
            return pool.parse().ok().map(Self::Risk);
        }
        if let Ok(kind) = name.parse::<ResourceKind>() {
            return Some(Self::Resource(kind));
        }
        Some(match name {
            "turn" => Self::Turn,
            "doom" => Self::Doom,
            "staff" => Self::Staff,
            "safety_staff" => Self::SafetyStaff,
            "capability_staff" => Self::CapabilityStaff,
            "managers" => Self::Managers,
            "unproductive_staff" => Self::UnproductiveStaff,
            "max_burnout" => Self::MaxBurnout,
            "min_loyalty" => Self::MinLoyalty,
            _ => return None,
        })
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turn => f.write_str("turn"),
            Self::Resource(kind) => f.write_str(kind.as_str()),
            Self::Doom => f.write_str("doom"),
            Self::Staff => f.write_str("staff"),
            Self::SafetyStaff => f.write_str("safety_staff"),
            Self::CapabilityStaff => f.write_str("capability_staff"),
            Self::Managers => f.write_str("managers"),
            Self::UnproductiveStaff => f.write_str("unproductive_staff"),
            Self::MaxBurnout => f.write_str("max_burnout"),
            Self::MinLoyalty => f.write_str("min_loyalty"),
            Self::Risk(pool) => write!(f, "risk.{pool}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
}

impl Comparison {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
        }
    }

    fn parse(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            _ => return None,
        })
    }

    #[must_use]
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// `field op value` predicate, written in JSON as e.g. `"money < 10000"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub field: StateField,
    pub op: Comparison,
    pub value: f64,
}

fn condition_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^\s*([a-z_]+(?:\.[a-z_]+)?)\s*(<=|>=|==|<|>)\s*(-?\d+(?:\.\d+)?)\s*$").ok()
        })
        .as_ref()
}

impl Condition {
    /// Evaluate against a field lookup.
    pub fn evaluate(&self, lookup: impl Fn(StateField) -> f64) -> bool {
        self.op.holds(lookup(self.field), self.value)
    }
}

impl TryFrom<String> for Condition {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let pattern = condition_pattern().ok_or_else(|| String::from("condition grammar"))?;
        let caps = pattern
            .captures(&raw)
            .ok_or_else(|| format!("malformed condition `{raw}`"))?;
        let field = StateField::parse(&caps[1])
            .ok_or_else(|| format!("unknown field `{}` in `{raw}`", &caps[1]))?;
        let op = Comparison::parse(&caps[2]).ok_or_else(|| format!("bad operator in `{raw}`"))?;
        let value = caps[3]
            .parse::<f64>()
            .map_err(|err| format!("bad value in `{raw}`: {err}"))?;
        Ok(Self { field, op, value })
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.symbol(), self.value)
    }
}

/// When a catalog event becomes pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Exactly on this turn.
    Turn { turn: u32 },
    Threshold { condition: Condition },
    /// One draw per evaluation, taken only while every precondition holds.
    Random {
        chance: f64,
        #[serde(default)]
        requires: Vec<Condition>,
    },
    /// Only reachable through a risk pool table.
    Risk,
}

/// Single mutation applied by an action or event option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Resource {
        resource: ResourceKind,
        amount: f64,
    },
    Doom {
        amount: f64,
        #[serde(default)]
        label: Option<String>,
    },
    Risk {
        pool: RiskPoolId,
        amount: f64,
    },
    /// Hire one researcher; without a fixed specialization the action
    /// parameters must name one.
    Hire {
        #[serde(default)]
        specialization: Option<Specialization>,
    },
    /// Dismiss the researcher named by the action parameters.
    Dismiss,
    Burnout {
        amount: f64,
    },
    Loyalty {
        amount: f64,
    },
    SalaryRaise {
        percent: f64,
    },
    /// The least loyal researcher leaves.
    Poach,
    AddTrait {
        #[serde(rename = "trait")]
        researcher_trait: ResearcherTrait,
    },
    Victory {
        reason: String,
    },
    Defeat {
        reason: String,
    },
}

impl Effect {
    /// Whether the effect needs a specific researcher or specialization
    /// supplied by the caller.
    #[must_use]
    pub const fn needs_params(&self) -> bool {
        matches!(self, Self::Hire { specialization: None } | Self::Dismiss)
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Resource { amount, .. }
            | Self::Doom { amount, .. }
            | Self::Risk { amount, .. }
            | Self::Burnout { amount }
            | Self::Loyalty { amount } => amount.is_finite(),
            Self::SalaryRaise { percent } => percent.is_finite(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_ap_cost")]
    pub ap_cost: u32,
    #[serde(default)]
    pub costs: ResourceCost,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub requires: Vec<Condition>,
    /// Shown after a successful application.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub costs: ResourceCost,
    /// AP drawn from the event reserve first, then from available AP.
    #[serde(default)]
    pub event_ap: u32,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub repeatable: bool,
    pub options: Vec<EventOption>,
}

impl EventDef {
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&EventOption> {
        self.options.iter().find(|opt| opt.id == id)
    }
}

/// Event ids grouped by severity for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RiskEventTable {
    #[serde(default)]
    pub minor: Vec<String>,
    #[serde(default)]
    pub moderate: Vec<String>,
    #[serde(default)]
    pub major: Vec<String>,
    #[serde(default)]
    pub critical: Vec<String>,
}

impl RiskEventTable {
    #[must_use]
    pub fn entries(&self, severity: RiskSeverity) -> &[String] {
        match severity {
            RiskSeverity::Minor => &self.minor,
            RiskSeverity::Moderate => &self.moderate,
            RiskSeverity::Major => &self.major,
            RiskSeverity::Critical => &self.critical,
        }
    }

    fn all(&self) -> impl Iterator<Item = &String> {
        self.minor
            .iter()
            .chain(&self.moderate)
            .chain(&self.major)
            .chain(&self.critical)
    }
}

/// Complete validated catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GameData {
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub risk_tables: BTreeMap<RiskPoolId, RiskEventTable>,
}

impl GameData {
    /// Create empty catalog data (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is inconsistent.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: Self =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Parse the catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails validation.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG_DATA)
    }

    /// Shared handle to the bundled catalog, parsed once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails validation.
    pub fn bundled() -> Result<Arc<Self>, CatalogError> {
        static CATALOG: OnceLock<Result<Arc<GameData>, CatalogError>> = OnceLock::new();
        CATALOG
            .get_or_init(|| Self::load_from_static().map(Arc::new))
            .clone()
    }

    /// Check id uniqueness, option shapes, costs, and table references.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for action in &self.actions {
            if !seen.insert(action.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "action",
                    id: action.id.clone(),
                });
            }
            if !action.costs.is_valid() || !action.effects.iter().all(Effect::is_finite) {
                return Err(CatalogError::InvalidCost(action.id.clone()));
            }
        }

        let mut seen = BTreeSet::new();
        for event in &self.events {
            if !seen.insert(event.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "event",
                    id: event.id.clone(),
                });
            }
            if event.options.is_empty() {
                return Err(CatalogError::NoOptions(event.id.clone()));
            }
            if let Trigger::Random { chance, .. } = event.trigger
                && !(0.0..=1.0).contains(&chance)
            {
                return Err(CatalogError::InvalidChance(event.id.clone()));
            }
            let mut option_ids = BTreeSet::new();
            for option in &event.options {
                if !option_ids.insert(option.id.as_str()) {
                    return Err(CatalogError::DuplicateOption {
                        event: event.id.clone(),
                        option: option.id.clone(),
                    });
                }
                if !option.costs.is_valid() || !option.effects.iter().all(Effect::is_finite) {
                    return Err(CatalogError::InvalidCost(format!("{}.{}", event.id, option.id)));
                }
            }
        }

        for (pool, table) in &self.risk_tables {
            for id in table.all() {
                match self.event(id) {
                    None => {
                        return Err(CatalogError::UnknownTableEvent {
                            pool: *pool,
                            id: id.clone(),
                        });
                    }
                    Some(event) if event.trigger != Trigger::Risk => {
                        return Err(CatalogError::NotRiskEvent {
                            pool: *pool,
                            id: id.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn action(&self, id: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|action| action.id == id)
    }

    #[must_use]
    pub fn event(&self, id: &str) -> Option<&EventDef> {
        self.events.iter().find(|event| event.id == id)
    }

    #[must_use]
    pub fn risk_table(&self, pool: RiskPoolId) -> Option<&RiskEventTable> {
        self.risk_tables.get(&pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_parse_and_print() {
        let cond: Condition = serde_json::from_str(r#""money < 10000""#).unwrap();
        assert_eq!(cond.field, StateField::Resource(ResourceKind::Money));
        assert_eq!(cond.op, Comparison::Lt);
        assert_eq!(cond.to_string(), "money < 10000");

        let cond: Condition = serde_json::from_str(r#""risk.public_scandal>=75.5""#).unwrap();
        assert_eq!(cond.field, StateField::Risk(RiskPoolId::PublicScandal));
        assert!(cond.evaluate(|_| 80.0));
        assert!(!cond.evaluate(|_| 75.0));

        assert!(serde_json::from_str::<Condition>(r#""vibes > 3""#).is_err());
        assert!(serde_json::from_str::<Condition>(r#""doom ~ 3""#).is_err());
    }

    #[test]
    fn bundled_catalog_validates() {
        let data = GameData::load_from_static().unwrap();
        assert!(data.action("hire_researcher").is_some());
        assert!(!data.events.is_empty());
        for pool in RiskPoolId::ALL {
            assert!(data.risk_table(pool).is_some(), "missing table for {pool}");
        }
        assert!(GameData::bundled().is_ok());
    }

    #[test]
    fn validation_rejects_bad_tables_and_duplicates() {
        let dup = r#"{"actions": [
            {"id": "a", "name": "A"}, {"id": "a", "name": "B"}
        ]}"#;
        assert_eq!(
            GameData::from_json(dup),
            Err(CatalogError::DuplicateId {
                kind: "action",
                id: "a".into()
            })
        );

        let table = r#"{
            "events": [{"id": "e", "name": "E", "trigger": {"kind": "turn", "turn": 2},
                        "options": [{"id": "ok", "label": "OK"}]}],
            "risk_tables": {"safety_debt": {"minor": ["e"]}}
        }"#;
        assert!(matches!(
            GameData::from_json(table),
            Err(CatalogError::NotRiskEvent { .. })
        ));

        let chance = r#"{"events": [{"id": "e", "name": "E",
            "trigger": {"kind": "random", "chance": 1.5},
            "options": [{"id": "ok", "label": "OK"}]}]}"#;
        assert_eq!(
            GameData::from_json(chance),
            Err(CatalogError::InvalidChance("e".into()))
        );
    }

    #[test]
    fn effects_parse_from_tagged_json() {
        let json = r#"[
            {"kind": "resource", "resource": "money", "amount": -500},
            {"kind": "hire"},
            {"kind": "add_trait", "trait": "mentor"},
            {"kind": "victory", "reason": "treaty"}
        ]"#;
        let effects: Vec<Effect> = serde_json::from_str(json).unwrap();
        assert!(effects[1].needs_params());
        assert_eq!(
            effects[2],
            Effect::AddTrait {
                researcher_trait: ResearcherTrait::Mentor
            }
        );
    }
}
