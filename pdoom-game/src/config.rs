//! Tunable simulation configuration.
//!
//! Every field carries a serde default drawn from [`crate::constants`], so an
//! empty JSON object yields the reference balance. [`SimConfig::validate`]
//! enforces the numeric invariants the turn engine relies on.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::researcher::Specialization;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("invalid configuration JSON: {0}")]
    Parse(String),
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value < min || value > max {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

/// Doom momentum parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoomConfig {
    #[serde(default = "DoomConfig::default_starting_doom")]
    pub starting_doom: f64,
    #[serde(default = "DoomConfig::default_base_drift")]
    pub base_drift: f64,
    #[serde(default = "DoomConfig::default_capability_rate")]
    pub capability_rate: f64,
    #[serde(default = "DoomConfig::default_safety_rate")]
    pub safety_rate: f64,
    #[serde(default = "DoomConfig::default_unproductive_rate")]
    pub unproductive_rate: f64,
    #[serde(default = "DoomConfig::default_accumulation_rate")]
    pub accumulation_rate: f64,
    #[serde(default = "DoomConfig::default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "DoomConfig::default_momentum_cap")]
    pub momentum_cap: f64,
    #[serde(default = "DoomConfig::default_velocity_retention")]
    pub velocity_retention: f64,
}

impl DoomConfig {
    const fn default_starting_doom() -> f64 {
        constants::DOOM_STARTING
    }

    const fn default_base_drift() -> f64 {
        constants::DOOM_BASE_DRIFT
    }

    const fn default_capability_rate() -> f64 {
        constants::DOOM_CAPABILITY_RATE
    }

    const fn default_safety_rate() -> f64 {
        constants::DOOM_SAFETY_RATE
    }

    const fn default_unproductive_rate() -> f64 {
        constants::DOOM_UNPRODUCTIVE_RATE
    }

    const fn default_accumulation_rate() -> f64 {
        constants::DOOM_ACCUMULATION_RATE
    }

    const fn default_decay_rate() -> f64 {
        constants::DOOM_DECAY_RATE
    }

    const fn default_momentum_cap() -> f64 {
        constants::DOOM_MOMENTUM_CAP
    }

    const fn default_velocity_retention() -> f64 {
        constants::DOOM_VELOCITY_RETENTION
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "doom.starting_doom",
            self.starting_doom,
            constants::DOOM_MIN,
            constants::DOOM_MAX,
        )?;
        check_range("doom.accumulation_rate", self.accumulation_rate, 0.0, 1.0)?;
        check_range("doom.decay_rate", self.decay_rate, 0.0, 1.0)?;
        check_range("doom.velocity_retention", self.velocity_retention, 0.0, 1.0)?;
        check_min("doom.momentum_cap", self.momentum_cap, 0.0)?;
        check_min("doom.unproductive_rate", self.unproductive_rate, 0.0)?;
        for (field, value) in [
            ("doom.base_drift", self.base_drift),
            ("doom.capability_rate", self.capability_rate),
            ("doom.safety_rate", self.safety_rate),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        Ok(())
    }
}

impl Default for DoomConfig {
    fn default() -> Self {
        Self {
            starting_doom: Self::default_starting_doom(),
            base_drift: Self::default_base_drift(),
            capability_rate: Self::default_capability_rate(),
            safety_rate: Self::default_safety_rate(),
            unproductive_rate: Self::default_unproductive_rate(),
            accumulation_rate: Self::default_accumulation_rate(),
            decay_rate: Self::default_decay_rate(),
            momentum_cap: Self::default_momentum_cap(),
            velocity_retention: Self::default_velocity_retention(),
        }
    }
}

/// Risk pool parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Amount subtracted from every pool at the start of each turn.
    /// Zero means pools only fall through explicit reductions.
    #[serde(default = "RiskConfig::default_passive_decay")]
    pub passive_decay: f64,
    #[serde(default = "RiskConfig::default_history_window")]
    pub history_window: usize,
}

impl RiskConfig {
    const fn default_passive_decay() -> f64 {
        constants::RISK_PASSIVE_DECAY
    }

    const fn default_history_window() -> usize {
        constants::RISK_HISTORY_WINDOW
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "risk.passive_decay",
            self.passive_decay,
            0.0,
            constants::RISK_MAX,
        )
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            passive_decay: Self::default_passive_decay(),
            history_window: Self::default_history_window(),
        }
    }
}

/// Staff behaviour parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffConfig {
    /// Head count covered before any manager is hired.
    #[serde(default = "StaffConfig::default_base_management_capacity")]
    pub base_management_capacity: usize,
    #[serde(default = "StaffConfig::default_staff_per_manager")]
    pub staff_per_manager: usize,
    #[serde(default = "StaffConfig::default_burnout_per_turn")]
    pub burnout_per_turn: f64,
    #[serde(default = "StaffConfig::default_skill_growth_chance")]
    pub skill_growth_chance: f64,
    #[serde(default = "StaffConfig::default_research_per_skill")]
    pub research_per_skill: f64,
    #[serde(default = "StaffConfig::default_loyalty_fair_pay_gain")]
    pub loyalty_fair_pay_gain: f64,
    #[serde(default = "StaffConfig::default_loyalty_underpay_rate")]
    pub loyalty_underpay_rate: f64,
}

impl StaffConfig {
    const fn default_base_management_capacity() -> usize {
        constants::BASE_MANAGEMENT_CAPACITY
    }

    const fn default_staff_per_manager() -> usize {
        constants::STAFF_PER_MANAGER
    }

    const fn default_burnout_per_turn() -> f64 {
        constants::BURNOUT_PER_TURN
    }

    const fn default_skill_growth_chance() -> f64 {
        constants::SKILL_GROWTH_CHANCE
    }

    const fn default_research_per_skill() -> f64 {
        constants::RESEARCH_PER_SKILL
    }

    const fn default_loyalty_fair_pay_gain() -> f64 {
        constants::LOYALTY_FAIR_PAY_GAIN
    }

    const fn default_loyalty_underpay_rate() -> f64 {
        constants::LOYALTY_UNDERPAY_RATE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_min("staff.burnout_per_turn", self.burnout_per_turn, 0.0)?;
        check_range(
            "staff.skill_growth_chance",
            self.skill_growth_chance,
            0.0,
            1.0,
        )?;
        check_min("staff.research_per_skill", self.research_per_skill, 0.0)?;
        check_min("staff.loyalty_fair_pay_gain", self.loyalty_fair_pay_gain, 0.0)?;
        check_min("staff.loyalty_underpay_rate", self.loyalty_underpay_rate, 0.0)
    }
}

impl Default for StaffConfig {
    fn default() -> Self {
        Self {
            base_management_capacity: Self::default_base_management_capacity(),
            staff_per_manager: Self::default_staff_per_manager(),
            burnout_per_turn: Self::default_burnout_per_turn(),
            skill_growth_chance: Self::default_skill_growth_chance(),
            research_per_skill: Self::default_research_per_skill(),
            loyalty_fair_pay_gain: Self::default_loyalty_fair_pay_gain(),
            loyalty_underpay_rate: Self::default_loyalty_underpay_rate(),
        }
    }
}

/// Action-point scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "EconomyConfig::default_base_ap")]
    pub base_ap: u32,
    #[serde(default = "EconomyConfig::default_ap_per_staff")]
    pub ap_per_staff: f64,
}

impl EconomyConfig {
    const fn default_base_ap() -> u32 {
        constants::BASE_ACTION_POINTS
    }

    const fn default_ap_per_staff() -> f64 {
        constants::ACTION_POINTS_PER_STAFF
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_min("economy.ap_per_staff", self.ap_per_staff, 0.0)
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_ap: Self::default_base_ap(),
            ap_per_staff: Self::default_ap_per_staff(),
        }
    }
}

/// Block of identical starting hires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingHire {
    pub specialization: Specialization,
    #[serde(default = "StartingHire::default_count")]
    pub count: u32,
}

impl StartingHire {
    const fn default_count() -> u32 {
        1
    }
}

/// Initial organisation for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartConfig {
    #[serde(default = "StartConfig::default_money")]
    pub money: f64,
    #[serde(default = "StartConfig::default_compute")]
    pub compute: f64,
    #[serde(default)]
    pub research: f64,
    #[serde(default)]
    pub papers: f64,
    #[serde(default = "StartConfig::default_reputation")]
    pub reputation: f64,
    #[serde(default = "StartConfig::default_staff")]
    pub staff: Vec<StartingHire>,
}

impl StartConfig {
    const fn default_money() -> f64 {
        constants::STARTING_MONEY
    }

    const fn default_compute() -> f64 {
        constants::STARTING_COMPUTE
    }

    const fn default_reputation() -> f64 {
        constants::STARTING_REPUTATION
    }

    fn default_staff() -> Vec<StartingHire> {
        vec![
            StartingHire {
                specialization: Specialization::Safety,
                count: 2,
            },
            StartingHire {
                specialization: Specialization::Capability,
                count: 1,
            },
        ]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_min("start.compute", self.compute, 0.0)?;
        check_min("start.research", self.research, 0.0)?;
        check_min("start.papers", self.papers, 0.0)?;
        check_min("start.reputation", self.reputation, 0.0)?;
        if !self.money.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "start.money",
            });
        }
        Ok(())
    }
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            money: Self::default_money(),
            compute: Self::default_compute(),
            research: 0.0,
            papers: 0.0,
            reputation: Self::default_reputation(),
            staff: Self::default_staff(),
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub doom: DoomConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub staff: StaffConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub start: StartConfig,
}

impl SimConfig {
    /// Parse and validate configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check numeric invariants across every section.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.doom.validate()?;
        self.risk.validate()?;
        self.staff.validate()?;
        self.economy.validate()?;
        self.start.validate()
    }
}
