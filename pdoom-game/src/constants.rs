//! Centralized balance and tuning constants for the P(Doom) simulation core.
//!
//! These values define the deterministic math for the core simulation and
//! seed the serde defaults in [`crate::config`]. Catalog content (action
//! costs, event text) lives in JSON data instead.

// Doom momentum -------------------------------------------------------------
pub(crate) const DOOM_MIN: f64 = 0.0;
pub(crate) const DOOM_MAX: f64 = 100.0;
pub(crate) const DOOM_STARTING: f64 = 50.0;
pub(crate) const DOOM_BASE_DRIFT: f64 = 1.0;
pub(crate) const DOOM_CAPABILITY_RATE: f64 = 3.0;
pub(crate) const DOOM_SAFETY_RATE: f64 = -3.5;
pub(crate) const DOOM_UNPRODUCTIVE_RATE: f64 = 0.5;
pub(crate) const DOOM_ACCUMULATION_RATE: f64 = 0.15;
pub(crate) const DOOM_DECAY_RATE: f64 = 0.92;
pub(crate) const DOOM_MOMENTUM_CAP: f64 = 8.0;
pub(crate) const DOOM_VELOCITY_RETENTION: f64 = 0.7;

// Velocity cut-offs for trend labels.
pub(crate) const TREND_STRONG_DECREASE: f64 = -3.0;
pub(crate) const TREND_DECREASE: f64 = -0.5;
pub(crate) const TREND_INCREASE: f64 = 0.5;
pub(crate) const TREND_STRONG_INCREASE: f64 = 3.0;

// Risk pools ----------------------------------------------------------------
pub(crate) const RISK_MIN: f64 = 0.0;
pub(crate) const RISK_MAX: f64 = 100.0;
pub(crate) const RISK_HISTORY_WINDOW: usize = 10;
pub(crate) const RISK_PASSIVE_DECAY: f64 = 0.0;

// Staff ---------------------------------------------------------------------
pub(crate) const SKILL_MIN: u8 = 1;
pub(crate) const SKILL_MAX: u8 = 10;
pub(crate) const HIRE_SKILL: u8 = 3;
pub(crate) const HIRE_LOYALTY: f64 = 60.0;
pub(crate) const BURNOUT_MAX: f64 = 100.0;
pub(crate) const LOYALTY_MAX: f64 = 100.0;
pub(crate) const BASE_MANAGEMENT_CAPACITY: usize = 9;
pub(crate) const STAFF_PER_MANAGER: usize = 9;
pub(crate) const BURNOUT_PER_TURN: f64 = 2.0;
pub(crate) const SKILL_GROWTH_CHANCE: f64 = 0.10;
pub(crate) const RESEARCH_PER_SKILL: f64 = 0.5;
pub(crate) const LOYALTY_FAIR_PAY_GAIN: f64 = 1.0;
pub(crate) const LOYALTY_UNDERPAY_RATE: f64 = 10.0;

// Trait modifiers -----------------------------------------------------------
pub(crate) const WORKAHOLIC_OUTPUT: f64 = 1.25;
pub(crate) const WORKAHOLIC_BURNOUT: f64 = 1.5;
pub(crate) const MERCENARY_SALARY_SENSITIVITY: f64 = 2.0;
pub(crate) const RECKLESS_DOOM: f64 = 0.5;
pub(crate) const CAUTIOUS_DOOM: f64 = -0.25;
pub(crate) const MENTOR_SKILL_BONUS: f64 = 0.10;

// Action points -------------------------------------------------------------
pub(crate) const BASE_ACTION_POINTS: u32 = 3;
pub(crate) const ACTION_POINTS_PER_STAFF: f64 = 0.5;

// Starting conditions -------------------------------------------------------
pub(crate) const STARTING_MONEY: f64 = 60_000.0;
pub(crate) const STARTING_COMPUTE: f64 = 10.0;
pub(crate) const STARTING_REPUTATION: f64 = 50.0;

// Session bookkeeping -------------------------------------------------------
pub(crate) const TURN_LOG_WINDOW: usize = 64;
pub(crate) const RECORD_SCHEMA_VERSION: u32 = 1;

// Logging keys --------------------------------------------------------------
pub(crate) const LOG_TURN_START: &str = "log.turn.start";
pub(crate) const LOG_SALARIES: &str = "log.turn.salaries";
pub(crate) const LOG_BANKRUPT: &str = "log.turn.bankrupt";
pub(crate) const LOG_ACTION_APPLIED: &str = "log.action.applied";
pub(crate) const LOG_ACTION_FAILED: &str = "log.action.failed";
pub(crate) const LOG_EVENT_RESOLVED: &str = "log.event.resolved";
pub(crate) const LOG_DOOM_RECOMPUTE: &str = "log.doom.recompute";
pub(crate) const LOG_GAME_OVER: &str = "log.game.over";
