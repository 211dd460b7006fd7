//! Doom momentum model.
//!
//! Doom is recomputed once per turn from a fixed set of signed sources. The
//! accumulated momentum from previous turns is applied on top of the raw
//! change before the momentum itself is updated, so spirals build over
//! consecutive turns.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::DoomConfig;
use crate::constants::{
    DOOM_MAX, DOOM_MIN, TREND_DECREASE, TREND_INCREASE, TREND_STRONG_DECREASE,
    TREND_STRONG_INCREASE,
};
use crate::numbers::{clamp_finite, count_to_f64};
use crate::researcher::StaffSummary;

/// Category of a doom contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoomSource {
    BaseDrift,
    Capability,
    Safety,
    Unproductive,
    Traits,
    Rival,
    Events,
}

/// Five-band classification of the smoothed velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoomTrend {
    StronglyDecreasing,
    Decreasing,
    #[default]
    Stable,
    Increasing,
    StronglyIncreasing,
}

impl DoomTrend {
    #[must_use]
    pub fn classify(velocity: f64) -> Self {
        if velocity <= TREND_STRONG_DECREASE {
            Self::StronglyDecreasing
        } else if velocity < TREND_DECREASE {
            Self::Decreasing
        } else if velocity <= TREND_INCREASE {
            Self::Stable
        } else if velocity < TREND_STRONG_INCREASE {
            Self::Increasing
        } else {
            Self::StronglyIncreasing
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StronglyDecreasing => "strongly decreasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
            Self::Increasing => "increasing",
            Self::StronglyIncreasing => "strongly increasing",
        }
    }
}

/// Inputs gathered by the orchestrator for one recompute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoomInputs {
    pub capability_heads: usize,
    pub productive_safety: usize,
    pub unproductive: usize,
    pub trait_doom: f64,
    pub rival: f64,
}

impl DoomInputs {
    #[must_use]
    pub const fn from_staff(staff: &StaffSummary, rival: f64) -> Self {
        Self {
            capability_heads: staff.capability_heads,
            productive_safety: staff.productive_safety,
            unproductive: staff.unproductive(),
            trait_doom: staff.trait_doom,
            rival,
        }
    }
}

/// Result of a single recompute, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DoomTurnReport {
    pub raw_change: f64,
    /// Momentum carried in from the previous turn and applied this turn.
    pub momentum_applied: f64,
    /// `raw_change + momentum_applied`, before clamping doom.
    pub total_change: f64,
    pub doom_before: f64,
    pub doom_after: f64,
    pub momentum_after: f64,
    pub velocity_after: f64,
    pub trend: DoomTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoomModel {
    pub doom: f64,
    pub momentum: f64,
    pub velocity: f64,
    /// Source breakdown of the most recent recompute.
    #[serde(default)]
    pub breakdown: BTreeMap<DoomSource, f64>,
    /// One-off contributions waiting for the next recompute.
    #[serde(default)]
    pub event_contributions: Vec<(String, f64)>,
    #[serde(default)]
    pub last_report: Option<DoomTurnReport>,
}

impl DoomModel {
    #[must_use]
    pub fn new(cfg: &DoomConfig) -> Self {
        Self {
            doom: clamp_finite(cfg.starting_doom, DOOM_MIN, DOOM_MAX),
            momentum: 0.0,
            velocity: 0.0,
            breakdown: BTreeMap::new(),
            event_contributions: Vec::new(),
            last_report: None,
        }
    }

    /// Queue a one-off contribution for the next recompute.
    pub fn add_event_contribution(&mut self, label: impl Into<String>, amount: f64) {
        if amount.is_finite() {
            self.event_contributions.push((label.into(), amount));
        }
    }

    #[must_use]
    pub fn pending_event_total(&self) -> f64 {
        self.event_contributions.iter().map(|(_, v)| v).sum()
    }

    #[must_use]
    pub fn trend(&self) -> DoomTrend {
        DoomTrend::classify(self.velocity)
    }

    /// Run the per-turn recompute and clear one-off contributions.
    pub fn recompute(&mut self, inputs: &DoomInputs, cfg: &DoomConfig) -> DoomTurnReport {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(DoomSource::BaseDrift, cfg.base_drift);
        breakdown.insert(
            DoomSource::Capability,
            count_to_f64(inputs.capability_heads) * cfg.capability_rate,
        );
        breakdown.insert(
            DoomSource::Safety,
            count_to_f64(inputs.productive_safety) * cfg.safety_rate,
        );
        breakdown.insert(
            DoomSource::Unproductive,
            count_to_f64(inputs.unproductive) * cfg.unproductive_rate,
        );
        breakdown.insert(DoomSource::Traits, inputs.trait_doom);
        breakdown.insert(
            DoomSource::Rival,
            if inputs.rival.is_finite() {
                inputs.rival
            } else {
                0.0
            },
        );
        breakdown.insert(DoomSource::Events, self.pending_event_total());
        self.event_contributions.clear();

        let raw_change: f64 = breakdown.values().sum();
        let momentum_applied = self.momentum;
        let total_change = raw_change + momentum_applied;
        let doom_before = self.doom;

        self.momentum = clamp_finite(
            momentum_applied * cfg.decay_rate + raw_change * cfg.accumulation_rate,
            -cfg.momentum_cap,
            cfg.momentum_cap,
        );
        self.doom = clamp_finite(doom_before + total_change, DOOM_MIN, DOOM_MAX);
        self.velocity = self.velocity * cfg.velocity_retention
            + raw_change * (1.0 - cfg.velocity_retention);
        self.breakdown = breakdown;

        let report = DoomTurnReport {
            raw_change,
            momentum_applied,
            total_change,
            doom_before,
            doom_after: self.doom,
            momentum_after: self.momentum,
            velocity_after: self.velocity,
            trend: self.trend(),
        };
        self.last_report = Some(report);
        report
    }

    #[must_use]
    pub fn is_within_bounds(&self, cfg: &DoomConfig) -> bool {
        (DOOM_MIN..=DOOM_MAX).contains(&self.doom)
            && self.momentum.abs() <= cfg.momentum_cap
            && self.velocity.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn safety_team_pulls_doom_down() {
        let cfg = DoomConfig::default();
        let mut model = DoomModel::new(&cfg);
        let report = model.recompute(
            &DoomInputs {
                productive_safety: 4,
                ..DoomInputs::default()
            },
            &cfg,
        );
        assert!(approx(report.raw_change, -13.0));
        assert!(approx(model.momentum, -1.95));
        assert!(approx(model.doom, 37.0));
        assert_eq!(model.breakdown[&DoomSource::Safety], -14.0);
    }

    #[test]
    fn capability_spiral_accelerates() {
        let cfg = DoomConfig {
            starting_doom: 0.0,
            ..DoomConfig::default()
        };
        let mut model = DoomModel::new(&cfg);
        let inputs = DoomInputs {
            capability_heads: 5,
            ..DoomInputs::default()
        };
        let first = model.recompute(&inputs, &cfg);
        let _ = model.recompute(&inputs, &cfg);
        let third = model.recompute(&inputs, &cfg);
        assert!(model.momentum > 0.0);
        assert!(third.total_change > first.total_change);
        assert!(approx(third.momentum_applied, 4.608));
    }

    #[test]
    fn momentum_is_capped_and_doom_clamped() {
        let cfg = DoomConfig::default();
        let mut model = DoomModel::new(&cfg);
        let inputs = DoomInputs {
            capability_heads: 40,
            ..DoomInputs::default()
        };
        let report = model.recompute(&inputs, &cfg);
        assert!(approx(model.momentum, cfg.momentum_cap));
        assert!(approx(report.doom_after, 100.0));
        assert!(model.is_within_bounds(&cfg));
    }

    #[test]
    fn event_contributions_clear_after_use() {
        let cfg = DoomConfig::default();
        let mut model = DoomModel::new(&cfg);
        model.add_event_contribution("leak", 4.0);
        model.add_event_contribution("bogus", f64::NAN);
        let first = model.recompute(&DoomInputs::default(), &cfg);
        assert!(approx(first.raw_change, 5.0));
        assert!(model.event_contributions.is_empty());
        let second = model.recompute(&DoomInputs::default(), &cfg);
        assert!(approx(second.raw_change, 1.0));
    }

    #[test]
    fn trend_bands() {
        assert_eq!(DoomTrend::classify(-3.0), DoomTrend::StronglyDecreasing);
        assert_eq!(DoomTrend::classify(-1.0), DoomTrend::Decreasing);
        assert_eq!(DoomTrend::classify(0.5), DoomTrend::Stable);
        assert_eq!(DoomTrend::classify(2.9), DoomTrend::Increasing);
        assert_eq!(DoomTrend::classify(3.0), DoomTrend::StronglyIncreasing);
    }
}
