//! Hidden risk pools with hybrid roll/threshold triggering.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::constants::{RISK_MAX, RISK_MIN};
use crate::numbers::clamp_finite;
use crate::rng::GameRng;

/// Named risk pool. Declaration order is the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPoolId {
    SafetyDebt,
    SecurityExposure,
    RegulatoryAttention,
    PublicScandal,
    InsiderThreat,
}

impl RiskPoolId {
    pub const ALL: [Self; 5] = [
        Self::SafetyDebt,
        Self::SecurityExposure,
        Self::RegulatoryAttention,
        Self::PublicScandal,
        Self::InsiderThreat,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SafetyDebt => "safety_debt",
            Self::SecurityExposure => "security_exposure",
            Self::RegulatoryAttention => "regulatory_attention",
            Self::PublicScandal => "public_scandal",
            Self::InsiderThreat => "insider_threat",
        }
    }
}

impl fmt::Display for RiskPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskPoolId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|pool| pool.as_str() == s)
            .ok_or(())
    }
}

/// Guaranteed trigger tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "50")]
    Elevated,
    #[serde(rename = "75")]
    High,
    #[serde(rename = "100")]
    Maximum,
}

impl RiskTier {
    /// Highest first.
    const DESCENDING: [Self; 3] = [Self::Maximum, Self::High, Self::Elevated];

    #[must_use]
    pub const fn threshold(self) -> f64 {
        match self {
            Self::Elevated => 50.0,
            Self::High => 75.0,
            Self::Maximum => 100.0,
        }
    }

    #[must_use]
    pub const fn severity(self) -> RiskSeverity {
        match self {
            Self::Elevated => RiskSeverity::Moderate,
            Self::High => RiskSeverity::Major,
            Self::Maximum => RiskSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl RiskSeverity {
    /// Band for a roll-triggered event at the given pool value.
    #[must_use]
    pub fn for_value(value: f64) -> Self {
        if value < 50.0 {
            Self::Minor
        } else if value < 75.0 {
            Self::Moderate
        } else if value < 100.0 {
            Self::Major
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerCause {
    Roll { sample: f64 },
    Threshold { tier: RiskTier },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTrigger {
    pub pool: RiskPoolId,
    pub severity: RiskSeverity,
    pub cause: TriggerCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RiskPool {
    pub value: f64,
    /// Highest tier that has already fired its guaranteed trigger.
    #[serde(default)]
    pub highest_tier: Option<RiskTier>,
}

impl RiskPool {
    fn next_threshold(&self) -> Option<RiskTier> {
        RiskTier::DESCENDING
            .into_iter()
            .find(|tier| tier.threshold() <= self.value && Some(*tier) > self.highest_tier)
    }
}

/// Pool values at the end of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub turn: u32,
    pub values: BTreeMap<RiskPoolId, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPools {
    pub pools: BTreeMap<RiskPoolId, RiskPool>,
    #[serde(default)]
    pub history: VecDeque<RiskSnapshot>,
}

impl Default for RiskPools {
    fn default() -> Self {
        Self {
            pools: RiskPoolId::ALL
                .into_iter()
                .map(|id| (id, RiskPool::default()))
                .collect(),
            history: VecDeque::new(),
        }
    }
}

impl RiskPools {
    #[must_use]
    pub fn value(&self, pool: RiskPoolId) -> f64 {
        self.pools.get(&pool).map_or(0.0, |p| p.value)
    }

    #[must_use]
    pub fn highest_tier(&self, pool: RiskPoolId) -> Option<RiskTier> {
        self.pools.get(&pool).and_then(|p| p.highest_tier)
    }

    /// Add a signed amount to a pool, clamped to `[0, 100]`. Returns the new value.
    pub fn add_risk(&mut self, pool: RiskPoolId, amount: f64) -> f64 {
        let entry = self.pools.entry(pool).or_default();
        if amount.is_finite() {
            entry.value = clamp_finite(entry.value + amount, RISK_MIN, RISK_MAX);
        }
        entry.value
    }

    /// Subtract a flat amount from every pool.
    pub fn apply_decay(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        for pool in self.pools.values_mut() {
            pool.value = clamp_finite(pool.value - amount, RISK_MIN, RISK_MAX);
        }
    }

    /// Hybrid trigger pass. Draws exactly one sample per pool, in pool order.
    /// A pool yields at most one trigger; a fresh threshold tier wins over the
    /// roll and advances the pool's marker.
    pub fn evaluate(&mut self, rng: &mut GameRng) -> SmallVec<[RiskTrigger; 5]> {
        let mut triggers = SmallVec::new();
        for id in RiskPoolId::ALL {
            let sample = rng.roll();
            let pool = self.pools.entry(id).or_default();
            if let Some(tier) = pool.next_threshold() {
                pool.highest_tier = Some(tier);
                triggers.push(RiskTrigger {
                    pool: id,
                    severity: tier.severity(),
                    cause: TriggerCause::Threshold { tier },
                });
            } else if sample < pool.value / RISK_MAX {
                triggers.push(RiskTrigger {
                    pool: id,
                    severity: RiskSeverity::for_value(pool.value),
                    cause: TriggerCause::Roll { sample },
                });
            }
        }
        triggers
    }

    pub fn record_history(&mut self, turn: u32, window: usize) {
        self.history.push_back(RiskSnapshot {
            turn,
            values: self.pools.iter().map(|(id, p)| (*id, p.value)).collect(),
        });
        while self.history.len() > window {
            self.history.pop_front();
        }
    }

    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        self.pools.len() == RiskPoolId::ALL.len()
            && self
                .pools
                .values()
                .all(|p| (RISK_MIN..=RISK_MAX).contains(&p.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_risk_clamps_at_ceiling() {
        let mut pools = RiskPools::default();
        pools.add_risk(RiskPoolId::SafetyDebt, 49.0);
        let value = pools.add_risk(RiskPoolId::SafetyDebt, 60.0);
        assert!((value - 100.0).abs() < f64::EPSILON);
        let value = pools.add_risk(RiskPoolId::SafetyDebt, -250.0);
        assert!(value.abs() < f64::EPSILON);
    }

    #[test]
    fn evaluate_draws_once_per_pool_even_when_empty() {
        let mut pools = RiskPools::default();
        let mut rng = GameRng::from_seed_str("quiet");
        let triggers = pools.evaluate(&mut rng);
        assert!(triggers.is_empty());
        assert_eq!(rng.draws(), 5);
    }

    #[test]
    fn threshold_fires_once_and_skips_consumed_tiers() {
        let mut pools = RiskPools::default();
        pools.add_risk(RiskPoolId::PublicScandal, 80.0);
        let mut rng = GameRng::from_seed_str("tiers");
        let first = pools.evaluate(&mut rng);
        assert_eq!(first.len(), 1);
        assert_eq!(
            first[0].cause,
            TriggerCause::Threshold {
                tier: RiskTier::High
            }
        );
        assert_eq!(first[0].severity, RiskSeverity::Major);
        assert_eq!(
            pools.highest_tier(RiskPoolId::PublicScandal),
            Some(RiskTier::High)
        );

        // Dropping and re-crossing never re-fires a consumed tier.
        pools.add_risk(RiskPoolId::PublicScandal, -40.0);
        pools.add_risk(RiskPoolId::PublicScandal, 40.0);
        for _ in 0..20 {
            let again = pools.evaluate(&mut rng);
            assert!(
                again
                    .iter()
                    .all(|t| !matches!(t.cause, TriggerCause::Threshold { .. }))
            );
        }
        pools.add_risk(RiskPoolId::PublicScandal, 50.0);
        let max = pools.evaluate(&mut rng);
        assert_eq!(
            max[0].cause,
            TriggerCause::Threshold {
                tier: RiskTier::Maximum
            }
        );
    }

    #[test]
    fn roll_trigger_uses_value_band() {
        let mut pools = RiskPools::default();
        pools.add_risk(RiskPoolId::InsiderThreat, 40.0);
        let mut rng = GameRng::from_seed_str("rolls");
        let mut fired = 0;
        for _ in 0..200 {
            for trigger in pools.evaluate(&mut rng) {
                assert_eq!(trigger.pool, RiskPoolId::InsiderThreat);
                assert_eq!(trigger.severity, RiskSeverity::Minor);
                fired += 1;
            }
        }
        assert!(fired > 40 && fired < 120, "fired {fired} times");
    }

    #[test]
    fn decay_and_history_window() {
        let mut pools = RiskPools::default();
        pools.add_risk(RiskPoolId::SecurityExposure, 10.0);
        pools.apply_decay(2.5);
        assert!((pools.value(RiskPoolId::SecurityExposure) - 7.5).abs() < f64::EPSILON);
        for turn in 0..15 {
            pools.record_history(turn, 10);
        }
        assert_eq!(pools.history.len(), 10);
        assert_eq!(pools.history.front().map(|s| s.turn), Some(5));
    }
}
