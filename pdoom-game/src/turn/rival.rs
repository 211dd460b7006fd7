//! Opponent seam: a once-per-turn doom contribution from outside the lab.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rng::GameRng;
use crate::state::SessionState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RivalContribution {
    pub doom: f64,
    /// Rival-side happenings worth logging.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Supplies the rival doom delta. Called once per executed turn, after queued
/// actions and before the doom recompute; any draws it takes are part of the
/// session's documented RNG order.
pub trait RivalModel: fmt::Debug + Send {
    fn compute_rival_contribution(
        &self,
        state: &SessionState,
        rng: &mut GameRng,
    ) -> RivalContribution;
}

/// No competitors. Takes no draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRivals;

impl RivalModel for NoRivals {
    fn compute_rival_contribution(
        &self,
        _state: &SessionState,
        _rng: &mut GameRng,
    ) -> RivalContribution {
        RivalContribution::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalLab {
    pub name: String,
    /// Mean doom added per turn.
    pub aggression: f64,
    /// Flat doom removed per turn.
    pub safety_focus: f64,
}

/// A small field of competing labs, one draw per lab per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalLabs {
    pub labs: Vec<RivalLab>,
    /// Rolls at or above this are announced as breakthroughs.
    pub breakthrough_roll: f64,
}

impl Default for RivalLabs {
    fn default() -> Self {
        Self {
            labs: vec![
                RivalLab {
                    name: String::from("Frontier Dynamics"),
                    aggression: 0.6,
                    safety_focus: 0.1,
                },
                RivalLab {
                    name: String::from("Open Horizon"),
                    aggression: 0.4,
                    safety_focus: 0.2,
                },
                RivalLab {
                    name: String::from("Prudent Systems"),
                    aggression: 0.2,
                    safety_focus: 0.3,
                },
            ],
            breakthrough_roll: 0.95,
        }
    }
}

impl RivalModel for RivalLabs {
    fn compute_rival_contribution(
        &self,
        state: &SessionState,
        rng: &mut GameRng,
    ) -> RivalContribution {
        let mut contribution = RivalContribution::default();
        for lab in &self.labs {
            let roll = rng.roll();
            let mut delta = lab.aggression * (0.5 + roll) - lab.safety_focus;
            if roll >= self.breakthrough_roll {
                delta += lab.aggression * 2.0;
                contribution
                    .notes
                    .push(format!("{} announced a breakthrough on turn {}", lab.name, state.turn));
            }
            contribution.doom += delta;
        }
        contribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn no_rivals_is_inert() {
        let state = SessionState::new("S1", &SimConfig::default());
        let mut rng = GameRng::from_seed_str("S1");
        let c = NoRivals.compute_rival_contribution(&state, &mut rng);
        assert!(c.doom.abs() < f64::EPSILON);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn rival_labs_draw_once_per_lab_and_stay_bounded() {
        let state = SessionState::new("S1", &SimConfig::default());
        let labs = RivalLabs::default();
        let mut rng = GameRng::from_seed_str("rivals");
        for _ in 0..50 {
            let c = labs.compute_rival_contribution(&state, &mut rng);
            assert!(c.doom > -1.0 && c.doom < 6.0, "doom {}", c.doom);
        }
        assert_eq!(rng.draws(), 150);
    }
}
