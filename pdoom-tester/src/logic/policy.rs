use std::fmt;

use pdoom_game::researcher::payroll;
use pdoom_game::{
    ActionDef, ActionParams, Effect, EventDef, EventPresentation, ResourceKind, SessionState,
    Specialization,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Option picked by a [`PlayerPolicy`] for a pending event.
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub option_id: String,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(option_id: impl Into<String>, rationale: Option<String>) -> Self {
        Self {
            option_id: option_id.into(),
            rationale,
        }
    }
}

/// Actions a policy wants queued this turn, in order, plus AP to hold back.
#[derive(Debug, Clone, Default)]
pub struct TurnPlan {
    pub actions: Vec<(String, ActionParams)>,
    pub reserve: u32,
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an option for a pending event.
    fn pick_option(
        &mut self,
        state: &SessionState,
        event: &EventDef,
        presentation: &EventPresentation,
    ) -> PolicyDecision;

    /// Choose what to queue from the currently affordable actions.
    fn plan_turn(&mut self, state: &SessionState, available: &[&ActionDef]) -> TurnPlan;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    SafetyFirst,
    Growth,
    Balanced,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::SafetyFirst, Self::Growth, Self::Balanced, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SafetyFirst => "Safety First",
            Self::Growth => "Growth",
            Self::Balanced => "Balanced",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::SafetyFirst => "safety",
            Self::Growth => "growth",
            Self::Balanced => "balanced",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.key().eq_ignore_ascii_case(key.trim()))
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::SafetyFirst => Box::new(PriorityPolicy::safety_first()),
            Self::Growth => Box::new(PriorityPolicy::growth()),
            Self::Balanced => Box::new(PriorityPolicy::balanced()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Doom pressure of an effect list: direct doom plus a tenth of added risk.
fn doom_pressure(effects: &[Effect]) -> f64 {
    effects
        .iter()
        .map(|effect| match effect {
            Effect::Doom { amount, .. } => *amount,
            Effect::Risk { amount, .. } => amount * 0.1,
            Effect::Defeat { .. } => 1000.0,
            Effect::Victory { .. } => -1000.0,
            _ => 0.0,
        })
        .sum()
}

fn resource_gain(effects: &[Effect]) -> f64 {
    effects
        .iter()
        .map(|effect| match effect {
            Effect::Resource { resource, amount } => match resource {
                ResourceKind::Money => amount / 1000.0,
                ResourceKind::Compute | ResourceKind::Research | ResourceKind::Papers => *amount,
                ResourceKind::Reputation => amount * 0.5,
            },
            Effect::Hire { .. } => 2.0,
            Effect::Poach => -3.0,
            _ => 0.0,
        })
        .sum()
}

/// Money the lab keeps back before spending on anything optional.
fn runway(state: &SessionState) -> f64 {
    payroll(&state.researchers) * 3.0
}

struct PriorityPolicy {
    name: &'static str,
    priorities: &'static [&'static str],
    hire: Specialization,
    doom_weight: f64,
    gain_weight: f64,
    reserve: u32,
}

impl PriorityPolicy {
    const fn safety_first() -> Self {
        Self {
            name: "Safety First",
            priorities: &[
                "hire_safety_researcher",
                "safety_audit",
                "security_review",
                "publish_paper",
                "fundraise",
                "buy_compute",
                "strategy_session",
            ],
            hire: Specialization::Safety,
            doom_weight: 1.0,
            gain_weight: 0.05,
            reserve: 1,
        }
    }

    const fn growth() -> Self {
        Self {
            name: "Growth",
            priorities: &[
                "ship_product",
                "hire_capability_researcher",
                "fundraise",
                "buy_compute",
                "publish_paper",
                "press_release",
            ],
            hire: Specialization::Capability,
            doom_weight: 0.05,
            gain_weight: 1.0,
            reserve: 0,
        }
    }

    const fn balanced() -> Self {
        Self {
            name: "Balanced",
            priorities: &[
                "fundraise",
                "publish_paper",
                "hire_researcher",
                "safety_audit",
                "buy_compute",
                "lobby_regulators",
                "team_retreat",
                "strategy_session",
            ],
            hire: Specialization::Interpretability,
            doom_weight: 1.0,
            gain_weight: 0.5,
            reserve: 1,
        }
    }

    fn score(&self, effects: &[Effect]) -> f64 {
        self.gain_weight * resource_gain(effects) - self.doom_weight * doom_pressure(effects)
    }
}

impl PlayerPolicy for PriorityPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pick_option(
        &mut self,
        _state: &SessionState,
        event: &EventDef,
        presentation: &EventPresentation,
    ) -> PolicyDecision {
        let best = event
            .options
            .iter()
            .zip(&presentation.options)
            .filter(|(_, shown)| shown.affordable)
            .map(|(option, _)| (option, self.score(&option.effects)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            Some((option, score)) => {
                PolicyDecision::new(option.id.clone(), Some(format!("score {score:.2}")))
            }
            None => PolicyDecision::new(
                event.options.first().map(|o| o.id.clone()).unwrap_or_default(),
                Some(String::from("nothing affordable")),
            ),
        }
    }

    fn plan_turn(&mut self, state: &SessionState, available: &[&ActionDef]) -> TurnPlan {
        let mut budget = state.action_points.available().saturating_sub(self.reserve);
        let mut money = state.resources.money - runway(state);
        let mut plan = TurnPlan {
            reserve: self.reserve.min(state.action_points.available()),
            ..TurnPlan::default()
        };
        for id in self.priorities {
            let Some(action) = available.iter().find(|a| a.id == *id) else {
                continue;
            };
            let cost = action.costs.get(ResourceKind::Money);
            if action.ap_cost == 0 || action.ap_cost > budget || (cost > 0.0 && cost > money) {
                continue;
            }
            budget -= action.ap_cost;
            money -= cost;
            let params = if action.effects.iter().any(Effect::needs_params) {
                ActionParams::hire(self.hire)
            } else {
                ActionParams::default()
            };
            plan.actions.push((action.id.clone(), params));
        }
        plan
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    fn params_for(&mut self, state: &SessionState) -> ActionParams {
        let spec = Specialization::ALL[self.rng.gen_range(0..Specialization::ALL.len())];
        let mut params = ActionParams::hire(spec);
        if !state.researchers.is_empty() {
            let idx = self.rng.gen_range(0..state.researchers.len());
            params.researcher_id = Some(state.researchers[idx].id);
        }
        params
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_option(
        &mut self,
        _state: &SessionState,
        event: &EventDef,
        presentation: &EventPresentation,
    ) -> PolicyDecision {
        let affordable: Vec<&str> = presentation
            .options
            .iter()
            .filter(|o| o.affordable)
            .map(|o| o.id.as_str())
            .collect();
        let pool: Vec<&str> = if affordable.is_empty() {
            event.options.iter().map(|o| o.id.as_str()).collect()
        } else {
            affordable
        };
        if pool.is_empty() {
            return PolicyDecision::new(String::new(), None);
        }
        let pick = pool[self.rng.gen_range(0..pool.len())];
        PolicyDecision::new(pick, Some(format!("1 of {}", pool.len())))
    }

    fn plan_turn(&mut self, state: &SessionState, available: &[&ActionDef]) -> TurnPlan {
        let mut plan = TurnPlan::default();
        if available.is_empty() {
            return plan;
        }
        let count = self.rng.gen_range(0..=3);
        for _ in 0..count {
            let action = available[self.rng.gen_range(0..available.len())];
            let params = self.params_for(state);
            plan.actions.push((action.id.clone(), params));
        }
        if self.rng.gen_bool(0.25) {
            plan.reserve = 1;
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdoom_game::{GameData, Phase, SimConfig, TurnController};

    fn started() -> (TurnController, SessionState) {
        let mut ctl = TurnController::new(GameData::bundled().unwrap(), SimConfig::default());
        let mut state = SessionState::new("POLICY", ctl.config());
        ctl.start_turn(&mut state).unwrap();
        while state.phase == Phase::EventResolution {
            let pending = state.pending_events[0].event_id.clone();
            let options: Vec<String> = ctl
                .data()
                .event(&pending)
                .unwrap()
                .options
                .iter()
                .map(|o| o.id.clone())
                .collect();
            assert!(
                options
                    .iter()
                    .any(|o| ctl.resolve_event(&mut state, &pending, o).is_ok())
            );
        }
        (ctl, state)
    }

    #[test]
    fn strategies_parse_from_keys() {
        assert_eq!(
            GameplayStrategy::from_key("Safety"),
            Some(GameplayStrategy::SafetyFirst)
        );
        assert_eq!(GameplayStrategy::from_key("nope"), None);
        assert_eq!(GameplayStrategy::Growth.to_string(), "Growth");
    }

    #[test]
    fn safety_plan_fits_the_ap_budget() {
        let (ctl, state) = started();
        let available = ctl.available_actions(&state);
        let mut policy = GameplayStrategy::SafetyFirst.create_policy(1);
        let plan = policy.plan_turn(&state, &available);
        let priorities = PriorityPolicy::safety_first().priorities;
        assert!(plan.actions.iter().all(|(id, _)| priorities.contains(&id.as_str())));
        let spent: u32 = plan
            .actions
            .iter()
            .filter_map(|(id, _)| ctl.data().action(id))
            .map(|a| a.ap_cost)
            .sum();
        assert!(spent + plan.reserve <= state.action_points.available());
    }

    #[test]
    fn random_policy_is_seeded() {
        let (ctl, state) = started();
        let available = ctl.available_actions(&state);
        let mut a = GameplayStrategy::Random.create_policy(7);
        let mut b = GameplayStrategy::Random.create_policy(7);
        let ids = |plan: TurnPlan| plan.actions.into_iter().map(|p| p.0).collect::<Vec<_>>();
        let plan_a = ids(a.plan_turn(&state, &available));
        let plan_b = ids(b.plan_turn(&state, &available));
        assert_eq!(plan_a, plan_b);
    }

    #[test]
    fn option_scores_follow_doom_pressure() {
        let calm = [Effect::Doom {
            amount: -2.0,
            label: None,
        }];
        let risky = [Effect::Doom {
            amount: 4.0,
            label: None,
        }];
        assert!(doom_pressure(&calm) < doom_pressure(&risky));
        let policy = PriorityPolicy::safety_first();
        assert!(policy.score(&calm) > policy.score(&risky));
    }
}
