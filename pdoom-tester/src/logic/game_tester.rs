use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use pdoom_game::{Ending, GameData, SessionState, SimConfig};

use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::{DecisionRecord, SimulationConfig, SimulationSession, TurnOutcome};

const DEFAULT_MAX_TURNS: u32 = 60;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: Option<u32>,
    /// Tweaks applied to the balance config before the session starts.
    pub setup: Option<fn(&mut SimConfig)>,
    /// Run the same seed a second time and keep its digests.
    pub replay: bool,
    /// Save and restore the session after this turn, then keep playing.
    pub restore_at: Option<u32>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            setup: None,
            replay: false,
            restore_at: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut SimConfig)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub const fn with_replay(mut self) -> Self {
        self.replay = true;
        self
    }

    #[must_use]
    pub const fn with_restore_at(mut self, turn: u32) -> Self {
        self.restore_at = Some(turn);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    /// # Errors
    ///
    /// Returns the expectation's failure.
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub strategy: GameplayStrategy,
    pub turns: Vec<TurnOutcome>,
    pub metrics: PlayabilityMetrics,
    pub final_state: SessionState,
    pub ending_message: String,
    pub game_ended: bool,
    pub replay_digests: Option<Vec<u64>>,
    pub restored_digests: Option<Vec<u64>>,
}

impl SimulationSummary {
    #[must_use]
    pub fn digests(&self) -> Vec<u64> {
        self.turns.iter().map(|t| t.digest).collect()
    }
}

/// Aggregated per-run measurements.
#[derive(Debug, Clone, Default)]
pub struct PlayabilityMetrics {
    pub turns_survived: u32,
    pub ending_type: String,
    pub victory: bool,
    pub events_faced: u32,
    pub unique_events: u32,
    pub actions_applied: u32,
    pub actions_failed: u32,
    pub selections_rejected: u32,
    pub final_doom: f64,
    pub peak_doom: f64,
    pub lowest_doom: f64,
    pub final_money: f64,
    pub lowest_money: f64,
    pub final_staff: usize,
    pub peak_staff: usize,
    pub invariant_violations: Vec<String>,
    pub decision_log: Vec<DecisionRecord>,
    event_ids: BTreeSet<String>,
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl PlayabilityMetrics {
    fn starting_from(state: &SessionState) -> Self {
        Self {
            final_doom: state.doom(),
            peak_doom: state.doom(),
            lowest_doom: state.doom(),
            final_money: state.resources.money,
            lowest_money: state.resources.money,
            final_staff: state.researchers.len(),
            peak_staff: state.researchers.len(),
            ending_type: String::from("unfinished"),
            ..Self::default()
        }
    }

    pub fn record_turn(&mut self, outcome: &TurnOutcome) {
        for decision in &outcome.decisions {
            self.events_faced += 1;
            self.event_ids.insert(decision.event_id.clone());
            self.decision_log.push(decision.clone());
        }
        self.actions_applied += saturating_u32(outcome.applied.len());
        self.actions_failed += saturating_u32(outcome.failed.len());
        self.selections_rejected += saturating_u32(outcome.rejected);
        self.peak_doom = self.peak_doom.max(outcome.doom);
        self.lowest_doom = self.lowest_doom.min(outcome.doom);
        self.lowest_money = self.lowest_money.min(outcome.money);
        self.peak_staff = self.peak_staff.max(outcome.staff);
        if let Some(violation) = &outcome.violation {
            self.invariant_violations
                .push(format!("turn {}: {violation}", outcome.turn));
        }
    }

    pub fn finalize(&mut self, state: &SessionState) {
        self.turns_survived = state.turn;
        self.final_doom = state.doom();
        self.final_money = state.resources.money;
        self.final_staff = state.researchers.len();
        self.unique_events = saturating_u32(self.event_ids.len());
        if let Some(ending) = &state.ending {
            self.ending_type = ending.key().to_string();
            self.victory = ending.is_victory();
        }
    }
}

fn describe_ending(state: &SessionState) -> String {
    match &state.ending {
        None => format!("Still running after turn {}", state.turn),
        Some(Ending::DoomAverted) => String::from("Doom averted"),
        Some(Ending::DoomReached) => String::from("Doom reached"),
        Some(Ending::Bankrupt { money }) => format!("Bankrupt at ${money:.0}"),
        Some(Ending::Victory { reason }) => format!("Victory: {reason}"),
        Some(Ending::Defeat { reason }) => format!("Defeat: {reason}"),
    }
}

/// Headless deterministic runner for the core game logic.
#[derive(Debug, Clone)]
pub struct GameTester {
    verbose: bool,
    data: Arc<GameData>,
    config: SimConfig,
}

impl GameTester {
    #[must_use]
    pub const fn new(data: Arc<GameData>, config: SimConfig, verbose: bool) -> Self {
        Self {
            verbose,
            data,
            config,
        }
    }

    /// Tester over the bundled catalog and default balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog fails validation.
    pub fn try_new(verbose: bool) -> Result<Self> {
        let data = GameData::bundled().context("loading bundled catalog")?;
        Ok(Self::new(data, SimConfig::default(), verbose))
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    fn config_for(&self, plan: &SimulationPlan) -> SimConfig {
        let mut config = self.config.clone();
        if let Some(setup) = plan.setup {
            setup(&mut config);
        }
        config
    }

    fn play(
        &self,
        sim: &SimulationConfig,
        config: &SimConfig,
        policy_seed: u64,
        restore_at: Option<u32>,
    ) -> Result<(Vec<TurnOutcome>, SimulationSession)> {
        let mut session = SimulationSession::new(sim, Arc::clone(&self.data), config.clone());
        let mut policy = sim.strategy.create_policy(policy_seed);
        let mut turns = Vec::new();
        if sim.max_turns == 0 {
            return Ok((turns, session));
        }

        loop {
            let outcome = session.advance(policy.as_mut())?;
            if self.verbose {
                log_turn(&outcome, session.state());
            }
            let finished = outcome.game_ended;
            if !finished && restore_at == Some(outcome.turn) {
                let record = session.to_record()?;
                session =
                    SimulationSession::restore(sim, &record, Arc::clone(&self.data), config.clone())?;
                log::debug!("restored {} after turn {}", sim.seed, outcome.turn);
            }
            turns.push(outcome);
            if finished {
                break;
            }
        }
        Ok((turns, session))
    }

    /// Run `plan` on one seed.
    ///
    /// # Errors
    ///
    /// Returns an error when the harness cannot drive the session, e.g. an
    /// event with no resolvable option or a record that fails to restore.
    pub fn run_plan(
        &self,
        plan: &SimulationPlan,
        seed: &str,
        policy_seed: u64,
    ) -> Result<SimulationSummary> {
        let sim = SimulationConfig::new(plan.strategy, seed)
            .with_max_turns(plan.max_turns.unwrap_or(DEFAULT_MAX_TURNS));
        let config = self.config_for(plan);

        if self.verbose {
            println!(
                "  {} seed {} strategy {} max turns {}",
                "▶".cyan(),
                sim.seed.bright_white(),
                plan.strategy.label(),
                sim.max_turns
            );
        }

        let (turns, session) = self.play(&sim, &config, policy_seed, None)?;
        let replay_digests = if plan.replay {
            let (replayed, _) = self.play(&sim, &config, policy_seed, None)?;
            Some(replayed.iter().map(|t| t.digest).collect())
        } else {
            None
        };
        let restored_digests = match plan.restore_at {
            Some(turn) => {
                let (restored, _) = self.play(&sim, &config, policy_seed, Some(turn))?;
                Some(restored.iter().map(|t| t.digest).collect())
            }
            None => None,
        };

        let final_state = session.into_state();
        let mut metrics = PlayabilityMetrics::starting_from(&SessionState::new(seed, &config));
        for outcome in &turns {
            metrics.record_turn(outcome);
        }
        metrics.finalize(&final_state);

        Ok(SimulationSummary {
            strategy: plan.strategy,
            game_ended: final_state.is_over(),
            ending_message: describe_ending(&final_state),
            turns,
            metrics,
            final_state,
            replay_digests,
            restored_digests,
        })
    }
}

fn log_turn(outcome: &TurnOutcome, state: &SessionState) {
    let change = outcome
        .doom_change
        .map_or_else(|| String::from("-"), |c| format!("{c:+.2}"));
    println!(
        "    turn {:>3} doom {:>6.2} ({change}) money {:>9.0} staff {:>2} applied {} failed {} events {}",
        outcome.turn,
        outcome.doom,
        outcome.money,
        outcome.staff,
        outcome.applied.len(),
        outcome.failed.len(),
        outcome.decisions.len()
    );
    if let Some(violation) = &outcome.violation {
        println!("      {} {}", "invariant:".red(), violation);
    }
    if state.is_over() {
        println!("      {}", describe_ending(state).yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;

    #[test]
    fn replay_and_restore_match_the_straight_run() {
        let tester = GameTester::try_new(false).unwrap();
        let plan = SimulationPlan::new(GameplayStrategy::Random)
            .with_max_turns(15)
            .with_replay()
            .with_restore_at(3);
        let summary = tester.run_plan(&plan, "PD-AUDIT11", 11).unwrap();
        let digests = summary.digests();
        assert_eq!(summary.replay_digests.as_ref(), Some(&digests));
        assert_eq!(summary.restored_digests.as_ref(), Some(&digests));
    }

    #[test]
    fn metrics_follow_the_turns() {
        let tester = GameTester::try_new(false).unwrap();
        let plan = SimulationPlan::new(GameplayStrategy::Balanced).with_max_turns(10);
        let summary = tester.run_plan(&plan, "metrics", 0).unwrap();
        let metrics = &summary.metrics;
        assert_eq!(metrics.turns_survived, summary.final_state.turn);
        assert!(metrics.peak_doom >= metrics.final_doom);
        assert!(metrics.lowest_doom <= metrics.final_doom);
        assert!(metrics.invariant_violations.is_empty());
        assert_eq!(
            metrics.events_faced as usize,
            summary.turns.iter().map(|t| t.decisions.len()).sum::<usize>()
        );
    }

    #[test]
    fn setup_hooks_change_the_balance() {
        let tester = GameTester::try_new(false).unwrap();
        let plan = SimulationPlan::new(GameplayStrategy::Growth)
            .with_max_turns(20)
            .with_setup(|cfg| cfg.start.money = 0.0);
        let summary = tester.run_plan(&plan, "broke", 0).unwrap();
        assert_eq!(summary.metrics.ending_type, "bankrupt");
        assert_eq!(summary.turns.len(), 1);
    }

    #[test]
    fn expectations_see_the_summary() {
        let expectation = SimulationExpectation::from(|summary: &SimulationSummary| {
            ensure!(summary.turns.is_empty(), "expected no turns");
            Ok(())
        });
        let tester = GameTester::try_new(false).unwrap();
        let plan = SimulationPlan::new(GameplayStrategy::SafetyFirst).with_max_turns(0);
        let summary = tester.run_plan(&plan, "idle", 0).unwrap();
        expectation.evaluate(&summary).unwrap();
        assert!(!summary.game_ended);
        assert_eq!(summary.metrics.ending_type, "unfinished");
    }
}
