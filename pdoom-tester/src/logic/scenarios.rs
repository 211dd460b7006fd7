use anyhow::{Result, ensure};
use pdoom_game::Specialization;

use crate::logic::game_tester::{SimulationPlan, SimulationSummary};
use crate::logic::policy::GameplayStrategy;

/// Named simulation plan runnable from the CLI.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    const fn new(name: &'static str, description: &'static str, plan: SimulationPlan) -> Self {
        Self {
            name,
            description,
            plan,
        }
    }
}

fn no_violations(summary: &SimulationSummary) -> Result<()> {
    let violations = &summary.metrics.invariant_violations;
    ensure!(
        violations.is_empty(),
        "{} invariant violation(s), first: {}",
        violations.len(),
        violations[0]
    );
    Ok(())
}

fn doom_stays_in_bounds(summary: &SimulationSummary) -> Result<()> {
    for turn in &summary.turns {
        ensure!(
            (0.0..=100.0).contains(&turn.doom),
            "doom {} out of bounds on turn {}",
            turn.doom,
            turn.turn
        );
    }
    Ok(())
}

fn runs_terminate(summary: &SimulationSummary) -> Result<()> {
    let last = summary.turns.last();
    ensure!(
        last.is_some_and(|t| t.game_ended),
        "run stopped before ending or reaching its turn limit"
    );
    Ok(())
}

fn replay_matches(summary: &SimulationSummary) -> Result<()> {
    let replayed = summary.replay_digests.as_deref().unwrap_or_default();
    let original = summary.digests();
    let diverged = original.iter().zip(replayed).position(|(a, b)| a != b);
    ensure!(
        diverged.is_none() && original.len() == replayed.len(),
        "replay diverged at turn {}",
        diverged.map_or(original.len().min(replayed.len()) + 1, |i| i + 1)
    );
    Ok(())
}

fn restore_matches(summary: &SimulationSummary) -> Result<()> {
    let restored = summary.restored_digests.as_deref().unwrap_or_default();
    ensure!(
        restored == summary.digests().as_slice(),
        "restored session diverged from the uninterrupted run"
    );
    Ok(())
}

fn ends_in_bankruptcy(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.ending_type == "bankrupt",
        "expected bankruptcy, got {}",
        summary.metrics.ending_type
    );
    ensure!(
        summary.turns.len() == 1,
        "bankruptcy should end the first turn"
    );
    Ok(())
}

fn runaway_doom_ends_quickly(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.game_ended, "runaway capability never ended the game");
    ensure!(
        summary.final_state.turn <= 5,
        "runaway capability took {} turns",
        summary.final_state.turn
    );
    Ok(())
}

fn full_game(strategy: GameplayStrategy) -> SimulationPlan {
    SimulationPlan::new(strategy)
        .with_max_turns(60)
        .with_expectation(no_violations)
        .with_expectation(doom_stays_in_bounds)
        .with_expectation(runs_terminate)
}

/// Every scenario known to the tester.
#[must_use]
pub fn catalog() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Ten balanced turns with invariant checks",
            SimulationPlan::new(GameplayStrategy::Balanced)
                .with_max_turns(10)
                .with_expectation(no_violations)
                .with_expectation(runs_terminate),
        ),
        TestScenario::new(
            "determinism",
            "Same seed twice yields identical records every turn",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_max_turns(40)
                .with_replay()
                .with_expectation(replay_matches),
        ),
        TestScenario::new(
            "roundtrip",
            "Save and restore after turn four continues identically",
            SimulationPlan::new(GameplayStrategy::Balanced)
                .with_max_turns(40)
                .with_restore_at(4)
                .with_expectation(restore_matches),
        ),
        TestScenario::new(
            "invariants",
            "Random play keeps state valid and doom clamped",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_max_turns(60)
                .with_expectation(no_violations)
                .with_expectation(doom_stays_in_bounds),
        ),
        TestScenario::new(
            "bankruptcy",
            "Payroll with no money ends the first turn",
            SimulationPlan::new(GameplayStrategy::Growth)
                .with_max_turns(5)
                .with_setup(|cfg| cfg.start.money = 0.0)
                .with_expectation(ends_in_bankruptcy),
        ),
        TestScenario::new(
            "runaway-capability",
            "Extreme capability rate drives doom to the cap within five turns",
            SimulationPlan::new(GameplayStrategy::Growth)
                .with_max_turns(10)
                .with_setup(|cfg| {
                    cfg.doom.capability_rate = 40.0;
                    cfg.start.money = 1e9;
                    for hire in &mut cfg.start.staff {
                        if hire.specialization == Specialization::Capability {
                            hire.count = 10;
                        }
                    }
                })
                .with_expectation(doom_stays_in_bounds)
                .with_expectation(runaway_doom_ends_quickly),
        ),
        TestScenario::new(
            "full-game-safety",
            "Safety-first policy for a full run",
            full_game(GameplayStrategy::SafetyFirst),
        ),
        TestScenario::new(
            "full-game-growth",
            "Growth policy for a full run",
            full_game(GameplayStrategy::Growth),
        ),
        TestScenario::new(
            "full-game-balanced",
            "Balanced policy for a full run",
            full_game(GameplayStrategy::Balanced),
        ),
    ]
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    catalog().into_iter().find(|s| s.name == name)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog().iter().map(|s| (s.name, s.description)).collect()
}

/// Plan used by playability sweeps for each strategy.
#[must_use]
pub fn playability_plan(strategy: GameplayStrategy, max_turns: u32) -> SimulationPlan {
    SimulationPlan::new(strategy)
        .with_max_turns(max_turns)
        .with_expectation(no_violations)
        .with_expectation(doom_stays_in_bounds)
}
