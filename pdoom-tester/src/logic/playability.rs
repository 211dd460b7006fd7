use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::logic::game_tester::{GameTester, PlayabilityMetrics};
use crate::logic::policy::GameplayStrategy;
use crate::logic::scenarios::playability_plan;
use crate::logic::seeds::SeedInfo;

#[derive(Debug, Clone)]
pub struct PlayabilityRecord {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub seed_code: String,
    pub seed: String,
    pub policy_seed: u64,
    /// Digest of the last turn's persistence record.
    pub final_digest: u64,
    pub metrics: PlayabilityMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayabilityAggregate {
    pub scenario_name: String,
    #[serde(serialize_with = "strategy_label")]
    pub strategy: GameplayStrategy,
    pub iterations: usize,
    pub mean_turns: f64,
    pub std_turns: f64,
    pub mean_final_doom: f64,
    pub std_final_doom: f64,
    pub mean_peak_doom: f64,
    pub victory_pct: f64,
    pub doom_reached_pct: f64,
    pub bankrupt_pct: f64,
    pub unfinished_pct: f64,
    pub mean_events: f64,
    pub mean_unique_events: f64,
    pub mean_actions_applied: f64,
    pub mean_actions_failed: f64,
    pub mean_final_money: f64,
    pub mean_peak_staff: f64,
}

fn strategy_label<S: serde::Serializer>(
    strategy: &GameplayStrategy,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(strategy.key())
}

pub fn run_playability_analysis(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
    max_turns: u32,
    strategies: &[GameplayStrategy],
) -> Result<Vec<PlayabilityRecord>> {
    let iterations = iterations.max(1);
    let mut records = Vec::with_capacity(seeds.len() * strategies.len() * iterations);

    for &strategy in strategies {
        let plan = playability_plan(strategy, max_turns);
        for seed in seeds {
            for iteration in 0..iterations {
                let iteration_seed = seed.iteration(iteration);
                let policy_seed = seed
                    .policy_seed()
                    .wrapping_add(u64::try_from(iteration).unwrap_or(0));
                let context = || {
                    format!(
                        "Playability run failed for strategy {strategy}, seed {iteration_seed} (iteration {})",
                        iteration + 1
                    )
                };
                let summary = tester
                    .run_plan(&plan, &iteration_seed, policy_seed)
                    .with_context(context)?;
                for expectation in &plan.expectations {
                    expectation.evaluate(&summary).with_context(context)?;
                }

                records.push(PlayabilityRecord {
                    scenario_name: format!("Full Game - {strategy}"),
                    strategy,
                    seed_code: seed.label().to_string(),
                    final_digest: summary.turns.last().map_or(0, |t| t.digest),
                    seed: iteration_seed,
                    policy_seed,
                    metrics: summary.metrics,
                });
            }
        }
    }

    Ok(records)
}

#[must_use]
pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut aggregates: BTreeMap<String, AggregateBuilder> = BTreeMap::new();

    for record in records {
        let entry = aggregates
            .entry(record.scenario_name.clone())
            .or_insert_with(|| AggregateBuilder::new(record));
        entry.ingest(&record.metrics);
    }

    aggregates
        .into_values()
        .map(AggregateBuilder::finish)
        .collect()
}

/// Re-run the first record of each strategy and confirm it lands on the
/// same record digest.
///
/// # Errors
///
/// Returns an error naming the first strategy whose rerun diverged.
pub fn validate_playability_targets(
    tester: &GameTester,
    records: &[PlayabilityRecord],
    max_turns: u32,
) -> Result<()> {
    let mut checked: Vec<GameplayStrategy> = Vec::new();
    for record in records {
        if checked.contains(&record.strategy) {
            continue;
        }
        checked.push(record.strategy);
        let plan = playability_plan(record.strategy, max_turns);
        let rerun = tester.run_plan(&plan, &record.seed, record.policy_seed)?;
        let digest = rerun.turns.last().map_or(0, |t| t.digest);
        ensure!(
            digest == record.final_digest,
            "{} on seed {} is not deterministic",
            record.strategy,
            record.seed
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    scenario_name: String,
    strategy: GameplayStrategy,
    stats_turns: RunningStats,
    stats_final_doom: RunningStats,
    peak_doom_sum: f64,
    iterations: u32,
    victories: u32,
    doom_reached: u32,
    bankruptcies: u32,
    unfinished: u32,
    events_sum: u32,
    unique_events_sum: u32,
    applied_sum: u32,
    failed_sum: u32,
    final_money_sum: f64,
    peak_staff_sum: u32,
}

impl AggregateBuilder {
    fn new(record: &PlayabilityRecord) -> Self {
        Self {
            scenario_name: record.scenario_name.clone(),
            strategy: record.strategy,
            stats_turns: RunningStats::default(),
            stats_final_doom: RunningStats::default(),
            peak_doom_sum: 0.0,
            iterations: 0,
            victories: 0,
            doom_reached: 0,
            bankruptcies: 0,
            unfinished: 0,
            events_sum: 0,
            unique_events_sum: 0,
            applied_sum: 0,
            failed_sum: 0,
            final_money_sum: 0.0,
            peak_staff_sum: 0,
        }
    }

    fn ingest(&mut self, metrics: &PlayabilityMetrics) {
        self.iterations += 1;
        self.stats_turns.add(f64::from(metrics.turns_survived));
        self.stats_final_doom.add(metrics.final_doom);
        self.peak_doom_sum += metrics.peak_doom;
        if metrics.victory {
            self.victories += 1;
        }
        match metrics.ending_type.as_str() {
            "doom_reached" => self.doom_reached += 1,
            "bankrupt" => self.bankruptcies += 1,
            "unfinished" => self.unfinished += 1,
            _ => {}
        }
        self.events_sum = self.events_sum.saturating_add(metrics.events_faced);
        self.unique_events_sum = self.unique_events_sum.saturating_add(metrics.unique_events);
        self.applied_sum = self.applied_sum.saturating_add(metrics.actions_applied);
        self.failed_sum = self.failed_sum.saturating_add(metrics.actions_failed);
        self.final_money_sum += metrics.final_money;
        self.peak_staff_sum = self
            .peak_staff_sum
            .saturating_add(u32::try_from(metrics.peak_staff).unwrap_or(u32::MAX));
    }

    fn finish(self) -> PlayabilityAggregate {
        let denom = f64::from(self.iterations.max(1));
        PlayabilityAggregate {
            scenario_name: self.scenario_name,
            strategy: self.strategy,
            iterations: usize::try_from(self.iterations).unwrap_or(usize::MAX),
            mean_turns: self.stats_turns.mean(),
            std_turns: self.stats_turns.std_dev(),
            mean_final_doom: self.stats_final_doom.mean(),
            std_final_doom: self.stats_final_doom.std_dev(),
            mean_peak_doom: self.peak_doom_sum / denom,
            victory_pct: f64::from(self.victories) / denom,
            doom_reached_pct: f64::from(self.doom_reached) / denom,
            bankrupt_pct: f64::from(self.bankruptcies) / denom,
            unfinished_pct: f64::from(self.unfinished) / denom,
            mean_events: f64::from(self.events_sum) / denom,
            mean_unique_events: f64::from(self.unique_events_sum) / denom,
            mean_actions_applied: f64::from(self.applied_sum) / denom,
            mean_actions_failed: f64::from(self.failed_sum) / denom,
            mean_final_money: self.final_money_sum / denom,
            mean_peak_staff: f64::from(self.peak_staff_sum) / denom,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / f64::from(self.count - 1)
        } else {
            0.0
        }
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::try_new(false).unwrap()
    }

    fn base_metrics(ending: &str, turns: u32, final_doom: f64) -> PlayabilityMetrics {
        let mut metrics = PlayabilityMetrics::default();
        metrics.turns_survived = turns;
        metrics.ending_type = ending.to_string();
        metrics.victory = ending == "doom_averted";
        metrics.final_doom = final_doom;
        metrics.peak_doom = final_doom.max(50.0);
        metrics
    }

    fn base_record(strategy: GameplayStrategy, metrics: PlayabilityMetrics) -> PlayabilityRecord {
        PlayabilityRecord {
            scenario_name: format!("Full Game - {strategy}"),
            strategy,
            seed_code: "PD-LAB01".to_string(),
            seed: "PD-LAB01".to_string(),
            policy_seed: 0,
            final_digest: 0,
            metrics,
        }
    }

    #[test]
    fn generates_records_for_each_strategy() {
        let seeds = vec![SeedInfo::from_literal("PD-LENS04")];
        let strategies = [GameplayStrategy::SafetyFirst, GameplayStrategy::Growth];
        let records = run_playability_analysis(&tester(), &seeds, 2, 12, &strategies).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].seed, "PD-LENS04#1");
        assert!(records.iter().all(|r| r.metrics.turns_survived <= 12));
    }

    #[test]
    fn aggregates_match_record_counts() {
        let records = vec![
            base_record(GameplayStrategy::Balanced, base_metrics("doom_reached", 10, 100.0)),
            base_record(GameplayStrategy::Balanced, base_metrics("doom_averted", 20, 0.0)),
            base_record(GameplayStrategy::Growth, base_metrics("bankrupt", 4, 70.0)),
        ];
        let aggregates = aggregate_playability(&records);
        assert_eq!(aggregates.len(), 2);
        let balanced = aggregates
            .iter()
            .find(|a| a.strategy == GameplayStrategy::Balanced)
            .unwrap();
        assert_eq!(balanced.iterations, 2);
        assert!((balanced.mean_turns - 15.0).abs() < 1e-9);
        assert!((balanced.victory_pct - 0.5).abs() < 1e-9);
        assert!((balanced.doom_reached_pct - 0.5).abs() < 1e-9);
        assert!(balanced.std_final_doom > 0.0);
        let growth = aggregates
            .iter()
            .find(|a| a.strategy == GameplayStrategy::Growth)
            .unwrap();
        assert!((growth.bankrupt_pct - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reruns_reproduce_recorded_digests() {
        let tester = tester();
        let seeds = vec![SeedInfo::from_literal("PD-PROBE09")];
        let records =
            run_playability_analysis(&tester, &seeds, 1, 15, &[GameplayStrategy::Random]).unwrap();
        validate_playability_targets(&tester, &records, 15).unwrap();

        let mut tampered = records;
        tampered[0].final_digest ^= 1;
        assert!(validate_playability_targets(&tester, &tampered, 15).is_err());
    }

    #[test]
    fn running_stats_track_mean_and_spread() {
        let mut stats = RunningStats::default();
        assert!(stats.mean().abs() < f64::EPSILON);
        for value in [2.0, 4.0, 6.0] {
            stats.add(value);
        }
        assert!((stats.mean() - 4.0).abs() < 1e-9);
        assert!((stats.std_dev() - 2.0).abs() < 1e-9);
    }
}
