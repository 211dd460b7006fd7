use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::{PlayabilityAggregate, PlayabilityRecord, ScenarioResult};

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (passed as f64 / results.len() as f64) * 100.0
}

/// # Errors
///
/// Returns an error if writing fails.
pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    aggregates: &[PlayabilityAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
        writeln!(out)?;
    }

    if !aggregates.is_empty() {
        writeln!(out, "{}", "🎲 Playability Summary".bright_magenta().bold())?;
        writeln!(out, "{}", "======================".magenta())?;
        for agg in aggregates {
            writeln!(out, "{} ({} runs)", agg.scenario_name.bold(), agg.iterations)?;
            writeln!(
                out,
                "   Turns: {:.1} ± {:.1} | Final doom: {:.1} ± {:.1} | Peak doom: {:.1}",
                agg.mean_turns,
                agg.std_turns,
                agg.mean_final_doom,
                agg.std_final_doom,
                agg.mean_peak_doom
            )?;
            writeln!(
                out,
                "   Victory {:.0}% | Doom reached {:.0}% | Bankrupt {:.0}% | Unfinished {:.0}%",
                agg.victory_pct * 100.0,
                agg.doom_reached_pct * 100.0,
                agg.bankrupt_pct * 100.0,
                agg.unfinished_pct * 100.0
            )?;
            writeln!(
                out,
                "   Events {:.1} ({:.1} unique) | Actions {:.1} applied, {:.1} failed | Money ${:.0} | Peak staff {:.1}",
                agg.mean_events,
                agg.mean_unique_events,
                agg.mean_actions_applied,
                agg.mean_actions_failed,
                agg.mean_final_money,
                agg.mean_peak_staff
            )?;
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if serialisation or writing fails.
pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

/// # Errors
///
/// Returns an error if writing fails.
pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# P(Doom) Logic Test Results\n")?;
    writeln!(
        out,
        "_Generated {}_\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(
            out,
            "### {} {} (`{}`)\n",
            status, result.scenario_name, result.seed
        )?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// # Errors
///
/// Returns an error if writing fails.
pub fn generate_csv_report(out: &mut dyn Write, records: &[PlayabilityRecord]) -> Result<()> {
    writeln!(
        out,
        "scenario,strategy,seed_code,seed,turns,ending,victory,final_doom,peak_doom,lowest_doom,final_money,lowest_money,final_staff,peak_staff,events,unique_events,actions_applied,actions_failed,selections_rejected,violations"
    )?;
    for record in records {
        let m = &record.metrics;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.0},{:.0},{},{},{},{},{},{},{},{}",
            csv_field(&record.scenario_name),
            record.strategy.key(),
            csv_field(&record.seed_code),
            csv_field(&record.seed),
            m.turns_survived,
            m.ending_type,
            m.victory,
            m.final_doom,
            m.peak_doom,
            m.lowest_doom,
            m.final_money,
            m.lowest_money,
            m.final_staff,
            m.peak_staff,
            m.events_faced,
            m.unique_events,
            m.actions_applied,
            m.actions_failed,
            m.selections_rejected,
            m.invariant_violations.len()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameplayStrategy;
    use crate::logic::game_tester::PlayabilityMetrics;

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "smoke".to_string(),
            seed: "PD-LAB01".to_string(),
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["turn 4: doom out of range".to_string()]
            },
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn markdown_lists_failures() {
        let text = render(|out| generate_markdown_report(out, &[sample_result(false)]));
        assert!(text.starts_with("# P(Doom) Logic Test Results"));
        assert!(text.contains("- **Failed**: 1"));
        assert!(text.contains("doom out of range"));
    }

    #[test]
    fn console_handles_empty_results() {
        let text = render(|out| generate_console_report(out, &[], &[], Duration::ZERO));
        assert!(text.contains("Success rate: 0.0%"));
        assert!(!text.contains("Performance Summary"));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let mut metrics = PlayabilityMetrics::default();
        metrics.turns_survived = 9;
        metrics.ending_type = "doom_reached".to_string();
        let record = PlayabilityRecord {
            scenario_name: "Full Game - Growth".to_string(),
            strategy: GameplayStrategy::Growth,
            seed_code: "lab, north".to_string(),
            seed: "lab, north".to_string(),
            policy_seed: 0,
            final_digest: 0,
            metrics,
        };
        let text = render(|out| generate_csv_report(out, &[record]));
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("scenario,strategy,seed_code"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("Full Game - Growth,growth,\"lab, north\""));
        assert!(row.contains(",9,doom_reached,false,"));
    }
}
