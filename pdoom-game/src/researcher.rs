//! Staff records and aggregate productivity rules.
//!
//! Aggregate counts are always derived from the roster; nothing here caches a
//! head count.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::config::StaffConfig;
use crate::constants::{
    BURNOUT_MAX, CAUTIOUS_DOOM, HIRE_LOYALTY, HIRE_SKILL, LOYALTY_MAX, MENTOR_SKILL_BONUS,
    MERCENARY_SALARY_SENSITIVITY, RECKLESS_DOOM, SKILL_MAX, SKILL_MIN, WORKAHOLIC_BURNOUT,
    WORKAHOLIC_OUTPUT,
};
use crate::numbers::{clamp_finite, count_to_f64, floor_f64_to_usize};
use crate::rng::GameRng;

/// Research discipline of a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Safety,
    Capability,
    ComputeEngineering,
    Management,
    AlignmentTheory,
    Interpretability,
}

/// How a specialization feeds the doom model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoomRole {
    Safety,
    Capability,
    Neutral,
}

impl Specialization {
    pub const ALL: [Self; 6] = [
        Self::Safety,
        Self::Capability,
        Self::ComputeEngineering,
        Self::Management,
        Self::AlignmentTheory,
        Self::Interpretability,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Capability => "capability",
            Self::ComputeEngineering => "compute_engineering",
            Self::Management => "management",
            Self::AlignmentTheory => "alignment_theory",
            Self::Interpretability => "interpretability",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Safety => "Safety Researcher",
            Self::Capability => "Capability Researcher",
            Self::ComputeEngineering => "Compute Engineer",
            Self::Management => "Manager",
            Self::AlignmentTheory => "Alignment Theorist",
            Self::Interpretability => "Interpretability Researcher",
        }
    }

    /// Salary expectation of a fresh hire, per turn.
    #[must_use]
    pub const fn base_salary(self) -> f64 {
        match self {
            Self::Safety => 2_000.0,
            Self::Capability => 2_200.0,
            Self::ComputeEngineering => 2_400.0,
            Self::Management => 2_500.0,
            Self::AlignmentTheory | Self::Interpretability => 2_600.0,
        }
    }

    #[must_use]
    pub const fn doom_role(self) -> DoomRole {
        match self {
            Self::Safety | Self::AlignmentTheory | Self::Interpretability => DoomRole::Safety,
            Self::Capability | Self::ComputeEngineering => DoomRole::Capability,
            Self::Management => DoomRole::Neutral,
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|spec| spec.as_str() == s)
            .ok_or(())
    }
}

/// Persistent modifier attached to a researcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearcherTrait {
    Workaholic,
    Mercenary,
    Reckless,
    Mentor,
    Cautious,
}

impl ResearcherTrait {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workaholic => "workaholic",
            Self::Mercenary => "mercenary",
            Self::Reckless => "reckless",
            Self::Mentor => "mentor",
            Self::Cautious => "cautious",
        }
    }

    const fn output_multiplier(self) -> f64 {
        match self {
            Self::Workaholic => WORKAHOLIC_OUTPUT,
            _ => 1.0,
        }
    }

    const fn burnout_multiplier(self) -> f64 {
        match self {
            Self::Workaholic => WORKAHOLIC_BURNOUT,
            _ => 1.0,
        }
    }

    const fn salary_sensitivity(self) -> f64 {
        match self {
            Self::Mercenary => MERCENARY_SALARY_SENSITIVITY,
            _ => 1.0,
        }
    }

    const fn skill_growth_bonus(self) -> f64 {
        match self {
            Self::Mentor => MENTOR_SKILL_BONUS,
            _ => 0.0,
        }
    }

    /// Doom added per turn. Cautious staff only count while productive.
    const fn doom_modifier(self, productive: bool) -> f64 {
        match self {
            Self::Reckless => RECKLESS_DOOM,
            Self::Cautious if productive => CAUTIOUS_DOOM,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ResearcherTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Researcher {
    pub id: u32,
    pub name: String,
    pub specialization: Specialization,
    pub skill: u8,
    pub burnout: f64,
    pub loyalty: f64,
    pub salary_expectation: f64,
    pub salary: f64,
    #[serde(default)]
    pub traits: BTreeSet<ResearcherTrait>,
    pub hired_turn: u32,
}

impl Researcher {
    /// Fresh hire paid exactly what they expect.
    #[must_use]
    pub fn hire(id: u32, specialization: Specialization, name: Option<&str>, turn: u32) -> Self {
        let salary = specialization.base_salary();
        Self {
            id,
            name: name.map_or_else(
                || format!("{} {id}", specialization.title()),
                ToString::to_string,
            ),
            specialization,
            skill: HIRE_SKILL,
            burnout: 0.0,
            loyalty: HIRE_LOYALTY,
            salary_expectation: salary,
            salary,
            traits: BTreeSet::new(),
            hired_turn: turn,
        }
    }

    #[must_use]
    pub fn has_trait(&self, t: ResearcherTrait) -> bool {
        self.traits.contains(&t)
    }

    fn trait_product(&self, f: impl Fn(ResearcherTrait) -> f64) -> f64 {
        self.traits.iter().map(|t| f(*t)).product()
    }

    /// Research generated in one productive turn.
    #[must_use]
    pub fn research_output(&self, cfg: &StaffConfig) -> f64 {
        f64::from(self.skill)
            * cfg.research_per_skill
            * self.trait_product(ResearcherTrait::output_multiplier)
    }

    #[must_use]
    pub fn doom_modifier(&self, productive: bool) -> f64 {
        self.traits.iter().map(|t| t.doom_modifier(productive)).sum()
    }

    /// Checks the field bounds a persisted record must respect.
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        (SKILL_MIN..=SKILL_MAX).contains(&self.skill)
            && (0.0..=BURNOUT_MAX).contains(&self.burnout)
            && (0.0..=LOYALTY_MAX).contains(&self.loyalty)
            && self.salary.is_finite()
            && self.salary_expectation.is_finite()
    }
}

/// Why a researcher did or did not contribute this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Productive,
    NoCompute,
    Unmanaged,
}

/// Heads covered by management. `base_management_capacity` is a flat
/// allowance a lab gets before hiring any manager; each manager adds
/// `staff_per_manager` on top.
#[must_use]
pub const fn management_capacity(managers: usize, cfg: &StaffConfig) -> usize {
    cfg.base_management_capacity
        .saturating_add(cfg.staff_per_manager.saturating_mul(managers))
}

/// Per-researcher status in roster order.
///
/// Compute is handed out one unit per head in roster order. Heads beyond the
/// management capacity are the latest hires and are always unproductive.
#[must_use]
pub fn work_statuses(researchers: &[Researcher], compute: f64, cfg: &StaffConfig) -> Vec<WorkStatus> {
    let managers = researchers
        .iter()
        .filter(|r| r.specialization == Specialization::Management)
        .count();
    let capacity = management_capacity(managers, cfg);
    let compute_units = floor_f64_to_usize(compute);
    researchers
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            if idx >= capacity {
                WorkStatus::Unmanaged
            } else if idx >= compute_units {
                WorkStatus::NoCompute
            } else {
                WorkStatus::Productive
            }
        })
        .collect()
}

/// Derived head counts for one roster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StaffSummary {
    pub total: usize,
    pub safety: usize,
    pub capability: usize,
    pub compute_engineering: usize,
    pub managers: usize,
    pub alignment_theory: usize,
    pub interpretability: usize,
    pub management_capacity: usize,
    pub unmanaged: usize,
    pub no_compute: usize,
    pub productive: usize,
    /// Productive heads with the safety doom role.
    pub productive_safety: usize,
    /// Heads with the capability doom role, productive or not.
    pub capability_heads: usize,
    pub trait_doom: f64,
    pub max_burnout: f64,
    pub min_loyalty: f64,
}

impl StaffSummary {
    #[must_use]
    pub fn compute(researchers: &[Researcher], compute: f64, cfg: &StaffConfig) -> Self {
        let statuses = work_statuses(researchers, compute, cfg);
        let mut summary = Self {
            total: researchers.len(),
            min_loyalty: LOYALTY_MAX,
            ..Self::default()
        };
        for (researcher, status) in researchers.iter().zip(statuses.iter()) {
            let productive = *status == WorkStatus::Productive;
            match researcher.specialization {
                Specialization::Safety => summary.safety += 1,
                Specialization::Capability => summary.capability += 1,
                Specialization::ComputeEngineering => summary.compute_engineering += 1,
                Specialization::Management => summary.managers += 1,
                Specialization::AlignmentTheory => summary.alignment_theory += 1,
                Specialization::Interpretability => summary.interpretability += 1,
            }
            match status {
                WorkStatus::Productive => summary.productive += 1,
                WorkStatus::NoCompute => summary.no_compute += 1,
                WorkStatus::Unmanaged => summary.unmanaged += 1,
            }
            match researcher.specialization.doom_role() {
                DoomRole::Safety if productive => summary.productive_safety += 1,
                DoomRole::Capability => summary.capability_heads += 1,
                _ => {}
            }
            summary.trait_doom += researcher.doom_modifier(productive);
            summary.max_burnout = summary.max_burnout.max(researcher.burnout);
            summary.min_loyalty = summary.min_loyalty.min(researcher.loyalty);
        }
        summary.management_capacity = management_capacity(summary.managers, cfg);
        summary
    }

    #[must_use]
    pub const fn unproductive(&self) -> usize {
        self.total.saturating_sub(self.productive)
    }
}

/// Outcome of one turn of passive staff drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StaffTurnReport {
    pub research: f64,
    pub skill_ups: Vec<u32>,
}

/// Apply research generation, burnout accrual, skill growth, and loyalty
/// drift. Draws exactly one sample per researcher, in roster order.
pub fn apply_turn_drift(
    researchers: &mut [Researcher],
    compute: f64,
    cfg: &StaffConfig,
    rng: &mut GameRng,
) -> StaffTurnReport {
    let statuses = work_statuses(researchers, compute, cfg);
    let mut report = StaffTurnReport::default();
    for (researcher, status) in researchers.iter_mut().zip(statuses) {
        let growth_chance = cfg.skill_growth_chance
            + researcher
                .traits
                .iter()
                .map(|t| t.skill_growth_bonus())
                .sum::<f64>();
        if rng.chance(growth_chance) && researcher.skill < SKILL_MAX {
            researcher.skill += 1;
            report.skill_ups.push(researcher.id);
        }

        if status == WorkStatus::Productive {
            report.research += researcher.research_output(cfg);
        }

        let burnout_gain =
            cfg.burnout_per_turn * researcher.trait_product(ResearcherTrait::burnout_multiplier);
        researcher.burnout = clamp_finite(researcher.burnout + burnout_gain, 0.0, BURNOUT_MAX);

        let loyalty_delta = if researcher.salary >= researcher.salary_expectation {
            cfg.loyalty_fair_pay_gain
        } else {
            let gap = (researcher.salary_expectation - researcher.salary)
                / researcher.salary_expectation.max(1.0);
            -gap * cfg.loyalty_underpay_rate
                * researcher.trait_product(ResearcherTrait::salary_sensitivity)
        };
        researcher.loyalty = clamp_finite(researcher.loyalty + loyalty_delta, 0.0, LOYALTY_MAX);
    }
    report
}

/// Sum of current salaries.
#[must_use]
pub fn payroll(researchers: &[Researcher]) -> f64 {
    researchers.iter().map(|r| r.salary).sum()
}

/// AP granted per head on top of the base allowance.
#[must_use]
pub fn staff_action_points(total_staff: usize, per_staff: f64) -> u32 {
    crate::numbers::floor_f64_to_u32(count_to_f64(total_staff) * per_staff)
}
