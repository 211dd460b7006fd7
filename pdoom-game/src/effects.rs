//! Shared effect vocabulary for actions and event options.
//!
//! Effects are applied in order against a scratch copy of the session; the
//! caller commits only when every effect succeeds. Effects never draw from the
//! RNG, so a rejected call leaves the stream untouched.
use serde::{Deserialize, Serialize};

use crate::constants::{BURNOUT_MAX, LOYALTY_MAX};
use crate::data::Effect;
use crate::error::ValidationError;
use crate::numbers::clamp_finite;
use crate::researcher::Specialization;
use crate::state::{Ending, SessionState};

/// Caller-supplied parameters for actions whose effects need a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<Specialization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researcher_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ActionParams {
    #[must_use]
    pub const fn hire(specialization: Specialization) -> Self {
        Self {
            specialization: Some(specialization),
            researcher_id: None,
            name: None,
        }
    }

    #[must_use]
    pub const fn researcher(id: u32) -> Self {
        Self {
            specialization: None,
            researcher_id: Some(id),
            name: None,
        }
    }
}

/// What a batch of effects changed beyond plain numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectOutcome {
    pub hired: Vec<u32>,
    pub departed: Vec<u32>,
    pub ended: bool,
}

/// Check that parameter-dependent effects can be satisfied, without mutating.
///
/// # Errors
///
/// Returns the first effect whose target is missing.
pub fn check_params(
    state: &SessionState,
    effects: &[Effect],
    params: &ActionParams,
    source: &str,
) -> Result<(), ValidationError> {
    for effect in effects {
        match effect {
            Effect::Hire {
                specialization: None,
            } if params.specialization.is_none() => {
                return Err(ValidationError::InvalidParams {
                    action: source.to_string(),
                    reason: String::from("a specialization is required"),
                });
            }
            Effect::Dismiss => {
                let id = params
                    .researcher_id
                    .ok_or_else(|| ValidationError::InvalidParams {
                        action: source.to_string(),
                        reason: String::from("a researcher id is required"),
                    })?;
                if state.researcher(id).is_none() {
                    return Err(ValidationError::UnknownResearcher(id));
                }
            }
            Effect::Poach | Effect::AddTrait { .. } if state.researchers.is_empty() => {
                return Err(ValidationError::StaffUnavailable(source.to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Apply effects in order. Stops at the first failure; the state may then be
/// partially modified, so callers run this on a scratch copy.
///
/// # Errors
///
/// Returns a [`ValidationError`] when an effect cannot be satisfied.
pub fn apply_effects(
    state: &mut SessionState,
    effects: &[Effect],
    params: &ActionParams,
    source: &str,
) -> Result<EffectOutcome, ValidationError> {
    check_params(state, effects, params, source)?;
    let mut outcome = EffectOutcome::default();
    for effect in effects {
        match effect {
            Effect::Resource { resource, amount } => state.resources.adjust(*resource, *amount),
            Effect::Doom { amount, label } => state
                .doom
                .add_event_contribution(label.as_deref().unwrap_or(source), *amount),
            Effect::Risk { pool, amount } => {
                state.risk.add_risk(*pool, *amount);
            }
            Effect::Hire { specialization } => {
                let spec = specialization
                    .or(params.specialization)
                    .ok_or_else(|| ValidationError::InvalidParams {
                        action: source.to_string(),
                        reason: String::from("a specialization is required"),
                    })?;
                outcome.hired.push(state.hire(spec, params.name.as_deref()));
            }
            Effect::Dismiss => {
                let id = params.researcher_id.ok_or_else(|| ValidationError::InvalidParams {
                    action: source.to_string(),
                    reason: String::from("a researcher id is required"),
                })?;
                state
                    .dismiss(id)
                    .ok_or(ValidationError::UnknownResearcher(id))?;
                outcome.departed.push(id);
            }
            Effect::Burnout { amount } => {
                for r in &mut state.researchers {
                    r.burnout = clamp_finite(r.burnout + amount, 0.0, BURNOUT_MAX);
                }
            }
            Effect::Loyalty { amount } => {
                for r in &mut state.researchers {
                    r.loyalty = clamp_finite(r.loyalty + amount, 0.0, LOYALTY_MAX);
                }
            }
            Effect::SalaryRaise { percent } => {
                let factor = 1.0 + percent / 100.0;
                for r in &mut state.researchers {
                    r.salary = (r.salary * factor).max(0.0);
                }
            }
            Effect::Poach => {
                // Ties go to the earliest hire.
                let target = state
                    .researchers
                    .iter()
                    .reduce(|least, r| if r.loyalty < least.loyalty { r } else { least })
                    .map(|r| r.id)
                    .ok_or_else(|| ValidationError::StaffUnavailable(source.to_string()))?;
                state.dismiss(target);
                outcome.departed.push(target);
            }
            Effect::AddTrait { researcher_trait } => {
                let target = match params.researcher_id {
                    Some(id) => state
                        .researchers
                        .iter_mut()
                        .find(|r| r.id == id)
                        .ok_or(ValidationError::UnknownResearcher(id))?,
                    None => state
                        .researchers
                        .iter_mut()
                        .rev()
                        .find(|r| !r.has_trait(*researcher_trait))
                        .ok_or_else(|| ValidationError::StaffUnavailable(source.to_string()))?,
                };
                target.traits.insert(*researcher_trait);
            }
            Effect::Victory { reason } => {
                outcome.ended |= set_ending(state, Ending::Victory {
                    reason: reason.clone(),
                });
            }
            Effect::Defeat { reason } => {
                outcome.ended |= set_ending(state, Ending::Defeat {
                    reason: reason.clone(),
                });
            }
        }
    }
    Ok(outcome)
}

/// Record the first ending reached; later endings are ignored.
fn set_ending(state: &mut SessionState, ending: Ending) -> bool {
    if state.ending.is_some() {
        return false;
    }
    state.ending = Some(ending);
    true
}
