//! Action catalog policy: selection checks, application, affordability.
use crate::config::SimConfig;
use crate::data::{ActionDef, GameData};
use crate::economy::{ResourceCost, Resources};
use crate::effects::{ActionParams, EffectOutcome, apply_effects, check_params};
use crate::error::ValidationError;
use crate::state::SessionState;

/// Resources left once every queued action has paid its costs.
#[must_use]
pub fn projected_resources(state: &SessionState, data: &GameData) -> Resources {
    let queued = state
        .queued_actions
        .iter()
        .filter_map(|q| data.action(&q.action_id))
        .fold(ResourceCost::default(), |acc, action| acc.plus(&action.costs));
    state.resources.minus(&queued)
}

fn check_costs(resources: &Resources, costs: &ResourceCost) -> Result<(), ValidationError> {
    match resources.shortfall(costs) {
        Some((resource, needed, available)) => Err(ValidationError::InsufficientResource {
            resource,
            needed,
            available,
        }),
        None => Ok(()),
    }
}

fn check_requirements(
    state: &SessionState,
    action: &ActionDef,
    cfg: &SimConfig,
) -> Result<(), ValidationError> {
    match state.failed_condition(&action.requires, &cfg.staff) {
        Some(cond) => Err(ValidationError::RequirementNotMet(cond.to_string())),
        None => Ok(()),
    }
}

/// Everything `select_action` checks before committing AP.
///
/// # Errors
///
/// Returns the first failed check: AP, projected resources, requirements,
/// then parameters.
pub fn validate_selection(
    state: &SessionState,
    data: &GameData,
    action: &ActionDef,
    params: &ActionParams,
    cfg: &SimConfig,
) -> Result<(), ValidationError> {
    let available = state.action_points.available();
    if action.ap_cost > available {
        return Err(ValidationError::InsufficientActionPoints {
            needed: action.ap_cost,
            available,
        });
    }
    check_costs(&projected_resources(state, data), &action.costs)?;
    check_requirements(state, action, cfg)?;
    check_params(state, &action.effects, params, &action.id)
}

/// Pay for and apply one action. Run against a scratch copy; on error the
/// copy is discarded.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the action is no longer affordable or
/// one of its effects cannot be satisfied.
pub fn apply_action(
    state: &mut SessionState,
    action: &ActionDef,
    params: &ActionParams,
    cfg: &SimConfig,
) -> Result<EffectOutcome, ValidationError> {
    check_costs(&state.resources, &action.costs)?;
    check_requirements(state, action, cfg)?;
    state.resources.pay(&action.costs);
    apply_effects(state, &action.effects, params, &action.id)
}

/// Catalog actions the player could queue right now, ignoring parameters.
#[must_use]
pub fn available_actions<'a>(
    state: &SessionState,
    data: &'a GameData,
    cfg: &SimConfig,
) -> Vec<&'a ActionDef> {
    let projected = projected_resources(state, data);
    let available = state.action_points.available();
    data.actions
        .iter()
        .filter(|action| action.ap_cost <= available)
        .filter(|action| projected.shortfall(&action.costs).is_none())
        .filter(|action| state.failed_condition(&action.requires, &cfg.staff).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::ResourceKind;
    use crate::state::QueuedAction;

    fn catalog() -> GameData {
        GameData::from_json(
            r#"{"actions": [
                {"id": "grant", "name": "Grant", "ap_cost": 1, "costs": {"money": 40000}},
                {"id": "retreat", "name": "Retreat", "ap_cost": 2, "requires": ["staff >= 5"]},
                {"id": "hire", "name": "Hire", "effects": [{"kind": "hire"}]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn queued_costs_reduce_projected_resources() {
        let cfg = SimConfig::default();
        let data = catalog();
        let mut state = SessionState::new("S1", &cfg);
        state.action_points.begin_turn(4);
        let grant = data.action("grant").unwrap();
        validate_selection(&state, &data, grant, &ActionParams::default(), &cfg).unwrap();
        state.queued_actions.push(QueuedAction {
            action_id: "grant".into(),
            params: ActionParams::default(),
            ap_cost: 1,
        });
        let err =
            validate_selection(&state, &data, grant, &ActionParams::default(), &cfg).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientResource {
                resource: ResourceKind::Money,
                needed: 40000.0,
                available: 20000.0,
            }
        );
    }

    #[test]
    fn requirements_and_params_are_checked() {
        let cfg = SimConfig::default();
        let data = catalog();
        let mut state = SessionState::new("S1", &cfg);
        state.action_points.begin_turn(4);
        let retreat = data.action("retreat").unwrap();
        assert_eq!(
            validate_selection(&state, &data, retreat, &ActionParams::default(), &cfg),
            Err(ValidationError::RequirementNotMet("staff >= 5".into()))
        );
        let hire = data.action("hire").unwrap();
        assert!(matches!(
            validate_selection(&state, &data, hire, &ActionParams::default(), &cfg),
            Err(ValidationError::InvalidParams { .. })
        ));

        let ids: Vec<&str> = available_actions(&state, &data, &cfg)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["grant", "hire"]);
    }

    #[test]
    fn apply_pays_costs_then_runs_effects() {
        let cfg = SimConfig::default();
        let data = catalog();
        let mut state = SessionState::new("S1", &cfg);
        let grant = data.action("grant").unwrap();
        apply_action(&mut state, grant, &ActionParams::default(), &cfg).unwrap();
        assert!((state.resources.money - 20000.0).abs() < f64::EPSILON);
        assert!(apply_action(&mut state, grant, &ActionParams::default(), &cfg).is_err());
    }
}
