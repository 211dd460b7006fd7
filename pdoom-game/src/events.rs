//! Event engine: catalog trigger evaluation, risk-table selection, and option
//! resolution.
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::data::{EventDef, EventOption, GameData, Trigger};
use crate::economy::ResourceCost;
use crate::effects::{ActionParams, EffectOutcome, apply_effects};
use crate::error::ValidationError;
use crate::numbers::{count_to_f64, floor_f64_to_usize};
use crate::risk::{RiskPoolId, RiskSeverity, RiskTrigger, TriggerCause};
use crate::state::SessionState;

/// Why an event became pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSource {
    Catalog,
    Risk {
        pool: RiskPoolId,
        severity: RiskSeverity,
        cause: TriggerCause,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub event_id: String,
    /// Turn on which the event was enqueued.
    pub turn: u32,
    pub source: EventSource,
}

/// Explainability record for one risk-table selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionTrace {
    pub pool: RiskPoolId,
    pub severity: RiskSeverity,
    pub roll: f64,
    pub candidates: Vec<String>,
    pub chosen_id: Option<String>,
}

fn enqueue(state: &mut SessionState, event: &EventDef, source: EventSource) {
    if !event.repeatable {
        state.triggered_events.insert(event.id.clone());
    }
    state.pending_events.push_back(PendingEvent {
        event_id: event.id.clone(),
        turn: state.turn,
        source,
    });
}

fn is_eligible(state: &SessionState, event: &EventDef) -> bool {
    (event.repeatable || !state.triggered_events.contains(&event.id))
        && !state.is_pending(&event.id)
}

/// Evaluate `turn`, `threshold`, and `random` triggers in catalog order.
/// `random` triggers draw once, and only while their preconditions hold.
/// Returns the ids enqueued by this call.
pub fn evaluate_catalog_events(
    state: &mut SessionState,
    data: &GameData,
    cfg: &SimConfig,
) -> Vec<String> {
    let mut fired = Vec::new();
    for event in &data.events {
        if !is_eligible(state, event) {
            continue;
        }
        let triggered = match &event.trigger {
            Trigger::Turn { turn } => state.turn == *turn,
            Trigger::Threshold { condition } => state
                .failed_condition(std::slice::from_ref(condition), &cfg.staff)
                .is_none(),
            Trigger::Random { chance, requires } => {
                state.failed_condition(requires, &cfg.staff).is_none()
                    && state.rng.chance(*chance)
            }
            Trigger::Risk => false,
        };
        if triggered {
            enqueue(state, event, EventSource::Catalog);
            fired.push(event.id.clone());
        }
    }
    fired
}

/// Turn risk triggers into pending events. Each trigger draws exactly one
/// selection sample, in trigger order, even when its table has no eligible
/// entry.
pub fn enqueue_risk_events(
    state: &mut SessionState,
    data: &GameData,
    triggers: &[RiskTrigger],
) -> Vec<SelectionTrace> {
    let mut traces = Vec::with_capacity(triggers.len());
    for trigger in triggers {
        let roll = state.rng.roll();
        let candidates: Vec<&EventDef> = data
            .risk_table(trigger.pool)
            .map(|table| table.entries(trigger.severity))
            .unwrap_or_default()
            .iter()
            .filter_map(|id| data.event(id))
            .filter(|event| is_eligible(state, event))
            .collect();
        let chosen = if candidates.is_empty() {
            None
        } else {
            let idx = floor_f64_to_usize(roll * count_to_f64(candidates.len()))
                .min(candidates.len() - 1);
            candidates.get(idx).copied()
        };
        if let Some(event) = chosen {
            enqueue(state, event, EventSource::Risk {
                pool: trigger.pool,
                severity: trigger.severity,
                cause: trigger.cause,
            });
        }
        traces.push(SelectionTrace {
            pool: trigger.pool,
            severity: trigger.severity,
            roll,
            candidates: candidates.iter().map(|e| e.id.clone()).collect(),
            chosen_id: chosen.map(|e| e.id.clone()),
        });
    }
    traces
}

/// Result of resolving one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub event_id: String,
    pub option_id: String,
    pub message: String,
    pub outcome: EffectOutcome,
}

/// Pay an option's costs and apply its effects. Run against a scratch copy.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the option's AP or resource costs cannot
/// be met, or one of its effects cannot be satisfied.
pub fn resolve_option(
    state: &mut SessionState,
    event: &EventDef,
    option: &EventOption,
) -> Result<Resolution, ValidationError> {
    state
        .action_points
        .spend_event(option.event_ap)
        .map_err(|short| ValidationError::InsufficientActionPoints {
            needed: short.needed,
            available: short.available,
        })?;
    if let Some((resource, needed, available)) = state.resources.shortfall(&option.costs) {
        return Err(ValidationError::InsufficientResource {
            resource,
            needed,
            available,
        });
    }
    state.resources.pay(&option.costs);
    let source = format!("{}.{}", event.id, option.id);
    let outcome = apply_effects(state, &option.effects, &ActionParams::default(), &source)?;
    let message = option
        .message
        .clone()
        .unwrap_or_else(|| format!("{}: {}", event.name, option.label));
    Ok(Resolution {
        event_id: event.id.clone(),
        option_id: option.id.clone(),
        message,
        outcome,
    })
}

/// Option payload for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPresentation {
    pub id: String,
    pub label: String,
    pub costs: ResourceCost,
    pub event_ap: u32,
    /// Whether the option can be paid for right now.
    pub affordable: bool,
}

/// Event payload for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPresentation {
    pub event_id: String,
    pub name: String,
    pub desc: String,
    pub source: EventSource,
    pub options: Vec<OptionPresentation>,
}

impl EventPresentation {
    #[must_use]
    pub fn new(state: &SessionState, event: &EventDef, source: EventSource) -> Self {
        let capacity = state.action_points.event_capacity();
        let options = event
            .options
            .iter()
            .map(|opt| OptionPresentation {
                id: opt.id.clone(),
                label: opt.label.clone(),
                costs: opt.costs,
                event_ap: opt.event_ap,
                affordable: opt.event_ap <= capacity
                    && state.resources.shortfall(&opt.costs).is_none(),
            })
            .collect();
        Self {
            event_id: event.id.clone(),
            name: event.name.clone(),
            desc: event.desc.clone(),
            source,
            options,
        }
    }
}
