use std::collections::BTreeSet;

use pdoom_game::{Effect, GameData, RiskPoolId, RiskSeverity, SimConfig, Trigger};

fn catalog() -> GameData {
    GameData::load_from_static().unwrap()
}

#[test]
fn every_event_has_a_free_option() {
    let needs_staff =
        |e: &Effect| matches!(e, Effect::Poach | Effect::AddTrait { .. } | Effect::Dismiss);
    for event in &catalog().events {
        assert!(
            event.options.iter().any(|o| o.event_ap == 0
                && o.costs.is_free()
                && !o.effects.iter().any(needs_staff)),
            "{} can deadlock event resolution",
            event.id
        );
    }
}

#[test]
fn a_turn_can_always_be_ended() {
    let data = catalog();
    assert!(
        data.actions
            .iter()
            .any(|a| a.ap_cost == 0 && a.costs.is_free() && a.requires.is_empty()),
        "no zero-cost action to end a turn with"
    );
}

#[test]
fn every_risk_event_is_reachable_from_a_table() {
    let data = catalog();
    let tabled: BTreeSet<&str> = RiskPoolId::ALL
        .iter()
        .filter_map(|pool| data.risk_table(*pool))
        .flat_map(|table| {
            [
                RiskSeverity::Minor,
                RiskSeverity::Moderate,
                RiskSeverity::Major,
                RiskSeverity::Critical,
            ]
            .into_iter()
            .flat_map(move |sev| table.entries(sev).iter().map(String::as_str))
        })
        .collect();
    for event in &data.events {
        if matches!(event.trigger, Trigger::Risk) {
            assert!(tabled.contains(event.id.as_str()), "{} is unreachable", event.id);
        }
    }
    for pool in RiskPoolId::ALL {
        let table = data.risk_table(pool).unwrap();
        assert!(
            !table.entries(RiskSeverity::Critical).is_empty(),
            "{pool} has no critical entry"
        );
    }
}

#[test]
fn parameterised_actions_are_flagged() {
    let data = catalog();
    let hire = data.action("hire_researcher").unwrap();
    assert!(hire.effects.iter().any(Effect::needs_params));
    let audit = data.action("safety_audit").unwrap();
    assert!(!audit.effects.iter().any(Effect::needs_params));
}

#[test]
fn endings_are_authored_in_data() {
    let data = catalog();
    let mut victories = 0;
    let mut defeats = 0;
    for option in data.events.iter().flat_map(|e| &e.options) {
        for effect in &option.effects {
            match effect {
                Effect::Victory { .. } => victories += 1,
                Effect::Defeat { .. } => defeats += 1,
                _ => {}
            }
        }
    }
    assert!(victories >= 1);
    assert!(defeats >= 1);
}

#[test]
fn default_config_validates_and_matches_reference_balance() {
    let cfg = SimConfig::default();
    cfg.validate().unwrap();
    assert!((cfg.doom.starting_doom - 50.0).abs() < f64::EPSILON);
    assert!((cfg.doom.safety_rate + 3.5).abs() < f64::EPSILON);
    assert!((cfg.doom.capability_rate - 3.0).abs() < f64::EPSILON);
    assert!(cfg.risk.passive_decay.abs() < f64::EPSILON);
}
