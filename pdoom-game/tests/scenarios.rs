use std::sync::Arc;

use pdoom_game::events::evaluate_catalog_events;
use pdoom_game::{
    ActionParams, Ending, GameData, Phase, RiskPoolId, RiskPools, SessionState, SimConfig,
    Specialization, StartingHire, TurnController, ValidationError,
};

const EPS: f64 = 1e-9;

fn fixture_catalog() -> Arc<GameData> {
    Arc::new(
        GameData::from_json(
            r#"{
            "actions": [
                {"id": "noop", "name": "Noop", "ap_cost": 1},
                {"id": "big_push", "name": "Big Push", "ap_cost": 2}
            ],
            "events": [
                {"id": "seventh_turn", "name": "Seventh Turn",
                 "trigger": {"kind": "turn", "turn": 7},
                 "options": [{"id": "ack", "label": "Acknowledge"}]}
            ]
        }"#,
        )
        .unwrap(),
    )
}

fn carryover_catalog() -> Arc<GameData> {
    Arc::new(
        GameData::from_json(
            r#"{
            "actions": [{"id": "noop", "name": "Noop", "ap_cost": 1}],
            "events": [
                {"id": "briefing", "name": "Briefing",
                 "trigger": {"kind": "turn", "turn": 2},
                 "options": [{"id": "attend", "label": "Attend", "event_ap": 1}]},
                {"id": "audit", "name": "Audit",
                 "trigger": {"kind": "turn", "turn": 2},
                 "options": [{"id": "sign", "label": "Sign", "event_ap": 2}]}
            ]
        }"#,
        )
        .unwrap(),
    )
}

fn reserve_two_and_end_turn(ctl: &mut TurnController, state: &mut SessionState) {
    ctl.start_turn(state).unwrap();
    assert_eq!(state.action_points.total, 3);
    ctl.select_action(state, "noop", ActionParams::default())
        .unwrap();
    ctl.reserve_action_points(state, 2).unwrap();
    ctl.execute_turn(state).unwrap();
    assert_eq!(state.phase, Phase::TurnStart);
    assert_eq!(state.action_points.reserved, 2);
}

fn config_with_staff(staff: &[(Specialization, u32)], compute: f64) -> SimConfig {
    let mut cfg = SimConfig::default();
    cfg.start.money = 1_000_000.0;
    cfg.start.compute = compute;
    cfg.start.staff = staff
        .iter()
        .map(|&(specialization, count)| StartingHire {
            specialization,
            count,
        })
        .collect();
    cfg
}

fn one_turn(ctl: &mut TurnController, state: &mut SessionState) -> pdoom_game::TurnReport {
    ctl.start_turn(state).unwrap();
    assert_eq!(state.phase, Phase::ActionSelection);
    ctl.select_action(state, "noop", ActionParams::default())
        .unwrap();
    ctl.execute_turn(state).unwrap()
}

#[test]
fn safety_team_pulls_doom_down_with_negative_momentum() {
    let cfg = config_with_staff(
        &[(Specialization::Safety, 4), (Specialization::Management, 1)],
        100.0,
    );
    let mut ctl = TurnController::new(fixture_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    assert!((state.doom() - 50.0).abs() < EPS);

    let doom = one_turn(&mut ctl, &mut state).doom.unwrap();
    assert!((doom.raw_change + 13.0).abs() < EPS, "raw {}", doom.raw_change);
    assert!((state.doom.momentum + 1.95).abs() < EPS);
    assert!((state.doom() - 37.0).abs() < EPS);
    assert_eq!(state.phase, Phase::TurnStart);
}

#[test]
fn capability_team_spirals_upward() {
    let cfg = config_with_staff(&[(Specialization::Capability, 5)], 10.0);
    let mut ctl = TurnController::new(fixture_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());

    let first = one_turn(&mut ctl, &mut state).doom.unwrap();
    let second = one_turn(&mut ctl, &mut state).doom.unwrap();
    let third = one_turn(&mut ctl, &mut state).doom.unwrap();

    assert!((first.total_change - 16.0).abs() < EPS);
    assert!(second.momentum_after > 0.0);
    assert!(third.momentum_applied > 0.0);
    assert!(third.total_change > first.total_change);
    assert!((third.total_change - 20.608).abs() < 1e-6);
    assert!((state.doom() - 100.0).abs() < EPS);
    assert_eq!(state.ending, Some(Ending::DoomReached));
    assert_eq!(state.phase, Phase::GameOver);
}

#[test]
fn risk_pool_clamps_at_maximum() {
    let mut pools = RiskPools::default();
    pools.add_risk(RiskPoolId::SafetyDebt, 49.0);
    let value = pools.add_risk(RiskPoolId::SafetyDebt, 60.0);
    assert!((value - 100.0).abs() < EPS);
    assert!((pools.value(RiskPoolId::SafetyDebt) - 100.0).abs() < EPS);
}

#[test]
fn reserved_points_block_further_selection() {
    let cfg = config_with_staff(&[(Specialization::Safety, 1)], 10.0);
    let mut ctl = TurnController::new(fixture_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    ctl.start_turn(&mut state).unwrap();
    assert_eq!(state.action_points.total, 3);

    ctl.select_action(&mut state, "big_push", ActionParams::default())
        .unwrap();
    ctl.reserve_action_points(&mut state, 1).unwrap();
    assert_eq!(state.action_points.available(), 0);

    let before = state.clone();
    let err = ctl
        .select_action(&mut state, "noop", ActionParams::default())
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::InsufficientActionPoints {
            needed: 1,
            available: 0
        }
    );
    assert_eq!(state, before);
}

#[test]
fn non_repeatable_turn_event_fires_once() {
    let cfg = config_with_staff(&[(Specialization::Safety, 1)], 10.0);
    let mut ctl = TurnController::new(fixture_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    for _ in 0..6 {
        one_turn(&mut ctl, &mut state);
    }

    let report = ctl.start_turn(&mut state).unwrap();
    assert_eq!(state.turn, 7);
    assert_eq!(report.catalog_events, vec!["seventh_turn"]);
    assert_eq!(state.phase, Phase::EventResolution);

    let again = evaluate_catalog_events(&mut state, ctl.data(), ctl.config());
    assert!(again.is_empty());
    assert_eq!(state.pending_events.len(), 1);

    ctl.resolve_event(&mut state, "seventh_turn", "ack").unwrap();
    assert_eq!(state.phase, Phase::ActionSelection);
    assert!(evaluate_catalog_events(&mut state, ctl.data(), ctl.config()).is_empty());
    assert!(state.pending_events.is_empty());
}

#[test]
fn reserve_carries_into_next_event_window_then_drops() {
    let cfg = config_with_staff(&[(Specialization::Safety, 1)], 10.0);
    let mut ctl = TurnController::new(carryover_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    reserve_two_and_end_turn(&mut ctl, &mut state);

    let report = ctl.start_turn(&mut state).unwrap();
    assert_eq!(report.catalog_events, vec!["briefing", "audit"]);
    assert_eq!(state.phase, Phase::EventResolution);
    assert_eq!(state.action_points.reserved, 2);
    assert_eq!(state.action_points.committed, 0);
    assert_eq!(state.action_points.available(), 1);

    ctl.resolve_event(&mut state, "briefing", "attend").unwrap();
    assert_eq!(state.action_points.used_event, 1);
    assert_eq!(state.action_points.committed, 0);
    assert_eq!(state.phase, Phase::EventResolution);

    let record = state.to_record().unwrap();
    let mut restored = SessionState::from_record(&record, ctl.data(), ctl.config()).unwrap();
    assert_eq!(restored, state);

    // One AP left in the reserve, the second comes out of the open budget.
    ctl.resolve_event(&mut state, "audit", "sign").unwrap();
    ctl.resolve_event(&mut restored, "audit", "sign").unwrap();
    assert_eq!(restored, state);
    assert_eq!(state.phase, Phase::ActionSelection);
    assert_eq!(state.action_points.reserved, 0);
    assert_eq!(state.action_points.used_event, 0);
    assert_eq!(state.action_points.committed, 1);
    assert_eq!(state.action_points.available(), 2);
}

#[test]
fn reserve_is_forfeited_when_no_events_are_pending() {
    let cfg = config_with_staff(&[(Specialization::Safety, 1)], 10.0);
    let mut ctl = TurnController::new(fixture_catalog(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    ctl.start_turn(&mut state).unwrap();
    ctl.select_action(&mut state, "noop", ActionParams::default())
        .unwrap();
    ctl.reserve_action_points(&mut state, 2).unwrap();
    ctl.execute_turn(&mut state).unwrap();
    assert_eq!(state.action_points.reserved, 2);

    ctl.start_turn(&mut state).unwrap();
    assert_eq!(state.phase, Phase::ActionSelection);
    assert_eq!(state.action_points.reserved, 0);
    assert_eq!(state.action_points.available(), 3);
}

#[test]
fn empty_lab_skips_loyalty_events() {
    let mut cfg = SimConfig::default();
    cfg.start.staff.clear();
    let mut ctl = TurnController::new(GameData::bundled().unwrap(), cfg);
    let mut state = SessionState::new("S1", ctl.config());
    let report = ctl.start_turn(&mut state).unwrap();
    assert!(state.researchers.is_empty());
    assert!(!report.catalog_events.iter().any(|id| id == "recruiter_calls"));
    assert!(!state.is_pending("recruiter_calls"));
}
