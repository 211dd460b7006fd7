use std::collections::BTreeMap;

use pdoom_game::{
    ActionParams, GameData, GameRng, Notification, Phase, RivalLabs, SessionState, SimConfig,
    Specialization, TurnController, ValidationError,
};

const SEEDS: [&str; 6] = ["S1", "PD-GPU07", "inv-1", "inv-2", "inv-3", "long haul"];

fn controller() -> TurnController {
    TurnController::with_rival(
        GameData::bundled().unwrap(),
        SimConfig::default(),
        Box::new(RivalLabs::default()),
    )
}

fn check(ctl: &TurnController, state: &SessionState) {
    state
        .validate(ctl.data(), ctl.config())
        .unwrap_or_else(|err| panic!("turn {}: {err}", state.turn));
    assert!((0.0..=100.0).contains(&state.doom()));
    let staff = state.staff_summary(&ctl.config().staff);
    assert_eq!(staff.total, state.researchers.len());
    assert_eq!(staff.safety, state.count(Specialization::Safety));
    assert_eq!(staff.capability, state.count(Specialization::Capability));
}

/// Resolve every pending event with the first option that succeeds.
fn settle(ctl: &mut TurnController, state: &mut SessionState) {
    while state.phase == Phase::EventResolution {
        let pending = state.pending_events[0].event_id.clone();
        let options: Vec<String> = ctl
            .data()
            .event(&pending)
            .unwrap()
            .options
            .iter()
            .map(|o| o.id.clone())
            .collect();
        assert!(
            options
                .iter()
                .any(|o| ctl.resolve_event(state, &pending, o).is_ok()),
            "{pending} could not be resolved"
        );
    }
}

fn random_params(policy: &mut GameRng, state: &SessionState) -> ActionParams {
    let spec = Specialization::ALL[policy.index(Specialization::ALL.len()).unwrap_or(0)];
    let mut params = ActionParams::hire(spec);
    if let Some(i) = policy.index(state.researchers.len()) {
        params.researcher_id = Some(state.researchers[i].id);
    }
    params
}

/// Drive a session with a seeded random player, checking invariants after
/// every call. Returns how many times each event id was enqueued.
fn fuzz(seed: &str, turns: u32) -> BTreeMap<String, usize> {
    let mut ctl = controller();
    let mut state = SessionState::new(seed, ctl.config());
    let mut policy = GameRng::from_seed_str(&format!("policy:{seed}"));
    let mut enqueued: BTreeMap<String, usize> = BTreeMap::new();

    while state.turn < turns && !state.is_over() {
        let report = ctl.start_turn(&mut state).unwrap();
        check(&ctl, &state);
        for id in report
            .catalog_events
            .iter()
            .chain(report.risk_selections.iter().filter_map(|t| t.chosen_id.as_ref()))
        {
            *enqueued.entry(id.clone()).or_default() += 1;
        }

        while state.phase == Phase::EventResolution {
            let pending = state.pending_events[0].event_id.clone();
            let options: Vec<String> = ctl
                .data()
                .event(&pending)
                .unwrap()
                .options
                .iter()
                .map(|o| o.id.clone())
                .collect();
            let start = policy.index(options.len()).unwrap_or(0);
            let resolved = (0..options.len()).any(|k| {
                let option = &options[(start + k) % options.len()];
                ctl.resolve_event(&mut state, &pending, option).is_ok()
            });
            assert!(resolved, "{pending} could not be resolved");
            check(&ctl, &state);
        }
        if state.is_over() {
            break;
        }

        let attempts = 1 + policy.index(4).unwrap_or(0);
        for _ in 0..attempts {
            let available: Vec<String> = ctl
                .available_actions(&state)
                .iter()
                .map(|a| a.id.clone())
                .collect();
            let Some(i) = policy.index(available.len()) else {
                break;
            };
            let params = random_params(&mut policy, &state);
            let before = state.clone();
            if ctl.select_action(&mut state, &available[i], params).is_err() {
                assert_eq!(state, before, "rejected selection mutated state");
            }
            check(&ctl, &state);
        }
        if policy.chance(0.3) && state.action_points.available() > 0 {
            ctl.reserve_action_points(&mut state, 1).unwrap();
        }
        if state.queued_actions.is_empty() {
            ctl.select_action(&mut state, "hold_position", ActionParams::default())
                .unwrap();
        }
        ctl.execute_turn(&mut state).unwrap();
        check(&ctl, &state);
        ctl.drain_notifications();
    }
    enqueued
}

#[test]
fn invariants_hold_under_random_play() {
    for seed in SEEDS {
        fuzz(seed, 40);
    }
}

#[test]
fn non_repeatable_events_fire_at_most_once() {
    let data = GameData::bundled().unwrap();
    for seed in SEEDS {
        for (id, count) in fuzz(seed, 40) {
            let event = data.event(&id).unwrap();
            if !event.repeatable {
                assert_eq!(count, 1, "{id} fired {count} times for seed {seed}");
            }
        }
    }
}

#[test]
fn rejected_calls_leave_records_untouched() {
    let mut ctl = controller();
    let mut state = SessionState::new("S1", ctl.config());
    let record = state.to_record().unwrap();

    assert!(matches!(
        ctl.select_action(&mut state, "strategy_session", ActionParams::default()),
        Err(ValidationError::WrongPhase { .. })
    ));
    assert!(ctl.execute_turn(&mut state).is_err());
    assert!(ctl.resolve_event(&mut state, "board_review", "present_roadmap").is_err());
    assert!(ctl.cancel_action(&mut state, 0).is_err());
    assert_eq!(state.to_record().unwrap(), record);

    let errors = ctl
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::Error { .. }))
        .count();
    assert_eq!(errors, 4);

    ctl.start_turn(&mut state).unwrap();
    settle(&mut ctl, &mut state);
    let record = state.to_record().unwrap();
    assert!(matches!(
        ctl.select_action(&mut state, "no_such_action", ActionParams::default()),
        Err(ValidationError::UnknownAction(_))
    ));
    assert!(matches!(
        ctl.select_action(&mut state, "hire_researcher", ActionParams::default()),
        Err(ValidationError::InvalidParams { .. })
    ));
    assert!(matches!(
        ctl.execute_turn(&mut state),
        Err(ValidationError::EmptyQueue)
    ));
    assert_eq!(state.to_record().unwrap(), record);
}

#[test]
fn doom_stays_clamped_with_extreme_config() {
    let mut cfg = SimConfig::default();
    cfg.doom.capability_rate = 40.0;
    cfg.start.money = 1e9;
    cfg.start.staff[1].count = 10;
    let mut ctl = TurnController::new(GameData::bundled().unwrap(), cfg);
    let mut state = SessionState::new("EXTREME", ctl.config());
    while !state.is_over() {
        ctl.start_turn(&mut state).unwrap();
        settle(&mut ctl, &mut state);
        if state.is_over() {
            break;
        }
        ctl.select_action(&mut state, "hold_position", ActionParams::default())
            .unwrap();
        ctl.execute_turn(&mut state).unwrap();
        assert!((0.0..=100.0).contains(&state.doom()));
        assert!(state.doom.momentum.abs() <= ctl.config().doom.momentum_cap);
    }
    assert!(state.turn <= 5);
}
