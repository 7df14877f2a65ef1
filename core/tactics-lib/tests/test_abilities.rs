//! 能力流程測試：消耗、冷卻、狀態效果跨回合的影響

mod test_helpers;

use tactics_lib::constants::{PLAYER_A_ID, PLAYER_B_ID, SPENT_COOLDOWN};
use tactics_lib::core_types::{Phase, StatusKind, UnitType};
use tactics_lib::error::{ActionError, ErrorCategory};
use tactics_lib::logic::ability::AbilityTarget;
use tactics_lib::logic::spatial::manhattan_distance;
use tactics_lib::session::{GameEvent, GameSession};
use test_helpers::{battle_session, battle_state, pos, set_hp};

fn end_rounds(session: &mut GameSession, rounds: usize) {
    for _ in 0..rounds {
        session.end_turn().unwrap();
        session.end_turn().unwrap();
    }
}

#[test]
fn test_cost_checked_before_effect() {
    let (mut state, catalog, config) = battle_state(
        "a b",
        &[
            (UnitType::Executive, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(1, 0)),
        ],
    );
    set_hp(&mut state, 2, 1);
    state.units.get_mut(&1).unwrap().actions_remaining = 1;
    let mut session = GameSession::from_state(state, catalog, config);
    let before = serde_json::to_value(session.state()).unwrap();

    let err = session
        .use_ability(1, "layoff", AbilityTarget::Unit(2))
        .unwrap_err();
    assert_eq!(
        err,
        ActionError::InsufficientResources {
            needed: 2,
            available: 1,
        }
    );
    assert_eq!(session.unit(2).unwrap().hp, 1);
    assert_eq!(session.unit(1).unwrap().cooldown("layoff"), 0);
    assert_eq!(serde_json::to_value(session.state()).unwrap(), before);
}

#[test]
fn test_one_time_ability_is_spent() {
    let (mut state, catalog, config) = battle_state(
        "
        a b
        . b
        ",
        &[
            (UnitType::Executive, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(1, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(1, 1)),
        ],
    );
    set_hp(&mut state, 2, 2);
    let mut session = GameSession::from_state(state, catalog, config);

    let events = session
        .use_ability(1, "layoff", AbilityTarget::Unit(2))
        .unwrap();
    assert_eq!(
        events[0],
        GameEvent::AbilityUsed {
            caster: 1,
            ability_id: "layoff".to_string(),
            target: AbilityTarget::Unit(2),
        }
    );
    assert!(session.unit(2).is_none());
    let exec = session.unit(1).unwrap();
    assert_eq!(exec.actions_remaining, 0);
    assert_eq!(exec.cooldown("layoff"), SPENT_COOLDOWN);

    end_rounds(&mut session, 3);
    assert_eq!(session.unit(1).unwrap().cooldown("layoff"), SPENT_COOLDOWN);
    assert!(!session.can_use_ability(1, "layoff"));
    let err = session
        .use_ability(1, "layoff", AbilityTarget::Unit(3))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::OnCooldown);
}

#[test]
fn test_cooldown_counts_owner_turns() {
    let mut session = battle_session(
        "a . b .",
        &[
            (UnitType::Developer, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Executive, PLAYER_B_ID, pos(2, 0)),
        ],
    );
    session
        .use_ability(1, "hotfix", AbilityTarget::Unit(2))
        .unwrap();
    assert_eq!(session.unit(2).unwrap().hp, 6);

    // (經過的完整回合數, 預期冷卻)
    let test_data = [(0, 2), (1, 1), (1, 0)];
    for (rounds, expected) in test_data {
        end_rounds(&mut session, rounds);
        assert_eq!(session.unit(1).unwrap().cooldown("hotfix"), expected);
        assert_eq!(session.can_use_ability(1, "hotfix"), expected == 0);
        if expected > 0 {
            let err = session
                .use_ability(1, "hotfix", AbilityTarget::Unit(2))
                .unwrap_err();
            assert_eq!(
                err,
                ActionError::OnCooldown {
                    ability_id: "hotfix".to_string(),
                    remaining: expected,
                }
            );
        }
    }
    session
        .use_ability(1, "hotfix", AbilityTarget::Unit(2))
        .unwrap();
    assert_eq!(session.unit(2).unwrap().hp, 4);
}

const WIDE: &str = "
    a a . b . .
    . . . b . .
    . . . . . .
    ";

#[test]
fn test_harassed_lasts_its_duration() {
    let mut session = battle_session(
        WIDE,
        &[
            (UnitType::HrManager, PLAYER_A_ID, pos(1, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(3, 0)),
        ],
    );
    let events = session
        .use_ability(1, "written_warning", AbilityTarget::Unit(2))
        .unwrap();
    assert!(events.contains(&GameEvent::StatusApplied {
        unit_id: 2,
        kind: StatusKind::Harassed,
        duration: 2,
    }));

    // 兩次回合開始都受影響，第二次回合開始後移除
    for turn in 0..2 {
        if turn > 0 {
            session.end_turn().unwrap();
        }
        let events = session.end_turn().unwrap();
        let intern = session.unit(2).unwrap();
        assert_eq!(intern.modifiers.move_delta, -1, "turn {turn}");
        let origin = intern.position;
        let moves = session.legal_moves(2);
        assert!(moves.iter().all(|p| manhattan_distance(origin, *p) <= 3));
        assert!(moves.iter().any(|p| manhattan_distance(origin, *p) == 3));
        assert_eq!(
            events.contains(&GameEvent::StatusExpired {
                unit_id: 2,
                kind: StatusKind::Harassed,
            }),
            turn == 1
        );
    }

    end_rounds(&mut session, 1);
    assert_eq!(session.unit(2).unwrap().modifiers.move_delta, 0);
    assert!(!session.unit(2).unwrap().has_status(StatusKind::Harassed));
}

#[test]
fn test_stunned_unit_loses_its_turn() {
    let mut session = battle_session(
        "
        a b
        a b
        ",
        &[
            (UnitType::Manager, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(1, 0)),
        ],
    );
    session
        .use_ability(1, "performance_review", AbilityTarget::Unit(2))
        .unwrap();
    assert_eq!(session.unit(1).unwrap().actions_remaining, 0);

    session.end_turn().unwrap();
    assert_eq!(session.unit(2).unwrap().actions_remaining, 0);
    let err = session.move_unit(2, pos(1, 1)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IllegalAction);

    end_rounds(&mut session, 1);
    assert_eq!(session.unit(2).unwrap().actions_remaining, 2);
    session.move_unit(2, pos(1, 1)).unwrap();
}

#[test]
fn test_confused_unit_cannot_use_abilities() {
    let mut session = battle_session(
        WIDE,
        &[
            (UnitType::SalesRep, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(3, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(3, 1)),
        ],
    );
    session
        .use_ability(1, "cold_call", AbilityTarget::Unit(2))
        .unwrap();
    session.end_turn().unwrap();

    assert!(session.unit(2).unwrap().modifiers.confused);
    assert!(!session.can_use_ability(2, "coffee_run"));
    assert!(session.ability_targets(2, "coffee_run").is_empty());
    let err = session
        .use_ability(2, "coffee_run", AbilityTarget::Unit(3))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IllegalAction);
    // 混亂不影響移動與其他單位
    assert!(session.can_unit_move(2));
    session
        .use_ability(3, "coffee_run", AbilityTarget::Unit(2))
        .unwrap();
    assert_eq!(session.unit(2).unwrap().actions_remaining, 3);
}

#[test]
fn test_shield_blocks_statuses_but_not_damage() {
    let mut session = battle_session(
        WIDE,
        &[
            (UnitType::HrManager, PLAYER_A_ID, pos(1, 0)),
            (UnitType::Accountant, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Executive, PLAYER_B_ID, pos(3, 0)),
        ],
    );
    session.end_turn().unwrap();
    session
        .use_ability(3, "golden_parachute", AbilityTarget::None)
        .unwrap();
    assert!(session.unit(3).unwrap().has_status(StatusKind::Shielded));
    session.end_turn().unwrap();

    let err = session
        .use_ability(1, "written_warning", AbilityTarget::Unit(3))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidTarget);

    let events = session
        .use_ability(2, "audit", AbilityTarget::Unit(3))
        .unwrap();
    let exec = session.unit(3).unwrap();
    assert_eq!(exec.hp, 7);
    assert!(!exec.has_status(StatusKind::Exhausted));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, GameEvent::StatusApplied { .. }))
    );
}

#[test]
fn test_action_granting_abilities() {
    let mut session = battle_session(
        WIDE,
        &[
            (UnitType::Developer, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_A_ID, pos(1, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(3, 0)),
        ],
    );
    session
        .use_ability(1, "all_nighter", AbilityTarget::None)
        .unwrap();
    assert_eq!(session.unit(1).unwrap().actions_remaining, 3);

    let events = session
        .use_ability(2, "coffee_run", AbilityTarget::Unit(1))
        .unwrap();
    assert!(events.contains(&GameEvent::ActionsGranted {
        unit_id: 1,
        amount: 1,
    }));
    assert_eq!(session.unit(1).unwrap().actions_remaining, 4);
    assert_eq!(session.unit(2).unwrap().actions_remaining, 1);
}

#[test]
fn test_brainstorm_inspires_all_allies() {
    let mut session = battle_session(
        WIDE,
        &[
            (UnitType::Designer, PLAYER_A_ID, pos(0, 0)),
            (UnitType::Intern, PLAYER_A_ID, pos(1, 0)),
            (UnitType::Intern, PLAYER_B_ID, pos(3, 0)),
        ],
    );
    let events = session
        .use_ability(1, "brainstorm", AbilityTarget::None)
        .unwrap();
    let inspired = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                GameEvent::StatusApplied {
                    kind: StatusKind::Inspired,
                    ..
                }
            )
        })
        .count();
    assert_eq!(inspired, 2);

    end_rounds(&mut session, 1);
    assert_eq!(session.unit(1).unwrap().actions_remaining, 3);
    assert_eq!(session.unit(2).unwrap().actions_remaining, 3);
    assert!(!session.unit(2).unwrap().has_status(StatusKind::Inspired));
    assert_eq!(session.unit(3).unwrap().actions_remaining, 2);
}

#[test]
fn test_budget_and_territory_abilities() {
    let mut session = battle_session(
        "
        A a . C
        a . . C
        . . b B
        ",
        &[
            (UnitType::SalesRep, PLAYER_A_ID, pos(1, 0)),
            (UnitType::Accountant, PLAYER_A_ID, pos(0, 1)),
            (UnitType::Intern, PLAYER_B_ID, pos(2, 2)),
        ],
    );
    let budget = session.player(PLAYER_A_ID).unwrap().budget;
    session
        .use_ability(2, "budget_review", AbilityTarget::None)
        .unwrap();
    assert_eq!(session.player(PLAYER_A_ID).unwrap().budget, budget + 3);

    // (目標格, 預期錯誤)
    let test_data = [
        (pos(0, 0), ErrorCategory::InvalidTarget),
        (pos(2, 0), ErrorCategory::InvalidTarget),
        (pos(3, 2), ErrorCategory::OutOfRange),
    ];
    for (tile, expected) in test_data {
        let err = session
            .use_ability(1, "territory_pitch", AbilityTarget::Tile(tile))
            .unwrap_err();
        assert_eq!(err.category(), expected, "{tile:?}");
    }

    let events = session
        .use_ability(1, "territory_pitch", AbilityTarget::Tile(pos(3, 0)))
        .unwrap();
    assert!(events.contains(&GameEvent::TileCaptured {
        position: pos(3, 0),
        player: PLAYER_A_ID,
        previous_owner: None,
    }));
    let player = session.player(PLAYER_A_ID).unwrap();
    assert_eq!(player.controlled_cubicles, 2);
    assert_eq!(player.income, 3);
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.player(PLAYER_B_ID).unwrap().controlled_cubicles, 1);
}
