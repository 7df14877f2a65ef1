//! 招募階段測試

mod test_helpers;

use tactics_lib::catalog::Catalog;
use tactics_lib::config::GameConfig;
use tactics_lib::constants::{PLAYER_A_ID, PLAYER_B_ID};
use tactics_lib::core_types::{Phase, UnitType};
use tactics_lib::error::{ActionError, ErrorCategory};
use tactics_lib::session::{GameEvent, GameSession};
use test_helpers::{level, pos};

const LOBBY: &str = "
    A a a a
    . . b b
    . . . B
    ";

fn lobby() -> GameSession {
    GameSession::new(level(LOBBY), Catalog::builtin().unwrap(), GameConfig::default())
}

#[test]
fn test_draft_phase_flow() {
    let mut session = lobby();
    assert_eq!(session.phase(), Phase::Setup);
    let err = session
        .hire_unit(PLAYER_A_ID, UnitType::Intern, pos(1, 0))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IllegalAction);

    let events = session.start_draft().unwrap();
    assert_eq!(events[0], GameEvent::PhaseChanged { phase: Phase::Draft });
    assert_eq!(session.player(PLAYER_A_ID).unwrap().budget, 20);
    assert_eq!(session.player(PLAYER_B_ID).unwrap().budget, 20);
    assert!(session.start_draft().is_err());

    // 任一方沒有單位時不能開戰
    session
        .hire_unit(PLAYER_A_ID, UnitType::Executive, pos(1, 0))
        .unwrap();
    let err = session.start_battle().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IllegalAction);

    session
        .hire_unit(PLAYER_B_ID, UnitType::Intern, pos(2, 1))
        .unwrap();
    session.start_battle().unwrap();
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.current_player(), PLAYER_A_ID);
    assert_eq!(session.turn_number(), 1);
    assert_eq!(session.unit(1).unwrap().actions_remaining, 2);
    assert_eq!(session.unit(2).unwrap().actions_remaining, 0);

    let err = session
        .hire_unit(PLAYER_A_ID, UnitType::Intern, pos(2, 0))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IllegalAction);
}

#[test]
fn test_hire_validation() {
    let mut session = lobby();
    session.start_draft().unwrap();
    session
        .hire_unit(PLAYER_A_ID, UnitType::Executive, pos(1, 0))
        .unwrap();
    assert_eq!(session.player(PLAYER_A_ID).unwrap().budget, 11);

    // (玩家, 部署點, 預期錯誤)
    let test_data = [
        (PLAYER_A_ID, pos(2, 1), ErrorCategory::InvalidTarget),
        (PLAYER_A_ID, pos(0, 1), ErrorCategory::InvalidTarget),
        (PLAYER_A_ID, pos(1, 0), ErrorCategory::Blocked),
        (PLAYER_B_ID, pos(2, 0), ErrorCategory::InvalidTarget),
    ];
    let before = serde_json::to_value(session.state()).unwrap();
    for (player, spawn, expected) in test_data {
        let err = session
            .hire_unit(player, UnitType::Intern, spawn)
            .unwrap_err();
        assert_eq!(err.category(), expected, "player {player} at {spawn:?}");
    }
    assert_eq!(serde_json::to_value(session.state()).unwrap(), before);

    session
        .hire_unit(PLAYER_A_ID, UnitType::Executive, pos(2, 0))
        .unwrap();
    let err = session
        .hire_unit(PLAYER_A_ID, UnitType::Manager, pos(3, 0))
        .unwrap_err();
    assert_eq!(
        err,
        ActionError::InsufficientResources {
            needed: 6,
            available: 2,
        }
    );
    let events = session
        .hire_unit(PLAYER_A_ID, UnitType::Intern, pos(3, 0))
        .unwrap();
    assert!(events.contains(&GameEvent::BudgetChanged {
        player: PLAYER_A_ID,
        budget: 0,
    }));
    assert_eq!(session.state().units_of(PLAYER_A_ID).count(), 3);
}
