//! 測試輔助：用 ASCII art 建立戰鬥中的遊戲
//!
//! 部署點符號 `a` / `b` 同時是單位的擺放位置，依 `units` 順序招募，
//! 單位 ID 從 1 開始依序分配。
#![allow(dead_code)]

use tactics_lib::alias::{PlayerId, UnitId};
use tactics_lib::catalog::Catalog;
use tactics_lib::config::GameConfig;
use tactics_lib::core_types::{GameState, Level, Position, UnitType};
use tactics_lib::loader::load_from_ascii;
use tactics_lib::logic::rules;
use tactics_lib::session::GameSession;

pub fn level(ascii: &str) -> Level {
    let (board, spawns) = load_from_ascii(ascii).unwrap();
    Level {
        name: "test".to_string(),
        board,
        spawns,
    }
}

/// 預算足夠招募任何組合的設定
pub fn config() -> GameConfig {
    let mut config = GameConfig::default();
    config.rules.draft_budget = 100;
    config
}

/// 招募完畢、進入 PLAYING 的狀態（A 隊先手）
pub fn battle_state(
    ascii: &str,
    units: &[(UnitType, PlayerId, Position)],
) -> (GameState, Catalog, GameConfig) {
    let catalog = Catalog::builtin().unwrap();
    let config = config();
    let mut state = GameState::new(level(ascii), config.rules.player_names.clone());
    rules::start_draft(&mut state, &config.rules).unwrap();
    for (unit_type, player_id, pos) in units {
        rules::hire_unit(&mut state, &catalog, *player_id, *unit_type, *pos).unwrap();
    }
    rules::start_battle(&mut state, &config.rules).unwrap();
    (state, catalog, config)
}

pub fn battle_session(ascii: &str, units: &[(UnitType, PlayerId, Position)]) -> GameSession {
    let (state, catalog, config) = battle_state(ascii, units);
    GameSession::from_state(state, catalog, config)
}

pub fn set_hp(state: &mut GameState, unit_id: UnitId, hp: i32) {
    state.units.get_mut(&unit_id).unwrap().hp = hp;
}

pub fn pos(x: usize, y: usize) -> Position {
    Position::new(x, y)
}
