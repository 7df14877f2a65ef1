//! 戰鬥規則引擎
//!
//! - 階段流程：SETUP → DRAFT → PLAYING → GAME_OVER
//! - 每個指令先完整驗證再修改狀態，失敗時狀態不變
//! - 每次成功修改後檢查勝負
use crate::alias::{AbilityId, PlayerId, UnitId};
use crate::catalog::Catalog;
use crate::config::RulesConfig;
use crate::constants::{FIRST_TURN, SPENT_COOLDOWN};
use crate::core_types::{Board, GameState, Phase, Position, StatusEffect, Unit, UnitType};
use crate::error::ActionError;
use crate::logic::ability::{self, AbilityOutcome, AbilityTarget};
use crate::logic::spatial::{
    manhattan_distance, neighbors, reachable_positions, reachable_tiles, reconstruct_path,
};
use crate::logic::status::{self, effective_attack_range, effective_move_range};
use crate::session::GameEvent;
use log::{debug, info};
use std::collections::BTreeSet;

pub type ActionResult = Result<Vec<GameEvent>, ActionError>;

fn ensure_phase(state: &GameState, phase: Phase) -> Result<(), ActionError> {
    if state.phase != phase {
        return Err(ActionError::illegal(format!(
            "目前階段為 {}，需要 {}",
            state.phase, phase
        )));
    }
    Ok(())
}

/// 行動單位的共同檢查：PLAYING 階段、單位存在、輪到擁有者、還有行動
fn acting_unit(state: &GameState, unit_id: UnitId) -> Result<&Unit, ActionError> {
    ensure_phase(state, Phase::Playing)?;
    let unit = state
        .unit(unit_id)
        .ok_or_else(|| ActionError::no_such_unit(unit_id))?;
    if unit.owner != state.current_player {
        return Err(ActionError::illegal(format!(
            "現在不是玩家 {} 的回合",
            unit.owner
        )));
    }
    if unit.actions_remaining == 0 {
        return Err(ActionError::illegal(format!("單位 {unit_id} 沒有剩餘行動")));
    }
    Ok(unit)
}

fn unit_mut(state: &mut GameState, unit_id: UnitId) -> Result<&mut Unit, ActionError> {
    state
        .units
        .get_mut(&unit_id)
        .ok_or_else(|| ActionError::no_such_unit(unit_id))
}

fn is_occupied(board: &Board) -> impl Fn(Position) -> bool + '_ {
    move |pos| board.get_tile(pos).is_some_and(|tile| tile.occupant.is_some())
}

// ============================================================================
// 招募階段
// ============================================================================

/// SETUP → DRAFT，重設兩位玩家的預算
pub fn start_draft(state: &mut GameState, rules: &RulesConfig) -> ActionResult {
    ensure_phase(state, Phase::Setup)?;
    state.phase = Phase::Draft;
    let mut events = vec![GameEvent::PhaseChanged { phase: Phase::Draft }];
    for player in &mut state.players {
        player.budget = rules.draft_budget;
        events.push(GameEvent::BudgetChanged {
            player: player.id,
            budget: player.budget,
        });
    }
    info!("draft started, budget {}", rules.draft_budget);
    Ok(events)
}

/// 招募單位並部署在己方部署點
pub fn hire_unit(
    state: &mut GameState,
    catalog: &Catalog,
    player_id: PlayerId,
    unit_type: UnitType,
    spawn: Position,
) -> ActionResult {
    ensure_phase(state, Phase::Draft)?;
    let player = state
        .player(player_id)
        .ok_or_else(|| ActionError::illegal(format!("玩家 {player_id} 不存在")))?;
    let budget = player.budget;
    if !state.spawns.for_team(player.team).contains(&spawn) {
        return Err(ActionError::invalid_target(format!(
            "({}, {}) 不是 {} 隊的部署點",
            spawn.x, spawn.y, player.team
        )));
    }
    let tile = state
        .board
        .get_tile(spawn)
        .ok_or_else(|| ActionError::invalid_target("部署點不在棋盤內"))?;
    if tile.occupant.is_some() || !tile.tile_type.is_traversable() {
        return Err(ActionError::Blocked { pos: spawn });
    }
    let id = state.next_unit_id;
    let unit = catalog
        .spawn_unit(unit_type, id, player_id, spawn)
        .map_err(|e| ActionError::illegal(e.to_string()))?;
    if unit.cost > budget {
        return Err(ActionError::InsufficientResources {
            needed: unit.cost,
            available: budget,
        });
    }

    let cost = unit.cost;
    state.next_unit_id += 1;
    state.units.insert(id, unit);
    if let Some(tile) = state.board.get_tile_mut(spawn) {
        tile.occupant = Some(id);
    }
    let mut events = vec![GameEvent::UnitHired {
        unit_id: id,
        player: player_id,
        unit_type,
        position: spawn,
    }];
    if let Some(player) = state.player_mut(player_id) {
        player.budget -= cost;
        events.push(GameEvent::BudgetChanged {
            player: player_id,
            budget: player.budget,
        });
    }
    info!("player {player_id} hired {unit_type} #{id} at ({}, {})", spawn.x, spawn.y);
    Ok(events)
}

/// DRAFT → PLAYING，先手玩家開始第一回合
pub fn start_battle(state: &mut GameState, rules: &RulesConfig) -> ActionResult {
    ensure_phase(state, Phase::Draft)?;
    if let Some(player) = state
        .players
        .iter()
        .find(|p| state.units_of(p.id).next().is_none())
    {
        return Err(ActionError::illegal(format!("{} 尚未招募任何單位", player.name)));
    }
    let first = state
        .players
        .first()
        .map(|p| p.id)
        .ok_or_else(|| ActionError::illegal("沒有玩家"))?;
    state.phase = Phase::Playing;
    state.current_player = first;
    state.turn_number = FIRST_TURN;
    state.selected_unit = None;
    let mut events = vec![GameEvent::PhaseChanged {
        phase: Phase::Playing,
    }];
    events.extend(begin_player_turn(state, rules, first));
    settle_winner(state, &mut events);
    Ok(events)
}

// ============================================================================
// 戰鬥指令
// ============================================================================

/// 移動到 BFS 可到達的格子，消耗一次行動
pub fn move_unit(state: &mut GameState, unit_id: UnitId, to: Position) -> ActionResult {
    let unit = acting_unit(state, unit_id)?;
    let from = unit.position;
    let limit = effective_move_range(unit) as usize;
    let distance = manhattan_distance(from, to);
    let tile = state
        .board
        .get_tile(to)
        .ok_or(ActionError::OutOfRange { distance, limit })?;
    if !tile.tile_type.is_traversable() || tile.occupant.is_some() {
        return Err(ActionError::Blocked { pos: to });
    }
    let reached = reachable_positions(from, limit, &state.board, is_occupied(&state.board));
    let path =
        reconstruct_path(&reached, from, to).ok_or(ActionError::OutOfRange { distance, limit })?;

    let unit = unit_mut(state, unit_id)?;
    unit.position = to;
    unit.has_moved = true;
    unit.actions_remaining -= 1;
    if let Some(tile) = state.board.get_tile_mut(from) {
        tile.occupant = None;
    }
    if let Some(tile) = state.board.get_tile_mut(to) {
        tile.occupant = Some(unit_id);
    }
    debug!("unit {unit_id} moved ({}, {}) -> ({}, {})", from.x, from.y, to.x, to.y);
    let mut events = vec![GameEvent::UnitMoved {
        unit_id,
        from,
        to,
        path,
    }];
    settle_winner(state, &mut events);
    Ok(events)
}

fn check_can_attack<'a>(
    state: &'a GameState,
    rules: &RulesConfig,
    unit_id: UnitId,
) -> Result<&'a Unit, ActionError> {
    let unit = acting_unit(state, unit_id)?;
    if rules.single_attack_per_turn && unit.has_attacked {
        return Err(ActionError::illegal(format!("單位 {unit_id} 本回合已攻擊")));
    }
    Ok(unit)
}

/// 攻擊射程內的敵人，傷害固定為攻擊者的攻擊力，無反擊
pub fn attack(
    state: &mut GameState,
    rules: &RulesConfig,
    attacker_id: UnitId,
    target_id: UnitId,
) -> ActionResult {
    let attacker = check_can_attack(state, rules, attacker_id)?;
    let target = state
        .unit(target_id)
        .ok_or_else(|| ActionError::invalid_target(format!("目標 {target_id} 不存在")))?;
    if target.owner == attacker.owner {
        return Err(ActionError::invalid_target("不能攻擊友軍"));
    }
    if !target.is_alive() {
        return Err(ActionError::invalid_target(format!("目標 {target_id} 已倒下")));
    }
    let distance = manhattan_distance(attacker.position, target.position);
    let limit = effective_attack_range(attacker) as usize;
    if distance > limit {
        return Err(ActionError::OutOfRange { distance, limit });
    }
    let damage = attacker.attack_damage;

    let attacker = unit_mut(state, attacker_id)?;
    attacker.actions_remaining -= 1;
    attacker.has_attacked = true;
    let mut events = vec![GameEvent::UnitAttacked {
        attacker: attacker_id,
        target: target_id,
        damage,
    }];
    events.extend(apply_damage(state, target_id, damage));
    settle_winner(state, &mut events);
    Ok(events)
}

/// 預覽能力結果（含所有合法性檢查），不修改狀態
pub fn preview_ability(
    state: &GameState,
    catalog: &Catalog,
    caster_id: UnitId,
    ability_id: &str,
    target: AbilityTarget,
) -> Result<Vec<AbilityOutcome>, ActionError> {
    let caster = acting_unit(state, caster_id)?;
    let ability = catalog
        .get_ability(ability_id)
        .ok_or_else(|| ActionError::illegal(format!("能力 {ability_id} 不存在")))?;
    ability::preview_ability(state, caster, ability, target)
}

/// 使用能力：效果成功才扣除行動並進入冷卻
pub fn use_ability(
    state: &mut GameState,
    catalog: &Catalog,
    rules: &RulesConfig,
    caster_id: UnitId,
    ability_id: &str,
    target: AbilityTarget,
) -> ActionResult {
    let outcomes = preview_ability(state, catalog, caster_id, ability_id, target)?;
    let ability = catalog
        .get_ability(ability_id)
        .ok_or_else(|| ActionError::illegal(format!("能力 {ability_id} 不存在")))?;

    let caster = unit_mut(state, caster_id)?;
    let caster_owner = caster.owner;
    caster.actions_remaining -= ability.cost;
    let cooldown = if ability.cooldown < 0 {
        SPENT_COOLDOWN
    } else {
        ability.cooldown
    };
    caster.cooldowns.insert(ability.id.clone(), cooldown);

    info!("unit {caster_id} used {ability_id}");
    let mut events = vec![GameEvent::AbilityUsed {
        caster: caster_id,
        ability_id: AbilityId::from(ability_id),
        target,
    }];
    for outcome in outcomes {
        events.extend(apply_outcome(state, rules, caster_owner, outcome));
    }
    settle_winner(state, &mut events);
    Ok(events)
}

fn apply_outcome(
    state: &mut GameState,
    rules: &RulesConfig,
    caster_owner: PlayerId,
    outcome: AbilityOutcome,
) -> Vec<GameEvent> {
    let mut events = vec![];
    if let Some(target_id) = outcome.target {
        if outcome.damage > 0 {
            events.extend(apply_damage(state, target_id, outcome.damage));
        }
        // 被擊倒的單位不再套用後續效果
        if let Some(unit) = state.units.get_mut(&target_id) {
            if outcome.healing > 0 {
                unit.hp = (unit.hp + outcome.healing).min(unit.max_hp);
                events.push(GameEvent::UnitHealed {
                    unit_id: target_id,
                    amount: outcome.healing,
                    hp: unit.hp,
                });
            }
            if let Some(effect) = outcome.status {
                events.extend(apply_status_to(unit, effect, caster_owner));
            }
            if outcome.action_bonus > 0 {
                unit.actions_remaining += outcome.action_bonus;
                events.push(GameEvent::ActionsGranted {
                    unit_id: target_id,
                    amount: outcome.action_bonus,
                });
            }
        }
    }
    if let Some(pos) = outcome.claimed_tile {
        events.extend(claim_tile(state, rules, pos, caster_owner));
    }
    if outcome.budget > 0 {
        if let Some(player) = state.player_mut(caster_owner) {
            player.budget += outcome.budget;
            events.push(GameEvent::BudgetChanged {
                player: caster_owner,
                budget: player.budget,
            });
        }
    }
    events
}

fn apply_status_to(unit: &mut Unit, effect: StatusEffect, caster_owner: PlayerId) -> Option<GameEvent> {
    let kind = effect.kind;
    let from_enemy = unit.owner != caster_owner;
    if !status::apply_status(unit, effect, from_enemy) {
        return None;
    }
    let duration = unit
        .status_effects
        .iter()
        .find(|s| s.kind == kind)
        .map_or(0, |s| s.duration);
    Some(GameEvent::StatusApplied {
        unit_id: unit.id,
        kind,
        duration,
    })
}

/// 扣血（最低 0），歸零時移除單位並清除所在格
pub fn apply_damage(state: &mut GameState, unit_id: UnitId, amount: i32) -> Vec<GameEvent> {
    let Some(unit) = state.units.get_mut(&unit_id) else {
        return vec![];
    };
    unit.hp = (unit.hp - amount).max(0);
    let mut events = vec![GameEvent::UnitDamaged {
        unit_id,
        amount,
        hp: unit.hp,
    }];
    if unit.hp == 0 {
        let position = unit.position;
        state.units.remove(&unit_id);
        if let Some(tile) = state.board.get_tile_mut(position) {
            if tile.occupant == Some(unit_id) {
                tile.occupant = None;
            }
        }
        if state.selected_unit == Some(unit_id) {
            state.selected_unit = None;
        }
        info!("unit {unit_id} destroyed at ({}, {})", position.x, position.y);
        events.push(GameEvent::UnitDestroyed { unit_id, position });
    }
    events
}

/// 佔領相鄰或腳下的小隔間 / 總部
pub fn capture_cubicle(
    state: &mut GameState,
    rules: &RulesConfig,
    unit_id: UnitId,
    pos: Position,
) -> ActionResult {
    let unit = acting_unit(state, unit_id)?;
    let owner = unit.owner;
    let distance = manhattan_distance(unit.position, pos);
    if distance > 1 {
        return Err(ActionError::OutOfRange { distance, limit: 1 });
    }
    let tile = state
        .board
        .get_tile(pos)
        .ok_or(ActionError::OutOfRange { distance, limit: 1 })?;
    if !tile.tile_type.is_capturable() {
        return Err(ActionError::invalid_target(format!(
            "{} 不可佔領",
            tile.tile_type
        )));
    }
    if tile.owner == Some(owner) {
        return Err(ActionError::invalid_target("已擁有此格"));
    }

    unit_mut(state, unit_id)?.actions_remaining -= 1;
    let mut events = claim_tile(state, rules, pos, owner);
    settle_winner(state, &mut events);
    Ok(events)
}

fn claim_tile(
    state: &mut GameState,
    rules: &RulesConfig,
    pos: Position,
    player_id: PlayerId,
) -> Vec<GameEvent> {
    let Some(tile) = state.board.get_tile_mut(pos) else {
        return vec![];
    };
    let previous_owner = tile.owner.replace(player_id);
    refresh_territory(state, rules, player_id);
    if let Some(previous) = previous_owner {
        refresh_territory(state, rules, previous);
    }
    info!("player {player_id} captured ({}, {})", pos.x, pos.y);
    vec![GameEvent::TileCaptured {
        position: pos,
        player: player_id,
        previous_owner,
    }]
}

/// 依格子所有權重算佔領數與收入
fn refresh_territory(state: &mut GameState, rules: &RulesConfig, player_id: PlayerId) {
    let count = state.recount_cubicles(player_id);
    if let Some(player) = state.player_mut(player_id) {
        player.income = rules.income_for(count);
    }
}

/// 結束回合：換人、回合數 +1、新玩家的單位重置並取得收入
pub fn end_turn(state: &mut GameState, rules: &RulesConfig) -> ActionResult {
    ensure_phase(state, Phase::Playing)?;
    let next = state
        .opponent_of(state.current_player)
        .ok_or_else(|| ActionError::illegal("找不到下一位玩家"))?;
    state.current_player = next;
    state.turn_number += 1;
    state.selected_unit = None;
    let mut events = begin_player_turn(state, rules, next);
    settle_winner(state, &mut events);
    Ok(events)
}

fn begin_player_turn(state: &mut GameState, rules: &RulesConfig, player_id: PlayerId) -> Vec<GameEvent> {
    let mut events = vec![GameEvent::TurnStarted {
        player: player_id,
        turn_number: state.turn_number,
    }];
    for unit in state.units.values_mut().filter(|u| u.owner == player_id) {
        for kind in status::begin_turn(unit) {
            events.push(GameEvent::StatusExpired {
                unit_id: unit.id,
                kind,
            });
        }
    }
    refresh_territory(state, rules, player_id);
    if let Some(player) = state.player_mut(player_id) {
        player.budget += player.income;
        events.push(GameEvent::BudgetChanged {
            player: player_id,
            budget: player.budget,
        });
    }
    info!("turn {} begins for player {player_id}", state.turn_number);
    events
}

// ============================================================================
// 勝負判定
// ============================================================================

/// 依序檢查：殲滅 → 總部被佔 → 佔領超過半數可佔領格
pub fn evaluate_winner(state: &GameState) -> Option<PlayerId> {
    for player in &state.players {
        if state.units_of(player.id).next().is_none() {
            return state.opponent_of(player.id);
        }
    }
    for pos in state.board.capturable_positions() {
        let Some(tile) = state.board.get_tile(pos) else {
            continue;
        };
        if let (Some(team), Some(owner)) = (tile.tile_type.hq_team(), tile.owner) {
            if owner != team.player_id() {
                return Some(owner);
            }
        }
    }
    let total = state.board.capturable_positions().count() as u32;
    state
        .players
        .iter()
        .find(|p| state.owned_capturables(p.id) * 2 > total)
        .map(|p| p.id)
}

fn settle_winner(state: &mut GameState, events: &mut Vec<GameEvent>) {
    if state.phase != Phase::Playing {
        return;
    }
    let Some(winner) = evaluate_winner(state) else {
        return;
    };
    state.phase = Phase::GameOver;
    state.winner = Some(winner);
    state.selected_unit = None;
    info!("game over, player {winner} wins on turn {}", state.turn_number);
    events.push(GameEvent::PhaseChanged {
        phase: Phase::GameOver,
    });
    events.push(GameEvent::GameOver { winner });
}

// ============================================================================
// 查詢（無副作用）
// ============================================================================

/// 可移動的目的地，無法移動時為空
pub fn legal_moves(state: &GameState, unit_id: UnitId) -> BTreeSet<Position> {
    match acting_unit(state, unit_id) {
        Ok(unit) => reachable_tiles(
            unit.position,
            effective_move_range(unit) as usize,
            &state.board,
            is_occupied(&state.board),
        ),
        Err(_) => BTreeSet::new(),
    }
}

pub fn can_unit_move(state: &GameState, unit_id: UnitId) -> bool {
    !legal_moves(state, unit_id).is_empty()
}

/// 單位本回合還能攻擊（不檢查目標）
pub fn can_unit_attack(state: &GameState, rules: &RulesConfig, unit_id: UnitId) -> bool {
    check_can_attack(state, rules, unit_id).is_ok()
}

/// 射程內可攻擊的敵人，依單位 ID 排序
pub fn attack_targets(state: &GameState, rules: &RulesConfig, unit_id: UnitId) -> Vec<UnitId> {
    let Ok(unit) = check_can_attack(state, rules, unit_id) else {
        return vec![];
    };
    let limit = effective_attack_range(unit) as usize;
    state
        .units
        .values()
        .filter(|u| u.owner != unit.owner && u.is_alive())
        .filter(|u| manhattan_distance(unit.position, u.position) <= limit)
        .map(|u| u.id)
        .collect()
}

/// 可佔領的格子：腳下優先，再依 +x, -x, +y, -y 掃描相鄰格
pub fn capturable_tiles(state: &GameState, unit_id: UnitId) -> Vec<Position> {
    let Ok(unit) = acting_unit(state, unit_id) else {
        return vec![];
    };
    std::iter::once(unit.position)
        .chain(neighbors(&state.board, unit.position))
        .filter(|pos| {
            state.board.get_tile(*pos).is_some_and(|tile| {
                tile.tile_type.is_capturable() && tile.owner != Some(unit.owner)
            })
        })
        .collect()
}

pub fn can_use_ability(
    state: &GameState,
    catalog: &Catalog,
    unit_id: UnitId,
    ability_id: &str,
) -> bool {
    let Ok(unit) = acting_unit(state, unit_id) else {
        return false;
    };
    catalog
        .get_ability(ability_id)
        .is_some_and(|ability| ability::can_use_ability(unit, ability))
}

/// 能力的合法目標，目前不能使用時為空
pub fn ability_targets(
    state: &GameState,
    catalog: &Catalog,
    unit_id: UnitId,
    ability_id: &str,
) -> Vec<AbilityTarget> {
    let Ok(unit) = acting_unit(state, unit_id) else {
        return vec![];
    };
    match catalog.get_ability(ability_id) {
        Some(ability) if ability::can_use_ability(unit, ability) => {
            ability::compute_valid_targets(state, unit, ability)
        }
        _ => vec![],
    }
}
