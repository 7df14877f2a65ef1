//! 狀態效果與回合開始結算
//!
//! 回合開始時依序：讀取狀態修正 → 冷卻 -1 → 狀態持續時間 -1。
//! 因此持續 N 回合的狀態恰好影響擁有者 N 次回合開始。

use crate::constants::SPENT_COOLDOWN;
use crate::core_types::{StatusEffect, StatusKind, TurnModifiers, Unit};

/// 由目前的狀態效果計算本回合的修正
pub fn read_modifiers(effects: &[StatusEffect]) -> TurnModifiers {
    let mut modifiers = TurnModifiers::default();
    for effect in effects {
        match effect.kind {
            StatusKind::OnDeadline => modifiers.move_delta += 1,
            StatusKind::Harassed => modifiers.move_delta -= 1,
            StatusKind::Focused => modifiers.attack_range_bonus += 1,
            StatusKind::Confused => modifiers.confused = true,
            StatusKind::Exhausted
            | StatusKind::Stunned
            | StatusKind::Shielded
            | StatusKind::Inspired => {}
        }
    }
    modifiers
}

/// 回合開始的行動數
///
/// 暈眩時為 0；疲憊 -1；受激勵 +1（可超過上限）
pub fn turn_start_actions(unit: &Unit) -> u32 {
    if unit.has_status(StatusKind::Stunned) {
        return 0;
    }
    let mut actions = unit.max_actions;
    if unit.has_status(StatusKind::Inspired) {
        actions += 1;
    }
    if unit.has_status(StatusKind::Exhausted) {
        actions = actions.saturating_sub(1);
    }
    actions
}

pub fn effective_move_range(unit: &Unit) -> u32 {
    (unit.move_range as i64 + unit.modifiers.move_delta as i64).max(0) as u32
}

pub fn effective_attack_range(unit: &Unit) -> u32 {
    unit.attack_range + unit.modifiers.attack_range_bonus
}

/// 冷卻 -1（最低 0），已用過的一次性能力維持不變
pub fn tick_cooldowns(unit: &mut Unit) {
    for cooldown in unit.cooldowns.values_mut() {
        if *cooldown > 0 {
            *cooldown -= 1;
        }
    }
}

/// 狀態持續時間 -1，回傳到期被移除的狀態
pub fn tick_statuses(unit: &mut Unit) -> Vec<StatusKind> {
    let mut expired = vec![];
    unit.status_effects.retain_mut(|effect| {
        effect.duration = effect.duration.saturating_sub(1);
        if effect.duration == 0 {
            expired.push(effect.kind);
            false
        } else {
            true
        }
    });
    expired
}

/// 擁有者回合開始時的單位重置，回傳到期的狀態
pub fn begin_turn(unit: &mut Unit) -> Vec<StatusKind> {
    unit.actions_remaining = turn_start_actions(unit);
    unit.modifiers = read_modifiers(&unit.status_effects);
    unit.has_moved = false;
    unit.has_attacked = false;
    tick_cooldowns(unit);
    tick_statuses(unit)
}

/// 附加狀態，同種狀態不疊加，持續時間取較大者
///
/// 目標有保護狀態時，敵方施加的狀態一律無效，回傳 false
pub fn apply_status(target: &mut Unit, effect: StatusEffect, from_enemy: bool) -> bool {
    if from_enemy && target.has_status(StatusKind::Shielded) {
        return false;
    }
    if effect.duration == 0 {
        return false;
    }
    match target
        .status_effects
        .iter_mut()
        .find(|existing| existing.kind == effect.kind)
    {
        Some(existing) => {
            existing.duration = existing.duration.max(effect.duration);
            existing.source = effect.source;
        }
        None => target.status_effects.push(effect),
    }
    true
}

/// 一次性能力已用過
pub fn is_spent(cooldown: i32) -> bool {
    cooldown == SPENT_COOLDOWN
}
