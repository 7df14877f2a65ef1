//! 能力的可用判定、合法目標與效果解析
//!
//! - 只負責判定與計算結果，不修改遊戲狀態
//! - 扣除行動、設定冷卻與套用結果由 `rules::use_ability` 處理
use crate::alias::UnitId;
use crate::core_types::{GameState, Position, StatusEffect, StatusKind, Tile, TileType, Unit};
use crate::error::ActionError;
use crate::loader_schema::{Ability, AbilityEffect, TargetType};
use crate::logic::spatial::{manhattan_distance, positions_within};
use crate::logic::status::is_spent;
use serde::{Deserialize, Serialize};

/// 指令指定的能力目標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityTarget {
    None,
    Unit(UnitId),
    Tile(Position),
}

/// 效果實際作用的對象
#[derive(Debug, Clone, Copy)]
pub enum EffectTarget<'a> {
    None,
    Unit(&'a Unit),
    Tile(Position, &'a Tile),
}

/// 效果對單一對象的解析結果，由規則引擎套用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityOutcome {
    pub target: Option<UnitId>,
    pub damage: i32,
    pub healing: i32,
    pub status: Option<StatusEffect>,
    pub action_bonus: u32,
    pub claimed_tile: Option<Position>,
    pub budget: u32,
}

impl AbilityOutcome {
    fn on(target: &Unit) -> Self {
        Self {
            target: Some(target.id),
            ..Default::default()
        }
    }

    /// 是否有任何實際效果
    pub fn is_effective(&self) -> bool {
        self.damage > 0
            || self.healing > 0
            || self.status.is_some()
            || self.action_bonus > 0
            || self.claimed_tile.is_some()
            || self.budget > 0
    }
}

/// 單位能否使用能力（不檢查目標）
///
/// 兵種須具備該能力、行動數不小於消耗、冷卻為 0 且未陷入混亂
pub fn can_use_ability(unit: &Unit, ability: &Ability) -> bool {
    check_use_ability(unit, ability).is_ok()
}

/// 同 `can_use_ability`，失敗時回傳原因
///
/// 檢查順序：具備能力 → 行動數 > 0 → 混亂 → 冷卻 → 行動數不小於消耗
pub fn check_use_ability(unit: &Unit, ability: &Ability) -> Result<(), ActionError> {
    if !unit.abilities.contains(&ability.id) {
        return Err(ActionError::illegal(format!(
            "{} 不具備能力 {}",
            unit.unit_type, ability.id
        )));
    }
    if unit.actions_remaining == 0 {
        return Err(ActionError::illegal(format!("單位 {} 沒有剩餘行動", unit.id)));
    }
    if unit.modifiers.confused {
        return Err(ActionError::illegal(format!(
            "單位 {} 陷入混亂，無法使用能力",
            unit.id
        )));
    }
    let remaining = unit.cooldown(&ability.id);
    if remaining != 0 {
        debug_assert!(remaining > 0 || is_spent(remaining));
        return Err(ActionError::OnCooldown {
            ability_id: ability.id.clone(),
            remaining,
        });
    }
    if unit.actions_remaining < ability.cost {
        return Err(ActionError::InsufficientResources {
            needed: ability.cost,
            available: unit.actions_remaining,
        });
    }
    Ok(())
}

/// 計算能力的所有合法目標
///
/// - SELF：施放者
/// - ALLY / ENEMY：射程內的友軍（含施放者）/ 敵人
/// - TILE：射程內所有棋盤座標（含施放者所在格）
/// - ALL_ALLIES / ALL_ENEMIES：所有友軍 / 敵人，不受射程限制
/// - NONE：`[AbilityTarget::None]`
pub fn compute_valid_targets(
    state: &GameState,
    caster: &Unit,
    ability: &Ability,
) -> Vec<AbilityTarget> {
    let range = ability.range as usize;
    let in_range = |unit: &Unit| manhattan_distance(caster.position, unit.position) <= range;
    match ability.target {
        TargetType::Caster => vec![AbilityTarget::Unit(caster.id)],
        TargetType::Ally => units_where(state, |u| u.owner == caster.owner && in_range(u)),
        TargetType::Enemy => units_where(state, |u| u.owner != caster.owner && in_range(u)),
        TargetType::Tile => positions_within(&state.board, caster.position, range)
            .into_iter()
            .map(AbilityTarget::Tile)
            .collect(),
        TargetType::AllAllies => units_where(state, |u| u.owner == caster.owner),
        TargetType::AllEnemies => units_where(state, |u| u.owner != caster.owner),
        TargetType::None => vec![AbilityTarget::None],
    }
}

fn units_where(state: &GameState, filter: impl Fn(&Unit) -> bool) -> Vec<AbilityTarget> {
    state
        .units
        .values()
        .filter(|u| u.is_alive() && filter(u))
        .map(|u| AbilityTarget::Unit(u.id))
        .collect()
}

/// 將指令目標展開為效果實際作用的對象
///
/// 全體類能力的指令目標可以是 `None` 或清單中任一單位，效果作用於整份清單
pub fn resolve_targets<'a>(
    state: &'a GameState,
    caster: &Unit,
    ability: &Ability,
    target: AbilityTarget,
) -> Result<Vec<EffectTarget<'a>>, ActionError> {
    let valid = compute_valid_targets(state, caster, ability);
    let listed = match (ability.target, target) {
        (TargetType::Caster, AbilityTarget::None) => valid,
        (TargetType::AllAllies | TargetType::AllEnemies, AbilityTarget::None) => valid,
        (TargetType::AllAllies | TargetType::AllEnemies, t) if valid.contains(&t) => valid,
        (_, t) if valid.contains(&t) => vec![t],
        (_, t) => return Err(explain_invalid_target(state, caster, ability, t)),
    };
    if listed.is_empty() {
        return Err(ActionError::invalid_target(format!(
            "能力 {} 沒有可作用的目標",
            ability.id
        )));
    }
    listed
        .into_iter()
        .map(|t| match t {
            AbilityTarget::None => Ok(EffectTarget::None),
            AbilityTarget::Unit(id) => state
                .unit(id)
                .map(EffectTarget::Unit)
                .ok_or_else(|| ActionError::no_such_unit(id)),
            AbilityTarget::Tile(pos) => state
                .board
                .get_tile(pos)
                .map(|tile| EffectTarget::Tile(pos, tile))
                .ok_or(ActionError::OutOfRange {
                    distance: manhattan_distance(caster.position, pos),
                    limit: ability.range as usize,
                }),
        })
        .collect()
}

/// 目標不在合法清單時，區分距離過遠與種類錯誤
fn explain_invalid_target(
    state: &GameState,
    caster: &Unit,
    ability: &Ability,
    target: AbilityTarget,
) -> ActionError {
    let pos = match (ability.target, target) {
        (TargetType::Ally | TargetType::Enemy, AbilityTarget::Unit(id)) => {
            match state.unit(id) {
                Some(unit) => {
                    let wrong_team = match ability.target {
                        TargetType::Ally => unit.owner != caster.owner,
                        _ => unit.owner == caster.owner,
                    };
                    if wrong_team {
                        return ActionError::invalid_target(format!(
                            "單位 {id} 不是能力 {} 的合法對象",
                            ability.id
                        ));
                    }
                    unit.position
                }
                None => return ActionError::no_such_unit(id),
            }
        }
        (TargetType::Tile, AbilityTarget::Tile(pos)) => pos,
        _ => {
            return ActionError::invalid_target(format!(
                "能力 {} 的目標類型為 {}",
                ability.id, ability.target
            ));
        }
    };
    ActionError::OutOfRange {
        distance: manhattan_distance(caster.position, pos),
        limit: ability.range as usize,
    }
}

fn enemy_unit<'a>(caster: &Unit, target: EffectTarget<'a>) -> Result<&'a Unit, ActionError> {
    match target {
        EffectTarget::Unit(unit) if unit.owner != caster.owner && unit.is_alive() => Ok(unit),
        _ => Err(ActionError::invalid_target("必須以敵人為目標")),
    }
}

fn ally_unit<'a>(caster: &Unit, target: EffectTarget<'a>) -> Result<&'a Unit, ActionError> {
    match target {
        EffectTarget::Unit(unit) if unit.owner == caster.owner && unit.is_alive() => Ok(unit),
        _ => Err(ActionError::invalid_target("必須以友軍為目標")),
    }
}

impl AbilityEffect {
    /// 解析效果對單一對象的結果，同時重新驗證目標
    ///
    /// 不修改任何狀態
    pub fn resolve(
        &self,
        caster: &Unit,
        target: EffectTarget,
    ) -> Result<AbilityOutcome, ActionError> {
        let status_on = |unit: &Unit, kind, duration| -> Option<StatusEffect> {
            let from_enemy = unit.owner != caster.owner;
            let shielded = from_enemy && unit.has_status(StatusKind::Shielded);
            (!shielded).then_some(StatusEffect {
                kind,
                duration,
                source: Some(caster.id),
            })
        };
        match *self {
            AbilityEffect::Damage { amount } => {
                let unit = enemy_unit(caster, target)?;
                Ok(AbilityOutcome {
                    damage: amount.max(0),
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::Execute { max_target_hp } => {
                let unit = enemy_unit(caster, target)?;
                if unit.hp > max_target_hp {
                    return Err(ActionError::invalid_target(format!(
                        "目標 HP {} 高於 {}",
                        unit.hp, max_target_hp
                    )));
                }
                Ok(AbilityOutcome {
                    damage: unit.hp,
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::Heal { amount } => {
                let unit = ally_unit(caster, target)?;
                if unit.hp >= unit.max_hp {
                    return Err(ActionError::invalid_target(format!(
                        "單位 {} HP 已滿",
                        unit.id
                    )));
                }
                Ok(AbilityOutcome {
                    healing: amount.max(0).min(unit.max_hp - unit.hp),
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::ApplyStatus { status, duration } => {
                let unit = if status.is_debuff() {
                    enemy_unit(caster, target)?
                } else {
                    ally_unit(caster, target)?
                };
                let effect = status_on(unit, status, duration).ok_or_else(|| {
                    ActionError::invalid_target(format!("單位 {} 受到保護", unit.id))
                })?;
                Ok(AbilityOutcome {
                    status: Some(effect),
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::DamageAndStatus {
                amount,
                status,
                duration,
            } => {
                let unit = enemy_unit(caster, target)?;
                Ok(AbilityOutcome {
                    damage: amount.max(0),
                    // 保護只擋狀態，傷害照常
                    status: status_on(unit, status, duration),
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::GrantActions { amount } => {
                let unit = ally_unit(caster, target)?;
                Ok(AbilityOutcome {
                    action_bonus: amount,
                    ..AbilityOutcome::on(unit)
                })
            }
            AbilityEffect::ClaimTile => match target {
                EffectTarget::Tile(pos, tile) if tile.tile_type == TileType::Cubicle => {
                    if tile.owner == Some(caster.owner) {
                        return Err(ActionError::invalid_target("已擁有此小隔間"));
                    }
                    Ok(AbilityOutcome {
                        claimed_tile: Some(pos),
                        ..Default::default()
                    })
                }
                _ => Err(ActionError::invalid_target("必須以小隔間為目標")),
            },
            AbilityEffect::RaiseBudget { amount } => Ok(AbilityOutcome {
                budget: amount,
                ..Default::default()
            }),
        }
    }
}

/// 預覽能力結果，不修改狀態
///
/// 單一目標能力的效果失敗即為錯誤；全體能力略過失敗的對象，全部失敗才回傳錯誤
pub fn preview_ability(
    state: &GameState,
    caster: &Unit,
    ability: &Ability,
    target: AbilityTarget,
) -> Result<Vec<AbilityOutcome>, ActionError> {
    check_use_ability(caster, ability)?;
    let targets = resolve_targets(state, caster, ability, target)?;
    let is_group = matches!(
        ability.target,
        TargetType::AllAllies | TargetType::AllEnemies
    );
    let mut outcomes = vec![];
    let mut last_err = None;
    for effect_target in targets {
        match ability.effect.resolve(caster, effect_target) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) if is_group => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    if outcomes.is_empty() {
        return Err(last_err.unwrap_or_else(|| {
            ActionError::invalid_target(format!("能力 {} 沒有產生效果", ability.id))
        }));
    }
    Ok(outcomes)
}
