//! AI 決策
//!
//! 每次決策都重新讀取 `GameSession` 的狀態，只使用公開的查詢與指令，
//! 和玩家受同一套規則約束。
//!
//! 優先順序：攻擊 → 佔領 → 能力 → 移動 → 放棄。
//! 只有移動評分帶隨機擾動，難度只影響擾動幅度。

use crate::alias::{AIScore, AbilityId, PlayerId, UnitId};
use crate::config::{AiConfig, Difficulty};
use crate::core_types::{Phase, Position, UnitType};
use crate::logic::ability::AbilityTarget;
use crate::session::{Command, GameEvent, GameSession};
use log::{debug, trace};
use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Attack {
        target: UnitId,
    },
    Capture {
        tile: Position,
    },
    UseAbility {
        ability_id: AbilityId,
        target: AbilityTarget,
    },
    Move {
        to: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAction {
    pub action: Action,
    pub score: AIScore,
    pub reason: String, // for debug purpose
}

impl ScoredAction {
    pub fn into_command(self, unit_id: UnitId) -> Command {
        match self.action {
            Action::Attack { target } => Command::Attack {
                attacker: unit_id,
                target,
            },
            Action::Capture { tile } => Command::Capture { unit_id, tile },
            Action::UseAbility { ability_id, target } => Command::UseAbility {
                caster: unit_id,
                ability_id,
                target,
            },
            Action::Move { to } => Command::Move { unit_id, to },
        }
    }
}

/// 一個回合的執行摘要
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnSummary {
    pub player: PlayerId,
    pub actions: usize,
    pub rejected: usize,
    pub passed: Vec<UnitId>,
    pub ended_turn: bool,
}

#[derive(Debug, Clone)]
pub struct AiController {
    difficulty: Difficulty,
    config: AiConfig,
    rng: StdRng,
}

impl AiController {
    pub fn new(difficulty: Difficulty, config: AiConfig, seed: u64) -> Self {
        Self {
            difficulty,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// 為單位選出一個行動，沒有可做的事時回傳 `None`
    pub fn decide(&mut self, session: &GameSession, unit_id: UnitId) -> Option<ScoredAction> {
        let unit = session.unit(unit_id)?;
        if unit.owner != session.current_player() || unit.actions_remaining == 0 {
            return None;
        }
        if let Some(action) = choose_attack(session, unit_id) {
            return Some(action);
        }
        if let Some(action) = choose_capture(session, unit_id) {
            return Some(action);
        }
        if self.config.use_abilities {
            if let Some(action) = choose_ability(session, unit_id) {
                return Some(action);
            }
        }
        self.choose_move(session, unit_id)
    }

    /// 依單位 ID 順序替目前玩家的每個單位行動，最後結束回合
    ///
    /// 每個單位最多嘗試 `max(max_actions, actions_remaining) + 1` 次；
    /// 沒有可做的事或指令被拒絕時換下一個單位
    pub fn take_turn(&mut self, session: &mut GameSession) -> TurnSummary {
        let player = session.current_player();
        let mut summary = TurnSummary {
            player,
            ..Default::default()
        };
        if session.phase() != Phase::Playing {
            return summary;
        }

        let unit_ids: Vec<UnitId> = session.state().units_of(player).map(|u| u.id).collect();
        for unit_id in unit_ids {
            let Some(unit) = session.unit(unit_id) else {
                continue;
            };
            let cap = unit.max_actions.max(unit.actions_remaining) + 1;
            for _ in 0..cap {
                if session.phase() != Phase::Playing {
                    return summary;
                }
                match session.unit(unit_id) {
                    Some(unit) if unit.actions_remaining > 0 => {}
                    _ => break,
                }
                let Some(choice) = self.decide(session, unit_id) else {
                    debug!("unit {unit_id} passes");
                    summary.passed.push(unit_id);
                    break;
                };
                debug!(
                    "unit {unit_id} decides {:?} (score {:.2}, {})",
                    choice.action, choice.score, choice.reason
                );
                match session.dispatch(choice.into_command(unit_id)) {
                    Ok(_) => summary.actions += 1,
                    Err(err) => {
                        debug!("unit {unit_id} action rejected: {err}");
                        summary.rejected += 1;
                        break;
                    }
                }
            }
        }

        if session.phase() == Phase::Playing {
            summary.ended_turn = session.end_turn().is_ok();
        }
        summary
    }

    /// 招募階段：隨機招募負擔得起的兵種，直到預算或部署點用完
    pub fn draft(&mut self, session: &mut GameSession, player_id: PlayerId) -> Vec<UnitId> {
        let mut hired = vec![];
        loop {
            let Some(player) = session.player(player_id) else {
                break;
            };
            let budget = player.budget;
            let spawn = session
                .state()
                .spawns
                .for_team(player.team)
                .iter()
                .copied()
                .find(|pos| {
                    session
                        .board()
                        .get_tile(*pos)
                        .is_some_and(|tile| tile.occupant.is_none())
                });
            let Some(spawn) = spawn else {
                break;
            };
            let affordable: Vec<UnitType> = session
                .catalog()
                .unit_types()
                .filter(|stats| stats.cost <= budget)
                .map(|stats| stats.unit_type)
                .collect();
            let Some(unit_type) = affordable.choose(&mut self.rng).copied() else {
                break;
            };
            match session.hire_unit(player_id, unit_type, spawn) {
                Ok(events) => hired.extend(events.iter().filter_map(|event| match event {
                    GameEvent::UnitHired { unit_id, .. } => Some(*unit_id),
                    _ => None,
                })),
                Err(err) => {
                    debug!("draft for player {player_id} stopped: {err}");
                    break;
                }
            }
        }
        hired
    }

    /// 評分所有可到達格，取最高分（同分取先出現者）
    ///
    /// 分數 = -(敵人權重 × 到最近敵人距離 + 小隔間權重 × 到最近未擁有可佔領格距離) + 擾動
    fn choose_move(&mut self, session: &GameSession, unit_id: UnitId) -> Option<ScoredAction> {
        let unit = session.unit(unit_id)?;
        let enemies: Vec<Position> = session
            .units()
            .filter(|u| u.owner != unit.owner)
            .map(|u| u.position)
            .collect();
        let board = session.board();
        let targets: Vec<Position> = board
            .capturable_positions()
            .filter(|pos| {
                board
                    .get_tile(*pos)
                    .is_some_and(|tile| tile.owner != Some(unit.owner))
            })
            .collect();
        let jitter = self.config.jitter.for_difficulty(self.difficulty);

        let mut best: Option<ScoredAction> = None;
        for to in session.legal_moves(unit_id) {
            let enemy_distance = nearest(&enemies, to);
            let target_distance = nearest(&targets, to);
            let mut score: AIScore = 0.0;
            if let Some(d) = enemy_distance {
                score -= self.config.enemy_weight * d as AIScore;
            }
            if let Some(d) = target_distance {
                score -= self.config.cubicle_weight * d as AIScore;
            }
            if jitter.is_finite() && jitter > 0.0 {
                score += self.rng.random_range(-jitter..=jitter);
            }
            trace!("unit {unit_id} move ({}, {}) score {score:.2}", to.x, to.y);
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(ScoredAction {
                    action: Action::Move { to },
                    score,
                    reason: format!(
                        "enemy distance {enemy_distance:?}, cubicle distance {target_distance:?}"
                    ),
                });
            }
        }
        best
    }
}

fn nearest(points: &[Position], from: Position) -> Option<usize> {
    points
        .iter()
        .map(|p| crate::logic::spatial::manhattan_distance(from, *p))
        .min()
}

use inner::*;
mod inner {
    use super::*;
    use crate::core_types::{GameState, Unit};
    use crate::loader_schema::Ability;
    use crate::logic::ability::AbilityOutcome;

    /// 射程內 HP 最低的敵人（同 HP 取 ID 較小者），不帶隨機
    pub fn choose_attack(session: &GameSession, unit_id: UnitId) -> Option<ScoredAction> {
        session
            .attack_targets(unit_id)
            .into_iter()
            .filter_map(|id| session.unit(id))
            .min_by_key(|target| target.hp)
            .map(|target| ScoredAction {
                action: Action::Attack { target: target.id },
                score: -(target.hp as AIScore),
                reason: format!("lowest hp {} in range", target.hp),
            })
    }

    /// 第一個可佔領格（腳下，再依 +x, -x, +y, -y）
    pub fn choose_capture(session: &GameSession, unit_id: UnitId) -> Option<ScoredAction> {
        session
            .capturable_tiles(unit_id)
            .first()
            .map(|tile| ScoredAction {
                action: Action::Capture { tile: *tile },
                score: 0.0,
                reason: "capturable tile nearby".to_string(),
            })
    }

    /// 試算每個能力與目標，取價值最高且大於 0 者
    pub fn choose_ability(session: &GameSession, unit_id: UnitId) -> Option<ScoredAction> {
        let unit = session.unit(unit_id)?;
        let mut best: Option<ScoredAction> = None;
        for ability in session.catalog().get_unit_abilities(unit.unit_type) {
            if !session.can_use_ability(unit_id, &ability.id) {
                continue;
            }
            for target in session.ability_targets(unit_id, &ability.id) {
                let Ok(outcomes) = session.preview_ability(unit_id, &ability.id, target) else {
                    continue;
                };
                let score = ability_value(session.state(), unit, ability, &outcomes);
                if score > 0.0 && best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(ScoredAction {
                        action: Action::UseAbility {
                            ability_id: ability.id.clone(),
                            target,
                        },
                        score,
                        reason: format!("{} on {target:?}", ability.id),
                    });
                }
            }
        }
        best
    }

    /// 能力試算結果的價值；預算只在招募階段有用，不計分
    pub fn ability_value(
        state: &GameState,
        caster: &Unit,
        ability: &Ability,
        outcomes: &[AbilityOutcome],
    ) -> AIScore {
        let mut value = 0.0;
        for outcome in outcomes.iter().filter(|o| o.is_effective()) {
            let target = outcome.target.and_then(|id| state.unit(id));
            value += 2.0 * outcome.damage as AIScore;
            if let Some(t) = target {
                if outcome.damage >= t.hp && outcome.damage > 0 {
                    value += 3.0;
                }
            }
            value += outcome.healing as AIScore;
            if let Some(effect) = &outcome.status {
                let refreshed = target.is_some_and(|t| {
                    t.status_effects
                        .iter()
                        .any(|s| s.kind == effect.kind && s.duration >= effect.duration)
                });
                if !refreshed {
                    value += 1.0;
                }
            }
            if outcome.action_bonus > 0 {
                value += if outcome.target == Some(caster.id) {
                    outcome.action_bonus as AIScore - ability.cost as AIScore
                } else {
                    0.5 * outcome.action_bonus as AIScore
                };
            }
            if outcome.claimed_tile.is_some() {
                value += 2.0;
            }
        }
        value
    }
}
