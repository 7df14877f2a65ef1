//! 遊戲狀態存放區
//!
//! `GameSession` 獨佔 `GameState`，是 UI 與 AI 讀取狀態、下達指令的唯一入口。
//! 指令成功後依序通知觀察者；失敗時狀態不變，只記錄 debug 訊息。

use crate::alias::{AbilityId, PlayerId, UnitId};
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::core_types::{
    Board, GameState, Highlight, Level, Phase, Player, Position, StatusKind, Unit, UnitType,
};
use crate::error::{ActionError, Result};
use crate::loader::builtin_level;
use crate::logic::ability::{AbilityOutcome, AbilityTarget};
use crate::logic::rules::{self, ActionResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// 戰鬥指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Move {
        unit_id: UnitId,
        to: Position,
    },
    Attack {
        attacker: UnitId,
        target: UnitId,
    },
    UseAbility {
        caster: UnitId,
        ability_id: AbilityId,
        target: AbilityTarget,
    },
    Capture {
        unit_id: UnitId,
        tile: Position,
    },
    EndTurn,
}

/// 成功指令產生的事件，依發生順序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged {
        phase: Phase,
    },
    UnitHired {
        unit_id: UnitId,
        player: PlayerId,
        unit_type: UnitType,
        position: Position,
    },
    /// `path` 含起點與終點
    UnitMoved {
        unit_id: UnitId,
        from: Position,
        to: Position,
        path: Vec<Position>,
    },
    UnitAttacked {
        attacker: UnitId,
        target: UnitId,
        damage: i32,
    },
    UnitDamaged {
        unit_id: UnitId,
        amount: i32,
        hp: i32,
    },
    UnitHealed {
        unit_id: UnitId,
        amount: i32,
        hp: i32,
    },
    UnitDestroyed {
        unit_id: UnitId,
        position: Position,
    },
    StatusApplied {
        unit_id: UnitId,
        kind: StatusKind,
        duration: u32,
    },
    StatusExpired {
        unit_id: UnitId,
        kind: StatusKind,
    },
    ActionsGranted {
        unit_id: UnitId,
        amount: u32,
    },
    AbilityUsed {
        caster: UnitId,
        ability_id: AbilityId,
        target: AbilityTarget,
    },
    TileCaptured {
        position: Position,
        player: PlayerId,
        previous_owner: Option<PlayerId>,
    },
    BudgetChanged {
        player: PlayerId,
        budget: u32,
    },
    TurnStarted {
        player: PlayerId,
        turn_number: u32,
    },
    GameOver {
        winner: PlayerId,
    },
}

/// 狀態變化的觀察者（畫面、音效、紀錄等）
pub trait SessionObserver {
    fn on_event(&mut self, event: &GameEvent, state: &GameState);
}

/// 記錄所有事件的觀察者，clone 後共用同一份紀錄
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl SessionObserver for EventLog {
    fn on_event(&mut self, event: &GameEvent, _state: &GameState) {
        self.events.borrow_mut().push(event.clone());
    }
}

pub struct GameSession {
    state: GameState,
    catalog: Catalog,
    config: GameConfig,
    selected_ability: Option<AbilityId>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl GameSession {
    pub fn new(level: Level, catalog: Catalog, config: GameConfig) -> Self {
        let state = GameState::new(level, config.rules.player_names.clone());
        Self::from_state(state, catalog, config)
    }

    /// 從既有狀態接續，例如預先擺好的局面
    pub fn from_state(state: GameState, catalog: Catalog, config: GameConfig) -> Self {
        Self {
            state,
            catalog,
            config,
            selected_ability: None,
            observers: vec![],
        }
    }

    /// 以內建關卡與能力表建立
    pub fn builtin(config: GameConfig) -> Result<Self> {
        Ok(Self::new(builtin_level()?, Catalog::builtin()?, config))
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------------
    // 唯讀存取
    // ------------------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.state.unit(unit_id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.state.units.values()
    }

    pub fn players(&self) -> &[Player] {
        &self.state.players
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.state.player(player_id)
    }

    pub fn current_player(&self) -> PlayerId {
        self.state.current_player
    }

    pub fn turn_number(&self) -> u32 {
        self.state.turn_number
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    pub fn selected_unit(&self) -> Option<UnitId> {
        self.state.selected_unit
    }

    pub fn selected_ability(&self) -> Option<&str> {
        self.selected_ability.as_deref()
    }

    // ------------------------------------------------------------------------
    // 查詢（無副作用）
    // ------------------------------------------------------------------------

    pub fn legal_moves(&self, unit_id: UnitId) -> BTreeSet<Position> {
        rules::legal_moves(&self.state, unit_id)
    }

    pub fn attack_targets(&self, unit_id: UnitId) -> Vec<UnitId> {
        rules::attack_targets(&self.state, &self.config.rules, unit_id)
    }

    pub fn capturable_tiles(&self, unit_id: UnitId) -> Vec<Position> {
        rules::capturable_tiles(&self.state, unit_id)
    }

    pub fn ability_targets(&self, unit_id: UnitId, ability_id: &str) -> Vec<AbilityTarget> {
        rules::ability_targets(&self.state, &self.catalog, unit_id, ability_id)
    }

    pub fn can_unit_move(&self, unit_id: UnitId) -> bool {
        rules::can_unit_move(&self.state, unit_id)
    }

    pub fn can_unit_attack(&self, unit_id: UnitId) -> bool {
        rules::can_unit_attack(&self.state, &self.config.rules, unit_id)
    }

    pub fn can_use_ability(&self, unit_id: UnitId, ability_id: &str) -> bool {
        rules::can_use_ability(&self.state, &self.catalog, unit_id, ability_id)
    }

    pub fn preview_ability(
        &self,
        unit_id: UnitId,
        ability_id: &str,
        target: AbilityTarget,
    ) -> std::result::Result<Vec<AbilityOutcome>, ActionError> {
        rules::preview_ability(&self.state, &self.catalog, unit_id, ability_id, target)
    }

    // ------------------------------------------------------------------------
    // 指令
    // ------------------------------------------------------------------------

    pub fn dispatch(&mut self, command: Command) -> ActionResult {
        let rules_config = &self.config.rules;
        let result = match &command {
            Command::Move { unit_id, to } => rules::move_unit(&mut self.state, *unit_id, *to),
            Command::Attack { attacker, target } => {
                rules::attack(&mut self.state, rules_config, *attacker, *target)
            }
            Command::UseAbility {
                caster,
                ability_id,
                target,
            } => rules::use_ability(
                &mut self.state,
                &self.catalog,
                rules_config,
                *caster,
                ability_id,
                *target,
            ),
            Command::Capture { unit_id, tile } => {
                rules::capture_cubicle(&mut self.state, rules_config, *unit_id, *tile)
            }
            Command::EndTurn => rules::end_turn(&mut self.state, rules_config),
        };
        self.finish(result, &format!("{command:?}"))
    }

    pub fn move_unit(&mut self, unit_id: UnitId, to: Position) -> ActionResult {
        self.dispatch(Command::Move { unit_id, to })
    }

    pub fn attack(&mut self, attacker: UnitId, target: UnitId) -> ActionResult {
        self.dispatch(Command::Attack { attacker, target })
    }

    pub fn use_ability(
        &mut self,
        caster: UnitId,
        ability_id: &str,
        target: AbilityTarget,
    ) -> ActionResult {
        self.dispatch(Command::UseAbility {
            caster,
            ability_id: ability_id.to_string(),
            target,
        })
    }

    pub fn capture(&mut self, unit_id: UnitId, tile: Position) -> ActionResult {
        self.dispatch(Command::Capture { unit_id, tile })
    }

    pub fn end_turn(&mut self) -> ActionResult {
        self.dispatch(Command::EndTurn)
    }

    pub fn start_draft(&mut self) -> ActionResult {
        let result = rules::start_draft(&mut self.state, &self.config.rules);
        self.finish(result, "StartDraft")
    }

    pub fn hire_unit(
        &mut self,
        player_id: PlayerId,
        unit_type: UnitType,
        spawn: Position,
    ) -> ActionResult {
        let result = rules::hire_unit(
            &mut self.state,
            &self.catalog,
            player_id,
            unit_type,
            spawn,
        );
        self.finish(result, &format!("Hire {unit_type} for player {player_id}"))
    }

    pub fn start_battle(&mut self) -> ActionResult {
        let result = rules::start_battle(&mut self.state, &self.config.rules);
        self.finish(result, "StartBattle")
    }

    fn finish(&mut self, result: ActionResult, what: &str) -> ActionResult {
        let events = match result {
            Ok(events) => events,
            Err(err) => {
                debug!("{what} rejected: {err}");
                return Err(err);
            }
        };
        self.refresh_highlights();
        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event, &self.state);
            }
        }
        Ok(events)
    }

    // ------------------------------------------------------------------------
    // 選取與 UI 標記
    // ------------------------------------------------------------------------

    /// 選取單位並更新格子標記，選取不存在的單位回傳 `InvalidTarget`
    pub fn select_unit(&mut self, unit_id: Option<UnitId>) -> std::result::Result<(), ActionError> {
        if let Some(id) = unit_id {
            if self.state.unit(id).is_none() {
                return Err(ActionError::invalid_target(format!("單位 {id} 不存在")));
            }
        }
        self.state.selected_unit = unit_id;
        self.selected_ability = None;
        self.refresh_highlights();
        Ok(())
    }

    /// 為已選取的單位選擇能力，標記改為能力目標
    pub fn select_ability(
        &mut self,
        ability_id: Option<&str>,
    ) -> std::result::Result<(), ActionError> {
        if let Some(id) = ability_id {
            let owns = self
                .state
                .selected_unit
                .and_then(|unit_id| self.state.unit(unit_id))
                .is_some_and(|unit| unit.abilities.iter().any(|a| a == id));
            if !owns {
                return Err(ActionError::illegal(format!("選取的單位沒有能力 {id}")));
            }
        }
        self.selected_ability = ability_id.map(str::to_string);
        self.refresh_highlights();
        Ok(())
    }

    fn refresh_highlights(&mut self) {
        self.state.board.clear_highlights();
        let Some(unit_id) = self
            .state
            .selected_unit
            .filter(|id| self.state.unit(*id).is_some())
        else {
            self.state.selected_unit = None;
            self.selected_ability = None;
            return;
        };

        let mut marks: Vec<(Position, Highlight)> = vec![];
        if let Some(ability_id) = &self.selected_ability {
            for target in self.ability_targets(unit_id, ability_id) {
                let pos = match target {
                    AbilityTarget::Unit(id) => self.state.unit(id).map(|u| u.position),
                    AbilityTarget::Tile(pos) => Some(pos),
                    AbilityTarget::None => None,
                };
                marks.extend(pos.map(|p| (p, Highlight::Ability)));
            }
        } else {
            marks.extend(
                self.legal_moves(unit_id)
                    .into_iter()
                    .map(|p| (p, Highlight::Movement)),
            );
            marks.extend(
                self.capturable_tiles(unit_id)
                    .into_iter()
                    .map(|p| (p, Highlight::Capture)),
            );
            for target in self.attack_targets(unit_id) {
                marks.extend(
                    self.state
                        .unit(target)
                        .map(|u| (u.position, Highlight::Attack)),
                );
            }
        }
        for (pos, highlight) in marks {
            if let Some(tile) = self.state.board.get_tile_mut(pos) {
                tile.highlight = Some(highlight);
            }
        }
    }
}
