//! 核心資料結構（棋盤、格子、單位、玩家、遊戲狀態）
//!
//! 只放資料與簡單的讀取輔助，規則判定請見 `logic`。

use crate::alias::{AbilityId, Coord, PlayerId, UnitId};
use crate::constants::{FIRST_TURN, PLAYER_A_ID, PLAYER_B_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

/// 棋盤位置（座標）
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: Coord,
    pub y: Coord,
}

impl Position {
    pub fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

/// 格子種類
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TileType {
    #[default]
    Normal,
    Cubicle,
    Obstacle,
    ConferenceRoom,
    Hallway,
    HqA,
    HqB,
}

impl TileType {
    /// 可被佔領（小隔間與總部）
    pub fn is_capturable(self) -> bool {
        matches!(self, TileType::Cubicle | TileType::HqA | TileType::HqB)
    }

    /// 障礙物不可通行、不可站立
    pub fn is_traversable(self) -> bool {
        self != TileType::Obstacle
    }

    /// 總部所屬隊伍
    pub fn hq_team(self) -> Option<Team> {
        match self {
            TileType::HqA => Some(Team::A),
            TileType::HqB => Some(Team::B),
            _ => None,
        }
    }
}

/// UI 提示用的格子標記，不屬於遊戲規則狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Highlight {
    Movement,
    Attack,
    Ability,
    Capture,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    pub owner: Option<PlayerId>,
    pub occupant: Option<UnitId>,
    #[serde(skip)]
    pub highlight: Option<Highlight>,
}

impl Tile {
    pub fn new(tile_type: TileType) -> Self {
        Self {
            tile_type,
            ..Default::default()
        }
    }
}

/// 棋盤，`tiles[y][x]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub width: Coord,
    pub height: Coord,
    pub tiles: Vec<Vec<Tile>>,
}

impl Board {
    /// 建立全部為指定種類的棋盤
    pub fn filled(width: Coord, height: Coord, tile_type: TileType) -> Self {
        Self {
            width,
            height,
            tiles: vec![vec![Tile::new(tile_type); width]; height],
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn get_tile(&self, pos: Position) -> Option<&Tile> {
        self.tiles.get(pos.y)?.get(pos.x)
    }

    pub fn get_tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(pos.y)?.get_mut(pos.x)
    }

    /// 依列優先順序列出所有座標
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position { x, y }))
    }

    /// 所有可佔領格（小隔間 + 總部）
    pub fn capturable_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(|pos| {
            self.get_tile(*pos)
                .is_some_and(|tile| tile.tile_type.is_capturable())
        })
    }

    /// 清除所有 UI 標記
    pub fn clear_highlights(&mut self) {
        for tile in self.tiles.iter_mut().flatten() {
            tile.highlight = None;
        }
    }
}

/// 隊伍
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// 每隊固定對應一位玩家
    pub fn player_id(self) -> PlayerId {
        match self {
            Team::A => PLAYER_A_ID,
            Team::B => PLAYER_B_ID,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub budget: u32,
    pub income: u32,
    /// 由格子所有權重算，不可單獨修改
    pub controlled_cubicles: u32,
}

/// 兵種
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnitType {
    Intern,
    Developer,
    Designer,
    SalesRep,
    HrManager,
    Accountant,
    Manager,
    Executive,
}

/// 狀態效果種類
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusKind {
    /// 移動 +1
    OnDeadline,
    /// 移動 -1
    Harassed,
    /// 回合開始行動 -1
    Exhausted,
    /// 回合開始行動歸零
    Stunned,
    /// 不受敵方狀態影響
    Shielded,
    /// 攻擊距離 +1
    Focused,
    /// 無法使用能力
    Confused,
    /// 回合開始行動 +1
    Inspired,
}

impl StatusKind {
    /// 負面狀態只能施加於敵人，其餘只能施加於友軍
    pub fn is_debuff(self) -> bool {
        matches!(
            self,
            StatusKind::Harassed | StatusKind::Exhausted | StatusKind::Stunned | StatusKind::Confused
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// 剩餘持續時間（擁有者的回合數）
    pub duration: u32,
    pub source: Option<UnitId>,
}

/// 回合開始時由狀態效果結算出的修正，整個回合內不變
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnModifiers {
    pub move_delta: i32,
    pub attack_range_bonus: u32,
    pub confused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub unit_type: UnitType,
    pub position: Position,
    pub hp: i32,
    pub max_hp: i32,
    pub move_range: u32,
    pub attack_range: u32,
    pub attack_damage: i32,
    pub actions_remaining: u32,
    pub max_actions: u32,
    pub status_effects: Vec<StatusEffect>,
    pub cost: u32,
    pub has_moved: bool,
    pub has_attacked: bool,
    pub abilities: Vec<AbilityId>,
    /// 0 = 可用；`SPENT_COOLDOWN` = 一次性能力已用過
    pub cooldowns: BTreeMap<AbilityId, i32>,
    #[serde(default)]
    pub modifiers: TurnModifiers,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status_effects.iter().any(|s| s.kind == kind)
    }

    /// 未記錄的能力視為可用
    pub fn cooldown(&self, ability_id: &str) -> i32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0)
    }
}

/// 遊戲階段
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Phase {
    #[default]
    Setup,
    Draft,
    Playing,
    GameOver,
}

/// 兩隊的部署點
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoints {
    pub team_a: Vec<Position>,
    pub team_b: Vec<Position>,
}

impl SpawnPoints {
    pub fn for_team(&self, team: Team) -> &[Position] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }
}

/// 已解析的關卡（棋盤 + 部署點）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub board: Board,
    pub spawns: SpawnPoints,
}

/// 遊戲狀態（聚合根），只由 `GameSession` 持有並透過規則函式修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub units: BTreeMap<UnitId, Unit>,
    pub players: Vec<Player>,
    pub current_player: PlayerId,
    pub turn_number: u32,
    pub phase: Phase,
    pub selected_unit: Option<UnitId>,
    pub winner: Option<PlayerId>,
    pub spawns: SpawnPoints,
    pub next_unit_id: UnitId,
}

impl GameState {
    /// 以關卡建立 SETUP 階段的狀態
    ///
    /// 玩家依 `names` 順序分配為 A、B 兩隊，A 隊先手
    pub fn new(level: Level, names: [String; 2]) -> Self {
        let [name_a, name_b] = names;
        let players = vec![
            Player {
                id: Team::A.player_id(),
                name: name_a,
                team: Team::A,
                budget: 0,
                income: 0,
                controlled_cubicles: 0,
            },
            Player {
                id: Team::B.player_id(),
                name: name_b,
                team: Team::B,
                budget: 0,
                income: 0,
                controlled_cubicles: 0,
            },
        ];
        let mut state = Self {
            board: level.board,
            units: BTreeMap::new(),
            players,
            current_player: Team::A.player_id(),
            turn_number: FIRST_TURN,
            phase: Phase::Setup,
            selected_unit: None,
            winner: None,
            spawns: level.spawns,
            next_unit_id: 1,
        };
        for player_id in [PLAYER_A_ID, PLAYER_B_ID] {
            state.recount_cubicles(player_id);
        }
        state
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.get(&unit_id)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.id != player_id)
            .map(|p| p.id)
    }

    pub fn units_of(&self, player_id: PlayerId) -> impl Iterator<Item = &Unit> + '_ {
        self.units.values().filter(move |u| u.owner == player_id)
    }

    /// 某玩家擁有的可佔領格數
    pub fn owned_capturables(&self, player_id: PlayerId) -> u32 {
        self.board
            .capturable_positions()
            .filter(|pos| {
                self.board
                    .get_tile(*pos)
                    .is_some_and(|tile| tile.owner == Some(player_id))
            })
            .count() as u32
    }

    /// 依格子所有權重算 controlled_cubicles，回傳新值
    pub fn recount_cubicles(&mut self, player_id: PlayerId) -> u32 {
        let count = self.owned_capturables(player_id);
        if let Some(player) = self.player_mut(player_id) {
            player.controlled_cubicles = count;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_type_flags() {
        let test_data = [
            (TileType::Normal, false, true),
            (TileType::Cubicle, true, true),
            (TileType::Obstacle, false, false),
            (TileType::ConferenceRoom, false, true),
            (TileType::Hallway, false, true),
            (TileType::HqA, true, true),
            (TileType::HqB, true, true),
        ];
        for (tile_type, capturable, traversable) in test_data {
            assert_eq!(tile_type.is_capturable(), capturable, "{tile_type}");
            assert_eq!(tile_type.is_traversable(), traversable, "{tile_type}");
        }
        assert_eq!(TileType::HqA.hq_team(), Some(Team::A));
        assert_eq!(TileType::Cubicle.hq_team(), None);
    }

    #[test]
    fn test_board_get_tile_out_of_bounds() {
        let board = Board::filled(3, 2, TileType::Normal);
        assert!(board.get_tile(Position::new(2, 1)).is_some());
        assert!(board.get_tile(Position::new(3, 0)).is_none());
        assert!(board.get_tile(Position::new(0, 2)).is_none());
        assert_eq!(board.positions().count(), 6);
    }

    #[test]
    fn test_new_state_counts_hq() {
        let mut board = Board::filled(3, 1, TileType::Cubicle);
        board.tiles[0][0] = Tile {
            tile_type: TileType::HqA,
            owner: Some(PLAYER_A_ID),
            ..Default::default()
        };
        let level = Level {
            name: "t".to_string(),
            board,
            spawns: SpawnPoints::default(),
        };
        let state = GameState::new(level, ["a".to_string(), "b".to_string()]);
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(state.player(PLAYER_A_ID).map(|p| p.controlled_cubicles), Some(1));
        assert_eq!(state.player(PLAYER_B_ID).map(|p| p.controlled_cubicles), Some(0));
        assert_eq!(state.opponent_of(PLAYER_A_ID), Some(PLAYER_B_ID));
    }

    #[test]
    fn test_unit_type_from_str() {
        use std::str::FromStr;
        assert_eq!(UnitType::from_str("hr_manager").ok(), Some(UnitType::HrManager));
        assert_eq!(UnitType::SalesRep.to_string(), "sales_rep");
    }
}
