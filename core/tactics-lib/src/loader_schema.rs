//! Loader 相關的資料結構定義（能力表、兵種表、關卡）

use crate::alias::AbilityId;
use crate::core_types::{StatusKind, UnitType};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

// ============================================================================
// 能力系統 (Ability System)
// ============================================================================

/// 能力的目標類型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetType {
    /// 只針對施放者自己
    #[serde(rename = "self")]
    #[strum(serialize = "self")]
    Caster,
    /// 射程內友軍（含施放者）
    Ally,
    /// 射程內敵人
    Enemy,
    /// 射程內任一格
    Tile,
    /// 所有友軍，不受射程限制
    AllAllies,
    /// 所有敵人，不受射程限制
    AllEnemies,
    /// 無目標
    None,
}

/// 能力效果
///
/// 每種效果在 `resolve` 時自行驗證目標，並回傳要套用的結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbilityEffect {
    /// 造成固定傷害
    Damage { amount: i32 },
    /// 目標 HP 不超過門檻時，造成等同目前 HP 的傷害
    Execute { max_target_hp: i32 },
    /// 回復 HP（不超過上限）
    Heal { amount: i32 },
    /// 附加狀態
    ApplyStatus { status: StatusKind, duration: u32 },
    /// 傷害並附加狀態
    DamageAndStatus {
        amount: i32,
        status: StatusKind,
        duration: u32,
    },
    /// 立即給予額外行動
    GrantActions { amount: u32 },
    /// 佔領目標小隔間（不含總部）
    ClaimTile,
    /// 增加施放者所屬玩家的預算
    RaiseBudget { amount: u32 },
}

/// 能力定義，載入後不再變動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 行動點消耗
    pub cost: u32,
    /// 冷卻回合數，-1 代表一次性
    #[serde(default)]
    pub cooldown: i32,
    #[serde(default)]
    pub range: u32,
    pub target: TargetType,
    pub effect: AbilityEffect,
}

// ============================================================================
// 兵種系統 (Unit Type System)
// ============================================================================

/// 兵種基礎屬性與能力配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub unit_type: UnitType,
    pub hp: i32,
    pub move_range: u32,
    pub attack_range: u32,
    pub attack_damage: i32,
    pub max_actions: u32,
    /// 招募花費
    pub cost: u32,
    #[serde(default)]
    pub abilities: Vec<AbilityId>,
}

/// `abilities.toml` 的根
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilitiesFile {
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

/// `units.toml` 的根
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitsFile {
    #[serde(default)]
    pub units: Vec<UnitStats>,
}

// ============================================================================
// 關卡系統 (Level System)
// ============================================================================

/// 關卡類型定義，`layout` 為 ASCII 地圖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelType {
    pub name: String,
    pub layout: String,
}
