//! 遊戲設定（規則參數與 AI 參數），可由 TOML 覆寫

use crate::alias::AIScore;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// AI 難度，只影響移動評分的隨機擾動幅度
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
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 招募階段每位玩家的預算
    pub draft_budget: u32,
    /// 每回合基本收入
    pub base_income: u32,
    /// 每個佔領格額外收入
    pub income_per_cubicle: u32,
    /// 每個單位每回合最多攻擊一次
    pub single_attack_per_turn: bool,
    pub player_names: [String; 2],
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            draft_budget: 20,
            base_income: 1,
            income_per_cubicle: 1,
            single_attack_per_turn: true,
            player_names: ["Player A".to_string(), "Player B".to_string()],
        }
    }
}

impl RulesConfig {
    pub fn income_for(&self, controlled_cubicles: u32) -> u32 {
        self.base_income + self.income_per_cubicle * controlled_cubicles
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// 接近最近敵人的權重
    pub enemy_weight: AIScore,
    /// 接近最近可佔領格的權重
    pub cubicle_weight: AIScore,
    pub jitter: JitterConfig,
    /// 是否在攻擊與佔領之後考慮使用能力
    pub use_abilities: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enemy_weight: 1.0,
            cubicle_weight: 0.6,
            jitter: JitterConfig::default(),
            use_abilities: true,
        }
    }
}

/// 各難度的隨機擾動上限，擾動值取 `[-j, j]` 均勻分佈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub easy: AIScore,
    pub normal: AIScore,
    pub hard: AIScore,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            easy: 3.0,
            normal: 1.0,
            hard: 0.05,
        }
    }
}

impl JitterConfig {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> AIScore {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}
