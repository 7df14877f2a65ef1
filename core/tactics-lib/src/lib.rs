//! 辦公室戰術：回合制戰棋的規則核心
//!
//! - `logic`：空間計算、能力結算、戰鬥規則（純函式）
//! - `catalog`：能力表與兵種表
//! - `session`：持有遊戲狀態的唯一入口，供 UI 與 AI 使用
//! - `ai`：電腦玩家

pub mod ai;
pub mod alias;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod error;
pub mod loader;
pub mod loader_schema;
pub mod logic;
pub mod session;

pub use ai::{AiController, TurnSummary};
pub use catalog::Catalog;
pub use config::{Difficulty, GameConfig};
pub use core_types::{GameState, Phase, Position, UnitType};
pub use error::{ActionError, Error, Result};
pub use session::{Command, GameEvent, GameSession};
