//! 遊戲常數定義

use crate::alias::PlayerId;

/// A 隊玩家（先手）
pub const PLAYER_A_ID: PlayerId = 1;

/// B 隊玩家（後手）
pub const PLAYER_B_ID: PlayerId = 2;

/// 一次性能力用過後的冷卻值，永遠無法再次使用
pub const SPENT_COOLDOWN: i32 = -1;

/// 能力表中代表「一次性」的冷卻設定
pub const ONE_TIME_COOLDOWN: i32 = -1;

/// 每個兵種最多可擁有的能力數
pub const MAX_ABILITIES_PER_UNIT_TYPE: usize = 2;

/// 起始回合數
pub const FIRST_TURN: u32 = 1;
