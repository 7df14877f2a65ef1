//! 型別別名

/// 棋盤座標分量
pub type Coord = usize;
/// 通用識別碼
pub type ID = u32;
/// 玩家識別碼
pub type PlayerId = ID;
/// 單位識別碼
pub type UnitId = ID;
/// 能力識別碼（對應能力表的 key）
pub type AbilityId = String;
/// 移動步數
pub type MovementCost = usize;
/// AI 評分
pub type AIScore = f32;
