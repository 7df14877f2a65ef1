//! 核心規則邏輯（純函式，狀態由呼叫端傳入）

pub mod ability;
pub mod rules;
pub mod spatial;
pub mod status;
