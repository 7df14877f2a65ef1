//! 錯誤處理系統
//!
//! - `ActionError`：指令被拒絕的原因，以 `Result` 回傳給呼叫端（UI 或 AI），狀態不變
//! - `Error`：載入資料時的頂層錯誤，附帶 context 鏈

use crate::alias::{AbilityId, Coord, UnitId};
use crate::core_types::Position;
use crate::core_types::UnitType;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 頂層錯誤，包含原始錯誤和 context 鏈
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    contexts: Vec<String>,
}

/// 錯誤種類
#[derive(Debug, ThisError)]
pub enum ErrorKind {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// 指令錯誤分類（不含細節，方便比對）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    IllegalAction,
    OutOfRange,
    Blocked,
    InvalidTarget,
    OnCooldown,
    InsufficientResources,
}

/// 指令被拒絕的原因
///
/// 所有檢查都在修改狀態前完成，回傳錯誤時遊戲狀態保證未變動
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ActionError {
    #[error("不合法的行動：{reason}")]
    IllegalAction { reason: String },
    #[error("超出範圍：距離 {distance}，上限 {limit}")]
    OutOfRange { distance: usize, limit: usize },
    #[error("位置 ({}, {}) 被阻擋", .pos.x, .pos.y)]
    Blocked { pos: Position },
    #[error("無效的目標：{reason}")]
    InvalidTarget { reason: String },
    #[error("能力 {ability_id} 冷卻中（剩餘 {remaining}）")]
    OnCooldown { ability_id: AbilityId, remaining: i32 },
    #[error("資源不足：需要 {needed}，剩餘 {available}")]
    InsufficientResources { needed: u32, available: u32 },
}

impl ActionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ActionError::IllegalAction { .. } => ErrorCategory::IllegalAction,
            ActionError::OutOfRange { .. } => ErrorCategory::OutOfRange,
            ActionError::Blocked { .. } => ErrorCategory::Blocked,
            ActionError::InvalidTarget { .. } => ErrorCategory::InvalidTarget,
            ActionError::OnCooldown { .. } => ErrorCategory::OnCooldown,
            ActionError::InsufficientResources { .. } => ErrorCategory::InsufficientResources,
        }
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        ActionError::IllegalAction {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_target(reason: impl Into<String>) -> Self {
        ActionError::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_such_unit(unit_id: UnitId) -> Self {
        Self::illegal(format!("單位 {unit_id} 不存在或已被消滅"))
    }
}

/// 格式載入錯誤
#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("解析失敗: {0}")]
    ParseError(String),
    #[error("第 {row} 行寬度 {found} 與第一行寬度 {expected} 不符")]
    RaggedRow {
        row: Coord,
        expected: Coord,
        found: Coord,
    },
    #[error("未知的地圖符號 `{symbol}` 於 ({x}, {y})")]
    UnknownSymbol { symbol: String, x: Coord, y: Coord },
    #[error("{format} 反序列化失敗: {reason}")]
    DeserializeError { format: String, reason: String },
}

/// 能力表 / 兵種表錯誤
#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error("能力未找到: {ability_id}")]
    AbilityNotFound { ability_id: AbilityId },
    #[error("能力重複定義: {ability_id}")]
    DuplicateAbility { ability_id: AbilityId },
    #[error("兵種 {unit_type} 未定義")]
    UnitTypeMissing { unit_type: UnitType },
    #[error("兵種 {unit_type} 能力過多：{count}")]
    TooManyAbilities { unit_type: UnitType, count: usize },
    #[error("能力 {ability_id} 設定錯誤：{reason}")]
    InvalidAbility {
        ability_id: AbilityId,
        reason: String,
    },
    #[error("兵種 {unit_type} 數值錯誤：{reason}")]
    InvalidUnitStats { unit_type: UnitType, reason: String },
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// 添加錯誤上下文，自動記錄呼叫位置
    #[track_caller]
    pub fn context<C: Into<String>>(mut self, context: C) -> Self {
        let loc = std::panic::Location::caller();
        let msg = format!("{} [{}:{}]", context.into(), loc.file(), loc.line());
        self.contexts.push(msg);
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in &self.contexts {
            write!(f, "\n  {}", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl<E: Into<ErrorKind>> From<E> for Error {
    fn from(error: E) -> Self {
        Self {
            kind: error.into(),
            contexts: Vec::new(),
        }
    }
}

/// Result 擴展 trait，用於添加錯誤上下文
pub trait Context<T> {
    #[track_caller]
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    #[track_caller]
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.context(context)),
        }
    }
}
