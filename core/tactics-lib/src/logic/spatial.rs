//! 距離、相鄰與可移動範圍
//!
//! 全部為純函式，不持有也不修改狀態。

use crate::alias::MovementCost;
use crate::core_types::{Board, Position};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// 移動方向（四方向）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

/// 固定的掃描順序：+x, -x, +y, -y
pub const DIRECTIONS: [Direction; 4] = [
    Direction::Right,
    Direction::Left,
    Direction::Down,
    Direction::Up,
];

/// 可到達位置的資訊（含步數與前驅節點）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReachableInfo {
    pub cost: MovementCost,
    pub prev: Position, // 上一個位置（可能是起點）
}

/// 曼哈頓距離，所有射程判定唯一使用的距離
pub fn manhattan_distance(a: Position, b: Position) -> usize {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

pub fn is_adjacent(a: Position, b: Position) -> bool {
    manhattan_distance(a, b) == 1
}

/// 往指定方向移動一格，超出棋盤回傳 `None`
pub fn step_in_direction(board: &Board, pos: Position, direction: Direction) -> Option<Position> {
    let next = match direction {
        Direction::Right => Position::new(pos.x + 1, pos.y),
        Direction::Left => Position::new(pos.x.checked_sub(1)?, pos.y),
        Direction::Down => Position::new(pos.x, pos.y + 1),
        Direction::Up => Position::new(pos.x, pos.y.checked_sub(1)?),
    };
    board.contains(next).then_some(next)
}

/// 棋盤內的四方向鄰格，依 `DIRECTIONS` 順序
pub fn neighbors(board: &Board, pos: Position) -> Vec<Position> {
    DIRECTIONS
        .iter()
        .filter_map(|dir| step_in_direction(board, pos, *dir))
        .collect()
}

/// 計算移動步數內可到達的所有位置（含步數與前驅節點）
///
/// 廣度優先搜尋，每一步成本為 1：
/// - 不可走出棋盤、不可進入障礙物
/// - 任何單位佔據的格子都不可進入也不可穿越
/// - 不包含起點
///
/// 起點不在棋盤內時回傳空集合
pub fn reachable_positions<F>(
    origin: Position,
    move_range: MovementCost,
    board: &Board,
    is_occupied: F,
) -> HashMap<Position, ReachableInfo>
where
    F: Fn(Position) -> bool,
{
    let mut reached: HashMap<Position, ReachableInfo> = HashMap::new();
    if !board.contains(origin) {
        return reached;
    }

    let mut queue = VecDeque::from([(origin, 0)]);
    while let Some((pos, cost)) = queue.pop_front() {
        if cost >= move_range {
            continue;
        }
        for next in neighbors(board, pos) {
            if next == origin || reached.contains_key(&next) {
                continue;
            }
            let passable = board
                .get_tile(next)
                .is_some_and(|tile| tile.tile_type.is_traversable());
            if !passable || is_occupied(next) {
                continue;
            }
            // BFS 先到者即為最短距離
            reached.insert(
                next,
                ReachableInfo {
                    cost: cost + 1,
                    prev: pos,
                },
            );
            queue.push_back((next, cost + 1));
        }
    }
    log::trace!(
        "reachable from ({}, {}) within {}: {} tiles",
        origin.x,
        origin.y,
        move_range,
        reached.len()
    );
    reached
}

/// 可移動的目的地集合
pub fn reachable_tiles<F>(
    origin: Position,
    move_range: MovementCost,
    board: &Board,
    is_occupied: F,
) -> BTreeSet<Position>
where
    F: Fn(Position) -> bool,
{
    reachable_positions(origin, move_range, board, is_occupied)
        .into_keys()
        .collect()
}

/// 依前驅節點還原路徑（含起點與終點），終點不可達時回傳 `None`
pub fn reconstruct_path(
    reached: &HashMap<Position, ReachableInfo>,
    from: Position,
    to: Position,
) -> Option<Vec<Position>> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        let info = reached.get(&current)?;
        current = info.prev;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

/// 以起點為中心、曼哈頓距離不超過 `range` 的棋盤內座標
pub fn positions_within(board: &Board, center: Position, range: usize) -> Vec<Position> {
    let min_x = center.x.saturating_sub(range);
    let min_y = center.y.saturating_sub(range);
    let max_x = (center.x + range).min(board.width.saturating_sub(1));
    let max_y = (center.y + range).min(board.height.saturating_sub(1));
    if board.width == 0 || board.height == 0 {
        return vec![];
    }
    (min_y..=max_y)
        .flat_map(|y| (min_x..=max_x).map(move |x| Position { x, y }))
        .filter(|pos| manhattan_distance(center, *pos) <= range)
        .collect()
}
