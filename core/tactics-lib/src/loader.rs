//! 關卡、能力表與設定的載入器

use crate::config::GameConfig;
use crate::core_types::{Board, Level, Position, SpawnPoints, Team, Tile, TileType};
use crate::error::{Context, LoadError, Result};
use crate::loader_schema::{AbilitiesFile, LevelType, UnitsFile};
use serde::de::DeserializeOwned;

const BUILTIN_LEVEL_TOML: &str = include_str!("../data/levels/open_office.toml");

/// 從 ASCII 格式載入棋盤
///
/// ASCII 格式：每行用空格分隔的符號
/// - `.` = 一般，`#` = 障礙，`C` = 小隔間，`R` = 會議室，`H` = 走廊
/// - `A` / `B` = A 隊 / B 隊總部（初始即屬於該隊）
/// - `a` / `b` = A 隊 / B 隊部署點（一般地形）
///
/// 例如：
/// ```text
/// A a . C
/// . # . .
/// C . b B
/// ```
pub fn load_from_ascii(ascii: &str) -> Result<(Board, SpawnPoints)> {
    let lines: Vec<&str> = ascii
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(LoadError::ParseError("棋盤為空".to_string()).into());
    }

    // 推導寬度（第一行的符號數）
    let width = lines[0].split_whitespace().count();
    let height = lines.len();

    let mut tiles = Vec::with_capacity(height);
    let mut spawns = SpawnPoints::default();
    for (y, line) in lines.iter().enumerate() {
        let cells: Vec<&str> = line.split_whitespace().collect();
        if cells.len() != width {
            return Err(LoadError::RaggedRow {
                row: y,
                expected: width,
                found: cells.len(),
            }
            .into());
        }
        let mut row = Vec::with_capacity(width);
        for (x, cell) in cells.into_iter().enumerate() {
            let pos = Position { x, y };
            let tile_type = match cell {
                "." => TileType::Normal,
                "#" => TileType::Obstacle,
                "C" => TileType::Cubicle,
                "R" => TileType::ConferenceRoom,
                "H" => TileType::Hallway,
                "A" => TileType::HqA,
                "B" => TileType::HqB,
                "a" => {
                    spawns.team_a.push(pos);
                    TileType::Normal
                }
                "b" => {
                    spawns.team_b.push(pos);
                    TileType::Normal
                }
                other => {
                    return Err(LoadError::UnknownSymbol {
                        symbol: other.to_string(),
                        x,
                        y,
                    }
                    .into());
                }
            };
            let mut tile = Tile::new(tile_type);
            tile.owner = tile_type.hq_team().map(Team::player_id);
            row.push(tile);
        }
        tiles.push(row);
    }

    Ok((
        Board {
            width,
            height,
            tiles,
        },
        spawns,
    ))
}

fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| {
        LoadError::DeserializeError {
            format: "TOML".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// 解析關卡 TOML
pub fn parse_level(content: &str) -> Result<Level> {
    let level: LevelType = parse_toml(content).context("解析關卡 TOML")?;
    let (board, spawns) =
        load_from_ascii(&level.layout).context(format!("解析關卡 {} 的地圖", level.name))?;
    Ok(Level {
        name: level.name,
        board,
        spawns,
    })
}

/// 內建關卡
pub fn builtin_level() -> Result<Level> {
    parse_level(BUILTIN_LEVEL_TOML).context("載入內建關卡")
}

pub fn parse_abilities(content: &str) -> Result<AbilitiesFile> {
    parse_toml(content).context("解析能力表 TOML")
}

pub fn parse_units(content: &str) -> Result<UnitsFile> {
    parse_toml(content).context("解析兵種表 TOML")
}

/// 解析設定，未寫出的欄位使用預設值
pub fn parse_config(content: &str) -> Result<GameConfig> {
    let config: GameConfig = parse_toml(content).context("解析設定 TOML")?;
    let ai = &config.ai;
    let weights = [
        ("enemy_weight", ai.enemy_weight),
        ("cubicle_weight", ai.cubicle_weight),
        ("jitter.easy", ai.jitter.easy),
        ("jitter.normal", ai.jitter.normal),
        ("jitter.hard", ai.jitter.hard),
    ];
    if let Some((name, value)) = weights.iter().find(|(_, v)| !v.is_finite()) {
        return Err(LoadError::ParseError(format!("AI 參數 {name} = {value} 不是有限數值"))
            .into());
    }
    Ok(config)
}
