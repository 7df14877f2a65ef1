//! 兩個 AI 對戰的命令列工具，用來檢查平衡與規則
//!
//! ```text
//! cargo run -p autobattle -- --seed 7 --difficulty-a hard --difficulty-b easy
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tactics_lib::ai::AiController;
use tactics_lib::catalog::Catalog;
use tactics_lib::config::{Difficulty, GameConfig};
use tactics_lib::constants::{PLAYER_A_ID, PLAYER_B_ID};
use tactics_lib::core_types::Phase;
use tactics_lib::loader::{builtin_level, parse_config, parse_level};
use tactics_lib::session::{EventLog, GameSession};

#[derive(Parser)]
#[command(name = "autobattle")]
#[command(about = "Run an AI vs AI match and print the result")]
struct Cli {
    /// Level TOML file (default: built-in open office)
    #[arg(short, long)]
    level: Option<PathBuf>,

    /// Directory holding abilities.toml and units.toml (default: built-in tables)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Game config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed; player B uses seed + 1
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = Difficulty::Normal)]
    difficulty_a: Difficulty,

    #[arg(long, default_value_t = Difficulty::Normal)]
    difficulty_b: Difficulty,

    /// Stop after this many turns without a winner
    #[arg(long, default_value_t = 200)]
    max_turns: u32,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print every game event as a JSON line
    #[arg(long)]
    events: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    level: String,
    seed: u64,
    winner: Option<String>,
    turns: u32,
    units_left: [usize; 2],
    cubicles: [u32; 2],
    budgets: [u32; 2],
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_session(cli: &Cli) -> Result<(GameSession, String)> {
    let config = match &cli.config {
        Some(path) => parse_config(&read(path)?)?,
        None => GameConfig::default(),
    };
    let level = match &cli.level {
        Some(path) => parse_level(&read(path)?)?,
        None => builtin_level()?,
    };
    let catalog = match &cli.data_dir {
        Some(dir) => Catalog::from_toml(
            &read(&dir.join("abilities.toml"))?,
            &read(&dir.join("units.toml"))?,
        )?,
        None => Catalog::builtin()?,
    };
    let name = level.name.clone();
    Ok((GameSession::new(level, catalog, config), name))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let (mut session, level_name) = load_session(&cli)?;
    let log = EventLog::new();
    session.add_observer(Box::new(log.clone()));

    let ai_config = session.config().ai.clone();
    let mut ai_a = AiController::new(cli.difficulty_a, ai_config.clone(), cli.seed);
    let mut ai_b = AiController::new(cli.difficulty_b, ai_config, cli.seed.wrapping_add(1));

    session.start_draft()?;
    let hired_a = ai_a.draft(&mut session, PLAYER_A_ID);
    let hired_b = ai_b.draft(&mut session, PLAYER_B_ID);
    if hired_a.is_empty() || hired_b.is_empty() {
        bail!("draft failed: budget or spawn points too small for any unit");
    }
    info!("drafted {} vs {} units", hired_a.len(), hired_b.len());
    session.start_battle()?;

    while session.phase() == Phase::Playing && session.turn_number() <= cli.max_turns {
        let summary = if session.current_player() == PLAYER_A_ID {
            ai_a.take_turn(&mut session)
        } else {
            ai_b.take_turn(&mut session)
        };
        info!(
            "turn {}: player {} took {} actions, {} passed",
            session.turn_number(),
            summary.player,
            summary.actions,
            summary.passed.len()
        );
        if !summary.ended_turn && session.phase() == Phase::Playing {
            bail!("player {} could not end the turn", summary.player);
        }
    }

    if cli.events {
        for event in log.events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    let per_player = |f: &dyn Fn(u32) -> u32| [f(PLAYER_A_ID), f(PLAYER_B_ID)];
    let report = MatchReport {
        level: level_name,
        seed: cli.seed,
        winner: session
            .winner()
            .and_then(|id| session.player(id))
            .map(|p| p.name.clone()),
        turns: session.turn_number(),
        units_left: [
            session.state().units_of(PLAYER_A_ID).count(),
            session.state().units_of(PLAYER_B_ID).count(),
        ],
        cubicles: per_player(&|id| session.state().owned_capturables(id)),
        budgets: per_player(&|id| session.player(id).map_or(0, |p| p.budget)),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.winner {
            Some(name) => println!("{name} wins on turn {}", report.turns),
            None => println!("no winner after {} turns", report.turns),
        }
        println!(
            "units left: {} / {}, cubicles: {} / {}, budget: {} / {}",
            report.units_left[0],
            report.units_left[1],
            report.cubicles[0],
            report.cubicles[1],
            report.budgets[0],
            report.budgets[1]
        );
    }
    Ok(())
}
