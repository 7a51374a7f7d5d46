//! # Dungeon Headless Driver
//!
//! Builds or loads a session, feeds it text commands from a script or stdin,
//! and prints the resulting events and map snapshots.

use clap::Parser;
use dungeon::{
    config, split_script, DungeonError, DungeonResult, GameSession, InputHandler, PlayerInput,
    SessionConfig, HELP_TEXT,
};
use log::{info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;

/// Command line arguments for the dungeon driver.
#[derive(Parser, Debug)]
#[command(name = "dungeon")]
#[command(about = "A deterministic turn-based dungeon crawler, played from the command line")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Session configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Level width in tiles
    #[arg(long)]
    width: Option<u32>,

    /// Level height in tiles
    #[arg(long)]
    height: Option<u32>,

    /// Resume a saved session instead of generating a new one
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the session here on exit
    #[arg(long)]
    save: Option<PathBuf>,

    /// Commands separated by `;` or newlines; stdin is read when absent
    #[arg(long)]
    script: Option<String>,

    /// Print events and snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Draw undiscovered tiles too
    #[arg(long)]
    reveal: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> DungeonResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level);
    info!("Starting dungeon v{}", dungeon::VERSION);

    let mut session = build_session(&args)?;
    let driver = Driver {
        handler: InputHandler::new(),
        json: args.json,
        reveal: args.reveal,
    };

    driver.show_map(&session)?;
    match &args.script {
        Some(script) => {
            for line in split_script(script) {
                if !driver.run_command(&mut session, line)? {
                    break;
                }
            }
        }
        None => {
            for line in io::stdin().lock().lines() {
                if !driver.run_command(&mut session, &line?)? {
                    break;
                }
            }
        }
    }
    driver.show_summary(&session)?;

    if let Some(path) = &args.save {
        session.save_to_file(path)?;
        info!("Saved session to {}", path.display());
    }
    Ok(())
}

/// Routes `log` records to stderr. `RUST_LOG` wins over `--log-level`.
fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

/// Loads a saved session or generates a new one from the arguments.
fn build_session(args: &Args) -> DungeonResult<GameSession> {
    if let Some(path) = &args.load {
        info!("Loading session from {}", path.display());
        return GameSession::load_from_file(path);
    }

    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::new(config::DEFAULT_SEED),
    };
    if let Some(seed) = args.seed {
        config.generation.seed = seed;
    }
    if let Some(width) = args.width {
        config.generation.width = width;
    }
    if let Some(height) = args.height {
        config.generation.height = height;
    }
    GameSession::new(config)
}

struct Driver {
    handler: InputHandler,
    json: bool,
    reveal: bool,
}

impl Driver {
    /// Runs one command line. Returns `false` once the session should stop.
    fn run_command(&self, session: &mut GameSession, line: &str) -> DungeonResult<bool> {
        let input = match self.handler.parse(line) {
            Ok(Some(input)) => input,
            Ok(None) => return Ok(true),
            Err(err) => {
                self.report_error(&err)?;
                return Ok(true);
            }
        };

        match input {
            PlayerInput::Quit => return Ok(false),
            PlayerInput::Help => println!("{}", HELP_TEXT),
            PlayerInput::ShowMap => self.show_map(session)?,
            PlayerInput::ShowInventory => self.show_inventory(session)?,
            _ => {}
        }
        if !input.takes_turn() {
            return Ok(true);
        }

        let action = match self.handler.input_to_action(input, session) {
            Ok(Some(action)) => action,
            Ok(None) => return Ok(true),
            Err(err) => {
                self.report_error(&err)?;
                return Ok(true);
            }
        };

        let events = session.submit_player_action(action);
        for event in &events {
            if self.json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                println!("{}", event);
            }
        }

        if session.state().is_terminal() {
            info!("Session ended: {}", session.state());
            self.show_map(session)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn report_error(&self, err: &DungeonError) -> DungeonResult<()> {
        warn!("Rejected command: {}", err);
        if self.json {
            println!("{}", serde_json::json!({ "error": err.to_string() }));
        } else {
            println!("error: {}", err);
        }
        Ok(())
    }

    fn show_map(&self, session: &GameSession) -> DungeonResult<()> {
        let view = session.current_view();
        if self.json {
            println!("{}", serde_json::to_string(&view)?);
            return Ok(());
        }

        for row in view.to_ascii_rows(self.reveal) {
            println!("{}", row.trim_end());
        }
        match view.player() {
            Some(player) => println!(
                "Turn {}  HP {}/{}  ATK {}  DEF {}  [{}]",
                view.turn, player.health, player.max_health, player.attack, player.defense, view.state
            ),
            None => println!("Turn {}  [{}]", view.turn, view.state),
        }
        Ok(())
    }

    fn show_inventory(&self, session: &GameSession) -> DungeonResult<()> {
        let view = session.current_view();
        let inventory = view
            .player()
            .map(|player| player.inventory.clone())
            .unwrap_or_default();

        if self.json {
            println!("{}", serde_json::to_string(&inventory)?);
        } else if inventory.is_empty() {
            println!("You carry nothing.");
        } else {
            for (slot, entry) in inventory.iter().enumerate() {
                println!("{}: {} ({})", slot + 1, entry.kind.name(), entry.id);
            }
        }
        Ok(())
    }

    fn show_summary(&self, session: &GameSession) -> DungeonResult<()> {
        let statistics = session.statistics();
        if self.json {
            println!(
                "{}",
                serde_json::json!({
                    "state": session.state(),
                    "turn": session.turn_number(),
                    "statistics": statistics,
                })
            );
            return Ok(());
        }

        println!(
            "{} after {} turns: {} steps, {} damage dealt, {} taken, {} kills, {} items used, {} treasures",
            session.state(),
            session.turn_number(),
            statistics.steps_taken,
            statistics.damage_dealt,
            statistics.damage_taken,
            statistics.enemies_defeated,
            statistics.items_used,
            statistics.treasures_found
        );
        if session.player().is_none() {
            info!("The player did not survive");
        }
        Ok(())
    }
}
