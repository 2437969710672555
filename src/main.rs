use clap::Parser;
use log::{error, info};
use macroquad::prelude::*;

use shellfire::config::{self, MatchConfig, WINDOW_HEIGHT, WINDOW_WIDTH};
use shellfire::environment::AmbientEffect;
use shellfire::game::Game;
use shellfire::logging;
use shellfire::render::Renderer;

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of tanks in the match (humans plus bots).
    #[arg(long, default_value_t = config::DEFAULT_PLAYERS)]
    players: u32,

    /// How many of the players are bots.
    #[arg(long, default_value_t = config::DEFAULT_BOTS)]
    bots: u32,

    #[arg(long, default_value_t = config::DEFAULT_ROUNDS)]
    rounds: u32,

    #[arg(long, default_value_t = config::MOUNTAINS)]
    mountains: u32,

    #[arg(long, default_value_t = config::VALLEYS)]
    valleys: u32,

    /// Ambient forces that vary during play.
    #[arg(long, value_enum, default_value_t = AmbientEffect::None)]
    effect: AmbientEffect,

    /// Terrain seed; -1 picks a random map.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    seed: i64,

    /// Show the frame rate in the corner.
    #[arg(long)]
    fps: bool,

    /// Debug filter to specify log topics (e.g., "terrain,round")
    /// Available topics: terrain, ballistics, round, bot, env
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Shellfire".to_owned(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init_logger(logging::parse_level(&args.log_level), args.debug_filter) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    info!("Initializing Shellfire...");

    let match_config = MatchConfig {
        players: args.players,
        bots: args.bots,
        rounds: args.rounds,
        mountains: args.mountains,
        valleys: args.valleys,
        effect: args.effect,
        seed: args.seed,
        ..Default::default()
    };

    let mut game = match Game::new(match_config) {
        Ok(game) => game,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Escape is handled by the game loop
    prevent_quit();

    let mut renderer = Renderer::new().with_fps(args.fps);
    info!("Renderer initialized.");

    game.run(&mut renderer).await;
}
