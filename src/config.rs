//! Configuration constants and the runtime match configuration.

use crate::environment::AmbientEffect;
use crate::error::ConfigError;

// Map and terrain
pub const MAP_WIDTH: u32 = 1240; // Playfield width in pixels
pub const MAP_HEIGHT: u32 = 480; // Playfield height in pixels
pub const TERRAIN_LINE_WIDTH: u32 = 1; // Pixels per terrain column
pub const SEA_LEVEL: f64 = 200.0; // Baseline column height
pub const MOUNTAINS: u32 = 3;
pub const VALLEYS: u32 = 2;
pub const TERRAIN_LAYERS: usize = 4; // Number of colour bands per column

// Physics
pub const GRAVITY: f64 = 9.8; // Default gravity (units/s^2)
pub const GRAVITY_MIN: f64 = 4.0; // Lower bound when gravity drifts
pub const GRAVITY_MAX: f64 = 16.0; // Upper bound when gravity drifts
pub const TIME_SCALE: f64 = 4.0; // Simulated seconds per wall-clock second
pub const WIND_MIN: f64 = 1.0;
pub const WIND_MAX: f64 = 10.0;
pub const WIND_DRIFT_SCALE: f64 = 2.0; // Horizontal drift per unit of wind velocity
pub const EPSILON: f64 = 1e-2;

// Projectiles
pub const SHOOT_MAX_SPEED: f64 = 400.0;
pub const DEFAULT_SHOOT_SPEED: f64 = 145.0;
pub const DEFAULT_SHOOT_ANGLE: f64 = 3.0 * std::f64::consts::FRAC_PI_4;
pub const TRAIL_SAMPLE_DIST_SQ: f64 = 50.0; // Squared distance between trail samples
pub const MAX_FLIGHT_STEPS: u32 = 100_000; // Safety cap for headless flight simulation
pub const PROJECTILE_MAX_STEP: f64 = 4.0; // Longest distance covered by one collision sub-step

// Tanks
pub const TANK_RADIUS: f64 = 18.0;
pub const TANK_GROUND_OFFSET: f64 = 15.0; // Tank centre sits this far above the surface
pub const MAX_LIFE: f64 = 100.0;
pub const FALL_DAMAGE_FACTOR: f64 = 0.5; // Life lost per unit of landing speed
pub const FALL_SPEED_THRESHOLD: f64 = 2.0; // Landings slower than this are free

// Aiming
pub const ANGLE_FINE_STEP_DEG: f64 = 0.1; // Per nominal frame
pub const ANGLE_COARSE_STEP_DEG: f64 = 1.0;
pub const SPEED_FINE_STEP: f64 = 0.1;
pub const SPEED_COARSE_STEP: f64 = 1.0;
pub const BOT_THINK_DELAY: f64 = 0.8; // Seconds a bot "thinks" before firing
pub const BOT_FALLBACK_SPEED: f64 = 120.0; // Used when the heuristic solver degenerates
pub const BOT_END_TURN_DELAY: f64 = 1.0;

// Effects
pub const EXPLOSION_DURATION: f64 = 0.6; // Seconds

// Economy and scoring
pub const STARTING_MONEY: i64 = 10_000;
pub const ROUND_ALLOWANCE: i64 = 10_000;
pub const KILL_REWARD: i64 = 5_000;
pub const SUICIDE_PENALTY: i64 = 5_000;
pub const SCORE_TANK_HIT: i64 = 10_000;
pub const SCORE_SUICIDE: i64 = 5_000;
pub const SCORE_CLOSE: i64 = 100;
pub const SCORE_NEAR: i64 = 50;
pub const SCORE_NEAR_MARGIN: f64 = 200.0;
pub const MAX_BOT_PURCHASES: u32 = 64; // Per shopping trip

// Rendering
pub const BORDER_PADDING: i32 = 20;
pub const HUD_HEIGHT: i32 = 200;
pub const WINDOW_WIDTH: i32 = MAP_WIDTH as i32 + 2 * BORDER_PADDING;
pub const WINDOW_HEIGHT: i32 = MAP_HEIGHT as i32 + 2 * BORDER_PADDING + HUD_HEIGHT;
pub const FRAME_RATE: u32 = 60; // Target frame rate
pub const SIMULATION_DT: f64 = 1.0 / FRAME_RATE as f64; // Fixed simulation step

// Match defaults
pub const DEFAULT_PLAYERS: u32 = 2;
pub const DEFAULT_BOTS: u32 = 1;
pub const DEFAULT_ROUNDS: u32 = 3;
pub const MAX_PLAYERS: u32 = 6;

/// Everything read at match setup. Immutable for the duration of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub map_width: u32,
    pub map_height: u32,
    pub line_width: u32,
    pub mountains: u32,
    pub valleys: u32,
    pub layers: usize,
    pub players: u32,
    pub bots: u32,
    pub rounds: u32,
    pub effect: AmbientEffect,
    /// -1 means non-deterministic terrain.
    pub seed: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            map_width: MAP_WIDTH,
            map_height: MAP_HEIGHT,
            line_width: TERRAIN_LINE_WIDTH,
            mountains: MOUNTAINS,
            valleys: VALLEYS,
            layers: TERRAIN_LAYERS,
            players: DEFAULT_PLAYERS,
            bots: DEFAULT_BOTS,
            rounds: DEFAULT_ROUNDS,
            effect: AmbientEffect::None,
            seed: -1,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if self.players > MAX_PLAYERS {
            return Err(ConfigError::TooManyPlayers(self.players, MAX_PLAYERS));
        }
        if self.bots > self.players {
            return Err(ConfigError::TooManyBots(self.bots, self.players));
        }
        if self.rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        if self.line_width == 0 {
            return Err(ConfigError::ZeroLineWidth);
        }
        let min_width = self.players * 4 * TANK_RADIUS as u32;
        if self.map_width < min_width || (self.map_height as f64) <= SEA_LEVEL {
            return Err(ConfigError::MapTooSmall(self.map_width, self.map_height));
        }
        if self.layers == 0 {
            return Err(ConfigError::NoLayers);
        }
        Ok(())
    }

    /// The terrain seed, or `None` for non-deterministic generation.
    pub fn terrain_seed(&self) -> Option<u64> {
        if self.seed < 0 { None } else { Some(self.seed as u64) }
    }

    pub fn humans(&self) -> u32 {
        self.players.saturating_sub(self.bots)
    }
}
