// Error types: match configuration errors, shop errors

use thiserror::Error;

use crate::types::Caliber;

/// Configuration Errors
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("At least one player is required")]
    NoPlayers,
    #[error("{0} players requested, maximum is {1}")]
    TooManyPlayers(u32, u32),
    #[error("{0} bots requested but only {1} players")]
    TooManyBots(u32, u32),
    #[error("At least one round is required")]
    NoRounds,
    #[error("Terrain line width must be positive")]
    ZeroLineWidth,
    #[error("Map {0}x{1} is too small")]
    MapTooSmall(u32, u32),
    #[error("Terrain needs at least one layer")]
    NoLayers,
}

/// Shop Errors
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ShopError {
    #[error("Not enough money for {caliber}: need {price}, have {money}")]
    InsufficientFunds {
        caliber: Caliber,
        price: i64,
        money: i64,
    },
}

/// Game Errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
