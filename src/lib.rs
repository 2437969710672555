pub mod ballistics;
pub mod config;
pub mod controller;
pub mod environment;
pub mod error;
pub mod game;
pub mod input;
pub mod logging;
pub mod player;
pub mod render;
pub mod round;
pub mod tank;
pub mod terrain;
pub mod types;
pub mod utils;
