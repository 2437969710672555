use macroquad::prelude::{KeyCode, is_key_down, is_key_pressed, is_quit_requested};

use crate::controller::InputState;
use crate::types::Caliber;

/// Polls the keyboard once. Down raises the barrel angle and up lowers it;
/// left/right change the muzzle speed; shift makes both coarse.
pub fn poll_input() -> InputState {
    let select = if is_key_pressed(KeyCode::Key1) {
        Some(Caliber::Mm60)
    } else if is_key_pressed(KeyCode::Key2) {
        Some(Caliber::Mm80)
    } else if is_key_pressed(KeyCode::Key3) {
        Some(Caliber::Mm105)
    } else {
        None
    };

    InputState {
        angle_up: is_key_down(KeyCode::Up),
        angle_down: is_key_down(KeyCode::Down),
        speed_up: is_key_down(KeyCode::Right),
        speed_down: is_key_down(KeyCode::Left),
        coarse: is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift),
        fire: is_key_pressed(KeyCode::Space),
        acknowledge: is_key_pressed(KeyCode::Enter),
        select,
        exit: is_key_pressed(KeyCode::Escape) || is_quit_requested(),
        restart: is_key_pressed(KeyCode::R),
    }
}
