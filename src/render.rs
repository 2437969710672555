use crate::config::{BORDER_PADDING, HUD_HEIGHT, MAX_LIFE, TANK_RADIUS, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::player::Player;
use crate::round::{ExplosionView, FrameSnapshot, RoundEnd, TurnPhase};
use crate::tank::Tank;
use crate::terrain::Terrain;
use crate::types::{Caliber, Point, Rgb};
use crate::utils;
use macroquad::prelude::*;

// Deepest band first
const LAYER_BOTTOM: Color = Color::new(0.24, 0.16, 0.10, 1.0);
const LAYER_TOP: Color = Color::new(0.36, 0.55, 0.22, 1.0);
const SKY_COLOR: Color = Color::new(0.09, 0.07, 0.20, 1.0);
const HUD_BACKGROUND: Color = Color::new(0.08, 0.08, 0.20, 1.0);

// Conversion helpers
fn point_to_vec2(p: Point) -> Vec2 {
    Vec2::new(p.x as f32 + BORDER_PADDING as f32, p.y as f32 + BORDER_PADDING as f32)
}

fn rgb_to_color(rgb: Rgb) -> Color {
    Color::from_rgba(rgb.r, rgb.g, rgb.b, 255)
}

fn faded_color(mut color: Color, alpha: f32) -> Color {
    color.a *= alpha;
    color
}

fn brighten_color(color: Color, amount: f32) -> Color {
    Color::new(
        (color.r + amount).min(1.0),
        (color.g + amount).min(1.0),
        (color.b + amount).min(1.0),
        color.a,
    )
}

fn mix_color(a: Color, b: Color, t: f32) -> Color {
    Color::new(
        utils::lerp(a.r, b.r, t),
        utils::lerp(a.g, b.g, t),
        utils::lerp(a.b, b.b, t),
        utils::lerp(a.a, b.a, t),
    )
}

fn layer_color(index: usize, count: usize) -> Color {
    let t = if count > 1 { index as f32 / (count - 1) as f32 } else { 1.0 };
    mix_color(LAYER_BOTTOM, LAYER_TOP, t)
}

// Health bar gradient: green at full life, yellow at half, red when empty
fn get_health_gradient_color(ratio: f32) -> Color {
    if ratio > 0.5 {
        let t = (ratio - 0.5) * 2.0;
        Color::new(1.0 - t, 1.0, 0.0, 1.0)
    } else {
        let t = ratio * 2.0;
        Color::new(1.0, t, 0.0, 1.0)
    }
}

// Draws a FrameSnapshot with macroquad
pub struct Renderer {
    show_fps: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer { show_fps: false }
    }

    pub fn with_fps(mut self, show_fps: bool) -> Self {
        self.show_fps = show_fps;
        self
    }

    pub fn draw_frame(&mut self, frame: &FrameSnapshot, players: &[Player], announcement: Option<&str>) {
        clear_background(SKY_COLOR);

        Self::draw_terrain(frame.terrain);
        for (index, tank) in frame.tanks.iter().enumerate() {
            Self::draw_tank(tank, frame.current_tank == Some(index));
        }
        if let Some(projectile) = frame.projectile {
            Self::draw_trail(&projectile.trail, projectile.position);
        }
        if let Some(explosion) = frame.explosion {
            Self::draw_explosion(&explosion);
        }
        Self::draw_map_border(frame.terrain);
        self.draw_hud(frame, players);

        if self.show_fps {
            draw_text(&format!("FPS: {}", get_fps()), 10.0, 14.0, 18.0, WHITE);
        }

        if let Some(msg) = announcement {
            self.draw_announcement(msg, "Press ESC to exit");
        } else if frame.phase == TurnPhase::RoundOver {
            let msg = match frame.outcome {
                Some(outcome) => match (outcome.reason, outcome.winner_player.and_then(|p| players.get(p))) {
                    (RoundEnd::LastTankStanding, Some(player)) => format!("{} wins round {}", player.name, frame.round),
                    (RoundEnd::NoOneCanAct, _) => format!("Round {}: out of ammunition", frame.round),
                    _ => format!("Round {} is a draw", frame.round),
                },
                None => format!("Round {} over", frame.round),
            };
            let hint = if players.iter().any(|p| !p.is_bot()) {
                "Press SPACE to continue"
            } else {
                ""
            };
            self.draw_announcement(&msg, hint);
        }
    }

    fn draw_map_border(terrain: &Terrain) {
        draw_rectangle_lines(
            BORDER_PADDING as f32 - 1.0,
            BORDER_PADDING as f32 - 1.0,
            terrain.map_width() as f32 + 2.0,
            terrain.map_height() as f32 + 2.0,
            2.0,
            GRAY,
        );
    }

    fn draw_terrain(terrain: &Terrain) {
        let floor = BORDER_PADDING as f32 + terrain.map_height() as f32;
        let width = terrain.line_width() as f32;
        let count = terrain.layer_count();

        for column in 0..terrain.columns() {
            let x = BORDER_PADDING as f32 + terrain.column_x(column) as f32;

            // Bands stacked from the floor upward
            let mut base = 0.0;
            for (j, thickness) in terrain.layers(column).iter().enumerate() {
                let top = base + *thickness as f32;
                if *thickness > 0.0 {
                    draw_rectangle(x, floor - top, width, *thickness as f32, layer_color(j, count));
                }
                base = top;
            }

            if let Some(chunk) = terrain.falling_chunk(column) {
                let mut base = chunk.bottom as f32;
                for (j, thickness) in chunk.layers.iter().enumerate() {
                    let top = base + *thickness as f32;
                    if *thickness > 0.0 {
                        draw_rectangle(x, floor - top, width, *thickness as f32, faded_color(layer_color(j, count), 0.9));
                    }
                    base = top;
                }
            }
        }
    }

    fn draw_tank(tank: &Tank, active: bool) {
        let center = point_to_vec2(tank.position);
        let radius = TANK_RADIUS as f32;
        let body_color = rgb_to_color(tank.color);

        if !tank.is_alive() {
            draw_circle(center.x, center.y, radius * 0.6, faded_color(DARKGRAY, 0.7));
            return;
        }

        // Turret, upward angles point toward negative screen y
        let (sin, cos) = (tank.aim_angle as f32).sin_cos();
        let muzzle = radius + tank.caliber.profile().muzzle_length as f32;
        let turret_end = center + Vec2::new(cos, -sin) * muzzle;
        draw_line(center.x, center.y, turret_end.x, turret_end.y, 4.0, LIGHTGRAY);

        draw_circle(center.x, center.y, radius * 0.75, body_color);
        draw_circle_lines(center.x, center.y, radius * 0.75, 2.0, brighten_color(body_color, 0.4));
        if active {
            draw_circle_lines(center.x, center.y, radius + 4.0, 1.0, faded_color(WHITE, 0.6));
        }

        // Health bar above the tank
        let ratio = (tank.life() / MAX_LIFE).clamp(0.0, 1.0) as f32;
        let bar_width = radius * 2.0;
        let bar_x = center.x - radius;
        let bar_y = center.y - radius - 10.0;
        draw_rectangle(bar_x, bar_y, bar_width, 4.0, Color::from_rgba(54, 58, 70, 255));
        draw_rectangle(bar_x, bar_y, bar_width * ratio, 4.0, get_health_gradient_color(ratio));
    }

    fn draw_trail(trail: &[Point], position: Point) {
        let count = trail.len().max(1);
        for (i, pair) in trail.windows(2).enumerate() {
            let a = point_to_vec2(pair[0]);
            let b = point_to_vec2(pair[1]);
            let alpha = (i + 1) as f32 / count as f32;
            draw_line(a.x, a.y, b.x, b.y, 1.5, faded_color(ORANGE, alpha));
        }
        let head = point_to_vec2(position);
        draw_circle(head.x, head.y, 3.0, WHITE);
    }

    fn draw_explosion(explosion: &ExplosionView) {
        let center = point_to_vec2(explosion.position);
        let radius = utils::lerp_f64(explosion.radius * 0.3, explosion.radius * 1.2, explosion.progress) as f32;
        let alpha = 1.0 - explosion.progress as f32;
        draw_circle(center.x, center.y, radius, faded_color(ORANGE, alpha * 0.6));
        draw_circle_lines(center.x, center.y, radius, 2.0, faded_color(YELLOW, alpha));
    }

    fn draw_hud(&self, frame: &FrameSnapshot, players: &[Player]) {
        let panel_y = (WINDOW_HEIGHT - HUD_HEIGHT) as f32;
        let padding = 10.0;
        draw_rectangle(0.0, panel_y, WINDOW_WIDTH as f32, HUD_HEIGHT as f32, HUD_BACKGROUND);

        let mut y = panel_y + padding + 16.0;
        let header = format!(
            "ROUND {}   WIND {:+.1}   GRAVITY {:.2}",
            frame.round, frame.wind, frame.gravity
        );
        draw_text(&header, padding, y, 22.0, GOLD);

        // Aim readout for the tank whose turn it is
        if let Some(tank) = frame.current_tank.and_then(|i| frame.tanks.get(i)) {
            y += 24.0;
            let name = players.get(tank.player).map(|p| p.name.as_str()).unwrap_or("?");
            let aim = format!(
                "{}  angle {:.1}  speed {:.1}  shell {}",
                name,
                tank.aim_angle.to_degrees(),
                tank.aim_velocity,
                tank.caliber
            );
            draw_text(&aim, padding, y, 18.0, WHITE);

            y += 20.0;
            let stock: Vec<String> = Caliber::ALL
                .iter()
                .enumerate()
                .map(|(i, c)| format!("[{}] {} x{}", i + 1, c, tank.ammunition.count(*c)))
                .collect();
            draw_text(&stock.join("   "), padding, y, 16.0, LIGHTGRAY);
        }
        if let Some(projectile) = frame.projectile {
            y += 20.0;
            let distance = frame
                .tanks
                .get(projectile.shooter)
                .map_or(0.0, |shooter| projectile.distance_from(shooter.position));
            let flight = format!(
                "peak {:.1}  speed {:.1}  distance {:.1}",
                projectile.peak_altitude(frame.terrain.map_height()),
                projectile.speed(),
                distance
            );
            draw_text(&flight, padding, y, 16.0, SKYBLUE);
        }

        // Player cards
        let card_width = 180.0;
        let card_height = 78.0;
        let cards_y = panel_y + HUD_HEIGHT as f32 - card_height - padding;
        for (i, player) in players.iter().enumerate() {
            let card_x = padding + i as f32 * (card_width + padding);
            let color = rgb_to_color(player.color);
            let dark = Color::new(color.r * 0.3, color.g * 0.3, color.b * 0.3, 0.35);
            draw_rectangle(card_x, cards_y, card_width, card_height, dark);
            draw_rectangle_lines(card_x, cards_y, card_width, card_height, 2.0, color);

            draw_text(&player.name, card_x + padding, cards_y + 20.0, 18.0, WHITE);
            let stats = format!("pts {}  ${}", player.points, player.money);
            draw_text(&stats, card_x + padding, cards_y + 40.0, 15.0, LIGHTGRAY);
            let record = format!("kills {}  deaths {}", player.murders, player.deaths);
            draw_text(&record, card_x + padding, cards_y + 56.0, 15.0, LIGHTGRAY);

            if let Some(tank) = frame.tanks.iter().find(|t| t.player == i) {
                let ratio = (tank.life() / MAX_LIFE).clamp(0.0, 1.0) as f32;
                let bar_width = card_width - 2.0 * padding;
                draw_rectangle(card_x + padding, cards_y + 64.0, bar_width, 6.0, Color::from_rgba(54, 58, 70, 255));
                draw_rectangle(
                    card_x + padding,
                    cards_y + 64.0,
                    bar_width * ratio,
                    6.0,
                    get_health_gradient_color(ratio),
                );
            }
        }
    }

    fn draw_announcement(&self, msg: &str, hint: &str) {
        let rect_width = 500.0;
        let rect_height = 120.0;
        let x = (WINDOW_WIDTH as f32 / 2.0) - (rect_width / 2.0);
        let y = ((WINDOW_HEIGHT - HUD_HEIGHT) as f32 / 2.0) - (rect_height / 2.0);
        draw_rectangle(x, y, rect_width, rect_height, Color::from_rgba(0, 0, 0, 180));

        let font_size = 32.0;
        let dims = measure_text(msg, None, font_size as u16, 1.0);
        let text_x = x + (rect_width - dims.width) / 2.0;
        let text_y = y + (rect_height - font_size) / 2.0 + font_size * 0.7;
        draw_text(msg, text_x, text_y, font_size, WHITE);

        if !hint.is_empty() {
            let hint_size = 18.0;
            let hint_dims = measure_text(hint, None, hint_size as u16, 1.0);
            let hint_x = x + (rect_width - hint_dims.width) / 2.0;
            draw_text(hint, hint_x, y + rect_height - hint_size - 10.0, hint_size, LIGHTGRAY);
        }
    }
}
