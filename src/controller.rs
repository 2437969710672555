//! Aiming decisions for the tank whose turn it is, from keyboard input or a bot.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::f64::consts::FRAC_PI_2;

use crate::config::{
    ANGLE_COARSE_STEP_DEG, ANGLE_FINE_STEP_DEG, BOT_FALLBACK_SPEED, BOT_THINK_DELAY, EPSILON, FRAME_RATE,
    SHOOT_MAX_SPEED, SPEED_COARSE_STEP, SPEED_FINE_STEP,
};
use crate::debug_bot;
use crate::tank::Tank;
use crate::terrain::Terrain;
use crate::types::{Caliber, Point};
use crate::utils;

/// One poll of the keyboard. `fire` and `acknowledge` are edges (fresh presses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub angle_up: bool,
    pub angle_down: bool,
    pub speed_up: bool,
    pub speed_down: bool,
    pub coarse: bool,
    pub fire: bool,
    pub acknowledge: bool,
    pub select: Option<Caliber>,
    pub exit: bool,
    pub restart: bool,
}

impl InputState {
    /// The same poll with the one-shot presses cleared.
    pub fn without_edges(self) -> Self {
        InputState {
            fire: false,
            acknowledge: false,
            select: None,
            restart: false,
            ..self
        }
    }

    /// Folds a newer poll into this one: held keys follow `newer`, one-shot
    /// presses stay set until a step consumes them.
    pub fn latch(self, newer: InputState) -> Self {
        InputState {
            fire: self.fire || newer.fire,
            acknowledge: self.acknowledge || newer.acknowledge,
            select: newer.select.or(self.select),
            exit: self.exit || newer.exit,
            restart: self.restart || newer.restart,
            ..newer
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimCommand {
    pub angle: f64,
    pub velocity: f64,
    pub caliber: Caliber,
}

impl AimCommand {
    pub fn from_tank(tank: &Tank) -> Self {
        AimCommand {
            angle: tank.aim_angle,
            velocity: tank.aim_velocity,
            caliber: tank.caliber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AimDecision {
    /// Keep aiming next tick with these settings.
    Hold(AimCommand),
    Fire(AimCommand),
}

/// Read-only view of the battlefield handed to controllers.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    pub tanks: &'a [Tank],
    pub terrain: &'a Terrain,
    pub gravity: f64,
    pub wind: f64,
}

pub trait Controller {
    fn decide_aim(&mut self, tank: &Tank, world: &WorldView, input: &InputState, dt: f64) -> AimDecision;

    fn is_bot(&self) -> bool;

    /// Called once when this controller's tank starts a turn.
    fn begin_turn(&mut self) {}
}

#[derive(Debug, Default)]
pub struct HumanController;

impl HumanController {
    pub fn new() -> Self {
        HumanController
    }
}

impl Controller for HumanController {
    fn decide_aim(&mut self, tank: &Tank, _world: &WorldView, input: &InputState, dt: f64) -> AimDecision {
        // Steps are defined per nominal frame
        let frames = dt * FRAME_RATE as f64;
        let (angle_step, speed_step) = if input.coarse {
            (ANGLE_COARSE_STEP_DEG, SPEED_COARSE_STEP)
        } else {
            (ANGLE_FINE_STEP_DEG, SPEED_FINE_STEP)
        };

        let mut command = AimCommand::from_tank(tank);
        if input.angle_down {
            command.angle += angle_step.to_radians() * frames;
        }
        if input.angle_up {
            command.angle -= angle_step.to_radians() * frames;
        }
        if input.speed_up {
            command.velocity += speed_step * frames;
        }
        if input.speed_down {
            command.velocity -= speed_step * frames;
        }
        command.angle = utils::normalize_angle(command.angle);
        command.velocity = utils::finite_clamp(command.velocity, 1.0, SHOOT_MAX_SPEED, tank.aim_velocity);
        if let Some(caliber) = input.select {
            command.caliber = caliber;
        }

        if input.fire {
            AimDecision::Fire(command)
        } else {
            AimDecision::Hold(command)
        }
    }

    fn is_bot(&self) -> bool {
        false
    }
}

/// Approximate firing solution toward `to`. The speed formula treats the shot
/// as if launch and landing heights matched, so it is only a rough guess.
pub fn solve_heuristic(from: Point, to: Point, gravity: f64) -> (f64, f64) {
    let dx = to.x - from.x;
    // Positive dy means the target is higher on screen
    let dy = from.y - to.y;
    let distance = dx.hypot(dy);

    let angle = if distance < EPSILON { FRAC_PI_2 } else { dy.atan2(dx).abs() };

    let speed = if dy.abs() < EPSILON {
        BOT_FALLBACK_SPEED
    } else {
        distance * gravity / (2.0 * dy.abs())
    };

    (angle, utils::finite_clamp(speed, 1.0, SHOOT_MAX_SPEED, BOT_FALLBACK_SPEED))
}

/// Prefers 60mm, moving up to larger calibers as smaller ones run out.
pub fn choose_caliber(tank: &Tank) -> Caliber {
    let mut choice = tank.caliber;
    if !tank.has_ammo_for(Caliber::Mm60) {
        choice = Caliber::Mm80;
    }
    if !tank.has_ammo_for(Caliber::Mm80) {
        choice = Caliber::Mm105;
    }
    if !tank.has_ammo_for(Caliber::Mm105) {
        if tank.has_ammo_for(Caliber::Mm80) {
            choice = Caliber::Mm80;
        }
        if tank.has_ammo_for(Caliber::Mm60) {
            choice = Caliber::Mm60;
        }
    }
    if tank.has_ammo_for(choice) {
        return choice;
    }
    Caliber::ALL
        .into_iter()
        .find(|c| tank.has_ammo_for(*c))
        .unwrap_or(choice)
}

pub struct BotController {
    rng: StdRng,
    think_timer: f64,
    target: Option<usize>,
}

impl BotController {
    pub fn with_seed(seed: u64) -> Self {
        BotController {
            rng: StdRng::seed_from_u64(seed),
            think_timer: 0.0,
            target: None,
        }
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    fn pick_target(&mut self, tank: &Tank, world: &WorldView) -> Option<usize> {
        let candidates: Vec<usize> = world
            .tanks
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != tank.id && t.is_alive())
            .map(|(i, _)| i)
            .collect();
        candidates.choose(&mut self.rng).copied()
    }
}

impl Controller for BotController {
    fn decide_aim(&mut self, tank: &Tank, world: &WorldView, _input: &InputState, dt: f64) -> AimDecision {
        let still_valid = self
            .target
            .and_then(|i| world.tanks.get(i))
            .is_some_and(|t| t.is_alive());
        if !still_valid {
            self.target = self.pick_target(tank, world);
            if let Some(target) = self.target {
                debug_bot!(tank: tank.id, "Targeting Tank {}", target);
            }
        }

        let mut command = AimCommand::from_tank(tank);
        command.caliber = choose_caliber(tank);
        if let Some(target) = self.target.and_then(|i| world.tanks.get(i)) {
            let (angle, velocity) = solve_heuristic(tank.position, target.position, world.gravity);
            command.angle = angle;
            command.velocity = velocity;
        }

        self.think_timer += dt;
        if self.think_timer < BOT_THINK_DELAY {
            return AimDecision::Hold(command);
        }
        debug_bot!(
            tank: tank.id,
            "Firing {} at {:.1} deg, speed {:.1}",
            command.caliber,
            command.angle.to_degrees(),
            command.velocity
        );
        AimDecision::Fire(command)
    }

    fn is_bot(&self) -> bool {
        true
    }

    fn begin_turn(&mut self) {
        self.think_timer = 0.0;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ammunition, Rgb};
    use assert_approx_eq::assert_approx_eq;

    fn tank_at(id: usize, x: f64, y: f64) -> Tank {
        Tank::new(id, id, Rgb::new(0, 0, 0), Point::new(x, y), Ammunition::starting())
    }

    fn world<'a>(tanks: &'a [Tank], terrain: &'a Terrain) -> WorldView<'a> {
        WorldView {
            tanks,
            terrain,
            gravity: 9.8,
            wind: 0.0,
        }
    }

    #[test]
    fn test_human_fine_and_coarse_steps() {
        let terrain = Terrain::from_heights(vec![100.0; 100], 480, 1, 4);
        let tanks = vec![tank_at(0, 10.0, 365.0)];
        let mut human = HumanController::new();
        let dt = 1.0 / FRAME_RATE as f64;

        let input = InputState { speed_up: true, ..Default::default() };
        let AimDecision::Hold(cmd) = human.decide_aim(&tanks[0], &world(&tanks, &terrain), &input, dt) else {
            panic!("no fire requested");
        };
        assert_approx_eq!(cmd.velocity, tanks[0].aim_velocity + SPEED_FINE_STEP);

        let input = InputState { angle_down: true, coarse: true, ..Default::default() };
        let AimDecision::Hold(cmd) = human.decide_aim(&tanks[0], &world(&tanks, &terrain), &input, dt) else {
            panic!("no fire requested");
        };
        assert_approx_eq!(cmd.angle, tanks[0].aim_angle + 1f64.to_radians());
    }

    #[test]
    fn test_human_fire_and_caliber_select() {
        let terrain = Terrain::from_heights(vec![100.0; 100], 480, 1, 4);
        let tanks = vec![tank_at(0, 10.0, 365.0)];
        let mut human = HumanController::new();
        let input = InputState {
            fire: true,
            select: Some(Caliber::Mm105),
            speed_down: true,
            coarse: true,
            ..Default::default()
        };
        let decision = human.decide_aim(&tanks[0], &world(&tanks, &terrain), &input, 1000.0);
        match decision {
            AimDecision::Fire(cmd) => {
                assert_eq!(cmd.caliber, Caliber::Mm105);
                assert_approx_eq!(cmd.velocity, 1.0);
            }
            other => panic!("expected fire, got {:?}", other),
        }
        assert!(!human.is_bot());
        assert!(!input.without_edges().fire);
    }

    #[test]
    fn test_latched_presses_survive_later_polls() {
        let pressed = InputState {
            fire: true,
            select: Some(Caliber::Mm80),
            angle_up: true,
            ..Default::default()
        };
        let later = InputState {
            speed_up: true,
            ..Default::default()
        };
        let latched = pressed.latch(later);
        assert!(latched.fire);
        assert_eq!(latched.select, Some(Caliber::Mm80));
        // Held keys only reflect the newest poll
        assert!(!latched.angle_up);
        assert!(latched.speed_up);

        let consumed = latched.without_edges();
        assert_eq!(consumed.select, None);
        assert!(!consumed.fire && !consumed.restart);
    }

    #[test]
    fn test_heuristic_handles_degenerate_geometry() {
        let (angle, speed) = solve_heuristic(Point::new(0.0, 0.0), Point::new(0.0, 0.0), 9.8);
        assert_approx_eq!(angle, FRAC_PI_2);
        assert_approx_eq!(speed, BOT_FALLBACK_SPEED);

        let (angle, speed) = solve_heuristic(Point::new(0.0, 100.0), Point::new(300.0, 100.0), 9.8);
        assert_approx_eq!(angle, 0.0);
        assert_approx_eq!(speed, BOT_FALLBACK_SPEED);

        let (angle, speed) = solve_heuristic(Point::new(0.0, 100.0), Point::new(-300.0, 100.0), 9.8);
        assert!(angle.is_finite() && speed.is_finite());
    }

    #[test]
    fn test_heuristic_formula() {
        // Target 300 right and 100 up: d = sqrt(100000)
        let (angle, speed) = solve_heuristic(Point::new(0.0, 200.0), Point::new(300.0, 100.0), 10.0);
        let d = 100_000f64.sqrt();
        assert_approx_eq!(angle, (100f64).atan2(300.0));
        assert_approx_eq!(speed, d * 10.0 / 200.0);

        // Tiny height difference blows up the formula; it is clamped
        let (_, speed) = solve_heuristic(Point::new(0.0, 200.0), Point::new(1000.0, 199.9), 9.8);
        assert_approx_eq!(speed, SHOOT_MAX_SPEED);
    }

    #[test]
    fn test_bot_caliber_choice_follows_stock() {
        let mut tank = tank_at(0, 0.0, 0.0);
        assert_eq!(choose_caliber(&tank), Caliber::Mm60);

        tank.ammunition.set(Caliber::Mm60, 0);
        assert_eq!(choose_caliber(&tank), Caliber::Mm80);

        tank.ammunition.set(Caliber::Mm80, 0);
        assert_eq!(choose_caliber(&tank), Caliber::Mm105);

        tank.ammunition = Ammunition::empty();
        tank.ammunition.set(Caliber::Mm80, 1);
        assert_eq!(choose_caliber(&tank), Caliber::Mm80);
    }

    #[test]
    fn test_bot_thinks_then_fires_at_living_opponent() {
        let terrain = Terrain::from_heights(vec![100.0; 600], 480, 1, 4);
        let mut tanks = vec![tank_at(0, 50.0, 365.0), tank_at(1, 300.0, 365.0), tank_at(2, 500.0, 300.0)];
        tanks[1].apply_damage(200.0);

        let mut bot = BotController::with_seed(11);
        bot.begin_turn();
        let dt = 0.1;
        let mut fired = None;
        for _ in 0..100 {
            match bot.decide_aim(&tanks[0], &world(&tanks, &terrain), &InputState::default(), dt) {
                AimDecision::Hold(_) => continue,
                AimDecision::Fire(cmd) => {
                    fired = Some(cmd);
                    break;
                }
            }
        }
        let cmd = fired.expect("bot should fire eventually");
        assert_eq!(bot.target(), Some(2));
        assert!(cmd.velocity >= 1.0 && cmd.velocity <= SHOOT_MAX_SPEED);
        assert!(bot.is_bot());
    }
}
