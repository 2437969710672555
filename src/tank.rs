use crate::ballistics::{self, Projectile};
use crate::config;
use crate::config::{MAX_LIFE, SHOOT_MAX_SPEED, TANK_GROUND_OFFSET, TANK_RADIUS};
use crate::terrain::Terrain;
use crate::types::{Ammunition, Caliber, Point, Rgb};
use crate::utils;

/// Result of one step of the falling integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallOutcome {
    Grounded,
    Falling,
    /// Touched down this step with the given vertical speed.
    Landed(f64),
}

// Represents one combatant on the map for the duration of a round
#[derive(Debug, Clone)]
pub struct Tank {
    pub id: usize,
    /// Index of the controlling player in the match context.
    pub player: usize,
    pub color: Rgb,
    pub position: Point,
    life: f64,
    alive: bool,
    pub aim_angle: f64,    // Radians, counter-clockwise from +x
    pub aim_velocity: f64, // Muzzle speed, within [1, SHOOT_MAX_SPEED]
    pub caliber: Caliber,
    pub ammunition: Ammunition,
    pub fall_speed: f64,
}

impl Tank {
    pub fn new(id: usize, player: usize, color: Rgb, position: Point, ammunition: Ammunition) -> Self {
        Tank {
            id,
            player,
            color,
            position,
            life: MAX_LIFE,
            alive: true,
            aim_angle: config::DEFAULT_SHOOT_ANGLE,
            aim_velocity: config::DEFAULT_SHOOT_SPEED,
            caliber: Caliber::Mm60,
            ammunition,
            fall_speed: 0.0,
        }
    }

    pub fn life(&self) -> f64 {
        self.life
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Subtracts life, clamped to [0, MAX_LIFE]. Returns true if this damage killed the tank.
    pub fn apply_damage(&mut self, amount: f64) -> bool {
        if !self.alive || !amount.is_finite() {
            return false;
        }
        self.life = (self.life - amount).clamp(0.0, MAX_LIFE);
        if self.life <= 0.0 {
            self.alive = false;
            log::info!("Tank {} destroyed", self.id);
            return true;
        }
        false
    }

    /// Hit test: inside the hull, or inside the caliber's snap-to-hit radius.
    pub fn collides_with(&self, point: Point, caliber: Caliber) -> bool {
        let distance = self.position.distance(&point);
        distance <= TANK_RADIUS || distance <= caliber.profile().inner_hit_radius
    }

    /// Alive and holding at least one round of any caliber.
    pub fn can_act(&self) -> bool {
        self.alive && !self.ammunition.is_empty()
    }

    pub fn has_ammo_for(&self, caliber: Caliber) -> bool {
        self.ammunition.count(caliber) > 0
    }

    /// Fires the selected caliber. Returns None when out of that caliber.
    pub fn shoot(&mut self) -> Option<Projectile> {
        if !self.alive || !self.ammunition.take(self.caliber) {
            return None;
        }
        Some(ballistics::launch(
            self.position,
            self.aim_angle,
            self.aim_velocity,
            self.caliber,
            self.id,
        ))
    }

    pub fn set_angle(&mut self, radians: f64) {
        if radians.is_finite() {
            self.aim_angle = utils::normalize_angle(radians);
        }
    }

    pub fn adjust_angle(&mut self, delta: f64) {
        self.set_angle(self.aim_angle + delta);
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.aim_velocity = utils::finite_clamp(velocity, 1.0, SHOOT_MAX_SPEED, self.aim_velocity);
    }

    pub fn adjust_velocity(&mut self, delta: f64) {
        self.set_velocity(self.aim_velocity + delta);
    }

    pub fn select_caliber(&mut self, caliber: Caliber) {
        self.caliber = caliber;
    }

    /// Where the tank's centre rests when standing on the terrain below it.
    pub fn ground_y(&self, terrain: &Terrain) -> f64 {
        terrain.surface_y(self.position.x) - TANK_GROUND_OFFSET
    }

    pub fn snap_to_ground(&mut self, terrain: &Terrain) {
        self.position.y = self.ground_y(terrain);
        self.fall_speed = 0.0;
    }

    /// Drops the tank under gravity if the ground below it has gone.
    pub fn fall_tick(&mut self, dt: f64, gravity: f64, terrain: &Terrain) -> FallOutcome {
        let ground = self.ground_y(terrain);
        if self.position.y >= ground {
            // Terrain landed on top of us; stand on it
            self.position.y = ground;
            return self.touch_down();
        }

        self.fall_speed += gravity * dt;
        self.position.y += self.fall_speed * dt;
        if self.position.y >= ground {
            self.position.y = ground;
            return self.touch_down();
        }
        FallOutcome::Falling
    }

    fn touch_down(&mut self) -> FallOutcome {
        let speed = self.fall_speed;
        self.fall_speed = 0.0;
        if speed > 0.0 {
            FallOutcome::Landed(speed)
        } else {
            FallOutcome::Grounded
        }
    }
}

/// Damage dealt by a landing at `speed`.
pub fn fall_damage(speed: f64) -> f64 {
    if speed > config::FALL_SPEED_THRESHOLD {
        speed * config::FALL_DAMAGE_FACTOR
    } else {
        0.0
    }
}
