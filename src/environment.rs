//! Wind and gravity: the two ambient forces acting on projectiles.

use rand::Rng;

use crate::config::{EPSILON, GRAVITY, GRAVITY_MAX, GRAVITY_MIN, WIND_MAX, WIND_MIN};
use crate::debug_env;

/// Which ambient forces vary during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AmbientEffect {
    #[default]
    None,
    Gravity,
    Wind,
    GravityAndWind,
}

impl AmbientEffect {
    pub fn has_wind(self) -> bool {
        matches!(self, AmbientEffect::Wind | AmbientEffect::GravityAndWind)
    }

    pub fn has_gravity_drift(self) -> bool {
        matches!(self, AmbientEffect::Gravity | AmbientEffect::GravityAndWind)
    }
}

/// Eases `current` toward `target`; close enough counts as arrived.
fn approach(current: f64, target: f64, dt: f64) -> f64 {
    current + (target - current).tanh() * dt
}

/// Horizontal wind. The velocity eases toward a target that is redrawn
/// whenever it is reached; targets are never weaker than `min`.
#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    velocity: f64,
    target: f64,
    min: f64,
    max: f64,
    enabled: bool,
}

impl Wind {
    pub fn new(enabled: bool) -> Self {
        Wind {
            velocity: WIND_MIN,
            target: WIND_MIN,
            min: WIND_MIN,
            max: WIND_MAX,
            enabled,
        }
    }

    pub fn velocity(&self) -> f64 {
        if self.enabled { self.velocity } else { 0.0 }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        if !self.enabled {
            return;
        }
        if (self.velocity - self.target).abs() < EPSILON {
            self.retarget(rng);
        }
        self.velocity = approach(self.velocity, self.target, dt);
    }

    /// Draws a new target in `[-max, -min] U [min, max]`.
    pub fn retarget<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let span = (self.max - self.min).round() as i64;
        let draw = rng.gen_range(-span..=span) as f64;
        self.target = if draw < 0.0 { draw - self.min } else { draw + self.min };
        debug_env!("Wind target {:.1} (now {:.2})", self.target, self.velocity);
    }
}

/// Gravity, constant unless the gravity effect is active.
#[derive(Debug, Clone, PartialEq)]
pub struct Gravity {
    value: f64,
    target: f64,
    min: f64,
    max: f64,
    drifting: bool,
}

impl Gravity {
    pub fn constant(value: f64) -> Self {
        Gravity {
            value,
            target: value,
            min: value,
            max: value,
            drifting: false,
        }
    }

    pub fn drifting<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> Self {
        let value = rng.gen_range(min..=max);
        Gravity {
            value,
            target: value,
            min,
            max,
            drifting: true,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_drifting(&self) -> bool {
        self.drifting
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        if !self.drifting {
            return;
        }
        if (self.value - self.target).abs() < EPSILON {
            self.retarget(rng);
        }
        self.value = approach(self.value, self.target, dt).clamp(self.min, self.max);
    }

    pub fn retarget<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.drifting {
            return;
        }
        self.target = rng.gen_range(self.min..=self.max);
        debug_env!("Gravity target {:.2} (now {:.2})", self.target, self.value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub wind: Wind,
    pub gravity: Gravity,
}

impl Environment {
    pub fn from_effect<R: Rng + ?Sized>(effect: AmbientEffect, rng: &mut R) -> Self {
        let gravity = if effect.has_gravity_drift() {
            Gravity::drifting(GRAVITY_MIN, GRAVITY_MAX, rng)
        } else {
            Gravity::constant(GRAVITY)
        };
        let mut wind = Wind::new(effect.has_wind());
        if wind.is_enabled() {
            wind.retarget(rng);
        }
        Environment { wind, gravity }
    }

    pub fn calm() -> Self {
        Environment {
            wind: Wind::new(false),
            gravity: Gravity::constant(GRAVITY),
        }
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        self.wind.tick(dt, rng);
        self.gravity.tick(dt, rng);
    }

    /// Called between turns so every shot sees fresh conditions.
    pub fn next_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.wind.is_enabled() {
            self.wind.retarget(rng);
        }
        self.gravity.retarget(rng);
    }

    pub fn gravity(&self) -> f64 {
        self.gravity.value()
    }

    pub fn wind(&self) -> f64 {
        self.wind.velocity()
    }
}
