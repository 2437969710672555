//! Projectile kinematics, trail sampling and collision resolution.

use crate::config::{MAX_FLIGHT_STEPS, PROJECTILE_MAX_STEP, TANK_RADIUS, TRAIL_SAMPLE_DIST_SQ, WIND_DRIFT_SCALE};
use crate::debug_ballistics;
use crate::tank::Tank;
use crate::terrain::Terrain;
use crate::types::{Caliber, Impact, ImpactKind, Point};

// A cannonball in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub position: Point,
    pub velocity: Point,
    pub caliber: Caliber,
    pub damage: f64,
    pub blast_radius: f64,
    pub impact_radius: f64,
    /// Index of the tank that fired it.
    pub shooter: usize,
    pub trail: Vec<Point>,
    /// Smallest screen y reached so far.
    pub peak_y: f64,
}

/// Creates a projectile leaving the muzzle of a tank at `origin`.
/// `angle` is in radians, counter-clockwise from the positive x axis.
pub fn launch(origin: Point, angle: f64, speed: f64, caliber: Caliber, shooter: usize) -> Projectile {
    let profile = caliber.profile();
    let muzzle = TANK_RADIUS + profile.muzzle_length;
    let (sin, cos) = angle.sin_cos();
    let position = Point::new(origin.x + muzzle * cos, origin.y - muzzle * sin);

    debug_ballistics!(
        "Launch {} from ({:.1}, {:.1}) angle {:.1} deg speed {:.1}",
        caliber,
        position.x,
        position.y,
        angle.to_degrees(),
        speed
    );

    Projectile {
        position,
        // Screen y grows downward, so upward aim means negative vy
        velocity: Point::new(speed * cos, -speed * sin),
        caliber,
        damage: profile.damage,
        blast_radius: profile.blast_radius,
        impact_radius: profile.inner_hit_radius,
        shooter,
        trail: vec![position],
        peak_y: position.y,
    }
}

impl Projectile {
    /// Euler step: move, then apply gravity and wind drift.
    pub fn tick(&mut self, dt: f64, gravity: f64, wind_velocity: f64) {
        self.position.x += self.velocity.x * dt;
        self.position.y += self.velocity.y * dt;
        self.velocity.y += gravity * dt;
        self.position.x += wind_velocity * dt * WIND_DRIFT_SCALE;

        self.peak_y = self.peak_y.min(self.position.y);

        let far_enough = self
            .trail
            .last()
            .is_none_or(|last| last.distance_sq(&self.position) > TRAIL_SAMPLE_DIST_SQ);
        if far_enough {
            self.trail.push(self.position);
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }

    /// Highest altitude above the map floor reached during the flight.
    pub fn peak_altitude(&self, map_height: f64) -> f64 {
        map_height - self.peak_y
    }

    /// Distance travelled from the launching tank's position.
    pub fn distance_from(&self, origin: Point) -> f64 {
        self.position.distance(&origin)
    }
}

/// Classifies the projectile's current position. Border beats terrain, terrain beats tanks.
pub fn resolve_collision(projectile: &Projectile, terrain: &Terrain, tanks: &[Tank], map_width: f64) -> Option<Impact> {
    let position = projectile.position;

    if position.x < 0.0 || position.x > map_width {
        return Some(Impact::new(position, ImpactKind::Border));
    }

    if terrain.collides(position) {
        return Some(Impact::new(position, ImpactKind::Terrain));
    }

    for (index, tank) in tanks.iter().enumerate() {
        if tank.is_alive() && tank.collides_with(position, projectile.caliber) {
            let kind = if index == projectile.shooter {
                ImpactKind::Suicide(index)
            } else {
                ImpactKind::Tank(index)
            };
            return Some(Impact::new(position, kind));
        }
    }

    None
}

/// Advances one simulation tick, split into sub-steps short enough not to
/// tunnel through a tank, checking for collisions after each sub-step.
pub fn step_flight(
    projectile: &mut Projectile,
    dt: f64,
    gravity: f64,
    wind_velocity: f64,
    terrain: &Terrain,
    tanks: &[Tank],
    map_width: f64,
) -> Option<Impact> {
    let travel = projectile.speed() * dt + wind_velocity.abs() * dt * WIND_DRIFT_SCALE;
    let sub_steps = ((travel / PROJECTILE_MAX_STEP).ceil() as u32).clamp(1, 64);
    let step_dt = dt / sub_steps as f64;

    for step in 0..sub_steps {
        projectile.tick(step_dt, gravity, wind_velocity);
        if let Some(impact) = resolve_collision(projectile, terrain, tanks, map_width) {
            debug_ballistics!(
                "{:?} impact at ({:.1}, {:.1}) on sub-step {}",
                impact.kind,
                impact.position.x,
                impact.position.y,
                step + 1
            );
            return Some(impact);
        }
    }
    None
}

/// Flies a projectile to its impact. Flights that exceed the step cap end as
/// a border impact so the simulation always terminates.
pub fn simulate_flight(
    projectile: &mut Projectile,
    dt: f64,
    gravity: f64,
    wind_velocity: f64,
    terrain: &Terrain,
    tanks: &[Tank],
    map_width: f64,
) -> Impact {
    for _ in 0..MAX_FLIGHT_STEPS {
        if let Some(impact) = step_flight(projectile, dt, gravity, wind_velocity, terrain, tanks, map_width) {
            return impact;
        }
    }
    log::warn!("Projectile exceeded {} steps, treating as out of bounds", MAX_FLIGHT_STEPS);
    Impact::new(projectile.position, ImpactKind::Border)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ammunition, Rgb};
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    fn flat_terrain(height: f64) -> Terrain {
        Terrain::from_heights(vec![height; 1000], 480, 1, 4)
    }

    fn tank_at(id: usize, x: f64, y: f64) -> Tank {
        Tank::new(id, id, Rgb::new(200, 0, 0), Point::new(x, y), Ammunition::starting())
    }

    #[test]
    fn test_launch_applies_muzzle_offset_and_velocity() {
        let p = launch(Point::new(100.0, 200.0), 0.0, 50.0, Caliber::Mm60, 0);
        assert_approx_eq!(p.position.x, 100.0 + TANK_RADIUS + 10.0);
        assert_approx_eq!(p.position.y, 200.0);
        assert_approx_eq!(p.velocity.x, 50.0);
        assert_approx_eq!(p.velocity.y, 0.0);

        let up = launch(Point::new(100.0, 200.0), FRAC_PI_2, 50.0, Caliber::Mm80, 0);
        assert!(up.velocity.y < 0.0, "positive angle must move upward");
        assert_approx_eq!(up.position.y, 200.0 - (TANK_RADIUS + 20.0));
        assert_eq!(up.damage, 40.0);
        assert_eq!(up.blast_radius, 20.0);
    }

    #[test]
    fn test_tick_integrates_gravity_and_wind() {
        let mut p = launch(Point::new(100.0, 200.0), 0.0, 10.0, Caliber::Mm60, 0);
        let start = p.position;
        p.tick(1.0, 9.8, 0.0);
        assert_approx_eq!(p.position.x, start.x + 10.0);
        assert_approx_eq!(p.position.y, start.y);
        assert_approx_eq!(p.velocity.y, 9.8);

        let mut windy = launch(Point::new(100.0, 200.0), 0.0, 10.0, Caliber::Mm60, 0);
        windy.tick(1.0, 9.8, 3.0);
        assert_approx_eq!(windy.position.x, start.x + 10.0 + 3.0 * WIND_DRIFT_SCALE);
    }

    #[test]
    fn test_distance_is_measured_from_the_tank() {
        let origin = Point::new(100.0, 200.0);
        let mut p = launch(origin, 0.0, 30.0, Caliber::Mm60, 0);
        assert_approx_eq!(p.distance_from(origin), TANK_RADIUS + 10.0);
        p.tick(1.0, 0.0, 0.0);
        assert_approx_eq!(p.distance_from(origin), TANK_RADIUS + 40.0);
    }

    #[test]
    fn test_trail_is_sparsified_by_distance() {
        let mut p = launch(Point::new(100.0, 200.0), 0.0, 1.0, Caliber::Mm60, 0);
        for _ in 0..100 {
            p.tick(0.01, 0.0, 0.0);
        }
        // Moved a single unit in total, never further than the sampling threshold
        assert_eq!(p.trail.len(), 1);

        for _ in 0..100 {
            p.tick(1.0, 0.0, 0.0);
        }
        assert!(p.trail.len() > 1 && p.trail.len() < 100);
        for pair in p.trail.windows(2) {
            assert!(pair[0].distance_sq(&pair[1]) > TRAIL_SAMPLE_DIST_SQ);
        }
    }

    #[test]
    fn test_vertical_shot_returns_to_launch_x() {
        let mut p = launch(Point::new(300.0, 300.0), FRAC_PI_2, 80.0, Caliber::Mm60, 0);
        let launch_x = p.position.x;
        let launch_y = p.position.y;
        let mut rising = true;
        for _ in 0..100_000 {
            p.tick(0.001, 9.8, 0.0);
            if p.velocity.y > 0.0 {
                rising = false;
            }
            if !rising && p.position.y >= launch_y {
                break;
            }
        }
        assert!(!rising);
        assert_approx_eq!(p.position.x, launch_x, 1e-6);
        assert!(p.peak_altitude(480.0) > 480.0 - launch_y);
    }

    #[test]
    fn test_border_wins_over_terrain_and_tanks() {
        let terrain = flat_terrain(470.0);
        let tanks = vec![tank_at(1, 999.0, 5.0)];
        let mut p = launch(Point::new(500.0, 5.0), 0.0, 0.0, Caliber::Mm105, 0);
        p.position = Point::new(1000.5, 20.0);
        let impact = resolve_collision(&p, &terrain, &tanks, 1000.0).expect("impact");
        assert_eq!(impact.kind, ImpactKind::Border);

        p.position = Point::new(-0.1, 20.0);
        let impact = resolve_collision(&p, &terrain, &tanks, 1000.0).expect("impact");
        assert_eq!(impact.kind, ImpactKind::Border);
    }

    #[test]
    fn test_terrain_wins_over_tank() {
        let terrain = flat_terrain(100.0);
        let tanks = vec![tank_at(0, 50.0, 370.0), tank_at(1, 500.0, 370.0)];
        let mut p = launch(Point::new(50.0, 365.0), 0.0, 0.0, Caliber::Mm60, 0);
        p.position = Point::new(500.0, 381.0);
        let impact = resolve_collision(&p, &terrain, &tanks, 1000.0).expect("impact");
        assert_eq!(impact.kind, ImpactKind::Terrain);
    }

    #[test]
    fn test_tank_and_suicide_impacts() {
        let terrain = flat_terrain(100.0);
        let tanks = vec![tank_at(0, 100.0, 365.0), tank_at(1, 500.0, 365.0)];
        let mut p = launch(Point::new(100.0, 365.0), 0.0, 0.0, Caliber::Mm60, 0);

        p.position = Point::new(505.0, 360.0);
        let impact = resolve_collision(&p, &terrain, &tanks, 1000.0).expect("impact");
        assert_eq!(impact.kind, ImpactKind::Tank(1));

        p.position = Point::new(102.0, 360.0);
        let impact = resolve_collision(&p, &terrain, &tanks, 1000.0).expect("impact");
        assert_eq!(impact.kind, ImpactKind::Suicide(0));

        p.position = Point::new(300.0, 100.0);
        assert!(resolve_collision(&p, &terrain, &tanks, 1000.0).is_none());
    }

    #[test]
    fn test_horizontal_shot_falls_and_terminates() {
        let terrain = flat_terrain(100.0);
        let mut p = launch(Point::new(100.0, 300.0), 0.0, 60.0, Caliber::Mm60, 0);
        let start_y = p.position.y;
        let mut last_y = start_y;
        for _ in 0..20 {
            p.tick(0.1, 9.8, 0.0);
            assert!(p.position.y >= last_y);
            last_y = p.position.y;
        }
        assert!(p.position.y > start_y);

        let impact = simulate_flight(&mut p, 1.0 / 15.0, 9.8, 0.0, &terrain, &[], 1000.0);
        assert!(matches!(impact.kind, ImpactKind::Terrain | ImpactKind::Border));
    }

    #[test]
    fn test_fast_shell_does_not_tunnel_through_tank() {
        let terrain = flat_terrain(10.0);
        let tanks = vec![tank_at(0, 100.0, 300.0), tank_at(1, 400.0, 300.0)];
        let mut p = launch(Point::new(100.0, 300.0), 0.0, 400.0, Caliber::Mm60, 0);
        // Gravity off so the shell flies level into the target
        let impact = simulate_flight(&mut p, 1.0 / 15.0, 0.0, 0.0, &terrain, &tanks, 1000.0);
        assert_eq!(impact.kind, ImpactKind::Tank(1));
    }
}
