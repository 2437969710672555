//! One round of the match: tank placement, the turn state machine, damage,
//! scoring and the render snapshot.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::ballistics::{self, Projectile};
use crate::config::{BOT_END_TURN_DELAY, EXPLOSION_DURATION, TANK_RADIUS, TIME_SCALE};
use crate::controller::{AimDecision, BotController, Controller, HumanController, InputState, WorldView};
use crate::debug_round;
use crate::environment::Environment;
use crate::game::MatchContext;
use crate::tank::{self, FallOutcome, Tank};
use crate::terrain::Terrain;
use crate::types::{Impact, ImpactKind, Point};

/// Result of one `Round::update`, telling the match loop what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    RoundOver,
    Exit,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnPhase {
    AwaitingTurnOrder,
    Aiming,
    Flying,
    Exploding { remaining: f64 },
    Destroying,
    Settling,
    EndOfTurn { waited: f64 },
    RoundOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd {
    LastTankStanding,
    NoSurvivors,
    /// Every surviving tank ran out of ammunition.
    NoOneCanAct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub winner: Option<usize>,
    pub winner_player: Option<usize>,
    pub reason: RoundEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionView {
    pub position: Point,
    pub radius: f64,
    /// 0 at detonation, 1 when the effect ends.
    pub progress: f64,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot<'a> {
    pub terrain: &'a Terrain,
    pub tanks: &'a [Tank],
    pub projectile: Option<&'a Projectile>,
    pub explosion: Option<ExplosionView>,
    pub current_tank: Option<usize>,
    pub wind: f64,
    pub gravity: f64,
    pub phase: TurnPhase,
    pub round: u32,
    pub outcome: Option<RoundOutcome>,
}

/// Life lost by a tank at `distance` from a blast that did not hit it directly.
/// Falls off quadratically to zero at `blast_radius + TANK_RADIUS`.
pub fn radial_damage(damage: f64, blast_radius: f64, distance: f64) -> f64 {
    let reach = blast_radius + TANK_RADIUS;
    if !distance.is_finite() || reach <= 0.0 {
        return 0.0;
    }
    let n = distance.max(0.0) / reach;
    if n >= 1.0 {
        return 0.0;
    }
    damage * (1.0 - n).powi(2)
}

pub struct Round {
    pub number: u32,
    terrain: Terrain,
    tanks: Vec<Tank>,
    controllers: Vec<Box<dyn Controller>>,
    environment: Environment,
    turn_queue: VecDeque<usize>,
    current: Option<usize>,
    projectile: Option<Projectile>,
    impact: Option<Impact>,
    phase: TurnPhase,
    /// Deaths already credited, per tank.
    tallied: Vec<bool>,
    outcome: Option<RoundOutcome>,
    rng: StdRng,
}

impl Round {
    /// Generates terrain and places one tank per player.
    pub fn new(number: u32, context: &MatchContext) -> Self {
        let config = &context.config;
        let mut rng = match config.terrain_seed() {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(number as u64)),
            None => StdRng::from_entropy(),
        };
        let terrain = Terrain::generate(
            config.map_width,
            config.map_height,
            config.line_width,
            config.mountains,
            config.valleys,
            config.layers,
            config.terrain_seed().map(|seed| seed.wrapping_add(number.saturating_sub(1) as u64)),
        );
        let environment = Environment::from_effect(config.effect, &mut rng);

        let count = context.players.len();
        let map_width = terrain.map_width();
        let zone = map_width / count.max(1) as f64;
        let mut zones: Vec<usize> = (0..count).collect();
        zones.shuffle(&mut rng);

        let mut tanks = Vec::with_capacity(count);
        let mut controllers: Vec<Box<dyn Controller>> = Vec::with_capacity(count);
        for (index, player) in context.players.iter().enumerate() {
            let centre = zone * (zones[index] as f64 + 0.5);
            let jitter = zone / 4.0;
            let x = (centre + rng.gen_range(-jitter..=jitter)).clamp(TANK_RADIUS, (map_width - TANK_RADIUS).max(TANK_RADIUS));

            let mut tank = Tank::new(index, index, player.color, Point::new(x, 0.0), player.ammunition.clone());
            tank.snap_to_ground(&terrain);
            debug_round!(tank: index, round: number, "{} placed at x={:.1}", player.name, x);
            tanks.push(tank);

            if player.is_bot() {
                controllers.push(Box::new(BotController::with_seed(rng.r#gen())));
            } else {
                controllers.push(Box::new(HumanController::new()));
            }
        }

        log::info!("Round {} ready with {} tanks", number, tanks.len());
        Self::assemble(number, terrain, tanks, controllers, environment, rng)
    }

    /// Builds a round from prepared pieces; tank `i` must belong to player `tanks[i].player`.
    pub fn from_parts(
        number: u32,
        terrain: Terrain,
        tanks: Vec<Tank>,
        controllers: Vec<Box<dyn Controller>>,
        environment: Environment,
        seed: u64,
    ) -> Self {
        Self::assemble(number, terrain, tanks, controllers, environment, StdRng::seed_from_u64(seed))
    }

    fn assemble(
        number: u32,
        terrain: Terrain,
        tanks: Vec<Tank>,
        controllers: Vec<Box<dyn Controller>>,
        environment: Environment,
        rng: StdRng,
    ) -> Self {
        let tallied = vec![false; tanks.len()];
        Round {
            number,
            terrain,
            tanks,
            controllers,
            environment,
            turn_queue: VecDeque::new(),
            current: None,
            projectile: None,
            impact: None,
            phase: TurnPhase::AwaitingTurnOrder,
            tallied,
            outcome: None,
            rng,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn current_tank(&self) -> Option<usize> {
        self.current
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.phase == TurnPhase::RoundOver
    }

    /// Advances the state machine by one tick of `dt` wall-clock seconds.
    pub fn update(&mut self, context: &mut MatchContext, dt: f64, input: &InputState) -> ControlSignal {
        if input.exit {
            return ControlSignal::Exit;
        }
        if input.restart {
            return ControlSignal::Restart;
        }
        if self.phase == TurnPhase::RoundOver {
            return ControlSignal::RoundOver;
        }

        let sim_dt = dt * TIME_SCALE;
        self.environment.tick(sim_dt, &mut self.rng);

        match self.phase {
            TurnPhase::AwaitingTurnOrder => self.begin_turn(context),
            TurnPhase::Aiming => self.aim(dt, input),
            TurnPhase::Flying => self.fly(sim_dt),
            TurnPhase::Exploding { remaining } => {
                let remaining = remaining - dt;
                self.phase = if remaining <= 0.0 {
                    TurnPhase::Destroying
                } else {
                    TurnPhase::Exploding { remaining }
                };
            }
            TurnPhase::Destroying => self.destroy(context),
            TurnPhase::Settling => self.settle(context, sim_dt),
            TurnPhase::EndOfTurn { waited } => self.end_turn(context, dt, input, waited),
            TurnPhase::RoundOver => {}
        }

        if self.phase == TurnPhase::RoundOver {
            ControlSignal::RoundOver
        } else {
            ControlSignal::Continue
        }
    }

    /// Next tank to play. The queue is refilled with a fresh shuffle whenever it
    /// runs dry; returns None once `2 * tanks` candidates were skipped in a row.
    pub fn try_next_turn(&mut self) -> Option<usize> {
        let limit = 2 * self.tanks.len();
        let mut skipped = 0;
        loop {
            if self.turn_queue.is_empty() {
                let mut order: Vec<usize> = (0..self.tanks.len()).collect();
                order.shuffle(&mut self.rng);
                self.turn_queue.extend(order);
            }
            let index = self.turn_queue.pop_front()?;
            if self.tanks[index].can_act() {
                return Some(index);
            }
            skipped += 1;
            if skipped >= limit {
                return None;
            }
        }
    }

    fn begin_turn(&mut self, context: &mut MatchContext) {
        match self.try_next_turn() {
            Some(index) => {
                self.current = Some(index);
                self.controllers[index].begin_turn();
                self.phase = TurnPhase::Aiming;
                log::info!("Round {}: Tank {} to play", self.number, index);
            }
            None => {
                log::info!("Round {}: no tank can act", self.number);
                self.finish(context, RoundEnd::NoOneCanAct, None);
            }
        }
    }

    fn aim(&mut self, dt: f64, input: &InputState) {
        let Some(index) = self.current else {
            self.phase = TurnPhase::AwaitingTurnOrder;
            return;
        };
        if !self.tanks[index].can_act() {
            self.phase = TurnPhase::AwaitingTurnOrder;
            return;
        }

        let world = WorldView {
            tanks: &self.tanks,
            terrain: &self.terrain,
            gravity: self.environment.gravity(),
            wind: self.environment.wind(),
        };
        let decision = self.controllers[index].decide_aim(&self.tanks[index], &world, input, dt);
        let (command, fire) = match decision {
            AimDecision::Hold(command) => (command, false),
            AimDecision::Fire(command) => (command, true),
        };

        let tank = &mut self.tanks[index];
        tank.set_angle(command.angle);
        tank.set_velocity(command.velocity);
        tank.select_caliber(command.caliber);
        if !fire {
            return;
        }
        match tank.shoot() {
            Some(projectile) => {
                log::info!(
                    "Round {}: Tank {} fires {} at {:.1} deg, speed {:.1}",
                    self.number,
                    index,
                    projectile.caliber,
                    tank.aim_angle.to_degrees(),
                    tank.aim_velocity
                );
                self.projectile = Some(projectile);
                self.phase = TurnPhase::Flying;
            }
            None => debug_round!(tank: index, round: self.number, "No {} shells left", tank.caliber),
        }
    }

    fn fly(&mut self, sim_dt: f64) {
        let gravity = self.environment.gravity();
        let wind = self.environment.wind();
        let map_width = self.terrain.map_width();
        let Some(projectile) = self.projectile.as_mut() else {
            self.enter_end_of_turn();
            return;
        };

        let Some(impact) = ballistics::step_flight(projectile, sim_dt, gravity, wind, &self.terrain, &self.tanks, map_width)
        else {
            return;
        };
        log::info!(
            "Round {}: Tank {} shell impact {:?} at ({:.1}, {:.1}), peak {:.1}",
            self.number,
            projectile.shooter,
            impact.kind,
            impact.position.x,
            impact.position.y,
            projectile.peak_altitude(self.terrain.map_height())
        );
        self.impact = Some(impact);
        self.phase = match impact.kind {
            ImpactKind::Border => TurnPhase::Destroying,
            _ => TurnPhase::Exploding {
                remaining: EXPLOSION_DURATION,
            },
        };
    }

    /// Living tank of another player closest to `point`.
    fn nearest_opponent(&self, shooter: usize, point: Point) -> Option<Point> {
        self.tanks
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != shooter && t.is_alive())
            .map(|(_, t)| t.position)
            .min_by(|a, b| a.distance_sq(&point).total_cmp(&b.distance_sq(&point)))
    }

    fn destroy(&mut self, context: &mut MatchContext) {
        let (Some(impact), Some(projectile)) = (self.impact, self.projectile.take()) else {
            self.phase = TurnPhase::Settling;
            return;
        };
        let shooter = projectile.shooter;
        let shooter_player = self.tanks[shooter].player;

        match impact.kind {
            ImpactKind::Terrain => {
                if let Some(target) = self.nearest_opponent(shooter, impact.position) {
                    context.players[shooter_player].score(&impact, target);
                }
            }
            ImpactKind::Tank(_) => context.players[shooter_player].score(&impact, impact.position),
            ImpactKind::Suicide(_) => {
                for tank in self.tanks.iter().filter(|t| t.player != shooter_player) {
                    context.players[tank.player].score(&impact, impact.position);
                }
            }
            ImpactKind::Border => {}
        }

        if impact.kind != ImpactKind::Border {
            let struck = impact.struck_tank();
            for (index, tank) in self.tanks.iter_mut().enumerate() {
                if !tank.is_alive() {
                    continue;
                }
                let damage = if Some(index) == struck {
                    projectile.damage
                } else {
                    radial_damage(projectile.damage, projectile.blast_radius, tank.position.distance(&impact.position))
                };
                if damage > 0.0 {
                    tank.apply_damage(damage);
                    debug_round!(tank: index, round: self.number, "Took {:.1} damage, life {:.1}", damage, tank.life());
                }
            }
            self.terrain
                .erode(impact.position.x, impact.position.y, projectile.blast_radius);
            self.tally_deaths(context, Some(shooter));
        }

        self.phase = TurnPhase::Settling;
    }

    fn settle(&mut self, context: &mut MatchContext, sim_dt: f64) {
        let gravity = self.environment.gravity();
        self.terrain.settle(sim_dt, gravity);

        let mut falling = false;
        for (index, tank) in self.tanks.iter_mut().enumerate() {
            if !tank.is_alive() {
                continue;
            }
            match tank.fall_tick(sim_dt, gravity, &self.terrain) {
                FallOutcome::Falling => falling = true,
                FallOutcome::Landed(speed) => {
                    let damage = tank::fall_damage(speed);
                    if damage > 0.0 {
                        tank.apply_damage(damage);
                        debug_round!(tank: index, round: self.number, "Landed at {:.1}, took {:.1}", speed, damage);
                    }
                }
                FallOutcome::Grounded => {}
            }
        }
        self.tally_deaths(context, self.current);

        if !falling && !self.terrain.is_settling() {
            self.enter_end_of_turn();
        }
    }

    /// Credits every newly destroyed tank to `shooter`.
    fn tally_deaths(&mut self, context: &mut MatchContext, shooter: Option<usize>) {
        for index in 0..self.tanks.len() {
            if self.tanks[index].is_alive() || self.tallied[index] {
                continue;
            }
            self.tallied[index] = true;
            context.players[self.tanks[index].player].record_death();

            let Some(shooter) = shooter else { continue };
            let killer = self.tanks[shooter].player;
            if killer == self.tanks[index].player {
                context.players[killer].pay_suicide_penalty();
                log::info!("Round {}: Tank {} destroyed itself", self.number, index);
            } else {
                context.players[killer].record_kill();
                log::info!("Round {}: Tank {} destroyed by Tank {}", self.number, index, shooter);
            }
        }
    }

    fn enter_end_of_turn(&mut self) {
        for tank in self.tanks.iter_mut().filter(|t| t.is_alive()) {
            tank.snap_to_ground(&self.terrain);
        }
        self.projectile = None;
        self.impact = None;
        self.environment.next_turn(&mut self.rng);
        self.phase = TurnPhase::EndOfTurn { waited: 0.0 };
    }

    fn end_turn(&mut self, context: &mut MatchContext, dt: f64, input: &InputState, waited: f64) {
        let waited = waited + dt;
        let human_turn = self.current.is_some_and(|i| !self.controllers[i].is_bot());
        let ready = if human_turn {
            input.acknowledge || input.fire
        } else {
            waited >= BOT_END_TURN_DELAY
        };
        if !ready {
            self.phase = TurnPhase::EndOfTurn { waited };
            return;
        }

        let alive: Vec<usize> = (0..self.tanks.len()).filter(|&i| self.tanks[i].is_alive()).collect();
        match alive.as_slice() {
            [winner] => self.finish(context, RoundEnd::LastTankStanding, Some(*winner)),
            [] => self.finish(context, RoundEnd::NoSurvivors, None),
            _ => {
                self.current = None;
                self.phase = TurnPhase::AwaitingTurnOrder;
            }
        }
    }

    fn finish(&mut self, context: &mut MatchContext, reason: RoundEnd, winner: Option<usize>) {
        for tank in &self.tanks {
            if let Some(player) = context.players.get_mut(tank.player) {
                player.ammunition = tank.ammunition.clone();
            }
        }
        let winner_player = winner.map(|i| self.tanks[i].player);
        match winner_player.and_then(|p| context.players.get(p)) {
            Some(player) => log::info!("Round {} won by {} ({:?})", self.number, player.name, reason),
            None => log::info!("Round {} ends in a draw ({:?})", self.number, reason),
        }
        self.outcome = Some(RoundOutcome {
            winner,
            winner_player,
            reason,
        });
        self.current = None;
        self.phase = TurnPhase::RoundOver;
    }

    pub fn frame(&self) -> FrameSnapshot<'_> {
        let explosion = match (self.phase, self.impact, &self.projectile) {
            (TurnPhase::Exploding { remaining }, Some(impact), Some(projectile)) => Some(ExplosionView {
                position: impact.position,
                radius: projectile.blast_radius,
                progress: (1.0 - remaining / EXPLOSION_DURATION).clamp(0.0, 1.0),
            }),
            _ => None,
        };
        FrameSnapshot {
            terrain: &self.terrain,
            tanks: &self.tanks,
            projectile: self.projectile.as_ref(),
            explosion,
            current_tank: self.current,
            wind: self.environment.wind(),
            gravity: self.environment.gravity(),
            phase: self.phase,
            round: self.number,
            outcome: self.outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballistics::launch;
    use crate::config::{
        ANGLE_FINE_STEP_DEG, KILL_REWARD, MAP_HEIGHT, SCORE_CLOSE, SCORE_SUICIDE, SCORE_TANK_HIT, STARTING_MONEY,
    };
    use crate::config::MatchConfig;
    use crate::types::{Ammunition, Caliber, Rgb};
    use assert_approx_eq::assert_approx_eq;

    fn bots_context(players: u32) -> MatchContext {
        let config = MatchConfig {
            players,
            bots: players,
            seed: 9,
            ..Default::default()
        };
        MatchContext::new(config).expect("valid config")
    }

    fn flat_round_with(xs: &[f64], human: bool) -> Round {
        let terrain = Terrain::from_heights(vec![200.0; 400], MAP_HEIGHT, 1, 4);
        let mut tanks = Vec::new();
        let mut controllers: Vec<Box<dyn Controller>> = Vec::new();
        for (i, x) in xs.iter().enumerate() {
            let mut tank = Tank::new(i, i, Rgb::new(100, 100, 100), Point::new(*x, 0.0), Ammunition::starting());
            tank.snap_to_ground(&terrain);
            tanks.push(tank);
            if human {
                controllers.push(Box::new(HumanController::new()));
            } else {
                controllers.push(Box::new(BotController::with_seed(i as u64)));
            }
        }
        Round::from_parts(1, terrain, tanks, controllers, Environment::calm(), 5)
    }

    fn flat_round(xs: &[f64]) -> Round {
        flat_round_with(xs, false)
    }

    fn strike(round: &mut Round, shooter: usize, caliber: Caliber, impact: Impact) {
        round.current = Some(shooter);
        round.projectile = Some(launch(round.tanks[shooter].position, 0.0, 10.0, caliber, shooter));
        round.impact = Some(impact);
        round.phase = TurnPhase::Destroying;
    }

    #[test]
    fn test_radial_damage_falloff() {
        assert_approx_eq!(radial_damage(50.0, 30.0, 0.0), 50.0);
        assert_approx_eq!(radial_damage(50.0, 30.0, 24.0), 12.5);
        assert_approx_eq!(radial_damage(50.0, 30.0, 48.0), 0.0);
        assert_approx_eq!(radial_damage(50.0, 30.0, 1000.0), 0.0);
        assert_approx_eq!(radial_damage(50.0, 30.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_no_one_can_act_without_ammo() {
        let mut round = flat_round(&[100.0, 300.0]);
        for tank in round.tanks.iter_mut() {
            tank.ammunition = Ammunition::empty();
        }
        assert_eq!(round.try_next_turn(), None);

        let mut context = bots_context(2);
        let signal = round.update(&mut context, 0.1, &InputState::default());
        assert_eq!(signal, ControlSignal::RoundOver);
        let outcome = round.outcome().expect("outcome");
        assert_eq!(outcome.reason, RoundEnd::NoOneCanAct);
        assert_eq!(outcome.winner, None);
        // Stock written back
        assert!(context.players[0].ammunition.is_empty());
    }

    #[test]
    fn test_human_turn_from_aim_to_acknowledge() {
        let mut round = flat_round_with(&[100.0, 300.0], true);
        let mut context = bots_context(2);
        let dt = 1.0 / 60.0;
        let idle = InputState::default();

        round.update(&mut context, dt, &idle);
        assert_eq!(round.phase(), TurnPhase::Aiming);
        let shooter = round.current_tank().expect("a tank to play");

        let before = round.tanks[shooter].aim_angle;
        let raise = InputState { angle_down: true, ..Default::default() };
        round.update(&mut context, dt, &raise);
        assert_approx_eq!(round.tanks[shooter].aim_angle, before + ANGLE_FINE_STEP_DEG.to_radians());

        // Out of the selected caliber: the press is ignored and aiming goes on
        round.tanks[shooter].ammunition.set(Caliber::Mm60, 0);
        let fire = InputState { fire: true, ..Default::default() };
        round.update(&mut context, dt, &fire);
        assert_eq!(round.phase(), TurnPhase::Aiming);
        assert!(round.projectile.is_none());

        let fire_80 = InputState {
            fire: true,
            select: Some(Caliber::Mm80),
            ..Default::default()
        };
        round.update(&mut context, dt, &fire_80);
        assert_eq!(round.phase(), TurnPhase::Flying);
        assert_eq!(round.tanks[shooter].caliber, Caliber::Mm80);
        assert_eq!(round.tanks[shooter].ammunition.count(Caliber::Mm80), 9);

        for _ in 0..100_000 {
            round.update(&mut context, dt, &idle);
            if matches!(round.phase(), TurnPhase::EndOfTurn { .. }) {
                break;
            }
        }
        assert!(matches!(round.phase(), TurnPhase::EndOfTurn { .. }));

        // A human turn only ends on a key press, however long it takes
        for _ in 0..600 {
            round.update(&mut context, dt, &idle);
            assert!(matches!(round.phase(), TurnPhase::EndOfTurn { .. }));
        }
        let acknowledge = InputState { acknowledge: true, ..Default::default() };
        round.update(&mut context, dt, &acknowledge);
        assert_eq!(round.phase(), TurnPhase::AwaitingTurnOrder);
        assert!(round.tanks.iter().all(|t| t.is_alive()));
    }

    #[test]
    fn test_turn_order_skips_dead_and_empty_tanks() {
        let mut round = flat_round(&[50.0, 150.0, 250.0]);
        round.tanks[0].apply_damage(1000.0);
        round.tanks[1].ammunition = Ammunition::empty();
        for _ in 0..10 {
            assert_eq!(round.try_next_turn(), Some(2));
        }
    }

    #[test]
    fn test_exit_and_restart_are_checked_first() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        let exit = InputState { exit: true, ..Default::default() };
        assert_eq!(round.update(&mut context, 0.1, &exit), ControlSignal::Exit);
        assert_eq!(round.phase(), TurnPhase::AwaitingTurnOrder);
        let restart = InputState { restart: true, ..Default::default() };
        assert_eq!(round.update(&mut context, 0.1, &restart), ControlSignal::Restart);
    }

    #[test]
    fn test_suicide_scores_for_opponent() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        let at = round.tanks[0].position;
        strike(&mut round, 0, Caliber::Mm60, Impact::new(at, ImpactKind::Suicide(0)));

        round.update(&mut context, 0.1, &InputState::default());
        assert_eq!(round.phase(), TurnPhase::Settling);
        assert_eq!(context.players[0].points, 0);
        assert_eq!(context.players[1].points, SCORE_SUICIDE);
        assert_approx_eq!(round.tanks[0].life(), 70.0);
        assert_approx_eq!(round.tanks[1].life(), 100.0);
    }

    #[test]
    fn test_kill_is_credited_and_round_is_won() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        round.tanks[1].apply_damage(80.0);
        let at = round.tanks[1].position;
        strike(&mut round, 0, Caliber::Mm60, Impact::new(at, ImpactKind::Tank(1)));

        round.update(&mut context, 0.1, &InputState::default());
        assert!(!round.tanks[1].is_alive());
        assert_eq!(context.players[0].points, SCORE_TANK_HIT);
        assert_eq!(context.players[0].murders, 1);
        assert_eq!(context.players[0].money, STARTING_MONEY + KILL_REWARD);
        assert_eq!(context.players[1].deaths, 1);

        let mut signal = ControlSignal::Continue;
        for _ in 0..1_000 {
            signal = round.update(&mut context, 0.1, &InputState::default());
            if signal != ControlSignal::Continue {
                break;
            }
        }
        assert_eq!(signal, ControlSignal::RoundOver);
        let outcome = round.outcome().expect("outcome");
        assert_eq!(outcome.winner, Some(0));
        assert_eq!(outcome.reason, RoundEnd::LastTankStanding);
        // Death is only counted once across both tally points
        assert_eq!(context.players[1].deaths, 1);
        assert_eq!(context.players[0].murders, 1);
    }

    #[test]
    fn test_terrain_impact_damages_and_erodes() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        let target = round.tanks[1].position;
        let at = Point::new(target.x, target.y + 20.0);
        let before = round.terrain.height_at(at.x);
        strike(&mut round, 0, Caliber::Mm105, Impact::new(at, ImpactKind::Terrain));

        round.update(&mut context, 0.1, &InputState::default());
        let expected = 100.0 - radial_damage(50.0, 30.0, 20.0);
        assert_approx_eq!(round.tanks[1].life(), expected);
        assert_approx_eq!(round.tanks[0].life(), 100.0);
        assert!(round.terrain.height_at(at.x) < before);
        assert!(round.terrain.check_invariants());
        assert_eq!(context.players[0].points, SCORE_CLOSE);
    }

    #[test]
    fn test_tank_falls_into_crater_and_snaps() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        let at = Point::new(300.0, round.terrain.surface_y(300.0) + 5.0);
        strike(&mut round, 0, Caliber::Mm105, Impact::new(at, ImpactKind::Terrain));
        round.update(&mut context, 0.1, &InputState::default());

        for _ in 0..1_000 {
            round.update(&mut context, 0.05, &InputState::default());
            if matches!(round.phase(), TurnPhase::EndOfTurn { .. }) {
                break;
            }
        }
        assert!(matches!(round.phase(), TurnPhase::EndOfTurn { .. }));
        let tank = &round.tanks[1];
        assert_approx_eq!(tank.position.y, tank.ground_y(&round.terrain));
        assert!(round.terrain.height_at(300.0) < 200.0);
    }

    #[test]
    fn test_border_impact_skips_explosion() {
        let mut round = flat_round(&[100.0, 300.0]);
        let mut context = bots_context(2);
        round.current = Some(0);
        let mut projectile = launch(round.tanks[0].position, 0.0, 10.0, Caliber::Mm60, 0);
        projectile.position = Point::new(round.terrain.map_width() - 0.5, 10.0);
        projectile.velocity = Point::new(400.0, 0.0);
        round.projectile = Some(projectile);
        round.phase = TurnPhase::Flying;

        round.update(&mut context, 0.1, &InputState::default());
        assert_eq!(round.phase(), TurnPhase::Destroying);
        round.update(&mut context, 0.1, &InputState::default());
        assert_eq!(round.phase(), TurnPhase::Settling);
        assert!(round.tanks.iter().all(|t| t.life() == 100.0));
        assert!(round.terrain.check_invariants());
    }

    #[test]
    fn test_new_round_places_tanks_on_ground() {
        let context = MatchContext::new(MatchConfig {
            players: 4,
            bots: 2,
            seed: 21,
            ..Default::default()
        })
        .expect("valid config");
        let round = Round::new(1, &context);
        assert_eq!(round.tanks().len(), 4);
        for tank in round.tanks() {
            assert!(tank.position.x >= TANK_RADIUS);
            assert!(tank.position.x <= round.terrain().map_width() - TANK_RADIUS);
            assert_approx_eq!(tank.position.y, tank.ground_y(round.terrain()));
        }
        assert_eq!(round.controllers.iter().filter(|c| c.is_bot()).count(), 2);
        assert!(round.frame().explosion.is_none());
    }

    #[test]
    fn test_bot_round_terminates() {
        let context_config = MatchConfig {
            players: 2,
            bots: 2,
            seed: 3,
            ..Default::default()
        };
        let mut context = MatchContext::new(context_config).expect("valid config");
        let mut round = Round::new(1, &context);
        let mut signal = ControlSignal::Continue;
        for _ in 0..2_000_000 {
            signal = round.update(&mut context, 1.0 / 60.0, &InputState::default());
            if signal != ControlSignal::Continue {
                break;
            }
        }
        assert_eq!(signal, ControlSignal::RoundOver);
        assert!(round.outcome().is_some());
        assert!(round.terrain().check_invariants());
    }
}
