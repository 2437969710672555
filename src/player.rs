//! Match-long participant state: score, money, kill record and ammunition stock.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::{
    KILL_REWARD, MAX_BOT_PURCHASES, ROUND_ALLOWANCE, SCORE_CLOSE, SCORE_NEAR, SCORE_NEAR_MARGIN, SCORE_SUICIDE,
    SCORE_TANK_HIT, STARTING_MONEY, SUICIDE_PENALTY, TANK_RADIUS,
};
use crate::error::ShopError;
use crate::types::{Ammunition, Caliber, Impact, ImpactKind, Point, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Human,
    Bot,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: usize,
    pub name: String,
    pub color: Rgb,
    pub kind: PlayerKind,
    pub points: i64,
    pub money: i64,
    pub murders: u32,
    pub deaths: u32,
    /// Stock carried between rounds; loaded into the tank at round start.
    pub ammunition: Ammunition,
}

impl Player {
    pub fn new(id: usize, name: impl Into<String>, color: Rgb, kind: PlayerKind) -> Self {
        Player {
            id,
            name: name.into(),
            color,
            kind,
            points: 0,
            money: STARTING_MONEY,
            murders: 0,
            deaths: 0,
            ammunition: Ammunition::starting(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.kind == PlayerKind::Bot
    }

    /// Scores one of this player's shots. Terrain hits are rated by how close
    /// they landed to `target`; a wide miss costs a third of the current points.
    pub fn score(&mut self, impact: &Impact, target: Point) {
        match impact.kind {
            ImpactKind::Terrain => {
                let distance = impact.position.distance(&target);
                if distance <= 2.0 * TANK_RADIUS {
                    self.points += SCORE_CLOSE;
                } else if distance <= TANK_RADIUS + SCORE_NEAR_MARGIN {
                    self.points += SCORE_NEAR;
                } else {
                    self.points -= self.points.div_euclid(3);
                }
            }
            ImpactKind::Tank(_) => self.points += SCORE_TANK_HIT,
            ImpactKind::Suicide(_) => self.points += SCORE_SUICIDE,
            ImpactKind::Border => {}
        }
    }

    pub fn grant_round_allowance(&mut self) {
        self.money += ROUND_ALLOWANCE;
    }

    pub fn buy(&mut self, caliber: Caliber) -> Result<(), ShopError> {
        let price = caliber.profile().price;
        if self.money < price {
            return Err(ShopError::InsufficientFunds {
                caliber,
                price,
                money: self.money,
            });
        }
        self.money -= price;
        self.ammunition.add(caliber, 1);
        Ok(())
    }

    /// Bot shopping: buys random calibers until the cheapest one is out of reach.
    pub fn auto_shop<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u32 {
        let cheapest = Caliber::ALL
            .iter()
            .map(|c| c.profile().price)
            .min()
            .unwrap_or(i64::MAX);
        let mut bought = 0;
        while self.money >= cheapest && bought < MAX_BOT_PURCHASES {
            let Some(&caliber) = Caliber::ALL.choose(rng) else {
                break;
            };
            if self.buy(caliber).is_ok() {
                bought += 1;
            }
        }
        log::debug!(target: "bot", "{} bought {} shells, {} money left", self.name, bought, self.money);
        bought
    }

    /// Credit for destroying an opponent's tank.
    pub fn record_kill(&mut self) {
        self.murders += 1;
        self.money += KILL_REWARD;
    }

    pub fn record_death(&mut self) {
        self.deaths += 1;
    }

    /// Cost of destroying one's own tank. Money never drops below zero.
    pub fn pay_suicide_penalty(&mut self) {
        self.money = (self.money - SUICIDE_PENALTY).max(0);
    }

    /// Back to a fresh match state, keeping identity and colour.
    pub fn reset(&mut self) {
        self.points = 0;
        self.money = STARTING_MONEY;
        self.murders = 0;
        self.deaths = 0;
        self.ammunition = Ammunition::starting();
    }
}

/// `count` distinct colours: each channel walks an evenly spaced ramp, and the
/// ramps are shuffled independently so neighbours do not look alike.
pub fn generate_colors<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Rgb> {
    if count == 0 {
        return Vec::new();
    }
    let step = 200 / count.max(1);
    let ramp: Vec<u8> = (0..count).map(|i| (55 + i * step).min(255) as u8).collect();

    let mut reds = ramp.clone();
    let mut greens = ramp.clone();
    let mut blues = ramp;
    reds.shuffle(rng);
    greens.shuffle(rng);
    blues.shuffle(rng);

    reds.into_iter()
        .zip(greens)
        .zip(blues)
        .map(|((r, g), b)| Rgb::new(r, g, b))
        .collect()
}
