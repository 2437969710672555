//! Shared value types: points, calibers, ammunition and impacts.

use std::collections::HashMap;
use std::fmt;

/// A point in map coordinates. `y` grows downward, as on screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

/// Plain RGB colour handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Caliber {
    Mm60,
    Mm80,
    Mm105,
}

/// Gameplay numbers for one caliber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaliberProfile {
    pub damage: f64,
    pub blast_radius: f64,
    /// Snap-to-hit tolerance around a tank centre.
    pub inner_hit_radius: f64,
    pub muzzle_length: f64,
    pub price: i64,
    pub starting_stock: u32,
}

const MM60: CaliberProfile = CaliberProfile {
    damage: 30.0,
    blast_radius: 10.0,
    inner_hit_radius: 10.0,
    muzzle_length: 10.0,
    price: 1000,
    starting_stock: 3,
};

const MM80: CaliberProfile = CaliberProfile {
    damage: 40.0,
    blast_radius: 20.0,
    inner_hit_radius: 20.0,
    muzzle_length: 20.0,
    price: 2500,
    starting_stock: 10,
};

const MM105: CaliberProfile = CaliberProfile {
    damage: 50.0,
    blast_radius: 30.0,
    inner_hit_radius: 30.0,
    muzzle_length: 30.0,
    price: 4000,
    starting_stock: 3,
};

impl Caliber {
    pub const ALL: [Caliber; 3] = [Caliber::Mm60, Caliber::Mm80, Caliber::Mm105];

    pub fn profile(self) -> &'static CaliberProfile {
        match self {
            Caliber::Mm60 => &MM60,
            Caliber::Mm80 => &MM80,
            Caliber::Mm105 => &MM105,
        }
    }
}

impl fmt::Display for Caliber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caliber::Mm60 => write!(f, "60mm"),
            Caliber::Mm80 => write!(f, "80mm"),
            Caliber::Mm105 => write!(f, "105mm"),
        }
    }
}

/// Rounds in stock per caliber.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ammunition {
    counts: HashMap<Caliber, u32>,
}

impl Ammunition {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock every player starts a match with.
    pub fn starting() -> Self {
        let mut ammo = Self::empty();
        for caliber in Caliber::ALL {
            ammo.add(caliber, caliber.profile().starting_stock);
        }
        ammo
    }

    pub fn count(&self, caliber: Caliber) -> u32 {
        self.counts.get(&caliber).copied().unwrap_or(0)
    }

    pub fn add(&mut self, caliber: Caliber, amount: u32) {
        *self.counts.entry(caliber).or_insert(0) += amount;
    }

    pub fn set(&mut self, caliber: Caliber, amount: u32) {
        self.counts.insert(caliber, amount);
    }

    /// Removes one round. Returns false (and changes nothing) if none are left.
    pub fn take(&mut self, caliber: Caliber) -> bool {
        match self.counts.get_mut(&caliber) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactKind {
    Terrain,
    Border,
    /// Another tank was hit; carries its index.
    Tank(usize),
    /// The shooter hit its own tank; carries its index.
    Suicide(usize),
}

/// The single terminal event of a projectile flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub position: Point,
    pub kind: ImpactKind,
}

impl Impact {
    pub fn new(position: Point, kind: ImpactKind) -> Self {
        Impact { position, kind }
    }

    /// Index of the tank that was struck directly, if any.
    pub fn struck_tank(&self) -> Option<usize> {
        match self.kind {
            ImpactKind::Tank(i) | ImpactKind::Suicide(i) => Some(i),
            _ => None,
        }
    }
}
