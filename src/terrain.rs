//! Layered heightmap terrain: procedural generation, collision queries,
//! erosion by explosions and gravity-driven settling of undercut slabs.

use crate::config::SEA_LEVEL;
use crate::debug_terrain;
use crate::types::Point;
use rand::prelude::*;
use rand::rngs::StdRng;

/// A slab of terrain left hanging by an erosion, falling back onto its column.
#[derive(Debug, Clone, PartialEq)]
pub struct FallingChunk {
    /// Height of the slab's underside, measured from the map floor.
    pub bottom: f64,
    pub thickness: f64,
    /// Thickness contributed by each colour band, bottom-to-top.
    pub layers: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Terrain {
    map_height: u32,
    line_width: u32,
    surface: Vec<f64>,
    layers: Vec<Vec<f64>>,
    falling: Vec<Option<FallingChunk>>,
    settling: bool,
    fall_speed: f64,
}

impl Terrain {
    /// Generates a terrain of `width / line_width` columns with the given number
    /// of mountains and valleys. A seed makes the result reproducible.
    pub fn generate(
        width: u32,
        height: u32,
        line_width: u32,
        mountains: u32,
        valleys: u32,
        layer_count: usize,
        seed: Option<u64>,
    ) -> Self {
        let line_width = line_width.max(1);
        let columns = ((width / line_width) as usize).max(1);
        let mut heights = vec![SEA_LEVEL; columns];

        match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                deform(&mut heights, height, mountains, valleys, &mut rng);
            }
            None => deform(&mut heights, height, mountains, valleys, &mut thread_rng()),
        }

        log::info!(
            "Generated terrain: {} columns, {} mountains, {} valleys, seed {:?}",
            columns,
            mountains,
            valleys,
            seed
        );
        Self::from_heights(heights, height, line_width, layer_count)
    }

    /// Builds a terrain from explicit column heights, split evenly into bands.
    pub fn from_heights(heights: Vec<f64>, map_height: u32, line_width: u32, layer_count: usize) -> Self {
        let layer_count = layer_count.max(1);
        let heights = if heights.is_empty() { vec![0.0] } else { heights };
        let layers = heights
            .iter()
            .map(|h| vec![h.max(0.0) / layer_count as f64; layer_count])
            .collect();
        let falling = vec![None; heights.len()];
        let surface = heights.into_iter().map(|h| h.max(0.0)).collect();
        Terrain {
            map_height,
            line_width: line_width.max(1),
            surface,
            layers,
            falling,
            settling: false,
            fall_speed: 0.0,
        }
    }

    pub fn columns(&self) -> usize {
        self.surface.len()
    }

    pub fn map_height(&self) -> f64 {
        self.map_height as f64
    }

    pub fn map_width(&self) -> f64 {
        (self.columns() as u32 * self.line_width) as f64
    }

    pub fn line_width(&self) -> u32 {
        self.line_width
    }

    pub fn layer_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn surface_heights(&self) -> &[f64] {
        &self.surface
    }

    pub fn layers(&self, column: usize) -> &[f64] {
        &self.layers[column.min(self.columns() - 1)]
    }

    pub fn falling_chunk(&self, column: usize) -> Option<&FallingChunk> {
        self.falling.get(column).and_then(Option::as_ref)
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Column holding `x`, clamped to the valid range.
    pub fn column_index(&self, x: f64) -> usize {
        let index = (x / self.line_width as f64).floor().max(0.0) as usize;
        index.min(self.columns() - 1)
    }

    /// Left edge of a column in map coordinates.
    pub fn column_x(&self, column: usize) -> f64 {
        (column as u32 * self.line_width) as f64
    }

    pub fn column_center(&self, column: usize) -> f64 {
        self.column_x(column) + self.line_width as f64 / 2.0
    }

    pub fn height_at(&self, x: f64) -> f64 {
        self.surface[self.column_index(x)]
    }

    /// Screen-space y of the surface at `x`.
    pub fn surface_y(&self, x: f64) -> f64 {
        self.map_height() - self.height_at(x)
    }

    /// True when the point lies inside the ground.
    pub fn collides(&self, point: Point) -> bool {
        point.y > self.surface_y(point.x)
    }

    /// Carves a circular crater centred at (`center_x`, `center_y_from_top`).
    /// Material left above the crater in a column starts falling.
    pub fn erode(&mut self, center_x: f64, center_y_from_top: f64, radius: f64) {
        if !(radius > 0.0) || !center_x.is_finite() || !center_y_from_top.is_finite() {
            return;
        }
        let center_from_ground = self.map_height() - center_y_from_top;
        let first = self.column_index(center_x - radius);
        let last = self.column_index(center_x + radius);

        debug_terrain!(
            "Eroding columns {}..={} around ({:.1}, {:.1}) r={:.1}",
            first,
            last,
            center_x,
            center_y_from_top,
            radius
        );

        for column in first..=last {
            let dx = self.column_center(column) - center_x;
            let half_chord = (radius * radius - dx * dx).max(0.0).sqrt();
            if half_chord <= 0.0 {
                continue;
            }
            self.carve_column(column, center_from_ground - half_chord, center_from_ground + half_chord);
        }
    }

    /// Removes the window [low, high] (heights from the floor) from one column.
    fn carve_column(&mut self, column: usize, low: f64, high: f64) {
        if self.falling[column].is_some() {
            self.land_chunk(column);
        }

        let top = self.surface[column];
        let low = low.max(0.0);
        if low >= top || high <= low {
            return;
        }

        let undercut = high < top;
        let mut chunk_layers = vec![0.0; self.layer_count()];
        let mut base = 0.0;
        for (j, thickness) in self.layers[column].iter_mut().enumerate() {
            let layer_bottom = base;
            let layer_top = base + *thickness;
            base = layer_top;

            let overlap = (layer_top.min(high) - layer_bottom.max(low)).max(0.0);
            let above = if undercut {
                (layer_top - layer_bottom.max(high)).max(0.0)
            } else {
                0.0
            };
            *thickness -= overlap + above;
            chunk_layers[j] = above;
        }
        normalize_layers(&mut self.layers[column]);
        self.surface[column] = self.layers[column].iter().sum();

        let thickness: f64 = chunk_layers.iter().sum();
        if thickness > 0.0 {
            self.falling[column] = Some(FallingChunk {
                bottom: high,
                thickness,
                layers: chunk_layers,
            });
            self.settling = true;
            self.fall_speed = 0.0;
        }
    }

    /// Drops the chunk of `column` onto the surface right away.
    fn land_chunk(&mut self, column: usize) {
        if let Some(chunk) = self.falling[column].take() {
            for (layer, extra) in self.layers[column].iter_mut().zip(&chunk.layers) {
                *layer += extra;
            }
            normalize_layers(&mut self.layers[column]);
            self.surface[column] = self.layers[column].iter().sum();
        }
    }

    /// Advances falling chunks by one step; chunks that reach the surface merge back.
    pub fn settle(&mut self, dt: f64, gravity: f64) {
        if !self.settling {
            return;
        }
        self.fall_speed += gravity * dt;
        let step = self.fall_speed * dt;

        let mut still_falling = false;
        for column in 0..self.columns() {
            let landed = match &mut self.falling[column] {
                Some(chunk) => {
                    chunk.bottom -= step;
                    chunk.bottom <= self.surface[column]
                }
                None => continue,
            };
            if landed {
                self.land_chunk(column);
            } else {
                still_falling = true;
            }
        }

        if !still_falling {
            debug_terrain!("Terrain settled");
            self.fall_speed = 0.0;
        }
        self.settling = still_falling;
    }

    /// Checks that every column's surface equals the sum of its non-negative layers.
    pub fn check_invariants(&self) -> bool {
        self.surface.iter().zip(&self.layers).all(|(surface, layers)| {
            let sum: f64 = layers.iter().sum();
            layers.iter().all(|t| *t >= 0.0) && (surface - sum).abs() < 1e-6
        })
    }
}

/// Zero-clamps negative layers, carrying the deficit to the band above.
fn normalize_layers(layers: &mut [f64]) {
    let mut deficit = 0.0;
    for thickness in layers.iter_mut() {
        *thickness -= deficit;
        deficit = 0.0;
        if *thickness < 0.0 {
            deficit = -*thickness;
            *thickness = 0.0;
        }
    }
}

fn deform<R: Rng + ?Sized>(heights: &mut [f64], map_height: u32, mountains: u32, valleys: u32, rng: &mut R) {
    let deformations = (mountains + valleys) as usize;
    if deformations == 0 || heights.is_empty() {
        return;
    }
    let columns = heights.len();
    let segment = columns / deformations;
    let jitter = (segment / 3) as i64;
    let last = columns as i64 - 1;

    let mut order: Vec<usize> = (0..deformations).collect();
    order.shuffle(rng);
    let valley_segments = &order[..valleys as usize];

    let map_height = map_height as f64;
    for i in 0..deformations {
        let segment_start = (i * segment) as i64;
        let segment_end = segment_start + segment as i64;
        let start = (segment_start + rng.gen_range(-jitter..=jitter)).clamp(0, last) as usize;
        let end = (segment_end + rng.gen_range(-jitter..=jitter)).clamp(0, last) as usize;

        if valley_segments.contains(&i) {
            let quarter = map_height / 4.0;
            let depth = rng.gen_range(quarter / 4.0..=quarter / 2.0);
            imprint(heights, start, end, -depth);
        } else {
            let max_height = ((map_height - SEA_LEVEL) / 2.0).max(0.0);
            let height = rng.gen_range(max_height / 4.0..=max_height);
            imprint(heights, start, end, height);
        }
    }

    for h in heights.iter_mut() {
        *h = h.clamp(0.0, map_height);
    }
}

/// Adds a symmetric parabolic bump (or dip, for negative amplitude) over [start, end).
fn imprint(heights: &mut [f64], start: usize, end: usize, amplitude: f64) {
    if end <= start {
        return;
    }
    let mid = (start + end) / 2;
    let half_span = mid as f64 - start as f64 - 1.0;
    if half_span <= 0.0 {
        return;
    }
    let multiplier = amplitude / (half_span * half_span);

    for (k, h) in heights.iter_mut().enumerate().take(mid).skip(start) {
        *h += ((k - start) as f64).powi(2) * multiplier;
    }
    for (k, h) in heights.iter_mut().enumerate().take(end).skip(mid) {
        *h += ((end - k) as f64).powi(2) * multiplier;
    }
}
