//! Seed-deterministic field content.
//!
//! Every category reseeds its own stream from `seed + offset`, so the output of one
//! category never depends on which others were generated first, or in what order.
//! Two processes with the same `(seed, theme)` build identical fields.

use crc::{Crc, CRC_32_ISO_HDLC};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::state::{ItemPlacement, PortalConfig, Position};
use super::theme::{Color, ItemKind, ObstacleKind, Theme};

/// Fields span `-FIELD_HALF_EXTENT..FIELD_HALF_EXTENT` on both axes.
pub const FIELD_HALF_EXTENT: f32 = 40.0;
/// Obstacles never land this close to the center, where players spawn.
pub const CENTER_CLEAR_RADIUS: f32 = 8.0;
pub const MIN_OBSTACLE_SPACING: f32 = 6.0;
pub const ITEM_OBSTACLE_CLEARANCE: f32 = 2.5;
pub const MAX_PLACEMENT_ATTEMPTS: usize = 20;
pub const SPAWN_POINT_COUNT: usize = 4;

const ITEM_SEED_OFFSET: u64 = 1000;
const SPAWN_SEED_OFFSET: u64 = 2000;
const PORTAL_SEED_OFFSET: u64 = 3000;
const GROUND_SEED_OFFSET: u64 = 4000;
const OBSTACLE_COLOR_SEED_OFFSET: u64 = 5000;

const MATCHING_ITEM_WEIGHT: usize = 3;

const KIND_HASH: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Position,
    pub scale: f32,
}

/// All generated content for one field, for inspection and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub seed: u64,
    pub theme: Theme,
    pub ground_color: Color,
    pub obstacles: Vec<Obstacle>,
    pub items: Vec<ItemPlacement>,
    pub spawn_points: Vec<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGenerator {
    seed: u64,
    theme: Theme,
}

impl FieldGenerator {
    pub fn new(seed: u64, theme: Theme) -> Self {
        Self { seed, theme }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    fn stream(&self, offset: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(offset))
    }

    /// Obstacle count in `4..=10`; a slot that finds no valid point after
    /// [`MAX_PLACEMENT_ATTEMPTS`] tries is skipped.
    pub fn generate_obstacles(&self) -> Vec<Obstacle> {
        let mut rng = self.stream(0);
        let count = rng.gen_range(4..=10);
        let mut placed: Vec<Obstacle> = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = ObstacleKind::ALL[rng.gen_range(0..ObstacleKind::ALL.len())];
            let scale = rng.gen_range(0.8f32..1.6);
            let spot = (0..MAX_PLACEMENT_ATTEMPTS).find_map(|_| {
                let candidate = random_point(&mut rng);
                let clear_of_center = candidate.length() >= CENTER_CLEAR_RADIUS;
                let spaced = placed
                    .iter()
                    .all(|o| o.position.distance_to(candidate) >= MIN_OBSTACLE_SPACING);
                (clear_of_center && spaced).then_some(candidate)
            });
            if let Some(position) = spot {
                placed.push(Obstacle {
                    kind,
                    position,
                    scale,
                });
            }
        }
        placed
    }

    /// Item count in `5..=12`. Kinds come from a pool holding the theme's matching
    /// kind three times and every other kind once.
    pub fn generate_items(&self) -> Vec<ItemPlacement> {
        let obstacles = self.generate_obstacles();
        let pool = self.item_pool();
        let mut rng = self.stream(ITEM_SEED_OFFSET);
        let count = rng.gen_range(5..=12);
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let item_id = pool[rng.gen_range(0..pool.len())];
            let quantity = rng.gen_range(1..=3);
            let spot = (0..MAX_PLACEMENT_ATTEMPTS).find_map(|_| {
                let candidate = random_point(&mut rng);
                obstacles
                    .iter()
                    .all(|o| o.position.distance_to(candidate) >= ITEM_OBSTACLE_CLEARANCE)
                    .then_some(candidate)
            });
            if let Some(position) = spot {
                items.push(ItemPlacement {
                    item_id,
                    position,
                    quantity,
                });
            }
        }
        items
    }

    /// Spawn points on a ring inside the cleared center.
    pub fn generate_spawn_points(&self) -> Vec<Position> {
        let mut rng = self.stream(SPAWN_SEED_OFFSET);
        let start = rng.gen_range(0.0f32..TAU);
        (0..SPAWN_POINT_COUNT)
            .map(|i| {
                let angle = start + TAU * i as f32 / SPAWN_POINT_COUNT as f32;
                let radius = rng.gen_range(2.0f32..CENTER_CLEAR_RADIUS - 1.0);
                Position::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    /// Unlinked exit portals, pre-configured so the fields behind them are
    /// reproducible from this field's seed.
    pub fn generate_exit_portals(&self, first_index: usize, count: usize) -> Vec<PortalConfig> {
        let mut rng = self.stream(PORTAL_SEED_OFFSET);
        (0..count)
            .map(|i| {
                let seed = rng.gen_range(1..=u64::MAX);
                let theme = if rng.gen_bool(0.5) {
                    self.theme
                } else {
                    Theme::ALL[rng.gen_range(0..Theme::ALL.len())]
                };
                PortalConfig::unlinked(first_index + i, seed, theme)
            })
            .collect()
    }

    pub fn ground_color(&self) -> Color {
        let mut rng = self.stream(GROUND_SEED_OFFSET);
        self.theme.ground_base().offset(
            rng.gen_range(-0.04f32..0.04),
            rng.gen_range(-0.04f32..0.04),
            rng.gen_range(-0.04f32..0.04),
        )
    }

    pub fn obstacle_color(&self, kind: ObstacleKind) -> Color {
        let kind_hash = u64::from(KIND_HASH.checksum(kind.key().as_bytes()));
        let mut rng = self.stream(OBSTACLE_COLOR_SEED_OFFSET.wrapping_add(kind_hash));
        kind.base_color().blend(self.theme.accent(), 0.25).offset(
            rng.gen_range(-0.05f32..0.05),
            rng.gen_range(-0.05f32..0.05),
            rng.gen_range(-0.05f32..0.05),
        )
    }

    pub fn generate(&self) -> FieldLayout {
        FieldLayout {
            seed: self.seed,
            theme: self.theme,
            ground_color: self.ground_color(),
            obstacles: self.generate_obstacles(),
            items: self.generate_items(),
            spawn_points: self.generate_spawn_points(),
        }
    }

    fn item_pool(&self) -> Vec<ItemKind> {
        let matching = self.theme.matching_item();
        ItemKind::ALL
            .iter()
            .flat_map(|kind| {
                let weight = if *kind == matching {
                    MATCHING_ITEM_WEIGHT
                } else {
                    1
                };
                std::iter::repeat(*kind).take(weight)
            })
            .collect()
    }
}

fn random_point(rng: &mut StdRng) -> Position {
    Position::new(
        rng.gen_range(-FIELD_HALF_EXTENT..FIELD_HALF_EXTENT),
        rng.gen_range(-FIELD_HALF_EXTENT..FIELD_HALF_EXTENT),
    )
}
