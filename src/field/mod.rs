//! Ephemeral field maps: seeded generation and the cache that keeps abandoned
//! fields restorable.

pub mod cache;
pub mod generator;
pub mod state;
pub mod theme;

pub use cache::{CacheStats, FieldStateCache};
pub use generator::{FieldGenerator, FieldLayout, Obstacle};
pub use state::{FieldParams, FieldState, ItemPlacement, PortalConfig, Position};
pub use theme::{Color, ItemKind, ObstacleKind, Theme};
