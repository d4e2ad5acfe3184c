//! # Travel
//!
//! Moving one player between towns and fields.
//!
//! - [`coordinator`] - the host/join state machine and portal resolution
//! - [`service`] - tokio actor wrapping the coordinator, plus its handle
//! - [`identity`] - the player's own town across re-hosts
//! - [`live`] - content of the map currently occupied
//! - [`notice`] - outcomes reported to the caller
//!
//! A town belongs to one player and is re-hosted under a fresh lobby whenever
//! that player comes back to it. Fields are generated from a seed, cached when
//! abandoned, and restored under a new lobby id that the cache remaps from the
//! old one.

pub mod coordinator;
pub mod identity;
pub mod live;
pub mod notice;
pub mod service;

pub use coordinator::{MapTravelCoordinator, TravelSettings, TravelState};
pub use identity::{default_town_portals, TownIdentity};
pub use live::{field_display_name, LiveMap, RETURN_PORTAL_INDEX};
pub use notice::{LobbySummary, TravelNotice};
pub use service::{TravelCommand, TravelHandle, TravelService, TravelSnapshot};
