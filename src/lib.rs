//! # Waygate - session travel for peer-hosted towns and fields
//!
//! Waygate moves a player between multiplayer sessions. Each session carries
//! either a **town** (persistent, owned by one player) or a **field**
//! (generated from a seed, ephemeral). The [`travel::MapTravelCoordinator`]
//! decides whether to host or join, keeps abandoned fields restorable, and
//! re-hosts the player's own town when they walk back into it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waygate::config::Config;
//! use waygate::session::LoopbackNetwork;
//! use waygate::travel::{TravelHandle, TravelService, TravelSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let network = LoopbackNetwork::default();
//!     let (service, _notices) =
//!         TravelService::loopback(&network, TravelSettings::from_config(&config));
//!     let (handle, commands) = TravelHandle::channel();
//!     tokio::spawn(service.run(commands));
//!     handle.host_town().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`travel`] - coordinator state machine, async service and notices
//! - [`field`] - seeded field generation and the field state cache
//! - [`session`] - directory/transport contracts and loopback implementations
//! - [`inventory`] - slot inventory that field items are picked up into
//! - [`config`] - TOML configuration
//! - [`metrics`] - process-wide travel counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TravelService  │ ← select! loop, commands in / notices out
//! └─────────────────┘
//!          │
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Coordinator    │ ──► │ FieldStateCache │
//! └─────────────────┘     │ FieldGenerator  │
//!          │              └─────────────────┘
//! ┌─────────────────┐
//! │ Directory +     │ ← lobby service and relay
//! │ Transport       │
//! └─────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod field;
pub mod inventory;
pub mod logutil;
pub mod metrics;
pub mod session;
pub mod travel;

pub use errors::TravelError;
