//! # Configuration
//!
//! TOML configuration for a waygate player process.
//!
//! ## Sections
//!
//! - [`PlayerConfig`] - who this process is and what its town is called
//! - [`SessionConfig`] - lobby parameters passed to the directory
//! - [`FieldConfig`] - portal counts and the default field theme
//! - [`InventoryConfig`] - slot layout for picked-up items
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waygate::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Town: {}", config.player.town_name);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//!
//! ```toml
//! [player]
//! identity = 1
//! display_name = "Wanderer"
//! town_name = "Hearthstead"
//!
//! [session]
//! capacity = 4
//!
//! [field]
//! default_theme = "verdant"
//! town_portal_count = 4
//! field_portal_count = 3
//!
//! [inventory]
//! slot_count = 20
//! max_stack = 99
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Missing sections fall back to their defaults. `load` validates before returning.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::field::Theme;
use crate::inventory::Inventory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Identity reported to the directory and transport. Must be non-zero.
    pub identity: u64,
    pub display_name: String,
    pub town_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            identity: 1,
            display_name: "Wanderer".to_string(),
            town_name: "Hearthstead".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum members per lobby created by this process.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

fn default_capacity() -> u32 {
    4
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Theme key used when no theme is given explicitly.
    #[serde(default = "default_theme_key")]
    pub default_theme: String,
    #[serde(default = "default_town_portal_count")]
    pub town_portal_count: usize,
    /// Includes the return portal at index 0.
    #[serde(default = "default_field_portal_count")]
    pub field_portal_count: usize,
}

fn default_theme_key() -> String {
    Theme::default().key().to_string()
}
fn default_town_portal_count() -> usize {
    4
}
fn default_field_portal_count() -> usize {
    3
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            default_theme: default_theme_key(),
            town_portal_count: default_town_portal_count(),
            field_portal_count: default_field_portal_count(),
        }
    }
}

impl FieldConfig {
    /// Parsed `default_theme`; unknown keys fall back to the default theme.
    pub fn theme(&self) -> Theme {
        Theme::from_key(&self.default_theme).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub slot_count: usize,
    pub max_stack: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            slot_count: 20,
            max_stack: 99,
        }
    }
}

impl InventoryConfig {
    pub fn build(&self) -> Inventory {
        Inventory::new(self.slot_count, self.max_stack)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;
        let config = Self::from_toml(&content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.player.identity == 0 {
            return Err(anyhow!("player.identity must be non-zero"));
        }
        if self.session.capacity == 0 {
            return Err(anyhow!("session.capacity must be at least 1"));
        }
        if self.field.field_portal_count == 0 {
            return Err(anyhow!(
                "field.field_portal_count must be at least 1 (the return portal)"
            ));
        }
        if Theme::from_key(&self.field.default_theme).is_none() {
            return Err(anyhow!(
                "field.default_theme '{}' is not one of: {}",
                self.field.default_theme,
                Theme::ALL
                    .iter()
                    .map(|t| t.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if self.inventory.slot_count == 0 {
            return Err(anyhow!("inventory.slot_count must be at least 1"));
        }
        if self.inventory.max_stack == 0 {
            return Err(anyhow!("inventory.max_stack must be at least 1"));
        }
        Ok(())
    }
}
