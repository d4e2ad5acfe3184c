use serde::{Deserialize, Serialize};
use std::fmt;

/// Palette and item-weighting key for a generated field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Verdant,
    Ember,
    Tidal,
    Frost,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Verdant, Theme::Ember, Theme::Tidal, Theme::Frost];

    pub fn key(self) -> &'static str {
        match self {
            Theme::Verdant => "verdant",
            Theme::Ember => "ember",
            Theme::Tidal => "tidal",
            Theme::Frost => "frost",
        }
    }

    pub fn from_key(key: &str) -> Option<Theme> {
        let key = key.trim();
        Theme::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(key))
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Theme::Verdant => "Verdant",
            Theme::Ember => "Ember",
            Theme::Tidal => "Tidal",
            Theme::Frost => "Frost",
        }
    }

    /// The item kind drawn at triple weight in this theme.
    pub fn matching_item(self) -> ItemKind {
        match self {
            Theme::Verdant => ItemKind::Herb,
            Theme::Ember => ItemKind::Ore,
            Theme::Tidal => ItemKind::Shell,
            Theme::Frost => ItemKind::Crystal,
        }
    }

    pub(crate) fn ground_base(self) -> Color {
        match self {
            Theme::Verdant => Color::new(0.30, 0.55, 0.25),
            Theme::Ember => Color::new(0.55, 0.30, 0.18),
            Theme::Tidal => Color::new(0.76, 0.70, 0.50),
            Theme::Frost => Color::new(0.82, 0.88, 0.92),
        }
    }

    pub(crate) fn accent(self) -> Color {
        match self {
            Theme::Verdant => Color::new(0.20, 0.40, 0.15),
            Theme::Ember => Color::new(0.60, 0.20, 0.10),
            Theme::Tidal => Color::new(0.20, 0.45, 0.60),
            Theme::Frost => Color::new(0.60, 0.75, 0.90),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Collectible kinds placed in fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Herb,
    Ore,
    Shell,
    Crystal,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [ItemKind::Herb, ItemKind::Ore, ItemKind::Shell, ItemKind::Crystal];

    pub fn key(self) -> &'static str {
        match self {
            ItemKind::Herb => "herb",
            ItemKind::Ore => "ore",
            ItemKind::Shell => "shell",
            ItemKind::Crystal => "crystal",
        }
    }
}

/// Static scenery kinds. Placement depends only on the seed, never on the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Rock,
    Tree,
    Bush,
    Pillar,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 4] = [
        ObstacleKind::Rock,
        ObstacleKind::Tree,
        ObstacleKind::Bush,
        ObstacleKind::Pillar,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ObstacleKind::Rock => "rock",
            ObstacleKind::Tree => "tree",
            ObstacleKind::Bush => "bush",
            ObstacleKind::Pillar => "pillar",
        }
    }

    pub(crate) fn base_color(self) -> Color {
        match self {
            ObstacleKind::Rock => Color::new(0.50, 0.50, 0.50),
            ObstacleKind::Tree => Color::new(0.35, 0.25, 0.15),
            ObstacleKind::Bush => Color::new(0.25, 0.45, 0.20),
            ObstacleKind::Pillar => Color::new(0.70, 0.68, 0.62),
        }
    }
}

/// Linear RGB, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn blend(self, other: Color, t: f32) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub(crate) fn offset(self, dr: f32, dg: f32, db: f32) -> Color {
        Color::new(
            (self.r + dr).clamp(0.0, 1.0),
            (self.g + dg).clamp(0.0, 1.0),
            (self.b + db).clamp(0.0, 1.0),
        )
    }
}
