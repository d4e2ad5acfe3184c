//! Typed view over the string key/value metadata a lobby carries.
//!
//! The directory only ever sees strings. Everything above this module works with
//! [`SessionMetadata`], so parsing and formatting stay in one place. Metadata is
//! readable by every directory participant and must never carry secrets.

use log::warn;

use super::types::{MapType, PeerId, SessionId};
use crate::field::{FieldParams, Theme};
use crate::logutil::escape_log;

pub const MAP_TYPE: &str = "mapType";
pub const DISPLAY_NAME: &str = "displayName";
pub const OWNER_IDENTITY: &str = "ownerIdentity";
pub const ORIGIN_SESSION_ID: &str = "originSessionId";
pub const ORIGIN_PORTAL_INDEX: &str = "originPortalIndex";
pub const ORIGIN_MAP_NAME: &str = "originMapName";
pub const GENERATION_SEED: &str = "generationSeed";
pub const THEME_KEY: &str = "themeKey";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionMetadata {
    Town {
        display_name: String,
        owner: Option<PeerId>,
    },
    Field {
        display_name: String,
        owner: Option<PeerId>,
        params: FieldParams,
    },
}

impl SessionMetadata {
    pub fn map_type(&self) -> MapType {
        match self {
            SessionMetadata::Town { .. } => MapType::Town,
            SessionMetadata::Field { .. } => MapType::Field,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SessionMetadata::Town { display_name, .. }
            | SessionMetadata::Field { display_name, .. } => display_name,
        }
    }

    pub fn owner(&self) -> Option<PeerId> {
        match self {
            SessionMetadata::Town { owner, .. } | SessionMetadata::Field { owner, .. } => *owner,
        }
    }

    /// Key/value pairs in the order they are written to the directory.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(8);
        if let Some(value) = self.map_type().metadata_value() {
            pairs.push((MAP_TYPE, value.to_string()));
        }
        pairs.push((DISPLAY_NAME, self.display_name().to_string()));
        if let Some(owner) = self.owner() {
            pairs.push((OWNER_IDENTITY, owner.to_string()));
        }
        if let SessionMetadata::Field { params, .. } = self {
            pairs.push((ORIGIN_SESSION_ID, params.origin_session_id.to_string()));
            pairs.push((ORIGIN_PORTAL_INDEX, params.origin_portal_index.to_string()));
            pairs.push((ORIGIN_MAP_NAME, params.origin_map_name.clone()));
            pairs.push((GENERATION_SEED, params.seed.to_string()));
            pairs.push((THEME_KEY, params.theme.key().to_string()));
        }
        pairs
    }

    /// Rebuild metadata from a lookup function (normally `directory.metadata(id, key)`).
    ///
    /// Malformed numeric fields fall back to zero so a half-written lobby can still be
    /// joined; the problem is logged instead of failing the join.
    pub fn read(lookup: impl Fn(&str) -> Option<String>) -> SessionMetadata {
        let map_type = MapType::from_metadata(lookup(MAP_TYPE).as_deref());
        let display_name = lookup(DISPLAY_NAME).unwrap_or_default();
        let owner = lookup(OWNER_IDENTITY).and_then(|raw| match raw.parse::<PeerId>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring malformed owner identity '{}'", escape_log(&raw));
                None
            }
        });

        if map_type != MapType::Field {
            return SessionMetadata::Town {
                display_name,
                owner,
            };
        }

        let origin_session_id = parse_or_default::<SessionId>(&lookup, ORIGIN_SESSION_ID);
        let origin_portal_index = parse_or_default::<usize>(&lookup, ORIGIN_PORTAL_INDEX);
        let seed = parse_or_default::<u64>(&lookup, GENERATION_SEED);
        let theme = match lookup(THEME_KEY) {
            Some(key) => Theme::from_key(&key).unwrap_or_else(|| {
                warn!("Unknown theme key '{}', using default", escape_log(&key));
                Theme::default()
            }),
            None => Theme::default(),
        };

        SessionMetadata::Field {
            display_name,
            owner,
            params: FieldParams {
                seed,
                origin_session_id,
                origin_portal_index,
                origin_map_name: lookup(ORIGIN_MAP_NAME).unwrap_or_default(),
                theme,
            },
        }
    }
}

fn parse_or_default<V>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> V
where
    V: std::str::FromStr + Default,
{
    match lookup(key) {
        Some(raw) => raw.parse::<V>().unwrap_or_else(|_| {
            warn!("Malformed metadata {}='{}'", key, escape_log(&raw));
            V::default()
        }),
        None => V::default(),
    }
}
