//! Entity definitions for the design graph.

pub mod attributes;
mod entity;

pub use entity::*;

use serde::{Deserialize, Serialize};

/// Unique identifier for all entities in the game.
///
/// Ids come from the upstream data layer and are never reused across kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an entity ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of entities in the design graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    /// Physical props and memory tokens.
    Element,
    Puzzle,
    TimelineEvent,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Character,
        EntityKind::Element,
        EntityKind::Puzzle,
        EntityKind::TimelineEvent,
    ];

    /// Singular display name, used for fallback labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Character => "Character",
            EntityKind::Element => "Element",
            EntityKind::Puzzle => "Puzzle",
            EntityKind::TimelineEvent => "Timeline Event",
        }
    }

    /// Plural display name, used for aggregate labels.
    pub fn plural_name(&self) -> &'static str {
        match self {
            EntityKind::Character => "Characters",
            EntityKind::Element => "Elements",
            EntityKind::Puzzle => "Puzzles",
            EntityKind::TimelineEvent => "Timeline Events",
        }
    }

    /// Short lowercase identifier, used in node ids.
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Element => "element",
            EntityKind::Puzzle => "puzzle",
            EntityKind::TimelineEvent => "timeline-event",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
