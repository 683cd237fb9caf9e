//! Relationships derived from entity attributes.
//!
//! Relationships are read-only and rebuilt from the entity list whenever it
//! changes. A relationship whose endpoint is not in the entity list is dropped.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entities::{Entity, EntityId, EntityKind};

/// All relationship kinds in the design graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Character -> owned element.
    Ownership,
    /// Container element -> contained element.
    Containment,
    /// Character <-> character. Undirected.
    CharacterLink,
    /// Puzzle -> required element.
    PuzzleRequires,
    /// Puzzle -> reward element.
    PuzzleRewards,
    /// Timeline event -> element revealing it.
    TimelineReveals,
}

impl RelationshipKind {
    pub fn is_directed(&self) -> bool {
        !matches!(self, RelationshipKind::CharacterLink)
    }

    pub fn slug(&self) -> &'static str {
        match self {
            RelationshipKind::Ownership => "ownership",
            RelationshipKind::Containment => "containment",
            RelationshipKind::CharacterLink => "character-link",
            RelationshipKind::PuzzleRequires => "puzzle-requires",
            RelationshipKind::PuzzleRewards => "puzzle-rewards",
            RelationshipKind::TimelineReveals => "timeline-reveals",
        }
    }
}

/// A link between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(source: EntityId, target: EntityId, kind: RelationshipKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }

    /// Check whether this relationship touches the given entity.
    pub fn involves(&self, id: &EntityId) -> bool {
        &self.source == id || &self.target == id
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint.
    pub fn other_end(&self, id: &EntityId) -> Option<&EntityId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }

    fn dedup_key(&self) -> (RelationshipKind, EntityId, EntityId) {
        if !self.kind.is_directed() && self.target < self.source {
            (self.kind, self.target.clone(), self.source.clone())
        } else {
            (self.kind, self.source.clone(), self.target.clone())
        }
    }
}

/// Derive every relationship implied by entity attributes.
///
/// Output order follows the entity order, then attribute order, so the same
/// input always yields the same list. Duplicates (for example containment
/// declared on both the container and the contained element) are collapsed.
pub fn derive_relationships(entities: &[Entity]) -> Vec<Relationship> {
    let kinds: HashMap<&EntityId, EntityKind> = entities.iter().map(|e| (&e.id, e.kind)).collect();

    let mut seen = HashSet::new();
    let mut relationships = Vec::new();
    let mut dropped = 0usize;

    let mut push = |rel: Relationship| {
        if !kinds.contains_key(&rel.source) || !kinds.contains_key(&rel.target) {
            dropped += 1;
            tracing::debug!(
                target: "game_model::relationships",
                kind = rel.kind.slug(),
                source = %rel.source,
                target = %rel.target,
                "relationship.dropped.missing_endpoint"
            );
            return;
        }
        if rel.source == rel.target {
            return;
        }
        if seen.insert(rel.dedup_key()) {
            relationships.push(rel);
        }
    };

    for entity in entities {
        match entity.kind {
            EntityKind::Character => {
                for other in entity.character_links() {
                    push(Relationship::new(
                        entity.id.clone(),
                        other,
                        RelationshipKind::CharacterLink,
                    ));
                }
            }
            EntityKind::Element => {
                if let Some(owner) = entity.owner_id() {
                    push(Relationship::new(
                        owner,
                        entity.id.clone(),
                        RelationshipKind::Ownership,
                    ));
                }
                if let Some(container) = entity.container_id() {
                    push(Relationship::new(
                        container,
                        entity.id.clone(),
                        RelationshipKind::Containment,
                    ));
                }
                for inner in entity.contents() {
                    push(Relationship::new(
                        entity.id.clone(),
                        inner,
                        RelationshipKind::Containment,
                    ));
                }
                if let Some(event) = entity.timeline_event_id() {
                    push(Relationship::new(
                        event,
                        entity.id.clone(),
                        RelationshipKind::TimelineReveals,
                    ));
                }
            }
            EntityKind::Puzzle => {
                for required in entity.required_elements() {
                    push(Relationship::new(
                        entity.id.clone(),
                        required,
                        RelationshipKind::PuzzleRequires,
                    ));
                }
                for reward in entity.reward_ids() {
                    push(Relationship::new(
                        entity.id.clone(),
                        reward,
                        RelationshipKind::PuzzleRewards,
                    ));
                }
            }
            EntityKind::TimelineEvent => {}
        }
    }

    if dropped > 0 {
        tracing::debug!(
            target: "game_model::relationships",
            dropped,
            kept = relationships.len(),
            "relationships.derived"
        );
    }

    relationships
}
