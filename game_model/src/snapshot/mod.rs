//! Snapshot management - the immutable entity set read by one render cycle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::{Entity, EntityId, EntityKind};
use crate::relationships::{derive_relationships, Relationship, RelationshipKind};

/// All entities and derived relationships at one point in time.
///
/// Entities keep their insertion order. Relationships are rebuilt whenever
/// the entity list changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "SnapshotRecord", into = "SnapshotRecord")]
pub struct GameSnapshot {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    relationships: Vec<Relationship>,
}

/// Wire form of a snapshot: relationships are never stored, only derived.
#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    entities: Vec<Entity>,
}

impl From<SnapshotRecord> for GameSnapshot {
    fn from(record: SnapshotRecord) -> Self {
        GameSnapshot::new(record.entities)
    }
}

impl From<GameSnapshot> for SnapshotRecord {
    fn from(snapshot: GameSnapshot) -> Self {
        SnapshotRecord {
            entities: snapshot.entities,
        }
    }
}

impl GameSnapshot {
    /// Build a snapshot from an entity list.
    ///
    /// Ids must be unique across kinds; a repeated id keeps its first entity.
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut snapshot = Self::default();
        for entity in entities {
            snapshot.insert(entity);
        }
        snapshot.rebuild_relationships();
        snapshot
    }

    /// Add an entity and rebuild relationships.
    ///
    /// Returns `false` if the id is already taken.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        let added = self.insert(entity);
        if added {
            self.rebuild_relationships();
        }
        added
    }

    /// Replace the entity with the same id and rebuild relationships.
    ///
    /// Returns `false` if no entity has that id.
    pub fn replace_entity(&mut self, entity: Entity) -> bool {
        match self.index.get(&entity.id) {
            Some(&position) => {
                self.entities[position] = entity;
                self.rebuild_relationships();
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, entity: Entity) -> bool {
        if self.index.contains_key(&entity.id) {
            tracing::warn!(
                target: "game_model::snapshot",
                id = %entity.id,
                kind = entity.kind.slug(),
                "snapshot.duplicate_id"
            );
            return false;
        }
        self.index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        true
    }

    fn rebuild_relationships(&mut self) {
        self.relationships = derive_relationships(&self.entities);
    }

    /// Get an entity by id.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).map(|&position| &self.entities[position])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities of one kind, in insertion order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Relationships of one kind touching the given entity.
    pub fn relationships_of<'a>(
        &'a self,
        id: &'a EntityId,
        kind: RelationshipKind,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind && r.involves(id))
    }

    /// Elements owned by a character.
    pub fn owned_by<'a>(&'a self, owner: &'a EntityId) -> impl Iterator<Item = &'a EntityId> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.kind == RelationshipKind::Ownership && &r.source == owner)
            .map(|r| &r.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameSnapshot {
        GameSnapshot::new(vec![
            Entity::character("c1", "Alex"),
            Entity::character("c2", "Sam").linked_to(["c1"]),
            Entity::element("e1", "Diary").owned_by("c1"),
            Entity::element("e2", "Ring").owned_by("c1"),
            Entity::element("e3", "Badge").owned_by("c2"),
        ])
    }

    #[test]
    fn test_lookup() {
        let snapshot = sample();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.get(&"e2".into()).unwrap().display_label(), "Ring");
        assert!(snapshot.get(&"zz".into()).is_none());
        assert_eq!(snapshot.of_kind(EntityKind::Character).count(), 2);
    }

    #[test]
    fn test_owned_by() {
        let snapshot = sample();
        let c1: EntityId = "c1".into();
        let owned: Vec<_> = snapshot.owned_by(&c1).collect();
        assert_eq!(owned.len(), 2);
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let snapshot = GameSnapshot::new(vec![
            Entity::character("x", "First"),
            Entity::element("x", "Second"),
        ]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&"x".into()).unwrap().kind, EntityKind::Character);
    }

    #[test]
    fn test_add_entity_rebuilds_relationships() {
        let mut snapshot = sample();
        let before = snapshot.relationships().len();

        assert!(snapshot.add_entity(Entity::element("e4", "Key").owned_by("c2")));
        assert_eq!(snapshot.relationships().len(), before + 1);
        assert!(!snapshot.add_entity(Entity::element("e4", "Again")));
    }

    #[test]
    fn test_replace_entity_rebuilds_relationships() {
        let mut snapshot = sample();
        let c1: EntityId = "c1".into();

        assert!(snapshot.replace_entity(Entity::element("e2", "Ring").owned_by("c2")));
        assert_eq!(snapshot.owned_by(&c1).count(), 1);
        assert!(!snapshot.replace_entity(Entity::element("nope", "Nope")));
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), snapshot.len());
        assert_eq!(restored.relationships().len(), snapshot.relationships().len());
        assert!(restored.contains(&"e3".into()));
    }
}
