//! The entity record shared by every kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::attributes;
use super::{EntityId, EntityKind};

/// One domain object: a character, element, puzzle or timeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default)]
    pub name: Option<String>,

    /// Loosely typed fields as delivered by the data layer.
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Entity {
    /// Create a new entity with no name and no attributes.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            attributes: HashMap::new(),
        }
    }

    pub fn character(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Character).with_name(name)
    }

    pub fn element(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Element).with_name(name)
    }

    pub fn puzzle(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::Puzzle).with_name(name)
    }

    pub fn timeline_event(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self::new(id, EntityKind::TimelineEvent).with_name(name)
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a raw attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn owned_by(self, owner: impl Into<EntityId>) -> Self {
        let owner = owner.into();
        self.with_attribute(attributes::OWNER_ID, owner.0)
    }

    pub fn contained_in(self, container: impl Into<EntityId>) -> Self {
        let container = container.into();
        self.with_attribute(attributes::CONTAINER_ID, container.0)
    }

    pub fn containing<I, S>(self, contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_id_list(attributes::CONTENTS, contents)
    }

    pub fn requiring<I, S>(self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_id_list(attributes::REQUIRED_ELEMENTS, elements)
    }

    pub fn rewarding<I, S>(self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_id_list(attributes::REWARD_IDS, elements)
    }

    pub fn linked_to<I, S>(self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_id_list(attributes::CHARACTER_LINKS, characters)
    }

    pub fn revealing(self, event: impl Into<EntityId>) -> Self {
        let event = event.into();
        self.with_attribute(attributes::TIMELINE_EVENT_ID, event.0)
    }

    pub fn with_element_type(self, element_type: impl Into<String>) -> Self {
        self.with_attribute(attributes::ELEMENT_TYPE, element_type.into())
    }

    fn with_id_list<I, S>(self, key: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<Value> = ids.into_iter().map(|id| Value::String(id.into())).collect();
        self.with_attribute(key, Value::Array(values))
    }

    /// Label for display. Missing or blank names fall back to "Unnamed {Kind}".
    pub fn display_label(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Unnamed {}", self.kind.display_name()),
        }
    }

    pub fn owner_id(&self) -> Option<EntityId> {
        attributes::id_value(&self.attributes, attributes::OWNER_ID)
    }

    pub fn container_id(&self) -> Option<EntityId> {
        attributes::id_value(&self.attributes, attributes::CONTAINER_ID)
    }

    pub fn contents(&self) -> Vec<EntityId> {
        attributes::id_list(&self.attributes, attributes::CONTENTS)
    }

    pub fn timeline_event_id(&self) -> Option<EntityId> {
        attributes::id_value(&self.attributes, attributes::TIMELINE_EVENT_ID)
    }

    pub fn required_elements(&self) -> Vec<EntityId> {
        attributes::id_list(&self.attributes, attributes::REQUIRED_ELEMENTS)
    }

    pub fn reward_ids(&self) -> Vec<EntityId> {
        attributes::id_list(&self.attributes, attributes::REWARD_IDS)
    }

    pub fn character_links(&self) -> Vec<EntityId> {
        attributes::id_list(&self.attributes, attributes::CHARACTER_LINKS)
    }

    pub fn element_type(&self) -> Option<&str> {
        attributes::string_value(&self.attributes, attributes::ELEMENT_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character() {
        let character = Entity::character("char-1", "Alex Reeves");
        assert_eq!(character.kind, EntityKind::Character);
        assert_eq!(character.display_label(), "Alex Reeves");
        assert!(character.owner_id().is_none());
    }

    #[test]
    fn test_unnamed_fallback() {
        let element = Entity::new("el-1", EntityKind::Element);
        assert_eq!(element.display_label(), "Unnamed Element");

        let event = Entity::timeline_event("ev-1", "   ");
        assert_eq!(event.display_label(), "Unnamed Timeline Event");
    }

    #[test]
    fn test_element_builder() {
        let element = Entity::element("el-1", "Locked Diary")
            .owned_by("char-1")
            .contained_in("el-box")
            .containing(["el-key"])
            .revealing("ev-1")
            .with_element_type("Prop");

        assert_eq!(element.owner_id(), Some(EntityId::from("char-1")));
        assert_eq!(element.container_id(), Some(EntityId::from("el-box")));
        assert_eq!(element.contents(), vec![EntityId::from("el-key")]);
        assert_eq!(element.timeline_event_id(), Some(EntityId::from("ev-1")));
        assert_eq!(element.element_type(), Some("Prop"));
    }

    #[test]
    fn test_puzzle_builder() {
        let puzzle = Entity::puzzle("pz-1", "Safe Combination")
            .requiring(["el-1", "el-2"])
            .rewarding(["el-3"]);
        assert_eq!(puzzle.required_elements().len(), 2);
        assert_eq!(puzzle.reward_ids(), vec![EntityId::from("el-3")]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"id": "el-9", "kind": "element"}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.id, EntityId::from("el-9"));
        assert!(entity.name.is_none());
        assert!(entity.attributes.is_empty());
    }
}
