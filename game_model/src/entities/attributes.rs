//! Well-known attribute keys and lenient accessors over the raw attribute map.
//!
//! Upstream records are loosely typed: a relation may arrive as a JSON array,
//! as a string holding a JSON array, or not at all. Every accessor here
//! degrades to "absent" instead of failing.

use serde_json::Value;
use std::collections::HashMap;

use super::EntityId;

/// Owning character of an element.
pub const OWNER_ID: &str = "owner_id";
/// Element that physically contains this element.
pub const CONTAINER_ID: &str = "container_id";
/// Elements contained by this element.
pub const CONTENTS: &str = "contents";
/// Timeline event revealed by this element.
pub const TIMELINE_EVENT_ID: &str = "timeline_event_id";
/// Elements a puzzle requires.
pub const REQUIRED_ELEMENTS: &str = "required_elements";
/// Elements a puzzle rewards.
pub const REWARD_IDS: &str = "reward_ids";
/// Characters a character is linked to.
pub const CHARACTER_LINKS: &str = "character_links";
/// Element sub-type ("Prop", "Memory Token", ...).
pub const ELEMENT_TYPE: &str = "element_type";

/// Read a single id. Accepts a plain string or the first entry of a list.
pub fn id_value(attributes: &HashMap<String, Value>, key: &str) -> Option<EntityId> {
    match attributes.get(key)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) if s.trim_start().starts_with('[') => {
            parse_id_list(s).into_iter().next()
        }
        Value::String(s) => Some(EntityId::new(s.trim())),
        Value::Array(items) => ids_from_array(items).into_iter().next(),
        _ => None,
    }
}

/// Read a list of ids. Malformed values yield an empty list.
pub fn id_list(attributes: &HashMap<String, Value>, key: &str) -> Vec<EntityId> {
    match attributes.get(key) {
        Some(Value::Array(items)) => ids_from_array(items),
        Some(Value::String(s)) => parse_id_list(s),
        _ => Vec::new(),
    }
}

/// Read a non-empty string attribute.
pub fn string_value<'a>(attributes: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    match attributes.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn ids_from_array(items: &[Value]) -> Vec<EntityId> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(EntityId::new(s.trim())),
            _ => None,
        })
        .collect()
}

fn parse_id_list(raw: &str) -> Vec<EntityId> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(items) => ids_from_array(&items),
        Err(err) => {
            tracing::debug!(
                target: "game_model::attributes",
                error = %err,
                "attributes.id_list.malformed"
            );
            Vec::new()
        }
    }
}
