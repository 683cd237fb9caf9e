//! Grouping keys, the per-kind grouping strategy and the visibility policy table.

use game_model::{Entity, EntityId, EntityKind, GameSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::node::NodeId;

/// Who a group is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupScope {
    /// Entities owned by the selected character.
    Owner(EntityId),
    Ungrouped,
}

/// Identity of an aggregation bucket: (kind, scope, category).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub kind: EntityKind,
    pub scope: GroupScope,
    /// Optional sub-type split, e.g. an element's type, in the form
    /// returned by [`canonical_category`].
    pub category: Option<String>,
}

impl GroupKey {
    /// The coarsest key: one bucket per kind.
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            kind,
            scope: GroupScope::Ungrouped,
            category: None,
        }
    }

    /// Distinct keys always give distinct paths.
    fn path(&self) -> String {
        let mut path = format!("{}:", self.kind.slug());
        match &self.scope {
            GroupScope::Owner(owner) => {
                path.push_str("owner=");
                push_escaped(&mut path, owner.as_str());
            }
            GroupScope::Ungrouped => path.push_str("ungrouped"),
        }
        if let Some(category) = &self.category {
            path.push(':');
            push_escaped(&mut path, category);
        }
        path
    }

    /// Id of the aggregate node for this group.
    pub fn node_id(&self) -> NodeId {
        NodeId(format!("group:{}", self.path()))
    }

    /// Id of the residual node left by a partial expansion of this group.
    pub fn residual_node_id(&self) -> NodeId {
        NodeId(format!("remaining-{}", self.path()))
    }

    /// Display label for a collapsed group of `count` members.
    pub fn label(&self, count: usize, snapshot: &GameSnapshot) -> String {
        let plural = self.kind.plural_name();
        let category = self.category.as_deref().map(title_case);
        match (&self.scope, &category) {
            (GroupScope::Ungrouped, None) => format!("{count} {plural}"),
            (GroupScope::Ungrouped, Some(category)) => format!("{count} {category} {plural}"),
            (GroupScope::Owner(owner), category) => {
                let owner_label = snapshot
                    .get(owner)
                    .map(Entity::display_label)
                    .unwrap_or_else(|| owner.to_string());
                let plural = plural.to_lowercase();
                match category {
                    Some(category) => format!("{owner_label}'s {category} {plural} ({count})"),
                    None => format!("{owner_label}'s {plural} ({count})"),
                }
            }
        }
    }

    /// Label for the remainder of a partially expanded group.
    pub fn residual_label(&self, shown: usize, total: usize) -> String {
        format!("Showing {shown} of {total} {}", self.kind.plural_name())
    }
}

/// `%` and `:` are escaped so a segment never reads as a separator.
fn push_escaped(path: &mut String, segment: &str) {
    for ch in segment.chars() {
        match ch {
            '%' => path.push_str("%25"),
            ':' => path.push_str("%3A"),
            _ => path.push(ch),
        }
    }
}

fn title_case(category: &str) -> String {
    category
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a free-text category: trimmed, lowercased, single spaces.
/// Blank input yields `None`.
pub fn canonical_category(raw: &str) -> Option<String> {
    let words: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// What the grouping functions may look at besides the entity itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupingContext<'a> {
    pub selected: Option<&'a Entity>,
}

impl<'a> GroupingContext<'a> {
    pub fn selected_character(&self) -> Option<&'a Entity> {
        self.selected.filter(|e| e.kind == EntityKind::Character)
    }
}

pub type GroupKeyFn = fn(&Entity, &GroupingContext<'_>) -> GroupKey;

/// Map from entity kind to the function computing its group key.
///
/// Kinds without a registered function group by kind alone, so adding a new
/// kind never touches aggregation control flow.
#[derive(Debug, Clone)]
pub struct GroupingStrategy {
    functions: HashMap<EntityKind, GroupKeyFn>,
}

impl Default for GroupingStrategy {
    fn default() -> Self {
        let mut strategy = Self::empty();
        strategy.register(EntityKind::Element, element_group_key);
        strategy
    }
}

impl GroupingStrategy {
    /// A strategy that groups every kind by kind alone.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: EntityKind, function: GroupKeyFn) {
        self.functions.insert(kind, function);
    }

    pub fn group_key(&self, entity: &Entity, ctx: &GroupingContext<'_>) -> GroupKey {
        match self.functions.get(&entity.kind) {
            Some(function) => function(entity, ctx),
            None => GroupKey::for_kind(entity.kind),
        }
    }
}

/// Elements owned by the selected character get their own scope; all
/// elements split by element type.
pub fn element_group_key(entity: &Entity, ctx: &GroupingContext<'_>) -> GroupKey {
    let scope = match (ctx.selected_character(), entity.owner_id()) {
        (Some(character), Some(owner)) if character.id == owner => GroupScope::Owner(owner),
        _ => GroupScope::Ungrouped,
    };
    GroupKey {
        kind: entity.kind,
        scope,
        category: entity.element_type().and_then(canonical_category),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Always rendered individually.
    AlwaysVisible,
    /// Subject to aggregation under the node budget.
    BudgetManaged,
}

/// Fixed table of which kinds are pinned and which are budget-managed.
#[derive(Debug, Clone)]
pub struct VisibilityPolicy {
    table: HashMap<EntityKind, Visibility>,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        let table = EntityKind::ALL
            .iter()
            .map(|&kind| {
                let visibility = match kind {
                    EntityKind::Character => Visibility::AlwaysVisible,
                    EntityKind::Element | EntityKind::Puzzle | EntityKind::TimelineEvent => {
                        Visibility::BudgetManaged
                    }
                };
                (kind, visibility)
            })
            .collect();
        Self { table }
    }
}

impl VisibilityPolicy {
    pub fn set(&mut self, kind: EntityKind, visibility: Visibility) {
        self.table.insert(kind, visibility);
    }

    pub fn visibility(&self, kind: EntityKind) -> Visibility {
        self.table
            .get(&kind)
            .copied()
            .unwrap_or(Visibility::BudgetManaged)
    }

    pub fn is_always_visible(&self, kind: EntityKind) -> bool {
        self.visibility(kind) == Visibility::AlwaysVisible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_key_scoped_to_selected_owner() {
        let alex = Entity::character("c1", "Alex");
        let diary = Entity::element("e1", "Diary").owned_by("c1").with_element_type("Prop");
        let strategy = GroupingStrategy::default();

        let unselected = strategy.group_key(&diary, &GroupingContext::default());
        assert_eq!(unselected.scope, GroupScope::Ungrouped);
        assert_eq!(unselected.category.as_deref(), Some("prop"));

        let ctx = GroupingContext {
            selected: Some(&alex),
        };
        let selected = strategy.group_key(&diary, &ctx);
        assert_eq!(selected.scope, GroupScope::Owner("c1".into()));
    }

    #[test]
    fn test_unregistered_kind_groups_by_kind() {
        let strategy = GroupingStrategy::default();
        let puzzle = Entity::puzzle("p1", "Safe");
        assert_eq!(
            strategy.group_key(&puzzle, &GroupingContext::default()),
            GroupKey::for_kind(EntityKind::Puzzle)
        );
    }

    #[test]
    fn test_custom_strategy() {
        let mut strategy = GroupingStrategy::empty();
        strategy.register(EntityKind::Puzzle, |entity, _| GroupKey {
            kind: entity.kind,
            scope: GroupScope::Ungrouped,
            category: Some("act-1".to_string()),
        });
        let key = strategy.group_key(&Entity::puzzle("p1", "Safe"), &GroupingContext::default());
        assert_eq!(key.node_id().as_str(), "group:puzzle:ungrouped:act-1");
    }

    #[test]
    fn test_labels() {
        let snapshot = GameSnapshot::new(vec![Entity::character("c1", "Alex")]);

        assert_eq!(GroupKey::for_kind(EntityKind::Element).label(40, &snapshot), "40 Elements");

        let owned = GroupKey {
            kind: EntityKind::Element,
            scope: GroupScope::Owner("c1".into()),
            category: canonical_category("Prop"),
        };
        assert_eq!(owned.label(20, &snapshot), "Alex's Prop elements (20)");
        assert_eq!(owned.residual_label(12, 20), "Showing 12 of 20 Elements");
        assert_eq!(owned.residual_node_id().as_str(), "remaining-element:owner=c1:prop");
    }

    #[test]
    fn test_category_normalization() {
        assert_eq!(canonical_category("  Memory   Token "), Some("memory token".to_string()));
        assert_eq!(canonical_category(" \t"), None);

        let strategy = GroupingStrategy::default();
        let ctx = GroupingContext::default();
        let upper = Entity::element("e1", "A").with_element_type("Memory Token");
        let lower = Entity::element("e2", "B").with_element_type("memory token");
        let blank = Entity::element("e3", "C").with_element_type("  ");
        assert_eq!(strategy.group_key(&upper, &ctx), strategy.group_key(&lower, &ctx));
        assert_eq!(
            strategy.group_key(&blank, &ctx),
            GroupKey::for_kind(EntityKind::Element)
        );
    }

    #[test]
    fn test_node_ids_are_distinct_per_key() {
        let key = |scope: GroupScope, category: Option<&str>| GroupKey {
            kind: EntityKind::Element,
            scope,
            category: category.map(str::to_string),
        };
        let keys = [
            key(GroupScope::Ungrouped, Some("memory token")),
            key(GroupScope::Ungrouped, Some("memory-token")),
            key(GroupScope::Owner("c1:x".into()), None),
            key(GroupScope::Owner("c1".into()), Some("x")),
            key(GroupScope::Ungrouped, Some("50%")),
            key(GroupScope::Ungrouped, Some("50%25")),
        ];
        let mut ids: Vec<NodeId> = keys.iter().map(GroupKey::node_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), keys.len());
        assert_eq!(
            keys[0].node_id().as_str(),
            "group:element:ungrouped:memory token"
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = VisibilityPolicy::default();
        assert!(policy.is_always_visible(EntityKind::Character));
        assert!(!policy.is_always_visible(EntityKind::Element));
        assert_eq!(
            policy.visibility(EntityKind::TimelineEvent),
            Visibility::BudgetManaged
        );
    }
}
