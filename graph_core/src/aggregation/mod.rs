//! Graph aggregation - keeps the rendered node count under the budget.
//!
//! The aggregation pass works as follows:
//! 1. **Pin**: the selection and always-visible kinds render individually
//! 2. **Group**: every other entity lands in a bucket keyed by (kind, scope, category)
//! 3. **Fit**: if everything fits, every entity renders individually
//! 4. **Collapse**: otherwise each bucket becomes one aggregate node
//! 5. **Expand**: user-expanded buckets open first, most recent first and
//!    partially if needed, then buckets below the minimum aggregate size
//!    open if they fit
//!
//! The output never exceeds the budget, whatever the expansion state.

mod grouping;

pub use grouping::*;

use game_model::{Entity, EntityId, EntityKind, GameSnapshot};
use std::collections::{BTreeMap, HashMap};

use crate::config::{EngineConfig, MIN_NODE_BUDGET};
use crate::node::{AggregateNode, Node, NodeId, Residual, SimpleNode};

/// Groups the user has opened, in the order they were opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: Vec<NodeId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a group. Returns whether it is now expanded.
    pub fn toggle(&mut self, group_id: &NodeId) -> bool {
        if let Some(position) = self.expanded.iter().position(|id| id == group_id) {
            self.expanded.remove(position);
            false
        } else {
            self.expanded.push(group_id.clone());
            true
        }
    }

    pub fn is_expanded(&self, group_id: &NodeId) -> bool {
        self.expanded.contains(group_id)
    }

    /// Collapse every group.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn expanded(&self) -> &[NodeId] {
        &self.expanded
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// How a bucket is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupMode {
    Collapsed,
    Individual,
    /// The first `shown` members individually, the rest behind a residual node.
    Partial { shown: usize },
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub nodes: Vec<Node>,
    /// Number of entities considered.
    pub entity_count: usize,
    /// Whether any entity is hidden behind an aggregate node.
    pub aggregated: bool,
}

impl Aggregation {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Reduces a snapshot to a bounded, explorable node set.
#[derive(Debug, Clone)]
pub struct GraphAggregator {
    budget: usize,
    min_aggregate_size: usize,
    grouping: GroupingStrategy,
    policy: VisibilityPolicy,
}

impl GraphAggregator {
    /// Budgets below [`MIN_NODE_BUDGET`] are raised to it.
    pub fn new(config: &EngineConfig) -> Self {
        let budget = config.node_budget.max(MIN_NODE_BUDGET);
        if budget != config.node_budget {
            tracing::warn!(
                target: "graph_core::aggregation",
                requested = config.node_budget,
                budget,
                "aggregation.budget_clamped"
            );
        }
        Self {
            budget,
            min_aggregate_size: config.min_aggregate_size.max(1),
            grouping: GroupingStrategy::default(),
            policy: VisibilityPolicy::default(),
        }
    }

    pub fn with_grouping(mut self, grouping: GroupingStrategy) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Run the aggregation pass for the given selection and expansion state.
    ///
    /// A selection id missing from the snapshot is treated as no selection
    /// for grouping purposes.
    pub fn aggregate(
        &self,
        snapshot: &GameSnapshot,
        selected: Option<&EntityId>,
        expansion: &ExpansionState,
    ) -> Aggregation {
        let selected = selected.and_then(|id| snapshot.get(id));
        let ctx = GroupingContext { selected };

        let mut pinned: Vec<&Entity> = snapshot
            .entities()
            .iter()
            .filter(|e| self.policy.is_always_visible(e.kind))
            .filter(|e| selected.map_or(true, |s| s.id != e.id))
            .collect();
        pinned.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(selected) = selected {
            pinned.insert(0, selected);
        }

        let managed: Vec<&Entity> = snapshot
            .entities()
            .iter()
            .filter(|e| !self.policy.is_always_visible(e.kind))
            .filter(|e| selected.map_or(true, |s| s.id != e.id))
            .collect();

        let entity_count = pinned.len() + managed.len();
        let mut groups = self.group(&managed, |e| self.grouping.group_key(e, &ctx));

        if entity_count <= self.budget {
            let nodes = pinned
                .into_iter()
                .chain(groups.into_values().flatten())
                .map(simple)
                .collect();
            return Aggregation {
                nodes,
                entity_count,
                aggregated: false,
            };
        }

        if pinned.len() + groups.len() > self.budget {
            tracing::debug!(
                target: "graph_core::aggregation",
                groups = groups.len(),
                pinned = pinned.len(),
                "aggregation.coarsen_groups"
            );
            groups = self.group(&managed, |e| GroupKey::for_kind(e.kind));
        }

        let (pinned, overflow) = self.split_pinned(pinned, groups.len());
        let mut used = pinned.len() + overflow.len() + groups.len();
        let mut modes: HashMap<GroupKey, GroupMode> = groups
            .keys()
            .map(|key| (key.clone(), GroupMode::Collapsed))
            .collect();

        // User expansions first; the latest click gets room before older ones.
        let by_id: HashMap<NodeId, &GroupKey> = groups.keys().map(|k| (k.node_id(), k)).collect();
        for group_id in expansion.expanded().iter().rev() {
            let Some(&key) = by_id.get(group_id) else {
                continue;
            };
            let size = groups[key].len();
            let free = self.budget.saturating_sub(used);
            let mode = if size - 1 <= free {
                used += size - 1;
                GroupMode::Individual
            } else if free > 0 {
                used += free;
                tracing::debug!(
                    target: "graph_core::aggregation",
                    group = %group_id,
                    shown = free,
                    total = size,
                    "aggregation.partial_expansion"
                );
                GroupMode::Partial { shown: free }
            } else {
                tracing::debug!(
                    target: "graph_core::aggregation",
                    group = %group_id,
                    "aggregation.expansion_skipped.no_room"
                );
                GroupMode::Collapsed
            };
            modes.insert(key.clone(), mode);
        }

        // Then small buckets, smallest first, while they fit.
        let mut small: Vec<(&GroupKey, usize)> = groups
            .iter()
            .filter(|(key, _)| modes[*key] == GroupMode::Collapsed)
            .filter(|(key, _)| !expansion.is_expanded(&key.node_id()))
            .map(|(key, members)| (key, members.len()))
            .filter(|(_, size)| *size < self.min_aggregate_size)
            .collect();
        small.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        for (key, size) in small {
            if size - 1 <= self.budget.saturating_sub(used) {
                used += size - 1;
                modes.insert(key.clone(), GroupMode::Individual);
            }
        }

        let mut nodes: Vec<Node> = pinned.into_iter().map(simple).collect();
        for (key, members) in overflow {
            nodes.push(aggregate_node(snapshot, &key, &members, false));
        }
        for (key, members) in &groups {
            match modes[key] {
                GroupMode::Individual => nodes.extend(members.iter().copied().map(simple)),
                GroupMode::Collapsed => nodes.push(aggregate_node(
                    snapshot,
                    key,
                    members,
                    expansion.is_expanded(&key.node_id()),
                )),
                GroupMode::Partial { shown } => {
                    nodes.extend(members[..shown].iter().copied().map(simple));
                    nodes.push(residual_node(key, &members[shown..], shown));
                }
            }
        }

        debug_assert!(nodes.len() <= self.budget);
        let aggregated = nodes.iter().any(|n| n.as_aggregate().is_some());
        Aggregation {
            nodes,
            entity_count,
            aggregated,
        }
    }

    /// Bucket entities by key; members sorted by id.
    fn group<'a>(
        &self,
        entities: &[&'a Entity],
        key_of: impl Fn(&Entity) -> GroupKey,
    ) -> BTreeMap<GroupKey, Vec<&'a Entity>> {
        let mut groups: BTreeMap<GroupKey, Vec<&'a Entity>> = BTreeMap::new();
        for &entity in entities {
            groups.entry(key_of(entity)).or_default().push(entity);
        }
        for members in groups.values_mut() {
            members.sort_by(|a, b| a.id.cmp(&b.id));
        }
        groups
    }

    /// Keep as many pinned entities as the budget allows once `group_slots`
    /// are reserved; fold the rest into one aggregate per kind. The selection
    /// sits at the front and is kept first.
    #[allow(clippy::type_complexity)]
    fn split_pinned<'a>(
        &self,
        mut pinned: Vec<&'a Entity>,
        group_slots: usize,
    ) -> (Vec<&'a Entity>, Vec<(GroupKey, Vec<&'a Entity>)>) {
        let capacity = self.budget.saturating_sub(group_slots);
        if pinned.len() <= capacity {
            return (pinned, Vec::new());
        }

        let mut kinds: Vec<EntityKind> = pinned.iter().map(|e| e.kind).collect();
        kinds.sort();
        kinds.dedup();
        let keep = capacity.saturating_sub(kinds.len()).max(1).min(pinned.len());

        let rest = pinned.split_off(keep);
        let mut overflow: BTreeMap<GroupKey, Vec<&'a Entity>> = BTreeMap::new();
        for entity in rest {
            overflow
                .entry(GroupKey::for_kind(entity.kind))
                .or_default()
                .push(entity);
        }
        tracing::warn!(
            target: "graph_core::aggregation",
            kept = pinned.len(),
            folded = overflow.values().map(Vec::len).sum::<usize>(),
            budget = self.budget,
            "aggregation.pinned_overflow"
        );
        (pinned, overflow.into_iter().collect())
    }
}

fn simple(entity: &Entity) -> Node {
    Node::Simple(SimpleNode::new(entity.clone()))
}

fn aggregate_node(
    snapshot: &GameSnapshot,
    key: &GroupKey,
    members: &[&Entity],
    is_expanded: bool,
) -> Node {
    Node::Aggregate(AggregateNode {
        id: key.node_id(),
        group_key: key.clone(),
        kind: key.kind,
        member_ids: members.iter().map(|e| e.id.clone()).collect(),
        is_expanded,
        label: key.label(members.len(), snapshot),
        residual: None,
    })
}

fn residual_node(key: &GroupKey, hidden: &[&Entity], shown: usize) -> Node {
    let total = shown + hidden.len();
    Node::Aggregate(AggregateNode {
        id: key.residual_node_id(),
        group_key: key.clone(),
        kind: key.kind,
        member_ids: hidden.iter().map(|e| e.id.clone()).collect(),
        is_expanded: true,
        label: key.residual_label(shown, total),
        residual: Some(Residual { shown, total }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(budget: usize) -> EngineConfig {
        EngineConfig {
            node_budget: budget,
            cull_threshold: budget.max(100),
            ..EngineConfig::default()
        }
    }

    fn unowned_elements(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|i| Entity::element(format!("e{i:03}"), format!("Element {i}")))
            .collect()
    }

    fn aggregates(aggregation: &Aggregation) -> Vec<&AggregateNode> {
        aggregation
            .nodes
            .iter()
            .filter_map(Node::as_aggregate)
            .collect()
    }

    #[test]
    fn test_small_graph_renders_everything() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(10));
        let snapshot = GameSnapshot::new(entities);

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            None,
            &ExpansionState::new(),
        );

        assert_eq!(result.node_count(), 11);
        assert!(!result.aggregated);
    }

    #[test]
    fn test_large_group_collapses() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(60));
        let snapshot = GameSnapshot::new(entities);

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            None,
            &ExpansionState::new(),
        );

        assert_eq!(result.node_count(), 2);
        let groups = aggregates(&result);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "60 Elements");
        assert_eq!(groups[0].member_count(), 60);
    }

    #[test]
    fn test_full_expansion_when_it_fits() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(30).into_iter().map(|e| e.with_element_type("Prop")));
        entities.extend((0..60).map(|i| {
            Entity::element(format!("m{i:03}"), "Memory").with_element_type("Memory Token")
        }));
        let snapshot = GameSnapshot::new(entities);
        let aggregator = GraphAggregator::new(&config(50));

        let mut expansion = ExpansionState::new();
        let props = GroupKey {
            kind: EntityKind::Element,
            scope: GroupScope::Ungrouped,
            category: canonical_category("Prop"),
        };
        assert!(expansion.toggle(&props.node_id()));

        let result = aggregator.aggregate(&snapshot, None, &expansion);
        // 1 character + 30 props + 1 memory-token aggregate.
        assert_eq!(result.node_count(), 32);
        assert_eq!(aggregates(&result).len(), 1);
    }

    #[test]
    fn test_partial_expansion_leaves_residual() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(80));
        let snapshot = GameSnapshot::new(entities);
        let aggregator = GraphAggregator::new(&config(50));

        let mut expansion = ExpansionState::new();
        expansion.toggle(&GroupKey::for_kind(EntityKind::Element).node_id());
        let result = aggregator.aggregate(&snapshot, None, &expansion);

        assert_eq!(result.node_count(), 50);
        let residual = aggregates(&result)[0];
        assert_eq!(residual.residual, Some(Residual { shown: 48, total: 80 }));
        assert_eq!(residual.label, "Showing 48 of 80 Elements");
        assert_eq!(residual.id.as_str(), "remaining-element:ungrouped");
        assert_eq!(residual.member_count(), 32);
        // Members are shown in id order.
        assert_eq!(result.nodes[1].id().as_str(), "e000");
    }

    #[test]
    fn test_latest_expansion_gets_room() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend((0..80).map(|i| {
            Entity::element(format!("p{i:03}"), "Prop").with_element_type("Prop")
        }));
        entities.extend((0..80).map(|i| {
            Entity::element(format!("m{i:03}"), "Memory").with_element_type("Memory")
        }));
        let snapshot = GameSnapshot::new(entities);
        let aggregator = GraphAggregator::new(&config(50));
        let key = |category: &str| GroupKey {
            kind: EntityKind::Element,
            scope: GroupScope::Ungrouped,
            category: canonical_category(category),
        };

        let mut expansion = ExpansionState::new();
        expansion.toggle(&key("Prop").node_id());
        let first = aggregator.aggregate(&snapshot, None, &expansion);
        assert_eq!(first.node_count(), 50);
        assert!(first.nodes.iter().any(|n| n.id().as_str() == "p000"));

        expansion.toggle(&key("Memory").node_id());
        let result = aggregator.aggregate(&snapshot, None, &expansion);

        assert_eq!(result.node_count(), 50);
        assert!(result.nodes.iter().any(|n| n.id().as_str() == "m000"));
        assert!(!result.nodes.iter().any(|n| n.id().as_str() == "p000"));
        let residual = result
            .nodes
            .iter()
            .find(|n| n.id() == &key("Memory").residual_node_id())
            .and_then(Node::as_aggregate)
            .unwrap();
        assert_eq!(residual.residual, Some(Residual { shown: 47, total: 80 }));
        // The older expansion yields its room and shows as one aggregate again.
        let props = result
            .nodes
            .iter()
            .find(|n| n.id() == &key("Prop").node_id())
            .and_then(Node::as_aggregate)
            .unwrap();
        assert_eq!(props.member_count(), 80);
        assert!(props.is_expanded);
    }

    #[test]
    fn test_category_case_shares_one_group() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend((0..30).map(|i| {
            Entity::element(format!("a{i:02}"), "Token").with_element_type("Memory Token")
        }));
        entities.extend((0..30).map(|i| {
            Entity::element(format!("b{i:02}"), "Token").with_element_type(" memory  token")
        }));
        let snapshot = GameSnapshot::new(entities);

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            None,
            &ExpansionState::new(),
        );

        let groups = aggregates(&result);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_count(), 60);
        assert_eq!(groups[0].label, "60 Memory Token Elements");
        let mut ids: Vec<&str> = result.nodes.iter().map(|n| n.id().as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), result.node_count());
    }

    #[test]
    fn test_budget_below_minimum_is_raised() {
        let mut entities = vec![Entity::character("c1", "Alex"), Entity::character("c2", "Sam")];
        entities.extend(unowned_elements(20));
        entities.extend((0..5).map(|i| Entity::puzzle(format!("p{i}"), "Puzzle")));
        entities.extend((0..5).map(|i| Entity::timeline_event(format!("t{i}"), "Event")));
        let snapshot = GameSnapshot::new(entities);
        let tiny = EngineConfig {
            node_budget: 3,
            ..EngineConfig::default()
        };
        let aggregator = GraphAggregator::new(&tiny);
        assert_eq!(aggregator.budget(), MIN_NODE_BUDGET);

        let selected: EntityId = "e005".into();
        let mut expansion = ExpansionState::new();
        expansion.toggle(&GroupKey::for_kind(EntityKind::Element).node_id());
        let result = aggregator.aggregate(&snapshot, Some(&selected), &expansion);

        assert!(result.node_count() <= MIN_NODE_BUDGET);
        assert_eq!(result.nodes[0].id().as_str(), "e005");
        let covered: usize = result.nodes.iter().map(|n| n.entity_ids().len()).sum();
        assert_eq!(covered, snapshot.len());
    }

    #[test]
    fn test_collapse_all_restores_default() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(80));
        let snapshot = GameSnapshot::new(entities);
        let aggregator = GraphAggregator::new(&config(50));

        let baseline = aggregator.aggregate(&snapshot, None, &ExpansionState::new());
        let mut expansion = ExpansionState::new();
        expansion.toggle(&GroupKey::for_kind(EntityKind::Element).node_id());
        expansion.collapse_all();

        assert_eq!(aggregator.aggregate(&snapshot, None, &expansion), baseline);
    }

    #[test]
    fn test_small_groups_stay_individual() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(60));
        entities.push(Entity::puzzle("p1", "Safe"));
        entities.push(Entity::puzzle("p2", "Cipher"));
        let snapshot = GameSnapshot::new(entities);

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            None,
            &ExpansionState::new(),
        );

        // 1 character + element aggregate + 2 individual puzzles.
        assert_eq!(result.node_count(), 4);
        assert!(result.nodes.iter().any(|n| n.id().as_str() == "p1"));
    }

    #[test]
    fn test_selection_regroups_owned_elements() {
        let mut entities = vec![Entity::character("c1", "Alex"), Entity::character("c2", "Sam")];
        for i in 0..30 {
            entities.push(Entity::element(format!("a{i:02}"), "Owned").owned_by("c1"));
            entities.push(Entity::element(format!("b{i:02}"), "Other").owned_by("c2"));
        }
        let snapshot = GameSnapshot::new(entities);
        let aggregator = GraphAggregator::new(&config(50));
        let c1: EntityId = "c1".into();

        let result = aggregator.aggregate(&snapshot, Some(&c1), &ExpansionState::new());
        let labels: Vec<_> = aggregates(&result).iter().map(|a| a.label.clone()).collect();

        assert!(labels.contains(&"Alex's elements (30)".to_string()));
        assert!(labels.contains(&"30 Elements".to_string()));
        assert_eq!(result.nodes[0].id().as_str(), "c1");
    }

    #[test]
    fn test_selected_element_rendered_individually() {
        let mut entities = vec![Entity::character("c1", "Alex")];
        entities.extend(unowned_elements(60));
        let snapshot = GameSnapshot::new(entities);
        let selected: EntityId = "e042".into();

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            Some(&selected),
            &ExpansionState::new(),
        );

        assert_eq!(result.nodes[0].id().as_str(), "e042");
        assert_eq!(aggregates(&result)[0].member_count(), 59);
    }

    #[test]
    fn test_pinned_overflow_respects_budget() {
        let entities: Vec<Entity> = (0..70)
            .map(|i| Entity::character(format!("c{i:02}"), "Extra"))
            .chain(unowned_elements(10))
            .collect();
        let snapshot = GameSnapshot::new(entities);

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            None,
            &ExpansionState::new(),
        );

        assert!(result.node_count() <= 50);
        assert!(aggregates(&result)
            .iter()
            .any(|a| a.kind == EntityKind::Character));
    }

    #[test]
    fn test_unknown_selection_is_ignored() {
        let snapshot = GameSnapshot::new(unowned_elements(5));
        let ghost: EntityId = "ghost".into();

        let result = GraphAggregator::new(&config(50)).aggregate(
            &snapshot,
            Some(&ghost),
            &ExpansionState::new(),
        );
        assert_eq!(result.node_count(), 5);
    }

    #[test]
    fn test_expansion_toggle() {
        let mut expansion = ExpansionState::new();
        let id = NodeId::from("group:element:ungrouped");
        assert!(expansion.toggle(&id));
        assert!(expansion.is_expanded(&id));
        assert!(!expansion.toggle(&id));
        assert!(expansion.is_empty());
    }
}
