//! Visual hierarchy - classifies every node and edge relative to the selection.
//!
//! Connection rules by kind of the selected entity:
//! - **Character**: owned elements, plus elements those contain (one hop);
//!   linked characters are secondary
//! - **Element**: owner, container and contents
//! - **Puzzle**: required and reward elements
//! - **Timeline event**: elements revealing it
//!
//! With nothing selected every node is `Selected` (full visibility). A
//! selection missing from the snapshot puts every node in the background.

mod tiers;

pub use tiers::*;

use game_model::{EntityId, EntityKind, GameSnapshot, RelationshipKind};
use std::collections::{HashMap, HashSet};

use crate::node::{Edge, Node, NodeId};

/// Entity-level classification for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTiers {
    NoSelection,
    /// The selected id is not in the snapshot.
    Unmatched,
    Matched {
        selected: EntityId,
        connected: HashSet<EntityId>,
        secondary: HashSet<EntityId>,
    },
}

impl EntityTiers {
    pub fn has_selection(&self) -> bool {
        !matches!(self, EntityTiers::NoSelection)
    }

    pub fn tier_of(&self, id: &EntityId) -> Tier {
        match self {
            EntityTiers::NoSelection => Tier::Selected,
            EntityTiers::Unmatched => Tier::Background,
            EntityTiers::Matched {
                selected,
                connected,
                secondary,
            } => {
                if selected == id {
                    Tier::Selected
                } else if connected.contains(id) {
                    Tier::Connected
                } else if secondary.contains(id) {
                    Tier::SecondaryConnected
                } else {
                    Tier::Background
                }
            }
        }
    }
}

/// Node and edge classification for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    pub has_selection: bool,
    pub node_tiers: HashMap<NodeId, Tier>,
    pub edge_emphasis: HashMap<String, EdgeEmphasis>,
}

impl Hierarchy {
    pub fn tier(&self, node: &NodeId) -> Tier {
        self.node_tiers.get(node).copied().unwrap_or(Tier::Background)
    }

    pub fn visual_state(&self, node: &NodeId) -> VisualState {
        if self.has_selection {
            self.tier(node).visual_state()
        } else {
            VisualState::FULL
        }
    }

    pub fn emphasis(&self, edge_id: &str) -> EdgeEmphasis {
        self.edge_emphasis
            .get(edge_id)
            .copied()
            .unwrap_or(EdgeEmphasis::Dim)
    }

    /// Nodes in one tier, sorted by id.
    pub fn nodes_in(&self, tier: Tier) -> Vec<&NodeId> {
        let mut ids: Vec<&NodeId> = self
            .node_tiers
            .iter()
            .filter(|(_, t)| **t == tier)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }
}

/// Computes per-node and per-edge visual tiers from the current selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualHierarchyCalculator;

impl VisualHierarchyCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Classify entities relative to the selection.
    pub fn classify_entities(
        &self,
        snapshot: &GameSnapshot,
        selected: Option<&EntityId>,
    ) -> EntityTiers {
        let Some(selected_id) = selected else {
            return EntityTiers::NoSelection;
        };
        let Some(selected) = snapshot.get(selected_id) else {
            tracing::debug!(
                target: "graph_core::hierarchy",
                id = %selected_id,
                "hierarchy.selection_unmatched"
            );
            return EntityTiers::Unmatched;
        };

        let id = &selected.id;
        let targets_of = |kind: RelationshipKind| -> Vec<EntityId> {
            snapshot
                .relationships()
                .iter()
                .filter(|r| r.kind == kind && &r.source == id)
                .map(|r| r.target.clone())
                .collect()
        };
        let sources_of = |kind: RelationshipKind| -> Vec<EntityId> {
            snapshot
                .relationships()
                .iter()
                .filter(|r| r.kind == kind && &r.target == id)
                .map(|r| r.source.clone())
                .collect()
        };

        let mut connected: HashSet<EntityId> = HashSet::new();
        let mut secondary: HashSet<EntityId> = HashSet::new();

        match selected.kind {
            EntityKind::Character => {
                let owned: HashSet<EntityId> =
                    targets_of(RelationshipKind::Ownership).into_iter().collect();
                let contained = snapshot
                    .relationships()
                    .iter()
                    .filter(|r| r.kind == RelationshipKind::Containment && owned.contains(&r.source))
                    .map(|r| r.target.clone());
                connected.extend(contained);
                connected.extend(owned);

                secondary.extend(
                    snapshot
                        .relationships_of(id, RelationshipKind::CharacterLink)
                        .filter_map(|r| r.other_end(id).cloned()),
                );
            }
            EntityKind::Element => {
                connected.extend(sources_of(RelationshipKind::Ownership));
                connected.extend(sources_of(RelationshipKind::Containment));
                connected.extend(targets_of(RelationshipKind::Containment));
            }
            EntityKind::Puzzle => {
                connected.extend(targets_of(RelationshipKind::PuzzleRequires));
                connected.extend(targets_of(RelationshipKind::PuzzleRewards));
            }
            EntityKind::TimelineEvent => {
                connected.extend(targets_of(RelationshipKind::TimelineReveals));
            }
        }

        connected.remove(id);
        secondary.remove(id);
        secondary.retain(|other| !connected.contains(other));

        EntityTiers::Matched {
            selected: id.clone(),
            connected,
            secondary,
        }
    }

    /// Classify rendered nodes and edges.
    ///
    /// An aggregate node takes the most prominent tier among its members.
    pub fn compute(
        &self,
        snapshot: &GameSnapshot,
        selected: Option<&EntityId>,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Hierarchy {
        let entity_tiers = self.classify_entities(snapshot, selected);

        let node_tiers: HashMap<NodeId, Tier> = nodes
            .iter()
            .map(|node| {
                let tier = node
                    .entity_ids()
                    .into_iter()
                    .map(|id| entity_tiers.tier_of(id))
                    .min()
                    .unwrap_or(Tier::Background);
                (node.id().clone(), tier)
            })
            .collect();

        let has_selection = entity_tiers.has_selection();
        let edge_emphasis = edges
            .iter()
            .map(|edge| {
                let emphasis = if !has_selection {
                    EdgeEmphasis::Relevant
                } else {
                    classify_edge(&node_tiers, edge)
                };
                (edge.id.clone(), emphasis)
            })
            .collect();

        Hierarchy {
            has_selection,
            node_tiers,
            edge_emphasis,
        }
    }
}

fn classify_edge(node_tiers: &HashMap<NodeId, Tier>, edge: &Edge) -> EdgeEmphasis {
    let tier = |id: &NodeId| node_tiers.get(id).copied().unwrap_or(Tier::Background);
    let (source, target) = (tier(&edge.source), tier(&edge.target));
    if source == Tier::Selected || target == Tier::Selected {
        EdgeEmphasis::Focused
    } else if source != Tier::Background && target != Tier::Background {
        EdgeEmphasis::Relevant
    } else {
        EdgeEmphasis::Dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{build_edges, SimpleNode};
    use game_model::Entity;

    fn simple_nodes(snapshot: &GameSnapshot) -> Vec<Node> {
        snapshot
            .entities()
            .iter()
            .cloned()
            .map(|e| Node::Simple(SimpleNode::new(e)))
            .collect()
    }

    fn world() -> GameSnapshot {
        GameSnapshot::new(vec![
            Entity::character("alex", "Alex").linked_to(["sam"]),
            Entity::character("sam", "Sam"),
            Entity::character("kai", "Kai"),
            Entity::element("box", "Box").owned_by("alex").containing(["key"]),
            Entity::element("key", "Key").contained_in("box"),
            Entity::element("badge", "Badge").owned_by("sam"),
            Entity::element("photo", "Photo").revealing("party"),
            Entity::puzzle("safe", "Safe").requiring(["key"]).rewarding(["badge"]),
            Entity::timeline_event("party", "The Party"),
        ])
    }

    fn tiers_for(snapshot: &GameSnapshot, selected: &str) -> Hierarchy {
        let nodes = simple_nodes(snapshot);
        let edges = build_edges(&nodes, snapshot.relationships());
        VisualHierarchyCalculator::new().compute(
            snapshot,
            Some(&EntityId::from(selected)),
            &nodes,
            &edges,
        )
    }

    #[test]
    fn test_character_selection() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "alex");

        assert_eq!(h.tier(&"alex".into()), Tier::Selected);
        assert_eq!(h.tier(&"box".into()), Tier::Connected);
        // One hop of containment through an owned element.
        assert_eq!(h.tier(&"key".into()), Tier::Connected);
        assert_eq!(h.tier(&"sam".into()), Tier::SecondaryConnected);
        assert_eq!(h.tier(&"kai".into()), Tier::Background);
        assert_eq!(h.tier(&"badge".into()), Tier::Background);
    }

    #[test]
    fn test_element_selection() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "key");

        assert_eq!(h.tier(&"box".into()), Tier::Connected);
        assert_eq!(h.tier(&"alex".into()), Tier::Background);

        let h = tiers_for(&snapshot, "box");
        assert_eq!(h.tier(&"alex".into()), Tier::Connected);
        assert_eq!(h.tier(&"key".into()), Tier::Connected);
    }

    #[test]
    fn test_puzzle_selection() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "safe");
        assert_eq!(
            h.nodes_in(Tier::Connected),
            vec![&NodeId::from("badge"), &NodeId::from("key")]
        );
    }

    #[test]
    fn test_timeline_selection() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "party");
        assert_eq!(h.nodes_in(Tier::Connected), vec![&NodeId::from("photo")]);
    }

    #[test]
    fn test_no_selection_is_full_visibility() {
        let snapshot = world();
        let nodes = simple_nodes(&snapshot);
        let edges = build_edges(&nodes, snapshot.relationships());
        let h = VisualHierarchyCalculator::new().compute(&snapshot, None, &nodes, &edges);

        assert!(!h.has_selection);
        assert_eq!(h.nodes_in(Tier::Selected).len(), nodes.len());
        assert_eq!(h.visual_state(&"kai".into()), VisualState::FULL);
        assert!(h.edge_emphasis.values().all(|e| *e == EdgeEmphasis::Relevant));
    }

    #[test]
    fn test_unmatched_selection_is_all_background() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "ghost");

        assert!(h.has_selection);
        assert_eq!(h.nodes_in(Tier::Background).len(), snapshot.len());
        assert!(h.edge_emphasis.values().all(|e| *e == EdgeEmphasis::Dim));
    }

    #[test]
    fn test_edge_emphasis() {
        let snapshot = world();
        let h = tiers_for(&snapshot, "alex");

        assert_eq!(h.emphasis("ownership:alex->box"), EdgeEmphasis::Focused);
        assert_eq!(h.emphasis("containment:box->key"), EdgeEmphasis::Relevant);
        assert_eq!(h.emphasis("ownership:sam->badge"), EdgeEmphasis::Dim);
    }

    #[test]
    fn test_aggregate_takes_best_member_tier() {
        use crate::aggregation::GroupKey;
        use crate::node::AggregateNode;

        let snapshot = world();
        let key = GroupKey::for_kind(EntityKind::Element);
        let aggregate = Node::Aggregate(AggregateNode {
            id: key.node_id(),
            group_key: key,
            kind: EntityKind::Element,
            member_ids: ["badge", "key"].into_iter().map(EntityId::from).collect(),
            is_expanded: false,
            label: "2 Elements".to_string(),
            residual: None,
        });

        let h = VisualHierarchyCalculator::new().compute(
            &snapshot,
            Some(&"alex".into()),
            &[aggregate],
            &[],
        );
        assert_eq!(h.tier(&NodeId::from("group:element:ungrouped")), Tier::Connected);
    }
}
