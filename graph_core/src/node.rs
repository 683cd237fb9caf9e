//! Renderable graph units: nodes wrapping one entity or summarizing many,
//! and the edges derived between them.

use game_model::{Entity, EntityId, EntityKind, Relationship, RelationshipKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::aggregation::GroupKey;

/// Stable identifier for a rendered node, used by renderers for diffing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EntityId> for NodeId {
    fn from(id: &EntityId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node wrapping exactly one entity. Its id is the entity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleNode {
    pub id: NodeId,
    pub entity: Entity,
}

impl SimpleNode {
    pub fn new(entity: Entity) -> Self {
        Self {
            id: NodeId::from(&entity.id),
            entity,
        }
    }
}

/// Members hidden behind a partial expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Residual {
    pub shown: usize,
    pub total: usize,
}

/// A node standing in for a non-empty set of same-kind entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateNode {
    pub id: NodeId,
    pub group_key: GroupKey,
    pub kind: EntityKind,
    pub member_ids: BTreeSet<EntityId>,
    pub is_expanded: bool,
    pub label: String,
    /// Set when this node holds the remainder of a partially expanded group.
    pub residual: Option<Residual>,
}

impl AggregateNode {
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    /// Id of the group this node belongs to. Residual nodes report their parent group.
    pub fn group_id(&self) -> NodeId {
        self.group_key.node_id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Simple(SimpleNode),
    Aggregate(AggregateNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Simple(node) => &node.id,
            Node::Aggregate(node) => &node.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Node::Simple(node) => node.entity.kind,
            Node::Aggregate(node) => node.kind,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Node::Simple(node) => node.entity.display_label(),
            Node::Aggregate(node) => node.label.clone(),
        }
    }

    /// Entities represented by this node.
    pub fn entity_ids(&self) -> Vec<&EntityId> {
        match self {
            Node::Simple(node) => vec![&node.entity.id],
            Node::Aggregate(node) => node.member_ids.iter().collect(),
        }
    }

    pub fn represents(&self, id: &EntityId) -> bool {
        match self {
            Node::Simple(node) => &node.entity.id == id,
            Node::Aggregate(node) => node.member_ids.contains(id),
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateNode> {
        match self {
            Node::Aggregate(node) => Some(node),
            Node::Simple(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Node::Simple(node) => Some(&node.entity),
            Node::Aggregate(_) => None,
        }
    }
}

/// A link between two rendered nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: RelationshipKind,
    /// Number of entity-level relationships folded into this edge.
    pub weight: u32,
}

/// Lift entity relationships onto the rendered node set.
///
/// Relationships with an endpoint outside `nodes` are dropped, as are those
/// whose endpoints fall into the same node. Parallel relationships of one
/// kind between the same node pair merge into a single weighted edge.
pub fn build_edges(nodes: &[Node], relationships: &[Relationship]) -> Vec<Edge> {
    let mut owner: HashMap<&EntityId, &NodeId> = HashMap::new();
    for node in nodes {
        for entity_id in node.entity_ids() {
            owner.insert(entity_id, node.id());
        }
    }

    let mut merged: BTreeMap<(RelationshipKind, &NodeId, &NodeId), u32> = BTreeMap::new();
    for rel in relationships {
        let (Some(&source), Some(&target)) = (owner.get(&rel.source), owner.get(&rel.target))
        else {
            continue;
        };
        if source == target {
            continue;
        }
        let (source, target) = if !rel.kind.is_directed() && target < source {
            (target, source)
        } else {
            (source, target)
        };
        *merged.entry((rel.kind, source, target)).or_default() += 1;
    }

    merged
        .into_iter()
        .map(|((kind, source, target), weight)| Edge {
            id: format!("{}:{}->{}", kind.slug(), source, target),
            source: source.clone(),
            target: target.clone(),
            kind,
            weight,
        })
        .collect()
}

/// Drop edges whose endpoints are not both present.
pub fn retain_connected(edges: &mut Vec<Edge>, present: &HashSet<&NodeId>) {
    edges.retain(|edge| present.contains(&edge.source) && present.contains(&edge.target));
}
