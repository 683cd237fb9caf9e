//! Layout collaborator interface.

use std::collections::HashMap;

use crate::node::{Edge, Node, NodeId};
use crate::viewport::Position;

/// Assigns graph-space positions to rendered nodes.
///
/// Nodes missing from the returned map are treated as unpositioned.
pub trait LayoutEngine {
    fn positions(&self, nodes: &[Node], edges: &[Edge]) -> HashMap<NodeId, Position>;
}

/// Places nodes row by row on a square-ish grid of `ceil(sqrt(n))` columns,
/// in input order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub spacing: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { spacing: 120.0 }
    }
}

impl GridLayout {
    pub fn new(spacing: f32) -> Self {
        Self { spacing }
    }
}

impl LayoutEngine for GridLayout {
    fn positions(&self, nodes: &[Node], _edges: &[Edge]) -> HashMap<NodeId, Position> {
        let columns = ((nodes.len() as f64).sqrt().ceil() as usize).max(1);
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let column = (i % columns) as f32;
                let row = (i / columns) as f32;
                (
                    node.id().clone(),
                    Position::new(column * self.spacing, row * self.spacing),
                )
            })
            .collect()
    }
}

/// No positions at all; every node counts as unpositioned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutEngine for NoLayout {
    fn positions(&self, _nodes: &[Node], _edges: &[Edge]) -> HashMap<NodeId, Position> {
        HashMap::new()
    }
}
