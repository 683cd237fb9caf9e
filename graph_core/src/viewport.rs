//! Viewport culling for oversized graphs, and throttling of viewport updates.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::node::{retain_connected, Edge, Node, NodeId};

/// A graph-space position produced by the layout collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Camera state: screen-space pan offset, zoom factor and screen size.
///
/// A graph point `p` appears on screen at `p * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, zoom: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            zoom,
            width,
            height,
        }
    }
}

/// Axis-aligned rectangle in graph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }
}

/// Output of a culling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Culled {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Render hint: labels should be hidden on surviving nodes.
    pub hide_labels: bool,
    /// Nodes removed by the pass.
    pub removed: usize,
}

/// Filters nodes to the visible viewport once the graph exceeds the threshold.
#[derive(Debug, Clone, Copy)]
pub struct ViewportCuller {
    threshold: usize,
    padding: f32,
    label_zoom_threshold: f32,
}

impl ViewportCuller {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.cull_threshold,
            padding: config.viewport.padding,
            label_zoom_threshold: config.viewport.label_zoom_threshold,
        }
    }

    /// Culling only applies above the threshold.
    pub fn is_active(&self, node_count: usize) -> bool {
        node_count > self.threshold
    }

    /// The padded visible rectangle in graph space.
    ///
    /// Returns `None` for a degenerate zoom.
    pub fn visible_bounds(&self, viewport: &Viewport) -> Option<Bounds> {
        if !(viewport.zoom.is_finite() && viewport.zoom > 0.0) {
            return None;
        }
        let to_graph_x = |screen: f32| (screen - viewport.x) / viewport.zoom;
        let to_graph_y = |screen: f32| (screen - viewport.y) / viewport.zoom;
        Some(Bounds {
            min_x: to_graph_x(0.0) - self.padding,
            min_y: to_graph_y(0.0) - self.padding,
            max_x: to_graph_x(viewport.width) + self.padding,
            max_y: to_graph_y(viewport.height) + self.padding,
        })
    }

    /// Drop nodes positioned outside the viewport and edges left dangling.
    ///
    /// Nodes without a position are kept. Below the threshold the input is
    /// returned unchanged.
    pub fn cull(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        positions: &HashMap<NodeId, Position>,
        viewport: &Viewport,
    ) -> Culled {
        let passthrough = |nodes, edges| Culled {
            nodes,
            edges,
            hide_labels: false,
            removed: 0,
        };
        if !self.is_active(nodes.len()) {
            return passthrough(nodes, edges);
        }
        let Some(bounds) = self.visible_bounds(viewport) else {
            tracing::debug!(
                target: "graph_core::viewport",
                zoom = viewport.zoom,
                "viewport.cull_skipped.degenerate_zoom"
            );
            return passthrough(nodes, edges);
        };

        let before = nodes.len();
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| positions.get(node.id()).map_or(true, |p| bounds.contains(*p)))
            .collect();
        let present: HashSet<&NodeId> = nodes.iter().map(Node::id).collect();
        let mut edges = edges;
        retain_connected(&mut edges, &present);
        let removed = before - nodes.len();

        tracing::trace!(
            target: "graph_core::viewport",
            before,
            removed,
            "viewport.culled"
        );

        Culled {
            nodes,
            edges,
            hide_labels: viewport.zoom < self.label_zoom_threshold,
            removed,
        }
    }
}

/// Admits at most one viewport update per interval.
#[derive(Debug, Clone)]
pub struct ViewportThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ViewportThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.viewport.throttle_interval())
    }

    /// Whether an update arriving at `now` should be processed.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
