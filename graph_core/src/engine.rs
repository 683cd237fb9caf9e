//! The engine facade: owns every state slice, turns user interaction into
//! state changes and produces render frames.
//!
//! Render pipeline:
//! 1. **Aggregate**: bound the node set by the budget
//! 2. **Edges**: lift snapshot relationships onto the rendered nodes
//! 3. **Layout**: ask the layout collaborator for positions
//! 4. **Cull**: drop off-screen nodes when the set is still above the cull threshold
//! 5. **Hierarchy**: classify nodes and edges relative to the selection

use game_model::{Entity, EntityId, GameSnapshot};
use serde::{Deserialize, Serialize};

use crate::aggregation::{Aggregation, ExpansionState, GraphAggregator};
use crate::config::{load_config_from_env, EngineConfig};
use crate::error::PersistError;
use crate::hierarchy::{EdgeEmphasis, EdgeStyle, Tier, VisualHierarchyCalculator, VisualState};
use crate::layers::{IntelligenceLayer, IntelligenceLayerArbiter, LayerToggle};
use crate::layout::LayoutEngine;
use crate::node::{build_edges, Edge, Node, NodeId, SimpleNode};
use crate::observer::Subscription;
use crate::performance::{PerformanceMode, PerformanceModeController, PerformanceState};
use crate::persistence::{KeyValueStore, PersistedView};
use crate::selection::{SelectionController, SelectionState, ViewMode};
use crate::viewport::{Position, Viewport, ViewportCuller};

/// A node ready for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub node: Node,
    pub tier: Tier,
    pub visual: VisualState,
    pub position: Option<Position>,
    /// Zoomed out far enough that labels should not be drawn.
    pub hide_label: bool,
}

/// An edge ready for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub edge: Edge,
    pub emphasis: EdgeEmphasis,
    pub style: EdgeStyle,
    /// Touches the hovered node.
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    /// Whether some entities are hidden behind aggregate nodes.
    pub aggregated: bool,
    /// Nodes removed by viewport culling.
    pub culled: usize,
}

impl RenderFrame {
    pub fn node(&self, id: &NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.node.id() == id)
    }

    pub fn edge(&self, id: &str) -> Option<&RenderEdge> {
        self.edges.iter().find(|e| e.edge.id == id)
    }

    pub fn node_ids(&self) -> Vec<&NodeId> {
        self.nodes.iter().map(|n| n.node.id()).collect()
    }

    pub fn visible_node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_in(&self, tier: Tier) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.tier == tier)
            .map(|n| n.node.id())
            .collect()
    }
}

/// What a node click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(EntityId),
    Expanded(NodeId),
    Collapsed(NodeId),
}

pub struct GraphEngine {
    config: EngineConfig,
    aggregator: GraphAggregator,
    culler: ViewportCuller,
    calculator: VisualHierarchyCalculator,
    selection: SelectionController,
    layers: IntelligenceLayerArbiter,
    performance: PerformanceModeController,
    expansion: ExpansionState,
    hovered: Option<NodeId>,
}

impl GraphEngine {
    /// Out-of-range config values are raised to valid ones, see
    /// [`EngineConfig::sanitized`].
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        Self {
            aggregator: GraphAggregator::new(&config),
            culler: ViewportCuller::new(&config),
            calculator: VisualHierarchyCalculator::new(),
            selection: SelectionController::new(),
            layers: IntelligenceLayerArbiter::new(),
            performance: PerformanceModeController::new(&config),
            expansion: ExpansionState::new(),
            hovered: None,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Build an engine from `GRAPH_CORE_CONFIG_PATH`, or the builtin config.
    pub fn from_env() -> Self {
        let (config, _) = load_config_from_env();
        Self::new(config)
    }

    /// Replace the aggregator, e.g. to register a grouping for a new kind.
    pub fn with_aggregator(mut self, aggregator: GraphAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn selected(&self) -> Option<&Entity> {
        self.selection.selected()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.selection.view_mode()
    }

    pub fn active_layers(&self) -> &[IntelligenceLayer] {
        self.layers.active()
    }

    pub fn performance(&self) -> PerformanceState {
        self.performance.state()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn hovered(&self) -> Option<&NodeId> {
        self.hovered.as_ref()
    }

    pub fn subscribe_selection(
        &mut self,
        callback: impl Fn(&SelectionState) + 'static,
    ) -> Subscription {
        self.selection.subscribe(callback)
    }

    pub fn subscribe_layers(
        &mut self,
        callback: impl Fn(&Vec<IntelligenceLayer>) + 'static,
    ) -> Subscription {
        self.layers.subscribe(callback)
    }

    pub fn subscribe_performance(
        &mut self,
        callback: impl Fn(&PerformanceState) + 'static,
    ) -> Subscription {
        self.performance.subscribe(callback)
    }

    /// Select an entity, or deselect with `None`. Deselecting collapses
    /// every expanded group.
    pub fn select_entity(&mut self, entity: Option<Entity>) {
        if entity.is_none() {
            self.expansion.collapse_all();
        }
        self.selection.select_entity(entity);
    }

    /// Select the snapshot entity with this id. Returns `false` and leaves
    /// the selection alone when the id is unknown.
    pub fn select_by_id(&mut self, snapshot: &GameSnapshot, id: &EntityId) -> bool {
        match snapshot.get(id) {
            Some(entity) => {
                self.select_entity(Some(entity.clone()));
                true
            }
            None => {
                tracing::debug!(
                    target: "graph_core::engine",
                    id = %id,
                    "engine.select_by_id.unknown"
                );
                false
            }
        }
    }

    pub fn navigate_back(&mut self) -> bool {
        self.selection.navigate_back()
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        self.selection.set_view_mode(mode)
    }

    /// Clicking an aggregate toggles its group; clicking a residual node
    /// collapses the partially expanded group it belongs to; clicking an
    /// entity node selects it.
    pub fn on_node_click(&mut self, node: &Node) -> ClickOutcome {
        match node {
            Node::Simple(simple) => {
                self.select_entity(Some(simple.entity.clone()));
                ClickOutcome::Selected(simple.entity.id.clone())
            }
            Node::Aggregate(aggregate) => {
                let group_id = aggregate.group_id();
                let expanded = self.expansion.toggle(&group_id);
                tracing::debug!(
                    target: "graph_core::engine",
                    group = %group_id,
                    expanded,
                    residual = aggregate.residual.is_some(),
                    "engine.group_toggled"
                );
                if expanded {
                    ClickOutcome::Expanded(group_id)
                } else {
                    ClickOutcome::Collapsed(group_id)
                }
            }
        }
    }

    pub fn on_node_hover(&mut self, node: Option<NodeId>) {
        self.hovered = node;
    }

    /// Background click: deselect and collapse.
    pub fn on_pane_click(&mut self) {
        self.hovered = None;
        self.select_entity(None);
    }

    pub fn on_escape(&mut self) {
        self.on_pane_click();
    }

    pub fn toggle_layer(&mut self, layer: IntelligenceLayer) -> LayerToggle {
        self.layers.toggle(layer)
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    pub fn set_performance_mode(&mut self, mode: PerformanceMode) {
        self.performance.set_mode(mode);
    }

    /// Run the aggregation pipeline without touching any state.
    pub fn compute_frame(
        &self,
        snapshot: &GameSnapshot,
        layout: &dyn LayoutEngine,
        viewport: Option<&Viewport>,
    ) -> RenderFrame {
        let Aggregation {
            nodes, aggregated, ..
        } = self
            .aggregator
            .aggregate(snapshot, self.selection.selected_id(), &self.expansion);
        self.assemble(snapshot, nodes, aggregated, layout, viewport)
    }

    /// Render the aggregated graph and report the visible node count to the
    /// performance controller.
    pub fn render(
        &mut self,
        snapshot: &GameSnapshot,
        layout: &dyn LayoutEngine,
        viewport: Option<&Viewport>,
    ) -> RenderFrame {
        let frame = self.compute_frame(snapshot, layout, viewport);
        self.performance.update_node_count(frame.visible_node_count());
        frame
    }

    /// Render every entity individually, relying on viewport culling alone
    /// to bound the output.
    pub fn render_unaggregated(
        &mut self,
        snapshot: &GameSnapshot,
        layout: &dyn LayoutEngine,
        viewport: Option<&Viewport>,
    ) -> RenderFrame {
        let nodes: Vec<Node> = snapshot
            .entities()
            .iter()
            .cloned()
            .map(|entity| Node::Simple(SimpleNode::new(entity)))
            .collect();
        let frame = self.assemble(snapshot, nodes, false, layout, viewport);
        self.performance.update_node_count(frame.visible_node_count());
        frame
    }

    fn assemble(
        &self,
        snapshot: &GameSnapshot,
        nodes: Vec<Node>,
        aggregated: bool,
        layout: &dyn LayoutEngine,
        viewport: Option<&Viewport>,
    ) -> RenderFrame {
        let edges = build_edges(&nodes, snapshot.relationships());
        let positions = layout.positions(&nodes, &edges);

        let (nodes, edges, hide_labels, culled) = match viewport {
            Some(viewport) if self.culler.is_active(nodes.len()) => {
                let culled = self.culler.cull(nodes, edges, &positions, viewport);
                (culled.nodes, culled.edges, culled.hide_labels, culled.removed)
            }
            _ => (nodes, edges, false, 0),
        };

        let selected = self.selection.selected_id();
        let hierarchy = self.calculator.compute(snapshot, selected, &nodes, &edges);

        let hovered = self.hovered.as_ref();
        let edges = edges
            .into_iter()
            .map(|edge| {
                let emphasis = hierarchy.emphasis(&edge.id);
                let highlighted =
                    hovered.is_some_and(|h| *h == edge.source || *h == edge.target);
                RenderEdge {
                    style: emphasis.style(),
                    emphasis,
                    highlighted,
                    edge,
                }
            })
            .collect();
        let nodes = nodes
            .into_iter()
            .map(|node| RenderNode {
                tier: hierarchy.tier(node.id()),
                visual: hierarchy.visual_state(node.id()),
                position: positions.get(node.id()).copied(),
                hide_label: hide_labels,
                node,
            })
            .collect();

        RenderFrame {
            nodes,
            edges,
            aggregated,
            culled,
        }
    }

    pub fn persisted_view(&self) -> PersistedView {
        PersistedView {
            selected: self.selection.selected().cloned(),
            view_mode: self.selection.view_mode(),
            active_layers: self.layers.active().to_vec(),
            performance_override: self.performance.state().user_override,
        }
    }

    /// Restore persisted state. History, expansion, hover and the visible
    /// node count start empty.
    pub fn restore_view(&mut self, view: PersistedView) {
        self.expansion.collapse_all();
        self.hovered = None;
        self.selection.restore(view.selected, view.view_mode);
        self.layers.restore(&view.active_layers);
        self.performance.restore(view.performance_override);
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), PersistError> {
        self.persisted_view().save(store)
    }

    /// Restore from a store. Missing or unreadable state falls back to the
    /// defaults; returns whether stored state was applied.
    pub fn load(&mut self, store: &dyn KeyValueStore) -> bool {
        match PersistedView::load(store) {
            Ok(Some(view)) => {
                self.restore_view(view);
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(
                    target: "graph_core::engine",
                    error = %err,
                    "engine.load.fallback_to_defaults"
                );
                self.restore_view(PersistedView::default());
                false
            }
        }
    }
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("selected", &self.selection.selected_id())
            .field("view_mode", &self.selection.view_mode())
            .field("active_layers", &self.layers.active())
            .field("performance", &self.performance.state())
            .field("expanded", &self.expansion.expanded())
            .finish()
    }
}
