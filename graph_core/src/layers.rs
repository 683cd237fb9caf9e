//! Intelligence layers - the bounded set of active analysis overlays.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LayerParseError;
use crate::observer::{Listeners, Subscription};

/// Maximum number of simultaneously active layers.
pub const MAX_ACTIVE_LAYERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntelligenceLayer {
    Story,
    Social,
    Economic,
    Production,
    Gaps,
}

impl IntelligenceLayer {
    pub const ALL: [IntelligenceLayer; 5] = [
        IntelligenceLayer::Story,
        IntelligenceLayer::Social,
        IntelligenceLayer::Economic,
        IntelligenceLayer::Production,
        IntelligenceLayer::Gaps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntelligenceLayer::Story => "story",
            IntelligenceLayer::Social => "social",
            IntelligenceLayer::Economic => "economic",
            IntelligenceLayer::Production => "production",
            IntelligenceLayer::Gaps => "gaps",
        }
    }
}

impl std::fmt::Display for IntelligenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntelligenceLayer {
    type Err = LayerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntelligenceLayer::ALL
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LayerParseError(s.to_string()))
    }
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerToggle {
    Activated,
    Deactivated,
    /// Activated after evicting the least recently activated layer.
    ActivatedWithEviction { evicted: IntelligenceLayer },
}

/// Keeps at most [`MAX_ACTIVE_LAYERS`] layers active, ordered by activation
/// (least recent first). Independent of the selection.
#[derive(Debug, Default)]
pub struct IntelligenceLayerArbiter {
    active: Vec<IntelligenceLayer>,
    listeners: Listeners<Vec<IntelligenceLayer>>,
}

impl IntelligenceLayerArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &[IntelligenceLayer] {
        &self.active
    }

    pub fn is_active(&self, layer: IntelligenceLayer) -> bool {
        self.active.contains(&layer)
    }

    pub fn subscribe(
        &mut self,
        callback: impl Fn(&Vec<IntelligenceLayer>) + 'static,
    ) -> Subscription {
        self.listeners.subscribe(callback)
    }

    /// Deactivate an active layer, or activate an inactive one, evicting the
    /// least recently activated layer when the set is full.
    pub fn toggle(&mut self, layer: IntelligenceLayer) -> LayerToggle {
        let outcome = if let Some(position) = self.active.iter().position(|l| *l == layer) {
            self.active.remove(position);
            LayerToggle::Deactivated
        } else if self.active.len() >= MAX_ACTIVE_LAYERS {
            let evicted = self.active.remove(0);
            self.active.push(layer);
            tracing::debug!(
                target: "graph_core::layers",
                layer = %layer,
                evicted = %evicted,
                "layers.evicted"
            );
            LayerToggle::ActivatedWithEviction { evicted }
        } else {
            self.active.push(layer);
            LayerToggle::Activated
        };
        self.notify();
        outcome
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.notify();
    }

    /// Replace the active set from a persisted snapshot, keeping the first
    /// occurrence of each layer and at most the newest [`MAX_ACTIVE_LAYERS`].
    pub fn restore(&mut self, layers: &[IntelligenceLayer]) {
        let mut active: Vec<IntelligenceLayer> = Vec::new();
        for layer in layers {
            if !active.contains(layer) {
                active.push(*layer);
            }
        }
        let excess = active.len().saturating_sub(MAX_ACTIVE_LAYERS);
        active.drain(..excess);
        self.active = active;
        self.notify();
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.active);
    }
}
