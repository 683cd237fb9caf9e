//! Performance mode: automatic switch to cheap rendering for busy graphs,
//! with a sticky user override.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::observer::{Listeners, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    /// Quality rendering, switched automatically by node count.
    #[default]
    Auto,
    Quality,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformanceState {
    pub mode: PerformanceMode,
    pub user_override: Option<PerformanceMode>,
    pub visible_node_count: usize,
}

impl PerformanceState {
    /// Whether the renderer should drop expensive effects.
    pub fn is_reduced(&self) -> bool {
        self.mode == PerformanceMode::Performance
    }

    fn auto_switching(&self) -> bool {
        matches!(self.user_override, None | Some(PerformanceMode::Auto))
    }
}

#[derive(Debug)]
pub struct PerformanceModeController {
    state: PerformanceState,
    node_threshold: usize,
    listeners: Listeners<PerformanceState>,
}

impl PerformanceModeController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: PerformanceState::default(),
            node_threshold: config.performance.node_threshold,
            listeners: Listeners::new(),
        }
    }

    pub fn state(&self) -> PerformanceState {
        self.state
    }

    pub fn mode(&self) -> PerformanceMode {
        self.state.mode
    }

    pub fn subscribe(&mut self, callback: impl Fn(&PerformanceState) + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    /// Record the visible node count and, unless the user pinned a mode,
    /// switch to performance at or above the threshold and back to auto below it.
    pub fn update_node_count(&mut self, count: usize) {
        let before = self.state;
        self.state.visible_node_count = count;

        if self.state.auto_switching() {
            self.state.mode = if count >= self.node_threshold {
                PerformanceMode::Performance
            } else {
                PerformanceMode::Auto
            };
        }

        if self.state.mode != before.mode {
            tracing::info!(
                target: "graph_core::performance",
                from = ?before.mode,
                to = ?self.state.mode,
                visible_node_count = count,
                "performance.mode_switched"
            );
        }
        if self.state != before {
            self.notify();
        }
    }

    /// Pin a mode. `Auto` re-enables automatic switching from the next update.
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        self.state.user_override = Some(mode);
        self.state.mode = mode;
        tracing::debug!(
            target: "graph_core::performance",
            mode = ?mode,
            "performance.override_set"
        );
        self.notify();
    }

    /// Restore a persisted override. The visible count starts at zero.
    pub fn restore(&mut self, user_override: Option<PerformanceMode>) {
        self.state = PerformanceState {
            mode: user_override.unwrap_or_default(),
            user_override,
            visible_node_count: 0,
        };
        self.notify();
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.state);
    }
}
