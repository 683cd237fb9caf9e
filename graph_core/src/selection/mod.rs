//! Selection state machine: current selection, bounded history and view mode.
//!
//! Invariants:
//! - `history.len() <= HISTORY_LIMIT`, oldest first
//! - `selected.is_none()` exactly when `view_mode == ViewMode::Overview`

mod history;

pub use history::*;

use game_model::{Entity, EntityId};
use serde::{Deserialize, Serialize};

use crate::observer::{Listeners, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Overview,
    EntityFocus,
    IntelligenceDeepDive,
}

impl ViewMode {
    /// Whether this mode is consistent with having a selection.
    pub fn requires_selection(&self) -> bool {
        !matches!(self, ViewMode::Overview)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected: Option<Entity>,
    pub history: SelectionHistory,
    pub view_mode: ViewMode,
}

impl SelectionState {
    pub fn selected_id(&self) -> Option<&EntityId> {
        self.selected.as_ref().map(|e| &e.id)
    }
}

/// Owns the selection state and notifies subscribers after every mutation.
#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
    listeners: Listeners<SelectionState>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&Entity> {
        self.state.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&EntityId> {
        self.state.selected_id()
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.state.history
    }

    pub fn view_mode(&self) -> ViewMode {
        self.state.view_mode
    }

    pub fn subscribe(&mut self, callback: impl Fn(&SelectionState) + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    /// Select an entity, or clear the selection with `None`.
    ///
    /// A different current selection is pushed onto the history. Selecting
    /// the same id again leaves the history alone but still notifies.
    pub fn select_entity(&mut self, entity: Option<Entity>) {
        let same = match (&self.state.selected, &entity) {
            (Some(current), Some(next)) => current.id == next.id,
            (None, None) => true,
            _ => false,
        };
        if !same {
            if let Some(previous) = self.state.selected.take() {
                if let Some(evicted) = self.state.history.push(previous) {
                    tracing::trace!(
                        target: "graph_core::selection",
                        evicted = %evicted.id,
                        "selection.history.evicted"
                    );
                }
            }
        }

        self.state.view_mode = if entity.is_some() {
            ViewMode::EntityFocus
        } else {
            ViewMode::Overview
        };
        self.state.selected = entity;

        tracing::debug!(
            target: "graph_core::selection",
            selected = ?self.state.selected_id(),
            history = self.state.history.len(),
            repeated = same,
            "selection.changed"
        );
        self.notify();
    }

    /// Return to the most recent history entry. No-op on an empty history.
    pub fn navigate_back(&mut self) -> bool {
        let Some(previous) = self.state.history.pop() else {
            return false;
        };
        self.state.selected = Some(previous);
        self.state.view_mode = ViewMode::EntityFocus;

        tracing::debug!(
            target: "graph_core::selection",
            selected = ?self.state.selected_id(),
            history = self.state.history.len(),
            "selection.navigate_back"
        );
        self.notify();
        true
    }

    /// Override the view mode without touching the selection.
    ///
    /// Rejected (returns `false`) when the mode contradicts the selection:
    /// `Overview` with a selection, or a focus mode without one.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if mode.requires_selection() != self.state.selected.is_some() {
            tracing::debug!(
                target: "graph_core::selection",
                requested = ?mode,
                has_selection = self.state.selected.is_some(),
                "selection.view_mode_rejected"
            );
            return false;
        }
        self.state.view_mode = mode;
        self.notify();
        true
    }

    /// Replace the whole state from a persisted snapshot. History starts empty.
    pub fn restore(&mut self, selected: Option<Entity>, view_mode: ViewMode) {
        let view_mode = match (&selected, view_mode) {
            (None, _) => ViewMode::Overview,
            (Some(_), ViewMode::Overview) => ViewMode::EntityFocus,
            (Some(_), mode) => mode,
        };
        self.state = SelectionState {
            selected,
            history: SelectionHistory::new(),
            view_mode,
        };
        self.notify();
    }

    fn notify(&mut self) {
        self.listeners.notify(&self.state);
    }
}
