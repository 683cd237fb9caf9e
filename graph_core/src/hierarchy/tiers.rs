//! Tier and emphasis classifications and the visual properties they map to.

use serde::{Deserialize, Serialize};

/// Visual-hierarchy classification of a node relative to the selection.
///
/// Ordered by prominence: `Selected` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Selected,
    Connected,
    SecondaryConnected,
    Background,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Selected,
        Tier::Connected,
        Tier::SecondaryConnected,
        Tier::Background,
    ];

    /// Visual properties for this tier while something is selected.
    pub fn visual_state(&self) -> VisualState {
        match self {
            Tier::Selected => VisualState {
                opacity: 1.0,
                scale: 1.15,
                z_index: 1000,
                show_label: true,
            },
            Tier::Connected => VisualState {
                opacity: 1.0,
                scale: 1.0,
                z_index: 500,
                show_label: true,
            },
            Tier::SecondaryConnected => VisualState {
                opacity: 0.7,
                scale: 0.9,
                z_index: 100,
                show_label: true,
            },
            Tier::Background => VisualState {
                opacity: 0.25,
                scale: 0.8,
                z_index: 0,
                show_label: false,
            },
        }
    }
}

/// Per-node presentation tuple consumed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub opacity: f32,
    pub scale: f32,
    pub z_index: i32,
    pub show_label: bool,
}

impl VisualState {
    /// Nothing selected: everything fully visible.
    pub const FULL: VisualState = VisualState {
        opacity: 1.0,
        scale: 1.0,
        z_index: 0,
        show_label: true,
    };
}

/// Edge classification relative to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEmphasis {
    /// Touches the selected node.
    Focused,
    /// Both endpoints outside the background.
    Relevant,
    Dim,
}

impl EdgeEmphasis {
    pub fn style(&self) -> EdgeStyle {
        match self {
            EdgeEmphasis::Focused => EdgeStyle {
                opacity: 1.0,
                stroke_width: 3.0,
            },
            EdgeEmphasis::Relevant => EdgeStyle {
                opacity: 0.6,
                stroke_width: 2.0,
            },
            EdgeEmphasis::Dim => EdgeStyle {
                opacity: 0.15,
                stroke_width: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub opacity: f32,
    pub stroke_width: f32,
}
