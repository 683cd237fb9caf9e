//! # Graph Core
//!
//! Adaptive graph rendering and selection engine for exploring a game's
//! characters, elements, puzzles and timeline events as an interactive graph.
//!
//! ## Core Components
//!
//! - **selection**: Selection state machine with bounded history and view modes
//! - **hierarchy**: Visual tiers of nodes and edges relative to the selection
//! - **aggregation**: Keeps the rendered node count under a hard budget
//! - **viewport**: Viewport culling and update throttling for oversized graphs
//! - **layers**: Bounded set of active intelligence layers
//! - **performance**: Automatic performance mode with a user override
//! - **engine**: Facade tying the state slices into a render pipeline
//!
//! ## Design Philosophy
//!
//! - **Recompute, don't mutate**: Nodes and edges are rebuilt from the current state on every render
//! - **Framework-agnostic**: State slices are exposed through plain subscribe/notify listeners
//! - **Degrade, don't fail**: Missing names, dangling relationships and unknown selections fall back to safe defaults

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod layers;
pub mod layout;
pub mod node;
pub mod observer;
pub mod performance;
pub mod persistence;
pub mod search;
pub mod selection;
pub mod viewport;

pub use aggregation::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use hierarchy::*;
pub use layers::*;
pub use layout::*;
pub use node::*;
pub use observer::*;
pub use performance::*;
pub use persistence::*;
pub use search::*;
pub use selection::*;
pub use viewport::*;
