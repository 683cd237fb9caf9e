//! # Game Model
//!
//! The data layer of the design graph: characters, elements, puzzles and
//! timeline events, plus the relationships derived between them.
//! This crate holds no selection or rendering logic; it is the snapshot the
//! graph engine reads on every render cycle.

pub mod entities;
pub mod relationships;
pub mod snapshot;

pub use entities::*;
pub use relationships::*;
pub use snapshot::*;
