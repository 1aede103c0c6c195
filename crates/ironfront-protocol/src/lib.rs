//! Shared ids and notification types for the Ironfront tech tree.
//!
//! Kept free of simulation logic so tooling can decode recorded events
//! without pulling in the engine.

mod event;
mod ids;

pub use crate::event::*;
pub use crate::ids::*;
