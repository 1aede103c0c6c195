//! Per-player prerequisite tracking.
//!
//! A [`TechTree`] owns one [`Watcher`] per buildable item. Whenever an actor
//! that provides prerequisites (or counts against a build limit) enters or
//! leaves the world, the tree gathers a fresh [`BuildableIndex`] and every
//! watcher compares it with its last reported state, emitting
//! [`ironfront_protocol::TechTreeEvent`]s for transitions only.

mod index;
mod sink;
mod tracker;
mod watcher;

pub use index::{ActorQuery, BuildableIndex};
pub use sink::{NullSink, TechTreeSink, VecSink};
pub use tracker::{PendingChanges, TechTree, TechTreeError};
pub use watcher::Watcher;
