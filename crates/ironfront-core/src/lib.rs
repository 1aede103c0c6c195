//! Ironfront tech tree: per-player prerequisite tracking for an RTS.
//!
//! - [`rules`] loads actor types and parses prerequisite expressions once.
//! - [`world`] stores actors with a capability index and owns one
//!   [`TechTree`] per player, notifying it after every lifecycle change.
//! - [`techtree`] gathers the buildable index and reports availability and
//!   hidden-state transitions.

#![forbid(unsafe_code)]

pub mod actor;
pub mod config;
mod entities;
pub mod rules;
pub mod techtree;
pub mod world;

pub use crate::actor::{Actor, Buildable, PrerequisiteProvider};
pub use crate::config::{ConfigError, DuplicatePolicy, SimConfig};
pub use crate::entities::SlotStore;
pub use crate::rules::{
    load_rules, parse_rules, ActorType, BuildableInfo, CompiledRules, PrerequisiteToken,
    RulesError, RulesSource, RulesWarning,
};
pub use crate::techtree::{
    ActorQuery, BuildableIndex, NullSink, TechTree, TechTreeError, TechTreeSink, VecSink, Watcher,
};
pub use crate::world::{ActorRegistry, World, WorldError, WorldSettings};
pub use ironfront_protocol::{ActorId, DataId, PlayerId, TechTreeEvent};
