use serde::{Deserialize, Serialize};

use crate::{ActorId, DataId, PlayerId};

/// Transition notifications produced by a player's tech tree.
///
/// `owner` is the actor that registered the watcher (typically a production
/// queue); `key` is the watched item type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TechTreeEvent {
    /// The item's prerequisites are now met and its build limit is not reached.
    PrerequisitesAvailable {
        player: PlayerId,
        owner: ActorId,
        key: DataId,
    },
    /// The item lost a prerequisite or hit its build limit.
    PrerequisitesUnavailable {
        player: PlayerId,
        owner: ActorId,
        key: DataId,
    },
    /// The item's hidden state flipped. `was_hidden` is the state before the change.
    HiddenChanged {
        player: PlayerId,
        owner: ActorId,
        key: DataId,
        was_hidden: bool,
    },
}

impl TechTreeEvent {
    pub fn key(&self) -> &str {
        match self {
            TechTreeEvent::PrerequisitesAvailable { key, .. }
            | TechTreeEvent::PrerequisitesUnavailable { key, .. }
            | TechTreeEvent::HiddenChanged { key, .. } => key,
        }
    }

    pub fn player(&self) -> PlayerId {
        match self {
            TechTreeEvent::PrerequisitesAvailable { player, .. }
            | TechTreeEvent::PrerequisitesUnavailable { player, .. }
            | TechTreeEvent::HiddenChanged { player, .. } => *player,
        }
    }

    pub fn owner(&self) -> ActorId {
        match self {
            TechTreeEvent::PrerequisitesAvailable { owner, .. }
            | TechTreeEvent::PrerequisitesUnavailable { owner, .. }
            | TechTreeEvent::HiddenChanged { owner, .. } => *owner,
        }
    }
}
