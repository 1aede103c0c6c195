use std::collections::BTreeMap;

use ironfront_protocol::{ActorId, DataId, PlayerId};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::actor::Actor;
use crate::config::DuplicatePolicy;
use crate::rules::BuildableInfo;
use crate::techtree::{ActorQuery, BuildableIndex, TechTreeSink, Watcher};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TechTreeError {
    #[error("{player}: `{key}` is already watched")]
    DuplicateWatcher { player: PlayerId, key: DataId },
}

#[derive(Debug, Clone)]
enum DeferredChange {
    Register {
        key: DataId,
        info: BuildableInfo,
        owner: ActorId,
    },
    Unregister(DataId),
}

/// Watcher changes queued while a pass is running, applied in order by
/// [`TechTree::apply_deferred`].
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    changes: Vec<DeferredChange>,
}

impl PendingChanges {
    pub fn register(&mut self, key: impl Into<DataId>, info: &BuildableInfo, owner: ActorId) {
        self.changes.push(DeferredChange::Register {
            key: key.into(),
            info: info.clone(),
            owner,
        });
    }

    pub fn unregister(&mut self, key: impl Into<DataId>) {
        self.changes.push(DeferredChange::Unregister(key.into()));
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Per-player prerequisite tracker.
///
/// Holds one [`Watcher`] per registered item and re-evaluates all of them
/// against a freshly gathered [`BuildableIndex`] whenever the player's
/// prerequisite-relevant actors change.
#[derive(Debug, Clone)]
pub struct TechTree {
    player: PlayerId,
    duplicate_policy: DuplicatePolicy,
    watchers: BTreeMap<DataId, Watcher>,
    deferred: PendingChanges,
}

impl TechTree {
    pub fn new(player: PlayerId, duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            player,
            duplicate_policy,
            watchers: BTreeMap::new(),
            deferred: PendingChanges::default(),
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn register(
        &mut self,
        key: impl Into<DataId>,
        info: &BuildableInfo,
        owner: ActorId,
    ) -> Result<(), TechTreeError> {
        let key = key.into();
        if self.watchers.contains_key(&key) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(TechTreeError::DuplicateWatcher {
                        player: self.player,
                        key,
                    });
                }
                DuplicatePolicy::Overwrite => {
                    warn!(player = %self.player, %key, "replacing existing tech tree watcher");
                }
            }
        }
        let watcher = Watcher::new(key.clone(), info, owner);
        self.watchers.insert(key, watcher);
        Ok(())
    }

    /// Returns whether a watcher was removed.
    pub fn unregister(&mut self, key: &str) -> bool {
        self.watchers.remove(key).is_some()
    }

    /// Queues a registration to be applied by [`TechTree::apply_deferred`].
    pub fn defer_register(
        &mut self,
        key: impl Into<DataId>,
        info: &BuildableInfo,
        owner: ActorId,
    ) {
        self.deferred.register(key, info, owner);
    }

    pub fn defer_unregister(&mut self, key: impl Into<DataId>) {
        self.deferred.unregister(key);
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Applies queued changes in order. Stops at the first rejected
    /// registration, leaving the remainder queued.
    pub fn apply_deferred(&mut self) -> Result<(), TechTreeError> {
        let pending = std::mem::take(&mut self.deferred.changes);
        let mut pending = pending.into_iter();
        while let Some(change) = pending.next() {
            let applied = match change {
                DeferredChange::Register { key, info, owner } => self.register(key, &info, owner),
                DeferredChange::Unregister(key) => {
                    self.unregister(&key);
                    Ok(())
                }
            };
            if let Err(err) = applied {
                self.deferred.changes.extend(pending);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Reacts to an actor being added to or removed from the world.
    ///
    /// Returns whether an update pass ran.
    pub fn on_actor_changed<Q: ActorQuery + ?Sized>(
        &mut self,
        actor: &Actor,
        query: &Q,
        sink: &mut dyn TechTreeSink,
    ) -> bool {
        if !actor.affects_tech_tree(self.player) {
            trace!(player = %self.player, actor = %actor.type_name, "actor change ignored");
            return false;
        }
        self.update(query, sink);
        true
    }

    /// Rebuilds the index once and evaluates every watcher against it.
    ///
    /// Changes the sink queues are left pending for
    /// [`TechTree::apply_deferred`].
    pub fn update<Q: ActorQuery + ?Sized>(&mut self, query: &Q, sink: &mut dyn TechTreeSink) {
        let index = BuildableIndex::gather(query, Some(self.player));
        debug!(
            player = %self.player,
            keys = index.len(),
            watchers = self.watchers.len(),
            "tech tree update"
        );
        let player = self.player;
        let pending = &mut self.deferred;
        for watcher in self.watchers.values_mut() {
            watcher.evaluate(player, &index, |event| sink.emit(event, pending));
        }
    }

    pub fn watcher(&self, key: &str) -> Option<&Watcher> {
        self.watchers.get(key)
    }

    pub fn watchers(&self) -> impl Iterator<Item = &Watcher> {
        self.watchers.values()
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Last reported availability; `false` for unknown keys.
    pub fn is_available(&self, key: &str) -> bool {
        self.watchers.get(key).is_some_and(Watcher::has_prerequisites)
    }

    /// Last reported hidden state; `false` for unknown keys.
    pub fn is_hidden(&self, key: &str) -> bool {
        self.watchers.get(key).is_some_and(Watcher::is_hidden)
    }
}
