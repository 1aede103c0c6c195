//! Minimal host world: actor storage, capability index and the per-player
//! tech trees it drives.

use std::collections::{BTreeMap, BTreeSet};

use ironfront_protocol::{ActorId, DataId, PlayerId, TechTreeEvent};
use thiserror::Error;
use tracing::{debug, warn};

use crate::actor::Actor;
use crate::config::DuplicatePolicy;
use crate::entities::SlotStore;
use crate::rules::{BuildableInfo, CompiledRules};
use crate::techtree::{
    ActorQuery, PendingChanges, TechTree, TechTreeError, TechTreeSink, VecSink,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("unknown actor type `{0}`")]
    UnknownActorType(DataId),
    #[error(transparent)]
    TechTree(#[from] TechTreeError),
}

#[derive(Debug, Clone, Default)]
pub struct WorldSettings {
    pub tech_level: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
}

/// Actor storage with one id set per capability.
///
/// Capabilities are fixed at insertion, so the sets only change on insert
/// and remove.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    actors: SlotStore<Actor>,
    providers: BTreeSet<ActorId>,
    buildables: BTreeSet<ActorId>,
}

impl ActorRegistry {
    pub fn insert(&mut self, actor: Actor) -> ActorId {
        let has_provider = actor.has_provider_capability();
        let is_buildable = actor.is_buildable();
        let id = self.actors.insert(actor);
        if has_provider {
            self.providers.insert(id);
        }
        if is_buildable {
            self.buildables.insert(id);
        }
        id
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.actors.remove(id)?;
        self.providers.remove(&id);
        self.buildables.remove(&id);
        Some(actor)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors.iter_ordered()
    }

    /// Returns the previous value, or `None` if the actor does not exist.
    pub fn set_dead(&mut self, id: ActorId, dead: bool) -> Option<bool> {
        let actor = self.actors.get_mut(id)?;
        Some(std::mem::replace(&mut actor.dead, dead))
    }

    pub fn set_in_world(&mut self, id: ActorId, in_world: bool) -> Option<bool> {
        let actor = self.actors.get_mut(id)?;
        Some(std::mem::replace(&mut actor.in_world, in_world))
    }

    pub fn set_owner(
        &mut self,
        id: ActorId,
        owner: Option<PlayerId>,
    ) -> Option<Option<PlayerId>> {
        let actor = self.actors.get_mut(id)?;
        Some(std::mem::replace(&mut actor.owner, owner))
    }

    fn resolve<'a>(
        &'a self,
        ids: &'a BTreeSet<ActorId>,
    ) -> impl Iterator<Item = (ActorId, &'a Actor)> + 'a {
        ids.iter()
            .filter_map(|&id| self.actors.get(id).map(|actor| (id, actor)))
    }
}

impl ActorQuery for ActorRegistry {
    fn providers(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.resolve(&self.providers)
    }

    fn buildables(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.resolve(&self.buildables)
    }
}

/// Buffers events for [`World::drain_events`] and forwards them to the
/// optional reactor.
#[derive(Default)]
struct EventBuffer {
    events: VecSink,
    reactor: Option<Box<dyn TechTreeSink>>,
}

impl std::fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuffer")
            .field("events", &self.events)
            .field("reactor", &self.reactor.is_some())
            .finish()
    }
}

impl TechTreeSink for EventBuffer {
    fn emit(&mut self, event: TechTreeEvent, pending: &mut PendingChanges) {
        if let Some(reactor) = self.reactor.as_mut() {
            reactor.emit(event.clone(), pending);
        }
        self.events.emit(event, pending);
    }
}

/// Owns the actors and one [`TechTree`] per player.
///
/// Every lifecycle mutation notifies the tree of the affected actor's owner
/// directly. Resulting events are buffered until [`World::drain_events`].
/// Watcher changes queued by the reactor during a pass are applied as soon
/// as that pass finishes.
#[derive(Debug, Default)]
pub struct World {
    settings: WorldSettings,
    registry: ActorRegistry,
    trees: BTreeMap<PlayerId, TechTree>,
    events: EventBuffer,
}

impl World {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.registry.get(id)
    }

    /// Creates the player's tech tree. Returns `false` if it already existed.
    pub fn add_player(&mut self, player: PlayerId) -> bool {
        if self.trees.contains_key(&player) {
            return false;
        }
        let tree = TechTree::new(player, self.settings.duplicate_policy);
        self.trees.insert(player, tree);
        true
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.trees.keys().copied()
    }

    pub fn tech_tree(&self, player: PlayerId) -> Option<&TechTree> {
        self.trees.get(&player)
    }

    pub fn tech_tree_mut(&mut self, player: PlayerId) -> Option<&mut TechTree> {
        self.trees.get_mut(&player)
    }

    pub fn drain_events(&mut self) -> Vec<TechTreeEvent> {
        self.events.events.drain()
    }

    /// Installs a sink that sees every event as it is emitted and may queue
    /// watcher changes in response.
    pub fn set_reactor(&mut self, reactor: impl TechTreeSink + 'static) {
        self.events.reactor = Some(Box::new(reactor));
    }

    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        let id = self.registry.insert(actor);
        debug!(actor = %id, "actor added");
        if let Some(actor) = self.registry.get(id) {
            notify(&mut self.trees, &self.registry, &mut self.events, actor);
        }
        id
    }

    /// Instantiates an actor type from `rules` at the world's tech level.
    pub fn spawn_type(
        &mut self,
        rules: &CompiledRules,
        type_name: &str,
        owner: Option<PlayerId>,
    ) -> Result<ActorId, WorldError> {
        let actor_type = rules
            .actor_type(type_name)
            .ok_or_else(|| WorldError::UnknownActorType(type_name.to_string()))?;
        let actor = actor_type.instantiate(owner, self.settings.tech_level.as_deref());
        Ok(self.spawn(actor))
    }

    /// Removes the actor from the world for good.
    pub fn destroy(&mut self, id: ActorId) -> Result<Actor, WorldError> {
        let actor = self
            .registry
            .remove(id)
            .ok_or(WorldError::UnknownActor(id))?;
        debug!(actor = %id, "actor removed");
        notify(&mut self.trees, &self.registry, &mut self.events, &actor);
        Ok(actor)
    }

    /// Marks the actor dead; it stops counting but stays addressable until destroyed.
    pub fn kill(&mut self, id: ActorId) -> Result<(), WorldError> {
        let was_dead = self
            .registry
            .set_dead(id, true)
            .ok_or(WorldError::UnknownActor(id))?;
        if !was_dead {
            self.notify_actor(id);
        }
        Ok(())
    }

    /// Moves an actor out of (or back into) the world, e.g. when loaded into a transport.
    pub fn set_in_world(&mut self, id: ActorId, in_world: bool) -> Result<(), WorldError> {
        let previous = self
            .registry
            .set_in_world(id, in_world)
            .ok_or(WorldError::UnknownActor(id))?;
        if previous != in_world {
            self.notify_actor(id);
        }
        Ok(())
    }

    /// Transfers ownership; both the old and the new owner's trees are updated.
    pub fn change_owner(
        &mut self,
        id: ActorId,
        owner: Option<PlayerId>,
    ) -> Result<(), WorldError> {
        let before = self
            .registry
            .get(id)
            .cloned()
            .ok_or(WorldError::UnknownActor(id))?;
        if before.owner == owner {
            return Ok(());
        }
        self.registry.set_owner(id, owner);
        notify(&mut self.trees, &self.registry, &mut self.events, &before);
        self.notify_actor(id);
        Ok(())
    }

    pub fn register_item(
        &mut self,
        player: PlayerId,
        key: impl Into<DataId>,
        info: &BuildableInfo,
        owner: ActorId,
    ) -> Result<(), WorldError> {
        let tree = self
            .trees
            .get_mut(&player)
            .ok_or(WorldError::UnknownPlayer(player))?;
        tree.register(key, info, owner)?;
        Ok(())
    }

    /// Registers every buildable type in `rules` for `player`, owned by `owner`.
    pub fn register_rules(
        &mut self,
        player: PlayerId,
        rules: &CompiledRules,
        owner: ActorId,
    ) -> Result<usize, WorldError> {
        let mut registered = 0;
        for (name, info) in rules.buildables() {
            self.register_item(player, name, info, owner)?;
            registered += 1;
        }
        Ok(registered)
    }

    pub fn unregister_item(&mut self, player: PlayerId, key: &str) -> Result<bool, WorldError> {
        let tree = self
            .trees
            .get_mut(&player)
            .ok_or(WorldError::UnknownPlayer(player))?;
        Ok(tree.unregister(key))
    }

    /// Runs an explicit update pass for `player`.
    pub fn refresh(&mut self, player: PlayerId) -> Result<(), WorldError> {
        let tree = self
            .trees
            .get_mut(&player)
            .ok_or(WorldError::UnknownPlayer(player))?;
        tree.update(&self.registry, &mut self.events);
        apply_deferred(tree);
        Ok(())
    }

    pub fn refresh_all(&mut self) {
        for tree in self.trees.values_mut() {
            tree.update(&self.registry, &mut self.events);
            apply_deferred(tree);
        }
    }

    fn notify_actor(&mut self, id: ActorId) {
        if let Some(actor) = self.registry.get(id) {
            notify(&mut self.trees, &self.registry, &mut self.events, actor);
        }
    }
}

fn notify(
    trees: &mut BTreeMap<PlayerId, TechTree>,
    registry: &ActorRegistry,
    events: &mut EventBuffer,
    actor: &Actor,
) {
    let Some(owner) = actor.owner else {
        return;
    };
    let Some(tree) = trees.get_mut(&owner) else {
        return;
    };
    tree.on_actor_changed(actor, registry, events);
    apply_deferred(tree);
}

fn apply_deferred(tree: &mut TechTree) {
    if let Err(err) = tree.apply_deferred() {
        warn!("deferred tech tree change rejected: {err}");
    }
}
