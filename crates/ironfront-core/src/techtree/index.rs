use std::collections::BTreeMap;

use ironfront_protocol::{ActorId, DataId, PlayerId};

use crate::actor::Actor;

/// Capability-filtered access to live actors, as needed by the tech tree.
///
/// Both iterators yield in ascending `ActorId` order so index construction
/// is deterministic.
pub trait ActorQuery {
    /// Actors with at least one prerequisite provider.
    fn providers(&self) -> impl Iterator<Item = (ActorId, &Actor)>;
    /// Actors with the buildable capability.
    fn buildables(&self) -> impl Iterator<Item = (ActorId, &Actor)>;
}

/// Snapshot of which prerequisite keys a player currently holds, and
/// through which actors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildableIndex {
    providers: BTreeMap<DataId, Vec<ActorId>>,
}

impl BuildableIndex {
    pub fn gather<Q: ActorQuery + ?Sized>(query: &Q, player: Option<PlayerId>) -> Self {
        let mut providers: BTreeMap<DataId, Vec<ActorId>> = BTreeMap::new();
        let Some(player) = player else {
            return Self { providers };
        };

        for (id, actor) in query.providers() {
            if !actor.is_active_for(player) {
                continue;
            }
            for key in actor.provided_prerequisites() {
                providers.entry(key.to_owned()).or_default().push(id);
            }
        }

        // Build-limited actors count under their own name unless an explicit
        // provider already claimed it. Collected first so every instance of
        // the same type is checked against the explicit claims only.
        let limited: Vec<_> = query
            .buildables()
            .filter(|(_, actor)| actor.build_limit() > 0 && actor.is_active_for(player))
            .filter(|(_, actor)| !providers.contains_key(&actor.type_name))
            .map(|(id, actor)| (actor.type_name.clone(), id))
            .collect();
        for (key, id) in limited {
            providers.entry(key).or_default().push(id);
        }

        Self { providers }
    }

    /// A key counts as present only while at least one actor provides it.
    pub fn contains(&self, key: &str) -> bool {
        self.providers.get(key).is_some_and(|ids| !ids.is_empty())
    }

    pub fn count(&self, key: &str) -> usize {
        self.providers.get(key).map_or(0, Vec::len)
    }

    pub fn providers(&self, key: &str) -> &[ActorId] {
        self.providers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
