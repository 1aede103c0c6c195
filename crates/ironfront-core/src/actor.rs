use ironfront_protocol::{DataId, PlayerId};

/// One prerequisite-providing component on an actor.
///
/// A provider whose key list is absent provides nothing but still gives the
/// actor the provider capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrerequisiteProvider {
    keys: Option<Vec<DataId>>,
    enabled: bool,
}

impl PrerequisiteProvider {
    /// Always-on provider.
    pub fn custom(keys: Option<Vec<DataId>>) -> Self {
        Self {
            keys,
            enabled: true,
        }
    }

    /// Provider that only contributes while the lobby runs at `level`.
    pub fn tech_level(level: &str, keys: Option<Vec<DataId>>, current: Option<&str>) -> Self {
        Self {
            keys,
            enabled: current == Some(level),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Keys this provider currently contributes. Empty keys are skipped.
    pub fn provided(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys
            .iter()
            .flatten()
            .filter(move |_| self.enabled)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buildable {
    pub build_limit: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub type_name: DataId,
    pub owner: Option<PlayerId>,
    pub dead: bool,
    pub in_world: bool,
    pub providers: Vec<PrerequisiteProvider>,
    pub buildable: Option<Buildable>,
}

impl Actor {
    pub fn new(type_name: impl Into<DataId>, owner: Option<PlayerId>) -> Self {
        Self {
            type_name: type_name.into(),
            owner,
            dead: false,
            in_world: true,
            providers: Vec::new(),
            buildable: None,
        }
    }

    pub fn with_provider(mut self, provider: PrerequisiteProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Shorthand for an always-on provider of `keys`.
    pub fn providing<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DataId>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        self.with_provider(PrerequisiteProvider::custom(Some(keys)))
    }

    pub fn with_build_limit(mut self, build_limit: u32) -> Self {
        self.buildable = Some(Buildable { build_limit });
        self
    }

    pub fn has_provider_capability(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn is_buildable(&self) -> bool {
        self.buildable.is_some()
    }

    pub fn build_limit(&self) -> u32 {
        self.buildable.as_ref().map_or(0, |b| b.build_limit)
    }

    /// Alive, in the world and owned by `player`.
    pub fn is_active_for(&self, player: PlayerId) -> bool {
        self.owner == Some(player) && !self.dead && self.in_world
    }

    /// Whether adding or removing this actor can change the tech tree state of `player`.
    pub fn affects_tech_tree(&self, player: PlayerId) -> bool {
        self.owner == Some(player) && (self.has_provider_capability() || self.build_limit() > 0)
    }

    pub fn provided_prerequisites(&self) -> impl Iterator<Item = &str> + '_ {
        self.providers.iter().flat_map(|provider| provider.provided())
    }
}
