use std::collections::{BTreeMap, BTreeSet};

use ironfront_protocol::{DataId, PlayerId};
use serde::Deserialize;
use thiserror::Error;

use crate::actor::{Actor, Buildable, PrerequisiteProvider};
use crate::rules::PrerequisiteToken;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActorType {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub buildable: Option<RawBuildable>,
    #[serde(default)]
    pub provides: Vec<RawProvider>,
}

impl RawActorType {
    pub fn compile(self, type_name: DataId) -> ActorType {
        ActorType {
            display_name: self.name.unwrap_or_else(|| type_name.clone()),
            type_name,
            buildable: self.buildable.map(RawBuildable::compile),
            providers: self.provides.into_iter().map(RawProvider::compile).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBuildable {
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub build_limit: u32,
    #[serde(default)]
    pub hidden: bool,
}

impl RawBuildable {
    pub fn compile(self) -> BuildableInfo {
        BuildableInfo {
            prerequisites: self
                .prerequisites
                .iter()
                .map(|raw| PrerequisiteToken::parse(raw))
                .collect(),
            build_limit: self.build_limit,
            hidden: self.hidden,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProvider {
    /// Present for tech-level providers; the provider is only enabled when
    /// the lobby runs at this level.
    #[serde(default)]
    pub tech_level: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<Vec<String>>,
}

impl RawProvider {
    pub fn compile(self) -> ProviderInfo {
        ProviderInfo {
            tech_level: self.tech_level,
            prerequisites: self.prerequisites,
        }
    }
}

/// Static production info for one buildable item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildableInfo {
    /// AND-combined prerequisite expressions, parsed at load.
    pub prerequisites: Vec<PrerequisiteToken>,
    /// Maximum live count; 0 means unlimited.
    pub build_limit: u32,
    /// Initial hidden state.
    pub hidden: bool,
}

impl BuildableInfo {
    /// Convenience constructor parsing raw expression strings.
    pub fn new<I, S>(prerequisites: I, build_limit: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prerequisites: prerequisites
                .into_iter()
                .map(|raw| PrerequisiteToken::parse(raw.as_ref()))
                .collect(),
            build_limit,
            hidden: false,
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub tech_level: Option<String>,
    pub prerequisites: Option<Vec<DataId>>,
}

impl ProviderInfo {
    pub fn instantiate(&self, current_tech_level: Option<&str>) -> PrerequisiteProvider {
        match &self.tech_level {
            Some(level) => PrerequisiteProvider::tech_level(
                level,
                self.prerequisites.clone(),
                current_tech_level,
            ),
            None => PrerequisiteProvider::custom(self.prerequisites.clone()),
        }
    }

    /// Every key this provider could contribute at any tech level.
    pub fn declared_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.prerequisites
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ActorType {
    pub type_name: DataId,
    pub display_name: String,
    pub buildable: Option<BuildableInfo>,
    pub providers: Vec<ProviderInfo>,
}

impl ActorType {
    pub fn instantiate(&self, owner: Option<PlayerId>, tech_level: Option<&str>) -> Actor {
        let mut actor = Actor::new(self.type_name.clone(), owner);
        actor.providers = self
            .providers
            .iter()
            .map(|p| p.instantiate(tech_level))
            .collect();
        actor.buildable = self.buildable.as_ref().map(|b| Buildable {
            build_limit: b.build_limit,
        });
        actor
    }
}

/// Consistency problems found in a ruleset. None of these stop a game from
/// running; affected items simply never become available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesWarning {
    #[error("{actor}: prerequisite `{raw}` has an empty key and can never be met")]
    EmptyPrerequisite { actor: DataId, raw: String },
    #[error("{actor}: prerequisite `{key}` is not provided by any actor type")]
    UnknownPrerequisite { actor: DataId, key: DataId },
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub actor_types: BTreeMap<DataId, ActorType>,
}

impl CompiledRules {
    pub fn actor_type(&self, type_name: &str) -> Option<&ActorType> {
        self.actor_types.get(type_name)
    }

    pub fn buildable(&self, type_name: &str) -> Option<&BuildableInfo> {
        self.actor_type(type_name)?.buildable.as_ref()
    }

    /// Buildable actor types in name order.
    pub fn buildables(&self) -> impl Iterator<Item = (&str, &BuildableInfo)> {
        self.actor_types
            .iter()
            .filter_map(|(name, ty)| Some((name.as_str(), ty.buildable.as_ref()?)))
    }

    /// Keys that can appear in a player's buildable index: explicitly
    /// provided keys, plus type names of build-limited actors.
    pub fn known_keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        for ty in self.actor_types.values() {
            for provider in &ty.providers {
                keys.extend(provider.declared_keys());
            }
            if ty.buildable.as_ref().is_some_and(|b| b.build_limit > 0) {
                keys.insert(ty.type_name.as_str());
            }
        }
        keys
    }

    pub fn validate(&self) -> Vec<RulesWarning> {
        let known = self.known_keys();
        let mut warnings = Vec::new();
        for (name, info) in self.buildables() {
            for token in &info.prerequisites {
                if token.is_malformed() {
                    warnings.push(RulesWarning::EmptyPrerequisite {
                        actor: name.to_string(),
                        raw: token.to_string(),
                    });
                } else if !known.contains(token.base_key.as_str()) {
                    warnings.push(RulesWarning::UnknownPrerequisite {
                        actor: name.to_string(),
                        key: token.base_key.clone(),
                    });
                }
            }
        }
        warnings
    }
}
