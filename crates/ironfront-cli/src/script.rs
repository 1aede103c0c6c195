//! Replay scripts: a scripted sequence of world changes, replayed against a
//! ruleset while collecting the tech tree events each step produces.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use ironfront_core::{Actor, ActorId, CompiledRules, World, WorldSettings};
use ironfront_protocol::{PlayerId, TechTreeEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
    /// Steps are written as single-key maps (`- kill: tank1`).
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

/// Items a player's production queue watches. Without `items`, every
/// buildable type in the ruleset is registered.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub player: PlayerId,
    #[serde(default)]
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Spawn {
        alias: String,
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        owner: Option<PlayerId>,
    },
    Destroy(String),
    Kill(String),
    LeaveWorld(String),
    EnterWorld(String),
    ChangeOwner {
        alias: String,
        #[serde(default)]
        owner: Option<PlayerId>,
    },
    Refresh(PlayerId),
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Spawn {
                alias,
                type_name,
                owner: Some(owner),
            } => write!(f, "spawn {alias} ({type_name}, {owner})"),
            Step::Spawn {
                alias, type_name, ..
            } => write!(f, "spawn {alias} ({type_name}, neutral)"),
            Step::Destroy(alias) => write!(f, "destroy {alias}"),
            Step::Kill(alias) => write!(f, "kill {alias}"),
            Step::LeaveWorld(alias) => write!(f, "leave_world {alias}"),
            Step::EnterWorld(alias) => write!(f, "enter_world {alias}"),
            Step::ChangeOwner {
                alias,
                owner: Some(owner),
            } => write!(f, "change_owner {alias} -> {owner}"),
            Step::ChangeOwner { alias, .. } => write!(f, "change_owner {alias} -> neutral"),
            Step::Refresh(player) => write!(f, "refresh {player}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    /// `None` for the initial pass run after registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    pub events: Vec<TechTreeEvent>,
}

impl Script {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("invalid replay script")
    }
}

pub struct Replay<'a> {
    rules: &'a CompiledRules,
    world: World,
    aliases: BTreeMap<String, ActorId>,
}

impl<'a> Replay<'a> {
    /// Sets up players and their production queues. Events produced by the
    /// initial registration pass are returned as step 0.
    pub fn new(
        rules: &'a CompiledRules,
        settings: WorldSettings,
        script: &Script,
    ) -> Result<(Self, Vec<TechTreeEvent>)> {
        let mut world = World::new(settings);
        let mut queues = BTreeMap::new();
        for &player in &script.players {
            if !world.add_player(player) {
                bail!("player {player} is declared twice");
            }
            queues.insert(player, world.spawn(Actor::new("queue", Some(player))));
        }

        for registration in &script.registrations {
            let player = registration.player;
            let Some(&queue) = queues.get(&player) else {
                bail!("registration for undeclared player {player}");
            };
            match &registration.items {
                None => {
                    let count = world.register_rules(player, rules, queue)?;
                    debug!(%player, count, "registered all buildables");
                }
                Some(items) => {
                    for item in items {
                        let info = rules
                            .buildable(item)
                            .with_context(|| format!("`{item}` is not buildable"))?;
                        world.register_item(player, item.as_str(), info, queue)?;
                    }
                }
            }
        }
        world.refresh_all();
        let initial = world.drain_events();

        Ok((
            Self {
                rules,
                world,
                aliases: BTreeMap::new(),
            },
            initial,
        ))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    fn resolve(&self, alias: &str) -> Result<ActorId> {
        match self.aliases.get(alias) {
            Some(&id) => Ok(id),
            None => bail!("unknown actor alias `{alias}`"),
        }
    }

    /// Actors may be neutral, but a player owner must have been declared.
    fn check_owner(&self, owner: Option<PlayerId>) -> Result<()> {
        match owner {
            Some(player) if self.world.tech_tree(player).is_none() => {
                bail!("unknown player {player}")
            }
            _ => Ok(()),
        }
    }

    pub fn apply(&mut self, step: &Step) -> Result<Vec<TechTreeEvent>> {
        match step {
            Step::Spawn {
                alias,
                type_name,
                owner,
            } => {
                if self.aliases.contains_key(alias) {
                    bail!("actor alias `{alias}` is already in use");
                }
                self.check_owner(*owner)?;
                let id = self.world.spawn_type(self.rules, type_name, *owner)?;
                self.aliases.insert(alias.clone(), id);
            }
            Step::Destroy(alias) => {
                let id = self.resolve(alias)?;
                self.world.destroy(id)?;
                self.aliases.remove(alias);
            }
            Step::Kill(alias) => {
                let id = self.resolve(alias)?;
                self.world.kill(id)?;
            }
            Step::LeaveWorld(alias) => {
                let id = self.resolve(alias)?;
                self.world.set_in_world(id, false)?;
            }
            Step::EnterWorld(alias) => {
                let id = self.resolve(alias)?;
                self.world.set_in_world(id, true)?;
            }
            Step::ChangeOwner { alias, owner } => {
                let id = self.resolve(alias)?;
                self.check_owner(*owner)?;
                self.world.change_owner(id, *owner)?;
            }
            Step::Refresh(player) => self.world.refresh(*player)?,
        }
        Ok(self.world.drain_events())
    }
}

/// Replays the whole script. Outcome 0 carries the events of the initial pass.
pub fn run(
    rules: &CompiledRules,
    settings: WorldSettings,
    script: &Script,
) -> Result<Vec<StepOutcome>> {
    let (mut replay, initial) = Replay::new(rules, settings, script)?;
    let mut outcomes = vec![StepOutcome {
        index: 0,
        step: None,
        events: initial,
    }];
    for (i, step) in script.steps.iter().enumerate() {
        let events = replay
            .apply(step)
            .with_context(|| format!("step {} failed", i + 1))?;
        outcomes.push(StepOutcome {
            index: i + 1,
            step: Some(step.clone()),
            events,
        });
    }
    info!(
        steps = script.steps.len(),
        actors = replay.world().actors().len(),
        "replay finished"
    );
    Ok(outcomes)
}
