//! Ironfront CLI.
//!
//! - `ironfront replay` - replay a scripted game against a ruleset and print
//!   the tech tree events of every step
//! - `ironfront rules` - list a ruleset's buildables and report problems

mod script;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ironfront_core::{load_rules, CompiledRules, RulesSource, SimConfig};
use ironfront_protocol::TechTreeEvent;
use tracing_subscriber::{fmt, EnvFilter};

use crate::script::Script;

#[derive(Parser)]
#[command(name = "ironfront")]
#[command(about = "Ironfront tech tree tools", version)]
struct Cli {
    /// Simulation config (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script and print the events of every step
    Replay {
        /// Rules directory containing actors.yaml, or `embedded`
        #[arg(long, default_value = "embedded")]
        rules: String,

        /// Replay script (YAML)
        #[arg(long)]
        script: PathBuf,

        /// Print one JSON object per step
        #[arg(long)]
        json: bool,
    },

    /// List buildables and validate a ruleset
    Rules {
        /// Rules directory containing actors.yaml, or `embedded`
        #[arg(long, default_value = "embedded")]
        rules: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            rules,
            script,
            json,
        } => replay(&config, &rules, &script, json),
        Commands::Rules { rules } => show_rules(&rules),
    }
}

fn load(rules: &str) -> Result<CompiledRules> {
    let source = if rules == "embedded" {
        RulesSource::Embedded
    } else {
        RulesSource::Path(PathBuf::from(rules))
    };
    load_rules(source).with_context(|| format!("failed to load rules from {rules}"))
}

fn replay(config: &SimConfig, rules: &str, script_path: &Path, json: bool) -> Result<()> {
    let rules = load(rules)?;
    let yaml = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script = Script::from_yaml_str(&yaml)?;

    let outcomes = script::run(&rules, config.world_settings(), &script)?;

    for outcome in &outcomes {
        if json {
            println!("{}", serde_json::to_string(outcome)?);
            continue;
        }
        match &outcome.step {
            Some(step) => println!("[{}] {step}", outcome.index),
            None => println!("[0] initial"),
        }
        for event in &outcome.events {
            println!("    {}", describe(event));
        }
    }

    Ok(())
}

fn describe(event: &TechTreeEvent) -> String {
    match event {
        TechTreeEvent::PrerequisitesAvailable { player, owner, key } => {
            format!("{player}: {key} available (queue {owner})")
        }
        TechTreeEvent::PrerequisitesUnavailable { player, owner, key } => {
            format!("{player}: {key} unavailable (queue {owner})")
        }
        TechTreeEvent::HiddenChanged {
            player,
            owner,
            key,
            was_hidden,
        } => {
            let state = if *was_hidden { "revealed" } else { "hidden" };
            format!("{player}: {key} {state} (queue {owner})")
        }
    }
}

fn show_rules(rules: &str) -> Result<()> {
    let rules = load(rules)?;

    println!("Buildables:");
    for (name, info) in rules.buildables() {
        let prerequisites: Vec<String> =
            info.prerequisites.iter().map(ToString::to_string).collect();
        let limit = match info.build_limit {
            0 => String::new(),
            n => format!(" (limit {n})"),
        };
        println!("  {name}{limit}: [{}]", prerequisites.join(", "));
    }

    let warnings = rules.validate();
    if warnings.is_empty() {
        println!("No problems found.");
    } else {
        println!("{} problem(s):", warnings.len());
        for warning in &warnings {
            println!("  {warning}");
        }
    }

    Ok(())
}
