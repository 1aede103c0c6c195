use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::rules::{CompiledRules, RawActorType};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    /// Directory containing `actors.yaml`.
    Path(PathBuf),
    Bytes(&'a [u8]),
}

pub fn load_rules(source: RulesSource<'_>) -> Result<CompiledRules, RulesError> {
    let rules = match source {
        RulesSource::Embedded => parse_rules(include_str!("../../data/base/actors.yaml"))?,
        RulesSource::Path(dir) => {
            let yaml = std::fs::read_to_string(dir.join("actors.yaml"))?;
            parse_rules(&yaml)?
        }
        RulesSource::Bytes(bytes) => parse_rules(std::str::from_utf8(bytes)?)?,
    };

    let warnings = rules.validate();
    for warning in &warnings {
        warn!("rules: {warning}");
    }
    debug!(
        actor_types = rules.actor_types.len(),
        warnings = warnings.len(),
        "rules loaded"
    );
    Ok(rules)
}

/// Parses and compiles a ruleset without validating it.
pub fn parse_rules(yaml: &str) -> Result<CompiledRules, RulesError> {
    let raw: BTreeMap<String, RawActorType> = serde_yaml::from_str(yaml)?;
    Ok(compile_rules(raw))
}

fn compile_rules(raw: BTreeMap<String, RawActorType>) -> CompiledRules {
    let actor_types = raw
        .into_iter()
        .map(|(name, ty)| (name.clone(), ty.compile(name)))
        .collect();
    CompiledRules { actor_types }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PrerequisiteToken, RulesWarning};

    #[test]
    fn embedded_rules_are_consistent() {
        let rules = load_rules(RulesSource::Embedded).expect("rules load");
        assert!(rules.validate().is_empty(), "{:?}", rules.validate());
        assert!(rules.buildable("powr").is_some());
        assert!(rules.actor_type("player").is_some_and(|t| t.buildable.is_none()));
    }

    #[test]
    fn compiles_tokens_limits_and_providers() {
        let yaml = r#"
stek:
  name: Tech Center
  buildable:
    prerequisites: [weap, "!~lowtech"]
    build_limit: 1
  provides:
    - prerequisites: [techcenter]
    - tech_level: high
      prerequisites: [techlevel.high]
weap:
  provides:
    - prerequisites: [weap]
"#;
        let rules = parse_rules(yaml).unwrap();
        let stek = rules.actor_type("stek").unwrap();
        assert_eq!(stek.display_name, "Tech Center");

        let info = stek.buildable.as_ref().unwrap();
        assert_eq!(info.build_limit, 1);
        assert!(!info.hidden);
        assert_eq!(info.prerequisites[0], PrerequisiteToken::plain("weap"));
        assert_eq!(info.prerequisites[1].base_key, "lowtech");
        assert!(info.prerequisites[1].negated && info.prerequisites[1].hidden_marker);

        assert_eq!(stek.providers.len(), 2);
        assert_eq!(stek.providers[1].tech_level.as_deref(), Some("high"));

        let weap = rules.actor_type("weap").unwrap();
        assert_eq!(weap.display_name, "weap");
    }

    #[test]
    fn validate_reports_empty_and_unknown_keys() {
        let yaml = r#"
tank:
  buildable:
    prerequisites: [factory, "!~", weap]
    build_limit: 2
weap:
  provides:
    - prerequisites: [weap]
"#;
        let rules = parse_rules(yaml).unwrap();
        let warnings = rules.validate();
        assert_eq!(
            warnings,
            vec![
                RulesWarning::UnknownPrerequisite {
                    actor: "tank".into(),
                    key: "factory".into(),
                },
                RulesWarning::EmptyPrerequisite {
                    actor: "tank".into(),
                    raw: "!~".into(),
                },
            ]
        );
    }

    #[test]
    fn build_limited_types_count_as_known_keys() {
        let yaml = r#"
mcv:
  buildable: { build_limit: 1 }
fact:
  buildable: { prerequisites: ["!mcv"] }
"#;
        let rules = parse_rules(yaml).unwrap();
        assert!(rules.validate().is_empty());
    }

    #[test]
    fn path_source_reads_actors_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("actors.yaml"),
            "tank:\n  buildable:\n    prerequisites: [weap]\n    build_limit: 3\nweap:\n  provides:\n    - prerequisites: [weap]\n",
        )
        .unwrap();

        let rules = load_rules(RulesSource::Path(dir.path().to_path_buf())).unwrap();
        assert_eq!(rules.buildable("tank").map(|b| b.build_limit), Some(3));
        assert!(rules.validate().is_empty());
    }

    #[test]
    fn path_source_without_actors_yaml_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rules(RulesSource::Path(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, RulesError::Io(_)));
    }

    #[test]
    fn bytes_source_rejects_invalid_utf8() {
        let err = load_rules(RulesSource::Bytes(&[0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, RulesError::Utf8(_)));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = parse_rules("tank: [not, a, map").unwrap_err();
        assert!(matches!(err, RulesError::Yaml(_)));
    }
}
