use ironfront_core::{
    load_rules, Actor, CompiledRules, DuplicatePolicy, PlayerId, RulesSource, SimConfig,
    TechTree, World,
};

const P0: PlayerId = PlayerId(0);

fn base_rules() -> CompiledRules {
    load_rules(RulesSource::Embedded).unwrap()
}

fn lobby(tech_level: &str) -> World {
    let config = SimConfig::from_yaml_str(&format!("tech_level: {tech_level}\n")).unwrap();
    let mut world = World::new(config.world_settings());
    world.add_player(P0);
    world
}

fn available(tree: &TechTree) -> Vec<&str> {
    tree.watchers()
        .filter(|w| w.has_prerequisites())
        .map(|w| w.key())
        .collect()
}

#[test]
fn base_rules_validate_cleanly() {
    assert!(base_rules().validate().is_empty());
}

#[test]
fn full_build_order_unlocks_the_tree() {
    let rules = base_rules();
    let mut world = lobby("unrestricted");
    let queue = world.spawn(Actor::new("queue", Some(P0)));
    let registered = world.register_rules(P0, &rules, queue).unwrap();
    assert_eq!(registered, rules.buildables().count());

    let spawn = |world: &mut World, name: &str| {
        world.spawn_type(&rules, name, Some(P0)).unwrap();
        world.drain_events()
    };

    spawn(&mut world, "player");
    let tree = world.tech_tree(P0).unwrap();
    assert!(available(tree).is_empty());
    assert!(tree.is_hidden("iron"));
    assert!(tree.is_hidden("tsla"));

    spawn(&mut world, "fact");
    assert_eq!(available(world.tech_tree(P0).unwrap()), vec!["powr", "spy"]);

    spawn(&mut world, "powr");
    spawn(&mut world, "proc");
    assert_eq!(
        available(world.tech_tree(P0).unwrap()),
        vec!["dome", "powr", "proc", "spy", "weap"]
    );

    spawn(&mut world, "weap");
    let events = spawn(&mut world, "dome");
    assert!(events.iter().any(|e| e.key() == "spy"));
    let tree = world.tech_tree(P0).unwrap();
    assert!(!tree.is_available("spy"));
    assert!(tree.is_available("stek"));
    assert!(tree.is_available("mcv"));

    spawn(&mut world, "stek");
    let tree = world.tech_tree(P0).unwrap();
    assert!(!tree.is_hidden("iron"));
    assert!(tree.is_available("iron"));
    assert!(tree.is_available("tsla"));

    spawn(&mut world, "iron");
    assert!(!world.tech_tree(P0).unwrap().is_available("iron"));
}

#[test]
fn low_tech_lobby_never_unlocks_radar() {
    let rules = base_rules();
    let mut world = lobby("low");
    let queue = world.spawn(Actor::new("queue", Some(P0)));
    world.register_rules(P0, &rules, queue).unwrap();

    for name in ["player", "fact", "powr", "proc"] {
        world.spawn_type(&rules, name, Some(P0)).unwrap();
    }
    let tree = world.tech_tree(P0).unwrap();
    assert!(tree.is_available("weap"));
    assert!(!tree.is_available("dome"));
}

#[test]
fn registering_twice_follows_the_configured_policy() {
    let rules = base_rules();
    let config = SimConfig::from_yaml_str("duplicate_registration: reject\n").unwrap();
    assert_eq!(config.duplicate_registration, DuplicatePolicy::Reject);

    let mut world = World::new(config.world_settings());
    world.add_player(P0);
    let queue = world.spawn(Actor::new("queue", Some(P0)));
    world.register_rules(P0, &rules, queue).unwrap();
    assert!(world.register_rules(P0, &rules, queue).is_err());
}
