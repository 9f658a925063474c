use std::path::Path;

use serde_json::json;

use kingdom_ledger::ledger::link::Link;
use kingdom_ledger::ledger::meta::Longevity;
use kingdom_ledger::rules::effect::EffectDef;
use kingdom_ledger::{EffectRequest, EngineConfig, PlayerId, Simulation};

fn bundled_config() -> EngineConfig {
    let content = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/data/kingdom.json");
    EngineConfig {
        content_path: content.display().to_string(),
        ..EngineConfig::default()
    }
}

fn setup() -> (Simulation, PlayerId, EngineConfig) {
    let config = bundled_config();
    let mut sim = Simulation::from_config(&config).expect("bundled content");
    let player = sim.add_player(config.starting_player("Aurelia").with_population("council", 1));
    (sim, player, config)
}

fn gold(amount: f64) -> EffectDef {
    EffectDef::new("resource", "add")
        .param("key", json!("gold"))
        .param("amount", json!(amount))
}

fn build(id: &str) -> EffectDef {
    EffectDef::new("building", "add").param("id", json!(id))
}

#[test]
fn repeated_income_and_upkeep_are_attributed_separately() {
    let (mut sim, player, _) = setup();

    let report = sim.tick(vec![EffectRequest::new(
        player,
        vec![gold(3.0), gold(3.0), gold(3.0)],
    )]);
    assert!(report.outcomes.iter().all(|outcome| outcome.is_applied()));
    sim.tick(vec![EffectRequest::new(player, vec![build("barracks")])]);

    let state = sim.player(player).expect("player");
    let income = state
        .ledger
        .contribution("gold", "resource:add:gold")
        .expect("income");
    assert!((income.amount - 9.0).abs() < 1e-9);
    assert_eq!(income.meta.longevity, Longevity::Permanent);

    let upkeep = state
        .ledger
        .contribution("gold", "building:upkeep:gold")
        .expect("upkeep");
    assert!((upkeep.amount + 2.0).abs() < 1e-9);
    assert_eq!(upkeep.meta.longevity, Longevity::Ongoing);
    assert_eq!(upkeep.meta.kind.as_deref(), Some("building"));
    assert_eq!(upkeep.meta.id.as_deref(), Some("barracks"));

    let keys: Vec<&str> = state.ledger.contributions("gold").map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["resource:add:gold", "building:upkeep:gold"]);
}

#[test]
fn contributions_explain_every_change_from_baseline() {
    let (mut sim, player, config) = setup();
    let turns = vec![
        vec![gold(4.0), build("farm")],
        vec![build("barracks"), build("temple")],
        vec![EffectDef::new("development", "add").param("id", json!("watchtower"))],
        vec![EffectDef::new("population", "add")
            .param("role", json!("legion"))
            .param("count", json!(2))],
        vec![],
    ];
    for effects in turns {
        let requests = if effects.is_empty() {
            Vec::new()
        } else {
            vec![EffectRequest::new(player, effects)]
        };
        sim.tick(requests);
    }

    let state = sim.player(player).expect("player");
    let baseline = config.starting_player("Aurelia");
    for quantity in state.ledger.quantities() {
        let expected = state.quantity(quantity) - baseline.quantity(quantity);
        let attributed = state.ledger.total(quantity);
        assert!(
            (expected - attributed).abs() < 1e-9,
            "{} attributed {} but moved {}",
            quantity,
            attributed,
            expected
        );
    }
}

#[test]
fn failed_request_leaves_player_untouched() {
    let (mut sim, player, _) = setup();
    let before = sim.fork_player(player).expect("player");

    let report = sim.tick(vec![EffectRequest::new(
        player,
        vec![gold(5.0), build("castle")],
    )]);

    let outcome = &report.outcomes[0];
    assert!(!outcome.is_applied());
    assert!(outcome.error.as_deref().unwrap_or_default().contains("castle"));
    assert_eq!(sim.player(player), Some(&before));
}

#[test]
fn preview_does_not_touch_the_world() {
    let (sim, player, _) = setup();
    let before = sim.fork_player(player).expect("player");

    let preview = sim.preview(player, &[build("farm")]).expect("preview");

    assert_eq!(preview.quantity("gold"), before.quantity("gold") + 2.0);
    assert_eq!(preview.building_count("farm"), 1);
    assert_eq!(sim.player(player), Some(&before));
    assert_eq!(sim.turn(), 0);
}

#[test]
fn building_then_demolishing_leaves_no_trace() {
    let (mut sim, player, _) = setup();
    let before = sim.fork_player(player).expect("player");

    sim.tick(vec![EffectRequest::new(
        player,
        vec![
            build("farm"),
            EffectDef::new("building", "remove").param("id", json!("farm")),
        ],
    )]);

    let state = sim.player(player).expect("player");
    assert_eq!(state.buildings, before.buildings);
    assert_eq!(state.quantity("gold"), before.quantity("gold"));
    assert!(state.ledger.contributions("gold").next().is_none());
}

#[test]
fn temple_happiness_depends_on_the_council() {
    let (mut sim, player, _) = setup();
    sim.tick(vec![EffectRequest::new(player, vec![build("temple")])]);

    let state = sim.player(player).expect("player");
    let (_, entry) = state
        .ledger
        .contributions("happiness")
        .next()
        .expect("happiness contribution");
    assert_eq!(entry.meta.kind.as_deref(), Some("building"));
    assert_eq!(entry.meta.instance.as_deref(), Some("temple#1"));
    let depends_on = entry.meta.depends_on.as_deref().unwrap_or_default();
    assert!(depends_on.contains(&Link::new("population", "council")));
    assert_eq!(entry.meta.removal, Some(Link::new("building", "temple")));
}

#[test]
fn action_requests_tag_their_contributions() {
    let (mut sim, player, _) = setup();
    let report = sim.tick(vec![
        EffectRequest::new(player, vec![gold(1.0)]).for_action("tax")
    ]);
    assert_eq!(report.outcomes[0].action.as_deref(), Some("tax"));

    let state = sim.player(player).expect("player");
    let entry = state
        .ledger
        .contribution("gold", "resource:add:gold")
        .expect("contribution");
    let extra = entry.meta.extra.as_ref().expect("extra");
    assert_eq!(extra.get("action"), Some(&json!("tax")));
}

#[test]
fn requests_for_unknown_players_are_reported() {
    let (mut sim, _, _) = setup();
    let report = sim.tick(vec![EffectRequest::new(PlayerId(99), vec![gold(1.0)])]);
    assert_eq!(report.outcomes.len(), 1);
    assert!(!report.outcomes[0].is_applied());
}

#[test]
fn turn_counter_advances_each_tick() {
    let (mut sim, _, _) = setup();
    assert_eq!(sim.tick(Vec::new()).turn, 0);
    assert_eq!(sim.tick(Vec::new()).turn, 1);
    assert_eq!(sim.turn(), 2);
}

#[test]
fn player_ids_follow_join_order() {
    let (mut sim, first, config) = setup();
    let second = sim.add_player(config.starting_player("Brennus"));

    let ids: Vec<PlayerId> = sim.player_ids().collect();
    assert_eq!(ids, vec![first, second]);
    assert_ne!(first, second);
}
