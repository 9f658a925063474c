use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use bevy_utils::tracing::subscriber;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use kingdom_ledger::core::config::{config_path, load_engine_config};
use kingdom_ledger::ledger::store::Contribution;
use kingdom_ledger::rules::effect::EffectDef;
use kingdom_ledger::{EffectRequest, PlayerState, Simulation};

const DEFAULT_SCENARIO_PATH: &str = "./assets/data/demo_scenario.json";

/// Scripted turns fed to the simulation by the CLI.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default = "default_player_name")]
    player: String,
    #[serde(default)]
    turns: Vec<ScenarioTurn>,
}

#[derive(Debug, Default, Deserialize)]
struct ScenarioTurn {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    effects: Vec<EffectDef>,
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn main() {
    // Config loading logs before the configured filter is known.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    let config = match subscriber::with_default(bootstrap, || load_engine_config(config_path())) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", err);
            process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scenario_path = parse_scenario_path(env::args().collect());
    let scenario = match load_scenario(&scenario_path) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("Failed to load scenario {}: {}", scenario_path.display(), err);
            process::exit(1);
        }
    };

    let mut sim = match Simulation::from_config(&config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("Failed to load content: {}", err);
            process::exit(1);
        }
    };
    let player = sim.add_player(config.starting_player(scenario.player.as_str()));

    for turn in scenario.turns {
        let requests = if turn.effects.is_empty() {
            Vec::new()
        } else {
            let mut request = EffectRequest::new(player, turn.effects);
            if let Some(action) = turn.action {
                request = request.for_action(action);
            }
            vec![request]
        };
        let report = sim.tick(requests);
        print_json(&report);
    }

    for id in sim.player_ids() {
        match sim.player(id) {
            Some(state) => print_json(&LedgerSummary::from_player(state)),
            None => {
                eprintln!("Player {} vanished from the world", id.0);
                process::exit(1);
            }
        }
    }
}

fn parse_scenario_path(args: Vec<String>) -> PathBuf {
    let mut iter = args.iter().skip(1);
    let mut path = PathBuf::from(DEFAULT_SCENARIO_PATH);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--scenario" => {
                if let Some(value) = iter.next() {
                    path = PathBuf::from(value);
                }
            }
            other if !other.starts_with("--") => path = PathBuf::from(other),
            _ => {}
        }
    }
    path
}

fn load_scenario(path: &Path) -> Result<Scenario, String> {
    let raw = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&raw).map_err(|err| err.to_string())
}

/// Current values next to the contributions that explain them. Quantities
/// and sources keep the ledger's first-touch order.
#[derive(Debug, Serialize)]
struct LedgerSummary<'a> {
    player: &'a str,
    resources: &'a BTreeMap<String, f64>,
    stats: &'a BTreeMap<String, f64>,
    population: &'a BTreeMap<String, u32>,
    buildings: &'a [String],
    developments: &'a [String],
    ledger: IndexMap<&'a str, QuantitySummary<'a>>,
}

#[derive(Debug, Serialize)]
struct QuantitySummary<'a> {
    value: f64,
    attributed: f64,
    sources: IndexMap<&'a str, &'a Contribution>,
}

impl<'a> LedgerSummary<'a> {
    fn from_player(state: &'a PlayerState) -> Self {
        let ledger = state
            .ledger
            .quantities()
            .map(|quantity| {
                let summary = QuantitySummary {
                    value: state.quantity(quantity),
                    attributed: state.ledger.total(quantity),
                    sources: state.ledger.contributions(quantity).collect(),
                };
                (quantity, summary)
            })
            .collect();

        Self {
            player: &state.name,
            resources: &state.resources,
            stats: &state.stats,
            population: &state.population,
            buildings: &state.buildings,
            developments: &state.developments,
            ledger,
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(err) => eprintln!("Failed to serialize output: {}", err),
    }
}
