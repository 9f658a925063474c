use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ledger::store::Ledger;
use crate::rules::effect::EffectDef;

/// Stable identifier for addressing players externally.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Inline effects installed by `passive:add`, kept so `passive:remove` can
/// reverse them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveRecord {
    pub id: String,
    pub effects: Vec<EffectDef>,
}

/// Everything one player owns: quantities, holdings, and the ledger
/// explaining the quantities.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub name: String,
    pub resources: BTreeMap<String, f64>,
    pub stats: BTreeMap<String, f64>,
    pub population: BTreeMap<String, u32>,
    pub developments: Vec<String>,
    pub buildings: Vec<String>,
    pub passives: IndexMap<String, PassiveRecord>,
    pub ledger: Ledger,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Baseline resource value; not recorded in the ledger.
    pub fn with_resource(mut self, key: impl Into<String>, value: f64) -> Self {
        self.resources.insert(key.into(), value);
        self
    }

    /// Baseline stat value; not recorded in the ledger.
    pub fn with_stat(mut self, key: impl Into<String>, value: f64) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    pub fn with_population(mut self, role: impl Into<String>, count: u32) -> Self {
        self.population.insert(role.into(), count);
        self
    }

    /// Current value of a resource, or of a stat with that id, or zero.
    pub fn quantity(&self, key: &str) -> f64 {
        self.resources
            .get(key)
            .or_else(|| self.stats.get(key))
            .copied()
            .unwrap_or(0.0)
    }

    /// Add `delta` to a resource, never dropping below zero. Returns the
    /// delta actually applied.
    pub fn adjust_resource(&mut self, key: &str, delta: f64) -> f64 {
        let current = self.resources.entry(key.to_string()).or_insert(0.0);
        let next = (*current + delta).max(0.0);
        let applied = next - *current;
        *current = next;
        applied
    }

    /// Add `delta` to a stat. Stats are unbounded.
    pub fn adjust_stat(&mut self, key: &str, delta: f64) -> f64 {
        *self.stats.entry(key.to_string()).or_insert(0.0) += delta;
        delta
    }

    pub fn population_count(&self, role: &str) -> u32 {
        self.population.get(role).copied().unwrap_or(0)
    }

    /// Sum over every role, saturating at `u32::MAX`.
    pub fn total_population(&self) -> u32 {
        self.population.values().fold(0u32, |total, count| total.saturating_add(*count))
    }

    pub fn development_count(&self, id: &str) -> usize {
        self.developments.iter().filter(|owned| *owned == id).count()
    }

    pub fn building_count(&self, id: &str) -> usize {
        self.buildings.iter().filter(|owned| *owned == id).count()
    }

    /// Independent copy for previews and transactional application.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}
