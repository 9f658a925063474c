use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::player::PlayerState;

/// Expression node computing a dynamic number: a population count, a
/// development count, a resource or stat value, or a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl EvaluatorDef {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Trimmed, non-empty string parameter.
    pub fn text_param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Parse a nested operand. Numbers are not evaluators.
    pub fn operand(value: &Value) -> Option<EvaluatorDef> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

pub type EvaluateFn = fn(&EvaluatorDef, &EvaluatorRegistry, &PlayerState) -> f64;

/// Evaluators by kind. Built once per simulation and shared through
/// `RulesServices`.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<String, EvaluateFn>,
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.evaluators.keys()).finish()
    }
}

impl EvaluatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("population", evaluate_population);
        registry.register("development", evaluate_development);
        registry.register("resource", evaluate_resource);
        registry.register("compare", evaluate_compare);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, evaluate: EvaluateFn) {
        self.evaluators.insert(kind.into(), evaluate);
    }

    /// Unknown kinds evaluate to zero.
    pub fn evaluate(&self, evaluator: &EvaluatorDef, player: &PlayerState) -> f64 {
        self.evaluators
            .get(&evaluator.kind)
            .map_or(0.0, |evaluate| evaluate(evaluator, self, player))
    }

    fn operand(&self, value: Option<&Value>, player: &PlayerState) -> f64 {
        match value {
            Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
            Some(other) => EvaluatorDef::operand(other)
                .map_or(0.0, |nested| self.evaluate(&nested, player)),
            None => 0.0,
        }
    }
}

fn evaluate_population(ev: &EvaluatorDef, _: &EvaluatorRegistry, player: &PlayerState) -> f64 {
    let count = match ev.text_param("role") {
        Some(role) => player.population_count(role),
        None => player.total_population(),
    };
    f64::from(count)
}

fn evaluate_development(ev: &EvaluatorDef, _: &EvaluatorRegistry, player: &PlayerState) -> f64 {
    let count = match ev.text_param("id") {
        Some(id) => player.development_count(id),
        None => player.developments.len(),
    };
    count as f64
}

fn evaluate_resource(ev: &EvaluatorDef, _: &EvaluatorRegistry, player: &PlayerState) -> f64 {
    ev.text_param("key")
        .map_or(0.0, |key| player.quantity(key))
}

fn evaluate_compare(ev: &EvaluatorDef, registry: &EvaluatorRegistry, player: &PlayerState) -> f64 {
    let left = registry.operand(ev.params.get("left"), player);
    let right = registry.operand(ev.params.get("right"), player);
    let holds = match ev.text_param("operator").unwrap_or("gte") {
        "lt" => left < right,
        "lte" => left <= right,
        "gt" => left > right,
        "eq" => left == right,
        "ne" => left != right,
        _ => left >= right,
    };
    if holds {
        1.0
    } else {
        0.0
    }
}
