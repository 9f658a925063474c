use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ledger::meta::{EffectRef, MetaPatch};
use crate::ledger::source::{source_key, DEFAULT_SOURCE_METHOD};
use crate::rules::evaluator::EvaluatorDef;
use crate::rules::frames::FrameError;

/// One rule step as written in content data.
///
/// An effect either dispatches by `type`/`method`, or scales its nested
/// `effects` by an `evaluator`, or just groups nested effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectDef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub effect_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<EvaluatorDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaPatch>,
}

impl EffectDef {
    pub fn new(effect_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            effect_type: Some(effect_type.into()),
            method: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_meta(mut self, meta: MetaPatch) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Registry key: `type:method`, with the method defaulted.
    pub fn handler_key(&self) -> Option<String> {
        let effect_type = self.effect_type.as_deref()?;
        let method = self.method.as_deref().unwrap_or(DEFAULT_SOURCE_METHOD);
        Some(format!("{}:{}", effect_type, method))
    }

    /// Ledger key for this effect touching `quantity`.
    pub fn source_key(&self, quantity: &str) -> String {
        source_key(self.effect_type.as_deref(), self.method.as_deref(), quantity)
    }

    pub fn effect_ref(&self) -> Option<EffectRef> {
        let effect = EffectRef {
            effect_type: self.effect_type.clone(),
            method: self.method.clone(),
        };
        if effect.is_empty() {
            None
        } else {
            Some(effect)
        }
    }

    pub fn text_param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn number_param(&self, key: &str) -> Option<f64> {
        self.params
            .get(key)
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("no handler registered for effect {key}")]
    UnknownHandler { key: String },
    #[error("effect {key} is missing parameter {param}")]
    MissingParam { key: String, param: &'static str },
    #[error("unknown {kind} {id}")]
    UnknownContent { kind: &'static str, id: String },
    #[error("{kind} {id} is not installed")]
    NotInstalled { kind: &'static str, id: String },
    #[error("unknown player {0}")]
    UnknownPlayer(u32),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
