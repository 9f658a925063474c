use std::collections::HashMap;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;

use crate::data::content::ContentCatalog;
use crate::ledger::dependencies::DependencyCollector;
use crate::ledger::meta::MetaPatch;
use crate::ledger::store::EPSILON;
use crate::rules::context::EffectContext;
use crate::rules::effect::{EffectDef, EffectError};
use crate::rules::evaluator::EvaluatorRegistry;
use crate::rules::frames::{with_frames, Frame};
use crate::rules::handlers;

pub type EffectHandler = fn(&mut EffectContext<'_>, &EffectDef, f64) -> Result<(), EffectError>;

/// Effect handlers keyed by `type:method`.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    handlers: HashMap<String, EffectHandler>,
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl EffectRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        handlers::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, handler: EffectHandler) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn get(&self, key: &str) -> Option<EffectHandler> {
        self.handlers.get(key).copied()
    }
}

/// Shared, read-only rule services for one simulation.
#[derive(Resource, Debug, Clone, Default)]
pub struct RulesServices {
    pub evaluators: EvaluatorRegistry,
    pub dependencies: DependencyCollector,
    pub effects: EffectRegistry,
    pub content: ContentCatalog,
}

impl RulesServices {
    pub fn new(content: ContentCatalog) -> Self {
        Self {
            evaluators: EvaluatorRegistry::with_builtins(),
            dependencies: DependencyCollector::with_builtins(),
            effects: EffectRegistry::with_builtins(),
            content,
        }
    }
}

pub fn run_effects(
    ctx: &mut EffectContext<'_>,
    effects: &[EffectDef],
    multiplier: f64,
) -> Result<(), EffectError> {
    for effect in effects {
        run_effect(ctx, effect, multiplier)?;
    }
    Ok(())
}

/// Apply one effect. Evaluator-scaled effects run their children with the
/// evaluated multiplier under a frame recording what the value depends on.
pub fn run_effect(
    ctx: &mut EffectContext<'_>,
    effect: &EffectDef,
    multiplier: f64,
) -> Result<(), EffectError> {
    let services = ctx.services;

    if let Some(evaluator) = &effect.evaluator {
        let value = services.evaluators.evaluate(evaluator, ctx.player);
        debug!(evaluator = %evaluator.kind, value, "evaluator resolved");
        if value.abs() < EPSILON {
            return Ok(());
        }
        let links = services.dependencies.collect(evaluator);
        let frame = (!links.is_empty()).then(|| {
            Frame::constant(
                format!("evaluator:{}", evaluator.kind),
                MetaPatch::default().depends_on(links),
            )
        });
        return with_frames(ctx, frame, |ctx| {
            run_effects(ctx, &effect.effects, multiplier * value)
        });
    }

    let Some(key) = effect.handler_key() else {
        return run_effects(ctx, &effect.effects, multiplier);
    };
    let handler = services
        .effects
        .get(&key)
        .ok_or_else(|| EffectError::UnknownHandler { key: key.clone() })?;
    debug!(effect = %key, multiplier, "dispatching effect");
    handler(ctx, effect, multiplier)
}
