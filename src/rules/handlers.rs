use bevy_utils::tracing::debug;

use crate::ledger::link::Link;
use crate::ledger::meta::{Longevity, MetaPatch};
use crate::rules::context::EffectContext;
use crate::rules::effect::{EffectDef, EffectError};
use crate::rules::engine::{run_effects, EffectRegistry};
use crate::rules::frames::{with_frames, Frame};
use crate::rules::resolve::resolve_meta;
use crate::core::player::PassiveRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityTarget {
    Resource,
    Stat,
}

pub fn register_builtins(registry: &mut EffectRegistry) {
    registry.register("resource:add", resource_add);
    registry.register("resource:remove", resource_remove);
    registry.register("stat:add", stat_add);
    registry.register("stat:remove", stat_remove);
    registry.register("building:add", building_add);
    registry.register("building:remove", building_remove);
    registry.register("building:upkeep", building_upkeep);
    registry.register("development:add", development_add);
    registry.register("development:remove", development_remove);
    registry.register("population:add", population_add);
    registry.register("population:remove", population_remove);
    registry.register("passive:add", passive_add);
    registry.register("passive:remove", passive_remove);
}

/// Change a quantity and record the change in the ledger.
///
/// Meta is resolved before anything is mutated. The ledger receives the delta
/// actually applied, which differs from `delta` when a resource bottoms out.
pub fn apply_quantity_change(
    ctx: &mut EffectContext<'_>,
    effect: &EffectDef,
    target: QuantityTarget,
    quantity: &str,
    delta: f64,
) -> Result<f64, EffectError> {
    let meta = resolve_meta(effect, ctx, quantity)?;
    let applied = match target {
        QuantityTarget::Resource => ctx.player.adjust_resource(quantity, delta),
        QuantityTarget::Stat => ctx.player.adjust_stat(quantity, delta),
    };
    ctx.player.ledger.apply_delta(quantity, applied, &meta);
    Ok(applied)
}

fn required_text<'e>(effect: &'e EffectDef, param: &'static str) -> Result<&'e str, EffectError> {
    effect.text_param(param).ok_or_else(|| EffectError::MissingParam {
        key: effect.handler_key().unwrap_or_default(),
        param,
    })
}

fn required_amount(effect: &EffectDef) -> Result<f64, EffectError> {
    effect
        .number_param("amount")
        .ok_or_else(|| EffectError::MissingParam {
            key: effect.handler_key().unwrap_or_default(),
            param: "amount",
        })
}

fn change(
    ctx: &mut EffectContext<'_>,
    effect: &EffectDef,
    target: QuantityTarget,
    sign: f64,
    multiplier: f64,
) -> Result<(), EffectError> {
    let key = required_text(effect, "key")?;
    let amount = required_amount(effect)?;
    apply_quantity_change(ctx, effect, target, key, sign * amount * multiplier)?;
    Ok(())
}

fn resource_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    change(ctx, effect, QuantityTarget::Resource, 1.0, multiplier)
}

fn resource_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    change(ctx, effect, QuantityTarget::Resource, -1.0, multiplier)
}

fn stat_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    change(ctx, effect, QuantityTarget::Stat, 1.0, multiplier)
}

fn stat_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    change(ctx, effect, QuantityTarget::Stat, -1.0, multiplier)
}

fn building_upkeep(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    change(ctx, effect, QuantityTarget::Resource, -1.0, multiplier)
}

/// Frame tagging everything an installed source produces, and keying it
/// under `kind:id:` so running the same effects with the opposite sign
/// cancels exactly those contributions.
pub fn install_frame(kind: &'static str, id: &str, instance: Option<String>) -> Frame {
    let id = id.to_string();
    Frame::new(format!("{}:{}", kind, id), move |effect, _, quantity| {
        let mut patch = MetaPatch::default()
            .kind(kind)
            .id(id.clone())
            .longevity(Longevity::Ongoing)
            .removal(Link::new(kind, id.clone()));
        patch.source_key = Some(format!("{}:{}:{}", kind, id, effect.source_key(quantity)));
        if let Some(instance) = &instance {
            patch = patch.instance(instance.clone());
        }
        Ok(Some(patch))
    })
}

fn run_installed(
    ctx: &mut EffectContext<'_>,
    frame: Frame,
    effects: &[EffectDef],
    multiplier: f64,
) -> Result<(), EffectError> {
    with_frames(ctx, [frame], |ctx| run_effects(ctx, effects, multiplier))
}

/// Whole copies a structural handler installs or removes for `multiplier`.
fn copies(multiplier: f64) -> usize {
    multiplier.round() as usize
}

fn building_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return building_remove(ctx, effect, -multiplier);
    }
    let services = ctx.services;
    let id = required_text(effect, "id")?;
    let building = services
        .content
        .building(id)
        .ok_or_else(|| EffectError::UnknownContent {
            kind: "building",
            id: id.to_string(),
        })?;

    for _ in 0..copies(multiplier) {
        let instance = format!("{}#{}", id, ctx.player.building_count(id) + 1);
        let frame = install_frame("building", id, Some(instance));
        run_installed(ctx, frame, &building.on_build, 1.0)?;
        ctx.player.buildings.push(id.to_string());
        debug!(building = id, "building installed");
    }
    Ok(())
}

fn building_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return building_add(ctx, effect, -multiplier);
    }
    let services = ctx.services;
    let id = required_text(effect, "id")?;
    let building = services
        .content
        .building(id)
        .ok_or_else(|| EffectError::UnknownContent {
            kind: "building",
            id: id.to_string(),
        })?;

    for _ in 0..copies(multiplier) {
        let Some(position) = ctx.player.buildings.iter().rposition(|owned| owned == id) else {
            return Err(EffectError::NotInstalled {
                kind: "building",
                id: id.to_string(),
            });
        };
        let frame = install_frame("building", id, None);
        run_installed(ctx, frame, &building.on_build, -1.0)?;
        ctx.player.buildings.remove(position);
        debug!(building = id, "building removed");
    }
    Ok(())
}

fn development_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return development_remove(ctx, effect, -multiplier);
    }
    let services = ctx.services;
    let id = required_text(effect, "id")?;
    let development = services
        .content
        .development(id)
        .ok_or_else(|| EffectError::UnknownContent {
            kind: "development",
            id: id.to_string(),
        })?;

    for _ in 0..copies(multiplier) {
        let instance = format!("{}#{}", id, ctx.player.development_count(id) + 1);
        let frame = install_frame("development", id, Some(instance));
        run_installed(ctx, frame, &development.on_build, 1.0)?;
        ctx.player.developments.push(id.to_string());
    }
    Ok(())
}

fn development_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return development_add(ctx, effect, -multiplier);
    }
    let services = ctx.services;
    let id = required_text(effect, "id")?;
    let development = services
        .content
        .development(id)
        .ok_or_else(|| EffectError::UnknownContent {
            kind: "development",
            id: id.to_string(),
        })?;

    for _ in 0..copies(multiplier) {
        let Some(position) = ctx.player.developments.iter().rposition(|owned| owned == id) else {
            return Err(EffectError::NotInstalled {
                kind: "development",
                id: id.to_string(),
            });
        };
        let frame = install_frame("development", id, None);
        run_installed(ctx, frame, &development.on_build, -1.0)?;
        ctx.player.developments.remove(position);
    }
    Ok(())
}

fn population_delta(effect: &EffectDef, multiplier: f64) -> i64 {
    let count = effect.number_param("count").unwrap_or(1.0);
    (count * multiplier).round() as i64
}

fn population_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    let count = population_delta(effect, multiplier);
    change_population(ctx, effect, count)
}

fn population_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    let count = population_delta(effect, multiplier);
    change_population(ctx, effect, -count)
}

/// Assign or release `count` members of a role, applying the role's
/// `onAssigned` effects once per member. The resulting count stays within
/// `0..=u32::MAX`.
fn change_population(ctx: &mut EffectContext<'_>, effect: &EffectDef, count: i64) -> Result<(), EffectError> {
    let services = ctx.services;
    let role = required_text(effect, "role")?;
    let definition = services
        .content
        .population_role(role)
        .ok_or_else(|| EffectError::UnknownContent {
            kind: "population role",
            id: role.to_string(),
        })?;

    let current = i64::from(ctx.player.population_count(role));
    let next = current.saturating_add(count).clamp(0, i64::from(u32::MAX));
    let count = next - current;
    if count == 0 {
        return Ok(());
    }

    let frame = install_frame("population", role, None);
    run_installed(ctx, frame, &definition.on_assigned, count as f64)?;
    let next = u32::try_from(next).unwrap_or(u32::MAX);
    ctx.player.population.insert(role.to_string(), next);
    debug!(role, count, total = next, "population changed");
    Ok(())
}

fn passive_add(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return passive_remove(ctx, effect, -multiplier);
    }
    let id = required_text(effect, "id")?;
    if ctx.player.passives.contains_key(id) {
        debug!(passive = id, "passive already active");
        return Ok(());
    }

    let frame = install_frame("passive", id, None);
    run_installed(ctx, frame, &effect.effects, 1.0)?;
    ctx.player.passives.insert(
        id.to_string(),
        PassiveRecord {
            id: id.to_string(),
            effects: effect.effects.clone(),
        },
    );
    Ok(())
}

fn passive_remove(ctx: &mut EffectContext<'_>, effect: &EffectDef, multiplier: f64) -> Result<(), EffectError> {
    if multiplier < 0.0 {
        return passive_add(ctx, effect, -multiplier);
    }
    let id = required_text(effect, "id")?;
    let Some(record) = ctx.player.passives.get(id).cloned() else {
        return Err(EffectError::NotInstalled {
            kind: "passive",
            id: id.to_string(),
        });
    };

    let frame = install_frame("passive", id, None);
    run_installed(ctx, frame, &record.effects, -1.0)?;
    ctx.player.passives.shift_remove(id);
    Ok(())
}
