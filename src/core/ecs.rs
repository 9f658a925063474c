use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;
use bevy_utils::tracing::{debug, warn};
use serde_json::json;

use crate::core::player::{PlayerId, PlayerState};
use crate::core::world::{EffectQueue, EffectRequest, IdAllocator, RequestOutcome, TurnLog};
use crate::ledger::meta::{Longevity, MetaPatch};
use crate::rules::context::EffectContext;
use crate::rules::effect::EffectError;
use crate::rules::engine::{run_effects, RulesServices};
use crate::rules::frames::{with_frames, Frame};

/// Canonical tick ordering for the simulation.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Effects,
    Upkeep,
    Time,
}

/// Turn number, starting at zero.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct TurnCounter(pub u64);

/// Build the ECS world with baseline resources.
pub fn create_world(services: RulesServices) -> World {
    let mut world = World::new();
    world.insert_resource(services);
    world.insert_resource(TurnCounter::default());
    world.insert_resource(EffectQueue::default());
    world.insert_resource(TurnLog::default());
    world.insert_resource(IdAllocator::default());
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets((TickSet::Effects, TickSet::Upkeep, TickSet::Time).chain());

    schedule.add_systems((
        effect_system.in_set(TickSet::Effects),
        upkeep_system.in_set(TickSet::Upkeep),
        advance_turn_system.in_set(TickSet::Time),
    ));

    schedule
}

/// System: applies queued effect requests. Each request runs on a fork of
/// the player and is committed only if every effect succeeded.
pub fn effect_system(
    mut queue: ResMut<EffectQueue>,
    services: Res<RulesServices>,
    turn: Res<TurnCounter>,
    mut log: ResMut<TurnLog>,
    mut players: Query<(&PlayerId, &mut PlayerState)>,
) {
    for request in queue.0.drain(..) {
        let Some((_, mut player)) = players.iter_mut().find(|(id, _)| **id == request.player) else {
            warn!(player = request.player.0, "effect request for unknown player");
            log.0.push(RequestOutcome::failed(&request, "unknown player".to_string()));
            continue;
        };

        match apply_request(&services, turn.0, &player, &request) {
            Ok(next) => {
                *player = next;
                log.0.push(RequestOutcome::applied(&request));
            }
            Err(err) => {
                warn!(player = request.player.0, error = %err, "effect request rejected");
                log.0.push(RequestOutcome::failed(&request, err.to_string()));
            }
        }
    }
}

/// Run a request against a fork of `player` and return the fork.
pub fn apply_request(
    services: &RulesServices,
    turn: u64,
    player: &PlayerState,
    request: &EffectRequest,
) -> Result<PlayerState, EffectError> {
    let mut draft = player.fork();
    {
        let mut ctx = EffectContext::new(&mut draft, services, turn);
        let frame = request.action.as_deref().map(action_frame);
        with_frames(&mut ctx, frame, |ctx| run_effects(ctx, &request.effects, 1.0))?;
    }
    Ok(draft)
}

fn action_frame(action: &str) -> Frame {
    Frame::constant(
        format!("action:{}", action),
        MetaPatch::default().extra_entry("action", json!(action)),
    )
}

/// System: charges every owned building's upkeep.
pub fn upkeep_system(
    services: Res<RulesServices>,
    turn: Res<TurnCounter>,
    mut log: ResMut<TurnLog>,
    mut players: Query<(&PlayerId, &mut PlayerState)>,
) {
    for (id, mut player) in players.iter_mut() {
        match run_upkeep(&services, turn.0, &player) {
            Ok(next) => *player = next,
            Err(err) => {
                warn!(player = id.0, error = %err, "upkeep failed");
                log.0.push(RequestOutcome {
                    player: *id,
                    action: Some("upkeep".to_string()),
                    error: Some(err.to_string()),
                });
            }
        }
    }
}

pub fn run_upkeep(
    services: &RulesServices,
    turn: u64,
    player: &PlayerState,
) -> Result<PlayerState, EffectError> {
    let mut draft = player.fork();
    {
        let mut ctx = EffectContext::new(&mut draft, services, turn);
        let owned = ctx.player.buildings.clone();
        for id in &owned {
            let Some(building) = services.content.building(id) else {
                continue;
            };
            if building.upkeep.is_empty() {
                continue;
            }
            with_frames(&mut ctx, [upkeep_frame(id)], |ctx| {
                run_effects(ctx, &building.upkeep, 1.0)
            })?;
        }
    }
    Ok(draft)
}

fn upkeep_frame(building: &str) -> Frame {
    Frame::constant(
        format!("upkeep:{}", building),
        MetaPatch::default()
            .kind("building")
            .id(building)
            .longevity(Longevity::Ongoing)
            .extra_entry("phase", json!("upkeep")),
    )
}

/// System: moves the turn counter forward.
pub fn advance_turn_system(mut turn: ResMut<TurnCounter>) {
    turn.0 += 1;
    debug!(turn = turn.0, "turn advanced");
}
