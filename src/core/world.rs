use bevy_ecs::prelude::*;
use bevy_utils::tracing::info;
use serde::Serialize;

use crate::core::config::EngineConfig;
use crate::core::ecs::{apply_request, create_schedule, create_world, TurnCounter};
use crate::core::player::{PlayerId, PlayerState};
use crate::data::content::{load_content_catalog, ContentError};
use crate::rules::effect::{EffectDef, EffectError};
use crate::rules::engine::RulesServices;

/// Effects to apply to one player during the next tick, optionally on
/// behalf of a named action.
#[derive(Debug, Clone)]
pub struct EffectRequest {
    pub player: PlayerId,
    pub action: Option<String>,
    pub effects: Vec<EffectDef>,
}

impl EffectRequest {
    pub fn new(player: PlayerId, effects: Vec<EffectDef>) -> Self {
        Self {
            player,
            action: None,
            effects,
        }
    }

    pub fn for_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Resource storing the requests for the next tick.
#[derive(Resource, Default, Debug)]
pub struct EffectQueue(pub Vec<EffectRequest>);

/// What happened to one request (or one upkeep run) this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    pub player: PlayerId,
    pub action: Option<String>,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn applied(request: &EffectRequest) -> Self {
        Self {
            player: request.player,
            action: request.action.clone(),
            error: None,
        }
    }

    pub fn failed(request: &EffectRequest, error: String) -> Self {
        Self {
            player: request.player,
            action: request.action.clone(),
            error: Some(error),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.error.is_none()
    }
}

/// Resource collecting outcomes during a tick.
#[derive(Resource, Default, Debug)]
pub struct TurnLog(pub Vec<RequestOutcome>);

/// Returned to the caller after each tick.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turn: u64,
    pub outcomes: Vec<RequestOutcome>,
}

#[derive(Resource, Debug)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn alloc(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Wrapper around the ECS world and schedule.
pub struct Simulation {
    world: World,
    schedule: Schedule,
    players: Vec<(PlayerId, Entity)>,
}

impl Simulation {
    pub fn new(services: RulesServices) -> Self {
        Self {
            world: create_world(services),
            schedule: create_schedule(),
            players: Vec::new(),
        }
    }

    /// Build a simulation with the content catalog named in `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ContentError> {
        let content = load_content_catalog(&config.content_path)?;
        Ok(Self::new(RulesServices::new(content)))
    }

    pub fn add_player(&mut self, state: PlayerState) -> PlayerId {
        let id = PlayerId(self.world.resource_mut::<IdAllocator>().alloc());
        let entity = self.world.spawn((id, state)).id();
        self.players.push((id, entity));
        id
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|(id, _)| *id)
    }

    pub fn turn(&self) -> u64 {
        self.world.resource::<TurnCounter>().0
    }

    pub fn services(&self) -> &RulesServices {
        self.world.resource::<RulesServices>()
    }

    /// Run one turn: queued requests, upkeep, then the turn counter.
    pub fn tick(&mut self, requests: Vec<EffectRequest>) -> TurnReport {
        let turn = self.turn();
        self.world.resource_mut::<TurnLog>().0.clear();
        self.world.resource_mut::<EffectQueue>().0 = requests;

        self.schedule.run(&mut self.world);

        let outcomes = std::mem::take(&mut self.world.resource_mut::<TurnLog>().0);
        let failed = outcomes.iter().filter(|outcome| !outcome.is_applied()).count();
        info!(turn, requests = outcomes.len(), failed, "turn resolved");
        TurnReport { turn, outcomes }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        let entity = self.entity(id)?;
        self.world.get::<PlayerState>(entity)
    }

    /// Independent copy of a player for lookahead or undo.
    pub fn fork_player(&self, id: PlayerId) -> Option<PlayerState> {
        self.player(id).map(PlayerState::fork)
    }

    /// Apply `effects` to a fork of the player without touching the world.
    pub fn preview(&self, id: PlayerId, effects: &[EffectDef]) -> Result<PlayerState, EffectError> {
        let player = self.player(id).ok_or(EffectError::UnknownPlayer(id.0))?;
        let request = EffectRequest::new(id, effects.to_vec());
        apply_request(self.services(), self.turn(), player, &request)
    }

    fn entity(&self, id: PlayerId) -> Option<Entity> {
        self.players
            .iter()
            .find(|(player, _)| *player == id)
            .map(|(_, entity)| *entity)
    }
}
