// Re-export core modules for use by the binary or other consumers
pub mod core;
pub mod data;
pub mod ledger;
pub mod rules;

// Expose the simulation wrapper and types needed for interaction
pub use crate::core::config::EngineConfig;
pub use crate::core::player::{PlayerId, PlayerState};
pub use crate::core::world::{EffectRequest, Simulation, TurnReport};
