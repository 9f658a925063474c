pub mod config;
pub mod ecs;
pub mod player;
pub mod world;
