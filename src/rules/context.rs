use crate::core::player::PlayerState;
use crate::rules::engine::RulesServices;
use crate::rules::frames::FrameStack;

/// Execution context for one effect application against one player.
///
/// The frame stack lives here rather than in shared state, so every context
/// (and every forked player it works on) has its own.
pub struct EffectContext<'a> {
    pub player: &'a mut PlayerState,
    pub services: &'a RulesServices,
    pub frames: FrameStack,
    pub turn: u64,
}

impl<'a> EffectContext<'a> {
    pub fn new(player: &'a mut PlayerState, services: &'a RulesServices, turn: u64) -> Self {
        Self {
            player,
            services,
            frames: FrameStack::default(),
            turn,
        }
    }
}
