pub mod context;
pub mod effect;
pub mod engine;
pub mod evaluator;
pub mod frames;
pub mod handlers;
pub mod resolve;

pub use context::EffectContext;
pub use effect::{EffectDef, EffectError};
pub use engine::{run_effect, run_effects, EffectHandler, EffectRegistry, RulesServices};
pub use evaluator::{EvaluatorDef, EvaluatorRegistry};
pub use frames::{with_frames, Frame, FrameError, FrameStack};
pub use handlers::{apply_quantity_change, install_frame, QuantityTarget};
pub use resolve::resolve_meta;
