use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bevy_utils::tracing::debug;
use thiserror::Error;

use crate::ledger::meta::MetaPatch;
use crate::rules::context::EffectContext;
use crate::rules::effect::EffectDef;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame {label} failed: {reason}")]
    Failed { label: String, reason: String },
}

type Provider =
    dyn Fn(&EffectDef, &EffectContext<'_>, &str) -> Result<Option<MetaPatch>, FrameError>
        + Send
        + Sync;

/// Metadata provider active while a region of nested effects runs.
#[derive(Clone)]
pub struct Frame {
    label: String,
    provider: Arc<Provider>,
}

impl Frame {
    pub fn new<F>(label: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&EffectDef, &EffectContext<'_>, &str) -> Result<Option<MetaPatch>, FrameError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            label: label.into(),
            provider: Arc::new(provider),
        }
    }

    /// Frame that contributes the same patch to every quantity.
    pub fn constant(label: impl Into<String>, patch: MetaPatch) -> Self {
        Self::new(label, move |_, _, _| Ok(Some(patch.clone())))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn provide(
        &self,
        effect: &EffectDef,
        ctx: &EffectContext<'_>,
        quantity: &str,
    ) -> Result<Option<MetaPatch>, FrameError> {
        (self.provider)(effect, ctx, quantity)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("label", &self.label).finish()
    }
}

/// Frames in push order, oldest first.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

/// Push `frames`, run `body`, then restore the previous depth on every exit
/// path, panics included.
pub fn with_frames<'a, R>(
    ctx: &mut EffectContext<'a>,
    frames: impl IntoIterator<Item = Frame>,
    body: impl FnOnce(&mut EffectContext<'a>) -> R,
) -> R {
    let mut scope = FrameScope::enter(ctx, frames);
    body(&mut *scope)
}

struct FrameScope<'s, 'a> {
    ctx: &'s mut EffectContext<'a>,
    depth: usize,
}

impl<'s, 'a> FrameScope<'s, 'a> {
    fn enter(ctx: &'s mut EffectContext<'a>, frames: impl IntoIterator<Item = Frame>) -> Self {
        let depth = ctx.frames.depth();
        for frame in frames {
            debug!(frame = frame.label(), depth = ctx.frames.depth(), "frame pushed");
            ctx.frames.frames.push(frame);
        }
        Self { ctx, depth }
    }
}

impl<'a> Deref for FrameScope<'_, 'a> {
    type Target = EffectContext<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<'a> DerefMut for FrameScope<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for FrameScope<'_, '_> {
    fn drop(&mut self) {
        let pushed = self.ctx.frames.depth().saturating_sub(self.depth);
        if pushed > 0 {
            debug!(popped = pushed, depth = self.depth, "frames popped");
        }
        self.ctx.frames.frames.truncate(self.depth);
    }
}
