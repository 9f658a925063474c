use crate::ledger::merge::merge_meta;
use crate::ledger::meta::{Longevity, Meta};
use crate::rules::context::EffectContext;
use crate::rules::effect::EffectDef;
use crate::rules::frames::FrameError;

/// Build the provenance record for `effect` changing `quantity`.
///
/// Frames are merged oldest to newest, then the effect's own embedded meta.
/// A failing frame aborts resolution; the caller's frame scope still
/// restores the stack.
pub fn resolve_meta(
    effect: &EffectDef,
    ctx: &EffectContext<'_>,
    quantity: &str,
) -> Result<Meta, FrameError> {
    let mut meta = Meta::new(effect.source_key(quantity), Longevity::Permanent);
    meta.effect = effect.effect_ref();

    for frame in ctx.frames.iter() {
        if let Some(patch) = frame.provide(effect, ctx, quantity)? {
            merge_meta(&mut meta, &patch);
        }
    }

    if let Some(own) = &effect.meta {
        merge_meta(&mut meta, own);
    }

    Ok(meta)
}
