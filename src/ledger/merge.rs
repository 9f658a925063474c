use crate::ledger::link::merge_link_collections;
use crate::ledger::meta::{Longevity, Meta, MetaPatch};

/// Merge `incoming` into `base` field by field.
///
/// `longevity` is sticky once ongoing; `kind`, `id`, `detail`, `instance` and
/// `removal` keep their first non-empty value; `depends_on` is a set union in
/// first-seen order; `effect` and `extra` are shallow merges where incoming
/// wins.
pub fn merge_meta(base: &mut Meta, incoming: &MetaPatch) {
    if let Some(source_key) = &incoming.source_key {
        base.source_key.clone_from(source_key);
    }

    if let Some(longevity) = incoming.longevity {
        if base.longevity != Longevity::Ongoing || longevity == Longevity::Ongoing {
            base.longevity = longevity;
        }
    }

    first_write(&mut base.kind, &incoming.kind);
    first_write(&mut base.id, &incoming.id);
    first_write(&mut base.detail, &incoming.detail);
    first_write(&mut base.instance, &incoming.instance);

    if let Some(links) = &incoming.depends_on {
        merge_link_collections(&mut base.depends_on, links);
    }

    if base.removal.is_none() {
        base.removal.clone_from(&incoming.removal);
    }

    if let Some(effect) = &incoming.effect {
        let target = base.effect.get_or_insert_with(Default::default);
        if let Some(effect_type) = &effect.effect_type {
            target.effect_type = Some(effect_type.clone());
        }
        if let Some(method) = &effect.method {
            target.method = Some(method.clone());
        }
    }

    if let Some(extra) = &incoming.extra {
        let target = base.extra.get_or_insert_with(Default::default);
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn first_write(slot: &mut Option<String>, incoming: &Option<String>) {
    if slot.as_deref().is_some_and(|current| !current.is_empty()) {
        return;
    }
    if let Some(value) = incoming.as_deref().filter(|value| !value.is_empty()) {
        *slot = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::link::Link;
    use crate::ledger::meta::EffectRef;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;
    use std::collections::HashSet;

    fn base() -> Meta {
        Meta::new("resource:add:gold", Longevity::Permanent)
    }

    #[test]
    fn ongoing_is_sticky() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default().longevity(Longevity::Ongoing));
        assert_eq!(meta.longevity, Longevity::Ongoing);

        merge_meta(&mut meta, &MetaPatch::default().longevity(Longevity::Permanent));
        assert_eq!(meta.longevity, Longevity::Ongoing);
    }

    #[test]
    fn permanent_base_accepts_permanent() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default().longevity(Longevity::Permanent));
        assert_eq!(meta.longevity, Longevity::Permanent);
    }

    #[test]
    fn kind_is_first_write_wins() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default().kind("building"));
        merge_meta(&mut meta, &MetaPatch::default().kind("population"));
        merge_meta(&mut meta, &MetaPatch::default().kind("development"));
        assert_eq!(meta.kind.as_deref(), Some("building"));
    }

    #[test]
    fn empty_strings_do_not_claim_first_write() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default().id(""));
        assert_eq!(meta.id, None);
        merge_meta(&mut meta, &MetaPatch::default().id("farm"));
        assert_eq!(meta.id.as_deref(), Some("farm"));
    }

    #[test]
    fn removal_is_first_write_wins() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default().removal(Link::new("building", "farm")));
        merge_meta(&mut meta, &MetaPatch::default().removal(Link::new("passive", "feast")));
        assert_eq!(meta.removal, Some(Link::new("building", "farm")));
    }

    #[test]
    fn source_key_is_overwritten_when_present() {
        let mut meta = base();
        merge_meta(&mut meta, &MetaPatch::default());
        assert_eq!(meta.source_key, "resource:add:gold");

        let patch = MetaPatch {
            source_key: Some("building:farm:resource:add:gold".to_string()),
            ..MetaPatch::default()
        };
        merge_meta(&mut meta, &patch);
        assert_eq!(meta.source_key, "building:farm:resource:add:gold");
    }

    #[test]
    fn effect_and_extra_merge_shallowly() {
        let mut meta = base();
        meta.effect = Some(EffectRef {
            effect_type: Some("resource".to_string()),
            method: Some("add".to_string()),
        });
        meta.extra = Some(serde_json::Map::from_iter([
            ("phase".to_string(), json!("growth")),
            ("note".to_string(), json!("kept")),
        ]));

        let patch = MetaPatch {
            effect: Some(EffectRef {
                effect_type: None,
                method: Some("remove".to_string()),
            }),
            ..MetaPatch::default()
        }
        .extra_entry("phase", json!("upkeep"));
        merge_meta(&mut meta, &patch);

        let effect = meta.effect.unwrap();
        assert_eq!(effect.effect_type.as_deref(), Some("resource"));
        assert_eq!(effect.method.as_deref(), Some("remove"));
        let extra = meta.extra.unwrap();
        assert_eq!(extra.get("phase"), Some(&json!("upkeep")));
        assert_eq!(extra.get("note"), Some(&json!("kept")));
    }

    #[test]
    fn merging_full_meta_keeps_dependencies_unique() {
        let mut target = base();
        target.depends_on = Some(vec![Link::new("population", "legion")]);
        let mut other = base();
        other.depends_on = Some(vec![
            Link::new("resource", "gold"),
            Link::new("population", "legion"),
        ]);

        merge_meta(&mut target, &other.to_patch());

        assert_eq!(
            target.depends_on,
            Some(vec![
                Link::new("population", "legion"),
                Link::new("resource", "gold"),
            ])
        );
    }

    fn random_patch(rng: &mut StdRng) -> MetaPatch {
        const KINDS: [&str; 4] = ["building", "population", "development", ""];
        const LINKS: [(&str, &str); 4] = [
            ("population", "legion"),
            ("resource", "gold"),
            ("development", "farm"),
            ("stat", "happiness"),
        ];

        let mut patch = MetaPatch::default();
        if rng.gen_bool(0.6) {
            patch.longevity = Some(if rng.gen_bool(0.5) {
                Longevity::Ongoing
            } else {
                Longevity::Permanent
            });
        }
        if rng.gen_bool(0.5) {
            patch.kind = Some(KINDS[rng.gen_range(0..KINDS.len())].to_string());
        }
        if rng.gen_bool(0.5) {
            patch.instance = Some(format!("#{}", rng.gen_range(0..3)));
        }
        if rng.gen_bool(0.7) {
            let count = rng.gen_range(0..4);
            let links = (0..count)
                .map(|_| {
                    let (link_type, id) = LINKS[rng.gen_range(0..LINKS.len())];
                    Link::new(link_type, id)
                })
                .collect();
            patch = patch.depends_on(links);
        }
        patch
    }

    #[test]
    fn random_merge_sequences_hold_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let mut meta = base();
            let patches: Vec<MetaPatch> = (0..rng.gen_range(1..12))
                .map(|_| random_patch(&mut rng))
                .collect();

            let mut seen_ongoing = false;
            for patch in &patches {
                merge_meta(&mut meta, patch);
                seen_ongoing |= patch.longevity == Some(Longevity::Ongoing);
                if seen_ongoing {
                    assert_eq!(meta.longevity, Longevity::Ongoing);
                }
            }

            let expected_kind = patches
                .iter()
                .filter_map(|patch| patch.kind.as_deref())
                .find(|kind| !kind.is_empty());
            assert_eq!(meta.kind.as_deref(), expected_kind);

            let expected_instance = patches.iter().find_map(|patch| patch.instance.as_deref());
            assert_eq!(meta.instance.as_deref(), expected_instance);

            if let Some(links) = &meta.depends_on {
                let unique: HashSet<&Link> = links.iter().collect();
                assert_eq!(unique.len(), links.len());
                assert!(!links.is_empty());
            }
        }
    }
}
