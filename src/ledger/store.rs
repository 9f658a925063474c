use bevy_utils::tracing::trace;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ledger::merge::merge_meta;
use crate::ledger::meta::Meta;

/// Deltas and running totals smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Signed amount one source has contributed to a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub amount: f64,
    pub meta: Meta,
}

/// What `Ledger::apply_delta` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Ignored,
    Created,
    Updated,
    Removed,
}

/// Per-player attribution ledger: quantity id -> source key -> contribution.
///
/// Both levels iterate in first-touch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    quantities: IndexMap<String, IndexMap<String, Contribution>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `delta` against `quantity` on behalf of `meta.source_key`.
    ///
    /// This is the only mutation point. A contribution whose running amount
    /// returns to zero is removed outright.
    pub fn apply_delta(&mut self, quantity: &str, delta: f64, meta: &Meta) -> LedgerChange {
        if !delta.is_finite() || delta.abs() < EPSILON {
            return LedgerChange::Ignored;
        }

        let slice = self.quantities.entry(quantity.to_string()).or_default();
        let Some(existing) = slice.get_mut(&meta.source_key) else {
            trace!(quantity, source = %meta.source_key, delta, "ledger contribution created");
            slice.insert(
                meta.source_key.clone(),
                Contribution {
                    amount: delta,
                    meta: meta.clone(),
                },
            );
            return LedgerChange::Created;
        };

        let amount = existing.amount + delta;
        if amount.abs() < EPSILON {
            slice.shift_remove(&meta.source_key);
            trace!(quantity, source = %meta.source_key, "ledger contribution cancelled out");
            return LedgerChange::Removed;
        }

        existing.amount = amount;
        merge_meta(&mut existing.meta, &meta.to_patch());
        trace!(quantity, source = %meta.source_key, amount, "ledger contribution updated");
        LedgerChange::Updated
    }

    /// Contributions for one quantity, in first-touch order.
    pub fn contributions<'a>(
        &'a self,
        quantity: &str,
    ) -> impl Iterator<Item = (&'a str, &'a Contribution)> + 'a {
        self.quantities
            .get(quantity)
            .into_iter()
            .flat_map(|slice| slice.iter().map(|(key, entry)| (key.as_str(), entry)))
    }

    pub fn contribution(&self, quantity: &str, source_key: &str) -> Option<&Contribution> {
        self.quantities.get(quantity)?.get(source_key)
    }

    /// Sum of every contribution to `quantity`.
    pub fn total(&self, quantity: &str) -> f64 {
        self.contributions(quantity)
            .map(|(_, entry)| entry.amount)
            .sum()
    }

    /// Quantity ids that have been touched at least once.
    pub fn quantities(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }

    /// Number of live contributions across every quantity.
    pub fn len(&self) -> usize {
        self.quantities.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Independent copy for a simulation branch.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}
