//! Attribution ledger: which rule caused how much of each tracked quantity.

pub mod dependencies;
pub mod link;
pub mod merge;
pub mod meta;
pub mod source;
pub mod store;

pub use dependencies::DependencyCollector;
pub use link::{append_dependency_link, merge_link_collections, normalize_link, normalize_links, Link};
pub use merge::merge_meta;
pub use meta::{EffectRef, Longevity, Meta, MetaPatch};
pub use source::source_key;
pub use store::{Contribution, Ledger, LedgerChange, EPSILON};
