//! Collections and roster classification.
//!
//! Pure read-aggregations over store snapshots: who is behind on payment,
//! and how the admin roster should be bucketed and ordered. Safe to run
//! concurrently with writes; a scan sees whichever snapshot it was given.

pub mod classifier;
pub mod roster;

pub use classifier::{CollectionEntry, CollectionsClassifier};
pub use roster::{classify, filter_roster, rank_all, RankedClient, RosterBucket};
