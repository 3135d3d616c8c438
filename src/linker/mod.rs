//! Version linker
//!
//! Cards that are versions of the same character share a group key derived
//! from their name. Grouping is a pure function of the record set, so it is
//! recomputed whenever the dataset is read or exported rather than stored.

mod groups;
mod normalize;

pub use groups::{group_of, link_groups, VersionGroup};
pub(crate) use groups::compare_ids;
pub use normalize::group_key;
