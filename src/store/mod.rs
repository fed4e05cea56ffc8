//! Journal entry persistence

mod entries;

pub use entries::{entry_count, EntryStore};
