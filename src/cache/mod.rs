//! Response cache: timestamped entries over the key-value store plus the
//! freshness policy that decides when an entry must be refetched.

pub mod entry;
pub mod freshness;

pub use entry::{CacheEntry, CacheError, EntryStore};
pub use freshness::is_stale;
