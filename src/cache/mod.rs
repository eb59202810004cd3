//! TTL-bounded cache of serialized platform objects
//!
//! The cache stores opaque byte payloads under `<kind>:<id>` keys, so it
//! is agnostic to what the bytes encode. Entries expire after a fixed
//! TTL; a periodic sweep (owned by the processor) reclaims expired
//! entries without blocking lookups.

mod store;

pub use store::{CacheStats, MetadataCache};
