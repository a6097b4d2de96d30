//! Cache Module
//!
//! Cluster-aware caching over one shared entry store: the entry model and key
//! scheme, the payload codec, merge-on-read, the cache itself and the registry
//! that picks a cache flavour by name.

pub mod codec;
mod clustered;
pub mod entry;
mod merge;
pub mod registry;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clustered::{CacheSettings, ClusteredCache, ClusteredCacheBuilder};
pub use codec::{CodecError, Externalizable, PayloadFormat, ValueCodec};
pub use entry::{current_timestamp_ms, CacheEntry, EntryProbe, ValueMatch};
pub use merge::{Aggregate, Lookup};
pub use registry::{CacheDescriptor, CacheKey, CacheRegistry, KeyKind, ValueKind};
