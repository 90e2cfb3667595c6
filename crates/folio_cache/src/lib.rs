//! Beat caching with TTL support.
//!
//! This crate provides the cache the orchestrator consults before asking the
//! provider for an unguided beat, so repeated requests for the same page
//! position return the same narrative without another remote call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;

pub use cache::{BeatCache, BeatCacheConfig, BeatCacheConfigBuilder, BeatKey, CacheEntry};
