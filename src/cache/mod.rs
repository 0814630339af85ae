//! # Response Cache
//!
//! ```text
//! CacheStore                     <- typed get/set, key derivation, TTL per category
//!   └── CacheProvider (enum)     <- zero-cost dispatch, no vtable
//!         ├── Redis(RedisCacheService)   (feature "cache-redis")
//!         ├── Moka(MokaCacheService)     (feature "cache-moka")
//!         └── NoOp(NoOpCacheService)     <- always-miss fallback
//! ```
//!
//! Backend failures never propagate past [`CacheStore`]: reads become misses
//! and writes report `false`. The cache is not circuit-broken.

pub mod category;
pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod store;
pub mod traits;

pub use category::CacheCategory;
pub use errors::{CacheError, CacheResult};
pub use keys::{derive_key, KeyArgs};
pub use provider::CacheProvider;
pub use providers::NoOpCacheService;
pub use store::{CacheStats, CacheStore};
pub use traits::{BackendStats, CacheService};

#[cfg(feature = "cache-redis")]
pub use providers::RedisCacheService;

#[cfg(feature = "cache-moka")]
pub use providers::MokaCacheService;
