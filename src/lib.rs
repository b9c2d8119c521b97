//! Trace-driven simulator for comparing shared last-level cache partitioning
//! schemes.

pub mod cache;
pub mod error;
pub mod experiments;
pub mod multi_level;
pub mod partitioning;
pub mod report;
pub mod trace;

pub use cache::{Cache, CacheConfig};
pub use error::CacheError;
pub use multi_level::MultiLevelCache;
pub use partitioning::SharedCache;
