//! Shared last-level cache partitioning schemes.
//!
//! Every scheme owns its physical caches outright and exposes the same
//! [`SharedCache`] surface, so it can sit behind a private level in a
//! [`MultiLevelCache`](crate::multi_level::MultiLevelCache) or be driven directly.

mod cluster;
mod inter_intra;
mod inter_node;
mod intra_node;
mod way;

pub use cluster::ClusterWayPartitioning;
pub use inter_intra::{InterIntraAuxTable, InterIntraNodePartitioning};
pub use inter_node::InterNodePartitioning;
pub use intra_node::{FixedBits, IntraNodePartitioning};
pub use way::WayPartitioning;

use crate::{
    cache::Cache,
    error::{CacheError, Result},
    trace::AccessKind,
};

/// Anything a client can issue accesses to and ask for per-client counters.
pub trait SharedCache {
    /// Fails with `InvalidClientId` when `client_id` is not served.
    fn check_client(&self, client_id: usize) -> Result<()>;

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool>;

    fn misses(&self, client_id: usize) -> Result<u64>;

    fn hits(&self, client_id: usize) -> Result<u64>;

    fn read(&mut self, client_id: usize, addr: u64) -> Result<bool> {
        self.access(client_id, addr, AccessKind::Read)
    }

    fn write(&mut self, client_id: usize, addr: u64) -> Result<bool> {
        self.access(client_id, addr, AccessKind::Write)
    }
}

/// A plain cache serves any client; its counters are global.
impl SharedCache for Cache {
    fn check_client(&self, _client_id: usize) -> Result<()> {
        Ok(())
    }

    fn access(&mut self, _client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        self.access_address(addr, kind)
    }

    fn misses(&self, _client_id: usize) -> Result<u64> {
        Ok(Cache::misses(self))
    }

    fn hits(&self, _client_id: usize) -> Result<u64> {
        Ok(Cache::hits(self))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub misses: u64,
    pub hits: u64,
}

impl ClientStats {
    pub fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

pub(crate) fn check_client_range(client_id: usize, clients: usize) -> Result<()> {
    if client_id < clients {
        Ok(())
    } else {
        Err(CacheError::InvalidClientId { client_id, clients })
    }
}

/// Drops `count` bits starting at `low` and shifts the upper bits down over them.
pub(crate) fn remove_bits(addr: u64, low: u32, count: u32) -> u64 {
    let kept_low = addr & crate::cache::mask(low);
    let upper = addr.checked_shr(low + count).unwrap_or(0);
    upper.checked_shl(low).unwrap_or(0) | kept_low
}
