use log::debug;

use super::{SharedCache, check_client_range};
use crate::{
    cache::{Cache, CacheConfig},
    error::{Result, invalid_config},
    trace::AccessKind,
};

/// Each client owns a private pool of ways; all pools share one set count, so
/// every client sees the same address-to-set mapping but never evicts another
/// client's lines.
#[derive(Debug, Clone)]
pub struct WayPartitioning {
    partitions: Vec<Cache>,
    sets: usize,
}

impl WayPartitioning {
    pub fn new(ways: &[usize], cache_size: u64, block_size: u64) -> Result<Self> {
        if ways.is_empty() {
            return Err(invalid_config("way partitioning needs at least one client"));
        }
        if let Some(client) = ways.iter().position(|&w| w == 0) {
            return Err(invalid_config(format!("client {client} has no ways")));
        }
        let total_ways: usize = ways.iter().sum();
        // The whole LLC must itself be a valid cache of `total_ways` ways.
        let total = CacheConfig::new(cache_size, total_ways, block_size);
        total.validate()?;
        let sets = total.num_sets();

        let partitions = ways
            .iter()
            .map(|&w| Cache::with_sets(sets, w, block_size))
            .collect::<Result<Vec<_>>>()?;
        debug!("way partitioning {ways:?} over {cache_size}B: {sets} sets");
        Ok(Self { partitions, sets })
    }

    pub fn clients(&self) -> usize {
        self.partitions.len()
    }

    pub fn sets(&self) -> usize {
        self.sets
    }

    /// Per-client private caches, indexed by client id.
    pub fn partitions(&self) -> &[Cache] {
        &self.partitions
    }
}

impl SharedCache for WayPartitioning {
    fn check_client(&self, client_id: usize) -> Result<()> {
        check_client_range(client_id, self.partitions.len())
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        self.check_client(client_id)?;
        self.partitions[client_id].access_address(addr, kind)
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self.partitions[client_id].misses())
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self.partitions[client_id].hits())
    }
}
