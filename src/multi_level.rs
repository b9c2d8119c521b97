use crate::{
    cache::Cache,
    error::{Result, invalid_config},
    partitioning::{ClientStats, SharedCache, check_client_range},
    trace::AccessKind,
};

/// Private per-core caches in front of a shared level. The shared level only
/// sees the traffic that missed privately.
#[derive(Debug, Clone)]
pub struct MultiLevelCache<L2> {
    private: Vec<Cache>,
    shared: L2,
    stats: Vec<ClientStats>,
}

impl<L2: SharedCache> MultiLevelCache<L2> {
    /// Every core gets its own copy of `private_template`.
    pub fn new(cores: usize, private_template: &Cache, shared: L2) -> Result<Self> {
        if cores == 0 {
            return Err(invalid_config("multi-level cache needs at least one core"));
        }
        Ok(Self {
            private: vec![private_template.clone(); cores],
            shared,
            stats: vec![ClientStats::default(); cores],
        })
    }

    pub fn cores(&self) -> usize {
        self.private.len()
    }

    pub fn private_cache(&self, core_id: usize) -> Result<&Cache> {
        check_client_range(core_id, self.private.len())?;
        Ok(&self.private[core_id])
    }

    pub fn shared(&self) -> &L2 {
        &self.shared
    }

    /// Hit if either level holds the block. The shared level is consulted only
    /// after a private miss.
    pub fn access(
        &mut self,
        core_id: usize,
        client_id: usize,
        addr: u64,
        kind: AccessKind,
    ) -> Result<bool> {
        check_client_range(core_id, self.private.len())?;
        self.shared.check_client(client_id)?;
        let hit = if self.private[core_id].access_address(addr, kind)? {
            true
        } else {
            self.shared.access(client_id, addr, kind)?
        };
        self.stats[core_id].record(hit);
        Ok(hit)
    }
}

/// Driven as a single level, the issuing core doubles as the client id.
impl<L2: SharedCache> SharedCache for MultiLevelCache<L2> {
    fn check_client(&self, client_id: usize) -> Result<()> {
        check_client_range(client_id, self.private.len())?;
        self.shared.check_client(client_id)
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        MultiLevelCache::access(self, client_id, client_id, addr, kind)
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        check_client_range(client_id, self.stats.len())?;
        Ok(self.stats[client_id].misses)
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        check_client_range(client_id, self.stats.len())?;
        Ok(self.stats[client_id].hits)
    }
}
