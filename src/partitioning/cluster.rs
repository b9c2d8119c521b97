use log::debug;

use super::{SharedCache, WayPartitioning, remove_bits};
use crate::{
    cache::mask,
    error::{Result, invalid_config},
    trace::AccessKind,
};

/// Independent way-partitioned clusters. The bits right above the block offset
/// pick the cluster and are then squeezed out of the address, so each cluster
/// indexes its sets with the remaining bits instead of aliasing on them.
#[derive(Debug, Clone)]
pub struct ClusterWayPartitioning {
    clusters: Vec<WayPartitioning>,
    cluster_bits: u32,
    block_offset_bits: u32,
}

impl ClusterWayPartitioning {
    pub fn new(
        n_clusters: usize,
        ways: &[usize],
        cluster_size: u64,
        block_size: u64,
    ) -> Result<Self> {
        if !n_clusters.is_power_of_two() {
            return Err(invalid_config(format!(
                "cluster count {n_clusters} is not a power of two"
            )));
        }
        let cluster = WayPartitioning::new(ways, cluster_size, block_size)?;
        let cluster_bits = (n_clusters as u64).ilog2();
        debug!("{n_clusters} way-partitioned clusters, {cluster_bits} selection bits");
        Ok(Self {
            clusters: vec![cluster; n_clusters],
            cluster_bits,
            block_offset_bits: block_size.ilog2(),
        })
    }

    pub fn clients(&self) -> usize {
        self.clusters[0].clients()
    }

    pub fn clusters(&self) -> &[WayPartitioning] {
        &self.clusters
    }

    pub fn cluster_for(&self, addr: u64) -> usize {
        ((addr >> self.block_offset_bits) & mask(self.cluster_bits)) as usize
    }

    /// Address as seen inside its cluster, with the selection bits removed.
    pub fn cluster_address(&self, addr: u64) -> u64 {
        remove_bits(addr, self.block_offset_bits, self.cluster_bits)
    }
}

impl SharedCache for ClusterWayPartitioning {
    fn check_client(&self, client_id: usize) -> Result<()> {
        self.clusters[0].check_client(client_id)
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        self.check_client(client_id)?;
        let cluster = self.cluster_for(addr);
        let local = self.cluster_address(addr);
        self.clusters[cluster].access(client_id, local, kind)
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        self.clusters.iter().map(|c| c.misses(client_id)).sum()
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        self.clusters.iter().map(|c| c.hits(client_id)).sum()
    }
}
