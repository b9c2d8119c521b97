use log::{debug, trace};

use super::{SharedCache, check_client_range};
use crate::{
    cache::{Cache, CacheConfig, ceil_log2, mask},
    error::{CacheError, Result, invalid_config},
    trace::AccessKind,
};

/// Maps an address-derived selector to a cluster, weighting each cluster by the
/// number of cores the client was given there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterIntraAuxTable {
    pub total_cores: u32,
    /// `(cluster_id, cumulative_core_count)`, cumulative counts increasing.
    pub entries: Vec<(usize, u32)>,
}

impl InterIntraAuxTable {
    pub fn new(total_cores: u32, entries: Vec<(usize, u32)>) -> Self {
        Self {
            total_cores,
            entries,
        }
    }

    /// Builds the table from per-cluster core counts; clusters with no cores are
    /// left out.
    pub fn from_core_counts(cores_per_cluster: &[u32]) -> Self {
        let mut total = 0;
        let entries = cores_per_cluster
            .iter()
            .enumerate()
            .filter(|(_, cores)| **cores > 0)
            .map(|(cluster, &cores)| {
                total += cores;
                (cluster, total)
            })
            .collect();
        Self::new(total, entries)
    }

    /// First cluster whose cumulative core count exceeds `selector`.
    pub fn cluster_for(&self, selector: u64) -> Option<usize> {
        self.entries
            .iter()
            .find(|(_, cumulative)| u64::from(*cumulative) > selector)
            .map(|(cluster, _)| *cluster)
    }

    fn validate(&self, client: usize, clusters: usize) -> Result<()> {
        if self.total_cores == 0 || self.entries.is_empty() {
            return Err(invalid_config(format!("client {client} has no cores in any cluster")));
        }
        let mut previous = 0;
        for &(cluster, cumulative) in &self.entries {
            if cluster >= clusters {
                return Err(invalid_config(format!(
                    "client {client} references cluster {cluster} of {clusters}"
                )));
            }
            if cumulative <= previous {
                return Err(invalid_config(format!(
                    "client {client} cumulative core counts are not increasing"
                )));
            }
            previous = cumulative;
        }
        if previous != self.total_cores {
            return Err(invalid_config(format!(
                "client {client} core counts sum to {previous}, expected {}",
                self.total_cores
            )));
        }
        Ok(())
    }
}

/// A grid of private caches, one per (cluster, client). A client spreads its
/// addresses over the clusters where it owns capacity, proportionally to the
/// cores it holds in each.
#[derive(Debug, Clone)]
pub struct InterIntraNodePartitioning {
    // cells[cluster][client]; `None` where the client owns nothing.
    cells: Vec<Vec<Option<Cache>>>,
    aux_tables: Vec<InterIntraAuxTable>,
    unserved: Vec<u64>,
    block_offset_bits: u32,
}

impl InterIntraNodePartitioning {
    /// `cell_sizes[cluster][client]` is the capacity in bytes of that cell, 0 for
    /// none.
    pub fn new(
        clients: usize,
        cell_sizes: &[Vec<u64>],
        associativity: usize,
        block_size: u64,
        aux_tables: Vec<InterIntraAuxTable>,
    ) -> Result<Self> {
        if cell_sizes.is_empty() {
            return Err(invalid_config("inter/intra partitioning needs at least one cluster"));
        }
        if aux_tables.len() != clients {
            return Err(invalid_config(format!(
                "{} lookup tables given for {clients} clients",
                aux_tables.len()
            )));
        }
        let mut cells = Vec::with_capacity(cell_sizes.len());
        for (cluster, row) in cell_sizes.iter().enumerate() {
            if row.len() != clients {
                return Err(invalid_config(format!(
                    "cluster {cluster} lists {} cells for {clients} clients",
                    row.len()
                )));
            }
            let row = row
                .iter()
                .map(|&size| match size {
                    0 => Ok(None),
                    size => Cache::new(CacheConfig::new(size, associativity, block_size)).map(Some),
                })
                .collect::<Result<Vec<_>>>()?;
            cells.push(row);
        }
        for (client, table) in aux_tables.iter().enumerate() {
            table.validate(client, cells.len())?;
        }
        debug!(
            "inter/intra partitioning: {} clusters x {clients} clients, tables {aux_tables:?}",
            cells.len()
        );
        Ok(Self {
            cells,
            aux_tables,
            unserved: vec![0; clients],
            block_offset_bits: block_size.ilog2(),
        })
    }

    pub fn clients(&self) -> usize {
        self.aux_tables.len()
    }

    pub fn clusters(&self) -> usize {
        self.cells.len()
    }

    pub fn get_cache_slice(&self, cluster: usize, client_id: usize) -> Option<&Cache> {
        self.cells.get(cluster)?.get(client_id)?.as_ref()
    }

    pub fn aux_table(&self, client_id: usize) -> Result<&InterIntraAuxTable> {
        self.check_client(client_id)?;
        Ok(&self.aux_tables[client_id])
    }

    /// Accesses that selected a cluster where the client owns no capacity.
    pub fn unserved(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self.unserved[client_id])
    }

    pub fn cluster_for(&self, client_id: usize, addr: u64) -> Result<usize> {
        let table = self.aux_table(client_id)?;
        let total = u64::from(table.total_cores);
        let selector = ((addr >> self.block_offset_bits) & mask(ceil_log2(total))) % total;
        table.cluster_for(selector).ok_or_else(|| {
            CacheError::InternalInvariantViolation(format!(
                "selector {selector} beyond lookup table of client {client_id}"
            ))
        })
    }
}

impl SharedCache for InterIntraNodePartitioning {
    fn check_client(&self, client_id: usize) -> Result<()> {
        check_client_range(client_id, self.aux_tables.len())
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        let cluster = self.cluster_for(client_id, addr)?;
        match self.cells[cluster][client_id].as_mut() {
            Some(cache) => cache.access_address(addr, kind),
            None => {
                trace!("client {client_id} has no capacity in cluster {cluster}, {addr:#x} dropped");
                self.unserved[client_id] += 1;
                Ok(false)
            }
        }
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self
            .cells
            .iter()
            .filter_map(|row| row[client_id].as_ref())
            .map(Cache::misses)
            .sum())
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self
            .cells
            .iter()
            .filter_map(|row| row[client_id].as_ref())
            .map(Cache::hits)
            .sum())
    }
}
