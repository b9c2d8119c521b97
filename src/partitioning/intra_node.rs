use log::debug;

use super::{ClientStats, SharedCache, check_client_range};
use crate::{
    cache::{ADDRESS_WIDTH, Cache, CacheConfig, LocationInfo, mask},
    error::{Result, invalid_config},
    trace::AccessKind,
};

/// Bit pattern forced into the top `n_bits` of a client's set index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBits {
    pub bits: u64,
    pub n_bits: u32,
}

impl FixedBits {
    pub fn new(bits: u64, n_bits: u32) -> Self {
        Self { bits, n_bits }
    }

    /// True when the set-index regions selected by `self` and `other` intersect,
    /// i.e. one pattern is a prefix of the other.
    fn overlaps(&self, other: &FixedBits) -> bool {
        let (short, long) = if self.n_bits <= other.n_bits {
            (self, other)
        } else {
            (other, self)
        };
        long.bits >> (long.n_bits - short.n_bits) == short.bits
    }
}

/// One physical cache shared by all clients; each client is confined to a fixed
/// slice of the set-index space by overwriting the high set-index bits of its
/// addresses.
#[derive(Debug, Clone)]
pub struct IntraNodePartitioning {
    cache: Cache,
    aux_table: Vec<FixedBits>,
    stats: Vec<ClientStats>,
    tag_bits: u32,
}

impl IntraNodePartitioning {
    pub fn new(
        clients: usize,
        cache_size: u64,
        associativity: usize,
        block_size: u64,
        aux_table: Vec<FixedBits>,
    ) -> Result<Self> {
        let cache = Cache::new(CacheConfig::new(cache_size, associativity, block_size))?;
        if aux_table.len() != clients {
            return Err(invalid_config(format!(
                "{} fixed-bit entries given for {clients} clients",
                aux_table.len()
            )));
        }
        let set_bits = cache.set_bits();
        for (client, entry) in aux_table.iter().enumerate() {
            if entry.n_bits > set_bits {
                return Err(invalid_config(format!(
                    "client {client} fixes {} bits but the set index has {set_bits}",
                    entry.n_bits
                )));
            }
            if entry.bits > mask(entry.n_bits) {
                return Err(invalid_config(format!(
                    "client {client} pattern {:#b} does not fit in {} bits",
                    entry.bits, entry.n_bits
                )));
            }
        }
        for (i, a) in aux_table.iter().enumerate() {
            for (j, b) in aux_table.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(invalid_config(format!(
                        "clients {i} and {j} map to overlapping sets"
                    )));
                }
            }
        }
        let tag_bits = ADDRESS_WIDTH - cache.block_offset_bits();
        debug!(
            "intra-node partitioning over {} sets for {clients} clients: {aux_table:?}",
            cache.sets()
        );
        Ok(Self {
            cache,
            aux_table,
            stats: vec![ClientStats::default(); clients],
            tag_bits,
        })
    }

    pub fn clients(&self) -> usize {
        self.aux_table.len()
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn aux_table(&self) -> &[FixedBits] {
        &self.aux_table
    }

    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    /// Number of sets reachable by `client_id`.
    pub fn sets_for(&self, client_id: usize) -> Result<usize> {
        self.check_client(client_id)?;
        Ok(1 << (self.cache.set_bits() - self.aux_table[client_id].n_bits))
    }

    /// Location of `addr` once the client's fixed bits are substituted into its
    /// set index. The tag keeps the whole block address so that addresses that
    /// differ only in the overwritten bits stay distinct.
    pub fn location_of(&self, client_id: usize, addr: u64) -> Result<LocationInfo> {
        self.check_client(client_id)?;
        let fixed = &self.aux_table[client_id];
        let block_bits = self.cache.block_offset_bits();
        let set_bits = self.cache.set_bits();

        let low = block_bits + set_bits - fixed.n_bits;
        let window = mask(fixed.n_bits) << low;
        let steered = (addr & !window) | (fixed.bits << low);
        Ok(LocationInfo {
            set_index: ((steered >> block_bits) & mask(set_bits)) as usize,
            tag: (addr >> block_bits) & mask(self.tag_bits),
        })
    }
}

impl SharedCache for IntraNodePartitioning {
    fn check_client(&self, client_id: usize) -> Result<()> {
        check_client_range(client_id, self.aux_table.len())
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        let loc = self.location_of(client_id, addr)?;
        let misses_before = self.cache.misses();
        self.cache.access(loc, addr, kind)?;
        let hit = self.cache.misses() == misses_before;
        self.stats[client_id].record(hit);
        Ok(hit)
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self.stats[client_id].misses)
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        self.check_client(client_id)?;
        Ok(self.stats[client_id].hits)
    }
}
