use log::debug;

use crate::{
    error::{CacheError, Result, invalid_config},
    trace::AccessKind,
};

/// Width of a simulated physical address.
pub const ADDRESS_WIDTH: u32 = u64::BITS;

/// All-ones value of `bits` width, e.g. `mask(2) == 0b11`.
pub fn mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Number of bits needed to index `n` distinct values.
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 { 0 } else { (n - 1).ilog2() + 1 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationInfo {
    pub set_index: usize,
    pub tag: u64,
}

/// Splits `addr` into set index and tag: offset bits lowest, set bits above them,
/// tag bits above the set bits.
pub fn compute_location_info(addr: u64, block_size: u64, sets: usize, tag_bits: u32) -> LocationInfo {
    let block_bits = block_size.ilog2();
    let set_bits = (sets as u64).ilog2();
    let shifted = addr.checked_shr(block_bits + set_bits).unwrap_or(0);
    LocationInfo {
        set_index: ((addr >> block_bits) & mask(set_bits)) as usize,
        tag: shifted & mask(tag_bits),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub cache_size: u64,      // in Bytes
    pub block_size: u64,      // in Bytes
    pub associativity: usize, // set to 1 for Direct-Mapped
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_size: 32 * 1024,
            block_size: 64,
            associativity: 4,
        }
    }
}

impl CacheConfig {
    pub fn new(cache_size: u64, associativity: usize, block_size: u64) -> Self {
        Self {
            cache_size,
            block_size,
            associativity,
        }
    }

    pub fn num_sets(&self) -> usize {
        let way_bytes = self.block_size * self.associativity as u64;
        if way_bytes == 0 {
            0
        } else {
            (self.cache_size / way_bytes) as usize
        }
    }

    /// Rejects any geometry whose address decomposition would be ill-defined.
    pub fn validate(&self) -> Result<()> {
        if !self.cache_size.is_power_of_two() {
            return Err(invalid_config(format!(
                "cache size {} is not a power of two",
                self.cache_size
            )));
        }
        self.validate_ways()?;
        let way_bytes = self.block_size * self.associativity as u64;
        if way_bytes > self.cache_size {
            return Err(invalid_config(format!(
                "cache of {} bytes cannot hold {} ways of {} byte blocks",
                self.cache_size, self.associativity, self.block_size
            )));
        }
        if self.cache_size % way_bytes != 0 {
            return Err(invalid_config(format!(
                "cache size {} is not a multiple of block size {} x associativity {}",
                self.cache_size, self.block_size, self.associativity
            )));
        }
        let sets = self.num_sets() as u64;
        if !sets.is_power_of_two() {
            return Err(invalid_config(format!("set count {sets} is not a power of two")));
        }
        Ok(())
    }

    fn validate_ways(&self) -> Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(invalid_config(format!(
                "block size {} is not a power of two",
                self.block_size
            )));
        }
        if self.associativity == 0 {
            return Err(invalid_config("associativity must be at least 1"));
        }
        self.block_size
            .checked_mul(self.associativity as u64)
            .ok_or_else(|| invalid_config("block size x associativity overflows"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Invalid,
    Valid,
    Dirty,
}

#[derive(Debug, Clone)]
pub struct CacheLine {
    pub state: LineState,
    pub tag: u64,
    pub address: u64, // last address that filled the line, for debugging
}

impl CacheLine {
    fn invalid() -> Self {
        Self {
            state: LineState::Invalid,
            tag: 0,
            address: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.state != LineState::Invalid
    }
}

#[derive(Debug, Clone)]
pub struct CacheSet {
    lines: Vec<CacheLine>,
    // Way indices, least recently used first.
    lru: Vec<usize>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: (0..ways).map(|_| CacheLine::invalid()).collect(),
            lru: (0..ways).collect(),
        }
    }

    pub fn associativity(&self) -> usize {
        self.lines.len()
    }

    pub fn cache_line(&self, way: usize) -> Option<&CacheLine> {
        self.lines.get(way)
    }

    pub fn lru_order(&self) -> &[usize] {
        &self.lru
    }

    fn find_line(&self, tag: u64) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.is_present() && line.tag == tag)
    }

    fn lru_position(&self, way: usize) -> Result<usize> {
        self.lru.iter().position(|&w| w == way).ok_or_else(|| {
            CacheError::InternalInvariantViolation(format!(
                "way {way} missing from LRU order {:?}",
                self.lru
            ))
        })
    }

    fn victim(&self) -> Result<usize> {
        match self.lru.first() {
            Some(&way) if way < self.lines.len() => Ok(way),
            _ => Err(CacheError::InternalInvariantViolation(format!(
                "LRU order {:?} has no valid victim",
                self.lru
            ))),
        }
    }

    /// Invalidates the least recently used way and returns it.
    fn evict(&mut self) -> Result<usize> {
        let way = self.victim()?;
        self.lines[way] = CacheLine::invalid();
        Ok(way)
    }

    /// Moves the way at LRU position `pos` to the most recently used end.
    fn promote(&mut self, pos: usize) {
        self.lru[pos..].rotate_left(1);
    }

    fn access(&mut self, tag: u64, address: u64, kind: AccessKind) -> Result<bool> {
        let (way, hit) = match self.find_line(tag) {
            Some(way) => (way, true),
            None => (self.victim()?, false),
        };
        // Resolve everything fallible before the set is touched.
        let pos = self.lru_position(way)?;
        if !hit {
            self.evict()?;
            let line = &mut self.lines[way];
            line.state = LineState::Valid;
            line.tag = tag;
            line.address = address;
        }
        if matches!(kind, AccessKind::Write) {
            self.lines[way].state = LineState::Dirty;
        }
        self.promote(pos);
        Ok(hit)
    }
}

#[derive(Debug, Clone)]
pub struct Cache {
    config: CacheConfig,
    sets: Vec<CacheSet>,
    num_sets: usize,
    tag_bits: u32,
    hits: u64,
    misses: u64,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn with_geometry(cache_size: u64, associativity: usize, block_size: u64) -> Result<Self> {
        Self::new(CacheConfig::new(cache_size, associativity, block_size))
    }

    /// Builds a cache from an explicit set count. The total size only has to be
    /// `sets * associativity * block_size`, so it need not be a power of two.
    pub fn with_sets(sets: usize, associativity: usize, block_size: u64) -> Result<Self> {
        if !sets.is_power_of_two() {
            return Err(invalid_config(format!("set count {sets} is not a power of two")));
        }
        let mut config = CacheConfig::new(0, associativity, block_size);
        config.validate_ways()?;
        config.cache_size = (sets as u64)
            .checked_mul(block_size * associativity as u64)
            .ok_or_else(|| invalid_config("cache size overflows"))?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        let num_sets = config.num_sets();
        let tag_bits =
            ADDRESS_WIDTH - (num_sets as u64).ilog2() - config.block_size.ilog2();
        debug!(
            "cache {}B {}-way {}B blocks: {} sets, {} tag bits",
            config.cache_size, config.associativity, config.block_size, num_sets, tag_bits
        );
        let sets = (0..num_sets)
            .map(|_| CacheSet::new(config.associativity))
            .collect();
        Self {
            config,
            sets,
            num_sets,
            tag_bits,
            hits: 0,
            misses: 0,
        }
    }

    pub fn location_of(&self, addr: u64) -> LocationInfo {
        compute_location_info(addr, self.config.block_size, self.num_sets, self.tag_bits)
    }

    /// Looks up `loc`, filling it on a miss. Returns whether it hit.
    pub fn access(&mut self, loc: LocationInfo, addr: u64, kind: AccessKind) -> Result<bool> {
        let num_sets = self.num_sets;
        let set = self.sets.get_mut(loc.set_index).ok_or_else(|| {
            CacheError::InternalInvariantViolation(format!(
                "set index {} out of range ({} sets)",
                loc.set_index, num_sets
            ))
        })?;
        let hit = set.access(loc.tag, addr, kind)?;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        Ok(hit)
    }

    pub fn access_address(&mut self, addr: u64, kind: AccessKind) -> Result<bool> {
        let loc = self.location_of(addr);
        self.access(loc, addr, kind)
    }

    pub fn read(&mut self, addr: u64) -> Result<bool> {
        self.access_address(addr, AccessKind::Read)
    }

    pub fn write(&mut self, addr: u64) -> Result<bool> {
        self.access_address(addr, AccessKind::Write)
    }

    /// Checks residency without touching counters or LRU state.
    pub fn exists(&self, addr: u64) -> bool {
        let loc = self.location_of(addr);
        self.sets[loc.set_index].find_line(loc.tag).is_some()
    }

    pub fn cache_size(&self) -> u64 {
        self.config.cache_size
    }

    pub fn block_size(&self) -> u64 {
        self.config.block_size
    }

    pub fn associativity(&self) -> usize {
        self.config.associativity
    }

    pub fn sets(&self) -> usize {
        self.num_sets
    }

    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    pub fn block_offset_bits(&self) -> u32 {
        self.config.block_size.ilog2()
    }

    pub fn set_bits(&self) -> u32 {
        (self.num_sets as u64).ilog2()
    }

    pub fn cache_set(&self, set_index: usize) -> Option<&CacheSet> {
        self.sets.get(set_index)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses() as f64
        }
    }
}
