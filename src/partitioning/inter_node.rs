use log::debug;

use super::{SharedCache, check_client_range};
use crate::{
    cache::{Cache, CacheConfig, mask},
    error::{Result, invalid_config},
    trace::AccessKind,
};

/// The LLC is split into independent slices (e.g. banks next to each node) and
/// each client is routed to one of the slices it owns by the address bits right
/// above the block offset. The selection field is as wide as the client count
/// needs, and is reduced modulo the number of slices the client owns.
#[derive(Debug, Clone)]
pub struct InterNodePartitioning {
    // Slice list per client.
    memory_nodes: Vec<Vec<Cache>>,
    node_selection_bits: u32,
    block_offset_bits: u32,
}

impl InterNodePartitioning {
    /// `n_slices[i]` is the number of slices owned by client `i`; every slice has
    /// the same geometry.
    pub fn new(
        clients: usize,
        n_slices: &[usize],
        slice_size: u64,
        associativity: usize,
        block_size: u64,
    ) -> Result<Self> {
        if n_slices.len() != clients {
            return Err(invalid_config(format!(
                "{} slice counts given for {clients} clients",
                n_slices.len()
            )));
        }
        if clients == 0 {
            return Err(invalid_config("inter-node partitioning needs at least one client"));
        }
        if let Some(client) = n_slices.iter().position(|&n| n == 0) {
            return Err(invalid_config(format!("client {client} owns no slices")));
        }
        let slice = Cache::new(CacheConfig::new(slice_size, associativity, block_size))?;
        let memory_nodes: Vec<Vec<Cache>> =
            n_slices.iter().map(|&n| vec![slice.clone(); n]).collect();

        let node_selection_bits = usize::BITS - clients.leading_zeros();
        debug!(
            "inter-node partitioning {n_slices:?}: slices of {}B, {node_selection_bits} selection bits",
            slice_size
        );
        Ok(Self {
            memory_nodes,
            node_selection_bits,
            block_offset_bits: slice.block_offset_bits(),
        })
    }

    pub fn clients(&self) -> usize {
        self.memory_nodes.len()
    }

    pub fn memory_nodes(&self, client_id: usize) -> Result<&[Cache]> {
        self.check_client(client_id)?;
        Ok(&self.memory_nodes[client_id])
    }

    pub fn node_selection_bits(&self) -> u32 {
        self.node_selection_bits
    }

    /// Index of the owned slice that serves `addr` for `client_id`.
    pub fn slice_for(&self, client_id: usize, addr: u64) -> Result<usize> {
        self.check_client(client_id)?;
        let node_selection = (addr >> self.block_offset_bits) & mask(self.node_selection_bits);
        Ok((node_selection % self.memory_nodes[client_id].len() as u64) as usize)
    }
}

impl SharedCache for InterNodePartitioning {
    fn check_client(&self, client_id: usize) -> Result<()> {
        check_client_range(client_id, self.memory_nodes.len())
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool> {
        let slice = self.slice_for(client_id, addr)?;
        self.memory_nodes[client_id][slice].access_address(addr, kind)
    }

    fn misses(&self, client_id: usize) -> Result<u64> {
        Ok(self.memory_nodes(client_id)?.iter().map(Cache::misses).sum())
    }

    fn hits(&self, client_id: usize) -> Result<u64> {
        Ok(self.memory_nodes(client_id)?.iter().map(Cache::hits).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_input() {
        let part = [2, 1, 1];
        // Client count mismatch.
        assert!(InterNodePartitioning::new(2, &part, 1024, 2, 16).is_err());
        assert!(InterNodePartitioning::new(4, &part, 1024, 2, 16).is_err());
        // Rows cannot be divided evenly.
        assert!(InterNodePartitioning::new(3, &part, 1023, 2, 16).is_err());
        assert!(InterNodePartitioning::new(2, &[1, 0], 1024, 2, 16).is_err());

        let inp = InterNodePartitioning::new(3, &part, 1024, 2, 16).unwrap();
        assert_eq!(inp.memory_nodes(0).unwrap().len(), 2);
        assert_eq!(inp.memory_nodes(0).unwrap()[0].sets(), 32);
        assert_eq!(inp.memory_nodes(0).unwrap()[1].sets(), 32);
        assert_eq!(inp.memory_nodes(1).unwrap()[0].sets(), 32);
        assert_eq!(inp.memory_nodes(2).unwrap()[0].sets(), 32);
        assert!(inp.memory_nodes(3).is_err());
    }

    #[test]
    fn routes_by_selection_modulo_ownership() {
        // Single-set slices of associativity 2 so only routing matters.
        let mut inp = InterNodePartitioning::new(3, &[2, 1, 1], 32, 2, 16).unwrap();
        assert_eq!(inp.node_selection_bits(), 2);

        let addr1 = 7 << 4; // selection 3, tag 7
        let addr2 = 15 << 4; // selection 3, tag 15
        let addr4 = 1 << 4; // selection 1, tag 1
        let addr5 = 1 << 6; // selection 0, tag 4
        let addr6 = 3 << 6; // selection 0, tag 12

        assert_eq!(inp.slice_for(0, addr1).unwrap(), 1);
        assert_eq!(inp.slice_for(0, addr5).unwrap(), 0);
        assert_eq!(inp.slice_for(1, addr1).unwrap(), 0);

        for client in 0..3 {
            assert_eq!(inp.misses(client).unwrap(), 0);
            assert_eq!(inp.hits(client).unwrap(), 0);
        }

        for addr in [addr1, addr2, addr5, addr6] {
            assert!(!inp.read(0, addr).unwrap());
        }
        for addr in [addr1, addr2, addr5, addr6] {
            assert!(inp.read(0, addr).unwrap());
        }
        assert_eq!(inp.misses(0).unwrap(), 4);
        assert_eq!(inp.hits(0).unwrap(), 4);

        inp.read(0, addr4).unwrap(); // evicts addr1 from slice 1
        inp.read(0, addr2).unwrap(); // hit
        inp.read(0, addr1).unwrap(); // miss
        assert_eq!(inp.misses(0).unwrap(), 6);
        assert_eq!(inp.hits(0).unwrap(), 5);

        let nodes = inp.memory_nodes(0).unwrap();
        assert_eq!((nodes[0].hits(), nodes[0].misses()), (2, 2));
        assert_eq!((nodes[1].hits(), nodes[1].misses()), (3, 4));

        inp.read(1, addr1).unwrap();
        inp.read(2, addr2).unwrap();
        inp.read(1, addr1).unwrap();
        inp.read(2, addr2).unwrap();
        for client in 1..3 {
            let node = &inp.memory_nodes(client).unwrap()[0];
            assert_eq!((node.misses(), node.hits()), (1, 1));
        }
        // Client 0's slices are untouched by the others.
        assert_eq!(inp.misses(0).unwrap(), 6);
    }

    #[test]
    fn selection_width_follows_client_count() {
        // Three slices each: two clients need 2 selection bits, so selection 3
        // wraps back to slice 0.
        let inp = InterNodePartitioning::new(2, &[3, 3], 64, 2, 16).unwrap();
        assert_eq!(inp.node_selection_bits(), 2);
        assert_eq!(inp.slice_for(0, 0x00).unwrap(), 0);
        assert_eq!(inp.slice_for(0, 0x10).unwrap(), 1);
        assert_eq!(inp.slice_for(0, 0x20).unwrap(), 2);
        assert_eq!(inp.slice_for(0, 0x30).unwrap(), 0);
        assert_eq!(inp.slice_for(0, 0x40).unwrap(), 0);
        assert_eq!(inp.slice_for(1, 0x60).unwrap(), 2);

        // A lone client gets a single selection bit and never reaches slice 2.
        let lone = InterNodePartitioning::new(1, &[3], 64, 2, 16).unwrap();
        assert_eq!(lone.node_selection_bits(), 1);
        assert!((0..64u64).all(|block| lone.slice_for(0, block << 4).unwrap() != 2));
        assert_eq!(lone.slice_for(0, 0x20).unwrap(), 0);
        assert_eq!(lone.slice_for(0, 0x30).unwrap(), 1);
    }

    #[test]
    fn bad_client_mutates_nothing() {
        let mut inp = InterNodePartitioning::new(2, &[1, 1], 64, 2, 16).unwrap();
        assert!(inp.read(2, 0x40).is_err());
        assert_eq!(inp.misses(0).unwrap() + inp.misses(1).unwrap(), 0);
    }
}
