//! Slab registry: the deployment's governed set of routable slabs

use percolator_common::{PercolatorError, MAX_SLABS};
use pinocchio::pubkey::Pubkey;

/// One registered slab
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SlabEntry {
    /// Slab program ID
    pub program_id: Pubkey,
    /// Slab state account
    pub state: Pubkey,
    /// Initial margin ratio quoted for portfolio aggregation (bps)
    pub imr_bps: u64,
    /// Maintenance margin ratio (bps)
    pub mmr_bps: u64,
    /// Registered timestamp
    pub registered_ts: u64,
    /// Active flag
    pub active: bool,
    /// Padding
    pub _padding: [u8; 7],
}

/// Registry account, PDA ["registry", router_id]
#[repr(C)]
pub struct SlabRegistry {
    /// Router program ID
    pub router_id: Pubkey,
    /// Governance authority
    pub governance: Pubkey,
    /// Number of registered slabs
    pub slab_count: u16,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 5],
    /// Registered slabs
    pub slabs: [SlabEntry; MAX_SLABS],
}

impl SlabRegistry {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize in place
    pub fn init(&mut self, router_id: Pubkey, governance: Pubkey, bump: u8) {
        self.router_id = router_id;
        self.governance = governance;
        self.slab_count = 0;
        self.bump = bump;
        self._padding = [0; 5];
    }

    pub fn is_initialized(&self) -> bool {
        self.router_id != Pubkey::default()
    }

    /// Register a slab
    pub fn register(
        &mut self,
        program_id: Pubkey,
        state: Pubkey,
        imr_bps: u64,
        mmr_bps: u64,
        now_ms: u64,
    ) -> Result<u16, PercolatorError> {
        if (self.slab_count as usize) >= MAX_SLABS {
            return Err(PercolatorError::ArenaFull);
        }

        let idx = self.slab_count;
        self.slabs[idx as usize] = SlabEntry {
            program_id,
            state,
            imr_bps,
            mmr_bps,
            registered_ts: now_ms,
            active: true,
            _padding: [0; 7],
        };
        self.slab_count += 1;
        Ok(idx)
    }

    /// Find an active slab by its state account
    pub fn find_by_state(&self, state: &Pubkey) -> Option<(u16, &SlabEntry)> {
        for i in 0..self.slab_count as usize {
            if &self.slabs[i].state == state && self.slabs[i].active {
                return Some((i as u16, &self.slabs[i]));
            }
        }
        None
    }

    pub fn is_registered(&self, state: &Pubkey) -> bool {
        self.find_by_state(state).is_some()
    }

    /// Deactivate a slab
    pub fn deactivate(&mut self, state: &Pubkey) -> Result<(), PercolatorError> {
        match self.find_by_state(state) {
            Some((idx, _)) => {
                self.slabs[idx as usize].active = false;
                Ok(())
            }
            None => Err(PercolatorError::InvalidArgument),
        }
    }
}
