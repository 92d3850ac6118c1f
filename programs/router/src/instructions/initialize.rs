//! Initialize: set up the registry and the deployment's slab set

use crate::state::SlabRegistry;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// One slab registration in the Initialize payload
#[derive(Debug, Clone, Copy)]
pub struct SlabReg {
    pub program_id: Pubkey,
    pub state: Pubkey,
    pub imr_bps: u64,
    pub mmr_bps: u64,
}

/// Encoded size of one SlabReg on the wire
pub const SLAB_REG_LEN: usize = 80;

/// Process initialize
pub fn process_initialize(
    registry: &mut SlabRegistry,
    router_id: Pubkey,
    governance: Pubkey,
    bump: u8,
    slabs: &[SlabReg],
    now_ms: u64,
) -> Result<(), PercolatorError> {
    if registry.is_initialized() {
        return Err(PercolatorError::InvalidArgument);
    }

    registry.init(router_id, governance, bump);

    for reg in slabs {
        if reg.imr_bps == 0 || reg.imr_bps < reg.mmr_bps {
            return Err(PercolatorError::InvalidArgument);
        }
        registry.register(reg.program_id, reg.state, reg.imr_bps, reg.mmr_bps, now_ms)?;
    }

    Ok(())
}
