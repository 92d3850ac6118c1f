//! Initialize instruction - set up the slab in place
//!
//! The 10 MB account arrives zeroed; the header, pools, and instrument
//! table are threaded in place. Re-initialization of a live slab is
//! rejected by the magic check.

use crate::state::{SlabHeader, SlabParams, SlabState};
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// One instrument definition in the Initialize payload
#[derive(Debug, Clone, Copy)]
pub struct InstrumentInit {
    pub symbol: [u8; 8],
    pub tick: u64,
    pub lot: u64,
    pub min_order: u64,
    pub initial_px: u64,
}

/// Encoded size of one InstrumentInit on the wire
pub const INSTRUMENT_INIT_LEN: usize = 40;

/// Process initialize instruction
pub fn process_initialize(
    slab: &mut SlabState,
    authority: Pubkey,
    router_id: Pubkey,
    params: SlabParams,
    bump: u8,
    instruments: &[InstrumentInit],
) -> Result<(), PercolatorError> {
    if slab.header.magic == SlabHeader::MAGIC {
        return Err(PercolatorError::InvalidArgument);
    }
    if instruments.is_empty() || instruments.len() > MAX_INSTRUMENTS {
        return Err(PercolatorError::InvalidArgument);
    }
    if params.imr_bps == 0 || params.mmr_bps == 0 || params.imr_bps < params.mmr_bps {
        return Err(PercolatorError::InvalidArgument);
    }
    if params.ttl_max_ms == 0 || params.ttl_max_ms > TTL_MAX_MS {
        return Err(PercolatorError::InvalidArgument);
    }

    slab.init(authority, router_id, params, bump);

    for spec in instruments {
        slab.add_instrument(spec.symbol, spec.tick, spec.lot, spec.min_order, spec.initial_px)?;
    }

    Ok(())
}
