//! UpdateFunding instruction - oracle crank

use crate::matching::funding::update_funding;
use crate::state::SlabState;
use percolator_common::*;

/// Process update_funding
///
/// Admin path: runs even while the slab is frozen so reconciliation can
/// bring the mark back inside the band before Resume.
pub fn process_update_funding(
    slab: &mut SlabState,
    instrument_idx: u16,
    index_price: u64,
    now_ms: u64,
) -> Result<(), PercolatorError> {
    if now_ms == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    update_funding(slab, instrument_idx, index_price, now_ms)
}
