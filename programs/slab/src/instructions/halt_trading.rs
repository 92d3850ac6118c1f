//! HaltTrading instruction - authority freeze

use crate::state::SlabState;
use percolator_common::*;

/// Process halt_trading; the entrypoint has already verified the authority
pub fn process_halt_trading(slab: &mut SlabState) -> Result<(), PercolatorError> {
    slab.header.freeze();
    slab.header.increment_seqno();
    Ok(())
}
