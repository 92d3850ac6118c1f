//! ResumeTrading instruction - authority unfreeze after reconciliation

use crate::state::SlabState;
use percolator_common::*;

/// Process resume_trading; the entrypoint has already verified the authority
pub fn process_resume_trading(slab: &mut SlabState) -> Result<(), PercolatorError> {
    slab.header.resume();
    slab.header.increment_seqno();
    Ok(())
}
