//! CommitFill instruction - execute a reservation at captured prices

use crate::instructions::freeze_on_fatal;
use crate::matching::commit::{commit, CommitResult};
use crate::state::{FillReceipt, SlabState};
use percolator_common::*;

/// Process commit_fill
///
/// Executes every slice locked by the hold at the maker prices captured
/// during Reserve. The receipt, when supplied, carries the result back to
/// the router alongside the return-data slot.
pub fn process_commit_fill(
    slab: &mut SlabState,
    hold_id: u64,
    now_ms: u64,
    receipt: Option<&mut FillReceipt>,
) -> Result<CommitResult, PercolatorError> {
    if now_ms == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    let result = commit(slab, hold_id, now_ms).map_err(|e| freeze_on_fatal(slab, e))?;

    if let Some(receipt) = receipt {
        if !receipt.validate() {
            return Err(PercolatorError::InvalidArgument);
        }
        receipt.write(
            slab.header.seqno,
            hold_id,
            result.filled_qty,
            result.vwap_px,
            result.notional,
            result.total_fee,
            result.total_debit,
        );
    }

    Ok(result)
}
