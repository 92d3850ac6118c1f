//! AdapterLiquidity instruction - the matcher's liquidity seam
//!
//! The router quotes and locks liquidity through this one discriminator,
//! regardless of the matcher variant behind it. Three payload forms,
//! distinguished by length: reserve (71 bytes), cancel-hold (8 bytes),
//! liquidate (22 bytes).

use crate::instructions::freeze_on_fatal;
use crate::matching::commit::cancel;
use crate::matching::liquidate::{liquidate, LiquidationResult};
use crate::matching::reserve::{reserve, ReserveResult};
use crate::state::SlabState;
use percolator_common::*;

/// Reserve payload length after the discriminator
pub const RESERVE_PAYLOAD_LEN: usize = 71;
/// Cancel-hold payload length after the discriminator
pub const CANCEL_PAYLOAD_LEN: usize = 8;
/// Liquidate payload length after the discriminator
pub const LIQUIDATE_PAYLOAD_LEN: usize = 22;

/// Process the reserve form
pub fn process_reserve(
    slab: &mut SlabState,
    account_idx: u32,
    instrument_idx: u16,
    side: Side,
    qty: u64,
    limit_px: u64,
    ttl_ms: u64,
    tif: TimeInForce,
    commitment_hash: [u8; 32],
    route_id: u64,
    now_ms: u64,
) -> Result<ReserveResult, PercolatorError> {
    reserve(
        slab,
        account_idx,
        instrument_idx,
        side,
        qty,
        limit_px,
        ttl_ms,
        tif,
        commitment_hash,
        route_id,
        now_ms,
    )
    .map_err(|e| freeze_on_fatal(slab, e))
}

/// Process the cancel-hold form; idempotent for released holds
pub fn process_cancel_hold(
    slab: &mut SlabState,
    hold_id: u64,
    now_ms: u64,
) -> Result<(), PercolatorError> {
    cancel(slab, hold_id, now_ms).map_err(|e| freeze_on_fatal(slab, e))
}

/// Process the liquidate form
pub fn process_liquidate(
    slab: &mut SlabState,
    target_account_idx: u32,
    qty_limit: u64,
    now_ms: u64,
) -> Result<LiquidationResult, PercolatorError> {
    if qty_limit == 0 || now_ms == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    liquidate(slab, target_account_idx, qty_limit, now_ms).map_err(|e| freeze_on_fatal(slab, e))
}
