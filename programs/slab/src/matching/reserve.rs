//! Reserve: walk the contra book and lock slices without executing
//!
//! Phase one of the two-phase flow. The walk claims quantity on specific
//! maker orders at known prices; nothing trades until Commit consumes the
//! hold.

use crate::matching::book::maybe_roll_epoch;
use crate::state::SlabState;
use percolator_common::*;

/// Result returned to the router after a reserve
#[derive(Debug, Clone, Copy)]
pub struct ReserveResult {
    pub hold_id: u64,
    pub vwap_px: u64,
    pub worst_px: u64,
    pub max_charge: u128,
    pub expiry_ms: u64,
    pub seqno: u64,
    pub filled_qty: u64,
}

/// Reserve liquidity from the book
pub fn reserve(
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
    slab.fail_if_frozen()?;
    slab.header.update_timestamp(now_ms);

    // Bounded lazy reclaim of expired holds
    sweep_expired(slab, now_ms)?;

    if ttl_ms == 0 || ttl_ms > slab.header.params.ttl_max_ms {
        return Err(PercolatorError::InvalidArgument);
    }
    if slab.get_account(account_idx).is_none() {
        return Err(PercolatorError::InvalidArgument);
    }

    let (tick, lot, min_order, halted, mark_px, index_px) = {
        let instrument = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        (
            instrument.tick,
            instrument.lot,
            instrument.min_order,
            instrument.halted,
            instrument.mark_price,
            instrument.index_price,
        )
    };

    if halted {
        return Err(PercolatorError::Halted);
    }
    if qty == 0 || limit_px == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if !is_tick_aligned(limit_px, tick) || !is_lot_aligned(qty, lot) {
        return Err(PercolatorError::InvalidArgument);
    }
    if qty < min_order {
        return Err(PercolatorError::InvalidArgument);
    }

    // Kill band: no reservations while mark has diverged from index
    if divergence_bps(mark_px, index_px) > slab.header.params.kill_band_bps as u128 {
        return Err(PercolatorError::KillBandBreached);
    }

    maybe_roll_epoch(slab, instrument_idx, now_ms)?;

    // Per-account reservation budget per epoch
    let epoch = slab.get_instrument(instrument_idx).unwrap().epoch;
    {
        let account = slab
            .get_account_mut(account_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        if account.frozen {
            return Err(PercolatorError::Unauthorized);
        }
        if account.reserve_epoch != epoch {
            account.reserve_epoch = epoch;
            account.reserves_in_epoch = 0;
        }
        if account.reserves_in_epoch >= RESERVES_PER_EPOCH_MAX {
            return Err(PercolatorError::RateLimited);
        }
        account.reserves_in_epoch += 1;
    }

    let resv_handle = slab
        .reservations
        .alloc()
        .ok_or(PercolatorError::ArenaFull)?;
    let resv_idx = resv_handle.idx;

    let walk = walk_and_reserve(slab, instrument_idx, side.contra(), qty, limit_px, resv_idx);

    let (filled_qty, weighted_sum, worst_px, slice_head) = match walk {
        Ok(w) => w,
        Err(e) => {
            slab.reservations.free(resv_idx);
            return Err(e);
        }
    };

    if filled_qty == 0 || (tif == TimeInForce::FOK && filled_qty < qty) {
        release_slices(slab, slice_head)?;
        slab.reservations.free(resv_idx);
        return Err(PercolatorError::InsufficientLiquidity);
    }

    let vwap_px = calculate_vwap(weighted_sum, filled_qty);
    let taker_notional = weighted_sum / (PRICE_MULTIPLIER as u128);
    let max_charge =
        taker_notional.saturating_add(fee_from_notional(taker_notional, slab.header.params.taker_fee_bps));

    let hold_id = slab.header.next_hold_id();
    let expiry_ms = now_ms.saturating_add(ttl_ms);
    let seqno = slab.header.increment_seqno();

    if let Some(resv) = slab.reservations.get_mut(resv_idx) {
        resv.hold_id = hold_id;
        resv.route_id = route_id;
        resv.account_idx = account_idx;
        resv.instrument_idx = instrument_idx;
        resv.side = side;
        resv.tif = tif;
        resv.qty = filled_qty;
        resv.vwap_px = vwap_px;
        resv.worst_px = worst_px;
        resv.max_charge = max_charge;
        resv.commitment_hash = commitment_hash;
        resv.expiry_ms = expiry_ms;
        resv.slice_head = slice_head;
        resv.committed = false;
    }

    Ok(ReserveResult {
        hold_id,
        vwap_px,
        worst_px,
        max_charge,
        expiry_ms,
        seqno,
        filled_qty,
    })
}

/// Walk one side of the book, carving slices off each touched maker.
///
/// Returns (filled_qty, price-weighted qty sum, worst price, slice head).
fn walk_and_reserve(
    slab: &mut SlabState,
    instrument_idx: u16,
    book_side: Side,
    qty: u64,
    limit_px: u64,
    resv_idx: u32,
) -> Result<(u64, u128, u64, u32), PercolatorError> {
    let head = {
        let instrument = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        match book_side {
            Side::Buy => instrument.bids_head,
            Side::Sell => instrument.asks_head,
        }
    };

    let mut curr_idx = head;
    let mut qty_left = qty;
    let mut weighted_sum: u128 = 0;
    let mut worst_px = limit_px;
    let mut slice_head = NIL;
    let mut slice_tail = NIL;

    while curr_idx != NIL && qty_left > 0 {
        let (price, available, next, order_gen) = {
            let order = slab
                .orders
                .get(curr_idx)
                .ok_or(PercolatorError::InvariantViolation)?;
            (
                order.price,
                order.qty.saturating_sub(order.reserved_qty),
                order.next,
                order.gen,
            )
        };

        // The walk stops at the first unfavorable price
        let crosses = match book_side {
            Side::Sell => price <= limit_px,
            Side::Buy => price >= limit_px,
        };
        if !crosses {
            break;
        }

        if available == 0 {
            curr_idx = next;
            continue;
        }

        let take = core::cmp::min(qty_left, available);

        let slice_handle = match slab.slices.alloc() {
            Some(h) => h,
            None => {
                // Unwind everything taken so far before surfacing the error
                release_slices(slab, slice_head)?;
                return Err(PercolatorError::ArenaFull);
            }
        };

        if let Some(slice) = slab.slices.get_mut(slice_handle.idx) {
            slice.resv_idx = resv_idx;
            slice.order_idx = curr_idx;
            slice.order_gen = order_gen;
            slice.qty = take;
            slice.price = price;
            slice.next = NIL;
        }

        if slice_head == NIL {
            slice_head = slice_handle.idx;
        } else if let Some(tail) = slab.slices.get_mut(slice_tail) {
            tail.next = slice_handle.idx;
        }
        slice_tail = slice_handle.idx;

        if let Some(order) = slab.orders.get_mut(curr_idx) {
            order.reserved_qty = order.reserved_qty.saturating_add(take);
        }

        qty_left -= take;
        weighted_sum = weighted_sum.saturating_add(mul_u64(take, price));
        worst_px = price;
        curr_idx = next;
    }

    Ok((qty - qty_left, weighted_sum, worst_px, slice_head))
}

/// Release a slice chain: give reserved quantity back to the makers and
/// return the slices to the pool.
pub(crate) fn release_slices(slab: &mut SlabState, slice_head: u32) -> Result<(), PercolatorError> {
    let mut curr_idx = slice_head;

    while curr_idx != NIL {
        let (order_idx, qty, next) = {
            let slice = slab
                .slices
                .get(curr_idx)
                .ok_or(PercolatorError::InvariantViolation)?;
            (slice.order_idx, slice.qty, slice.next)
        };

        if let Some(order) = slab.orders.get_mut(order_idx) {
            order.reserved_qty = order.reserved_qty.saturating_sub(qty);
        }

        slab.slices.free(curr_idx);
        curr_idx = next;
    }

    Ok(())
}

/// Slots examined per sweep, independent of how many are reclaimable
const SWEEP_SCAN_LIMIT: u32 = 4 * EXPIRY_SWEEP_MAX;

/// Reclaim up to EXPIRY_SWEEP_MAX expired reservations starting at the
/// round-robin cursor. Work per entry point is bounded by the scan limit;
/// reclaim latency amortizes across subsequent operations.
pub fn sweep_expired(slab: &mut SlabState, now_ms: u64) -> Result<(), PercolatorError> {
    let capacity = slab.reservations.capacity();
    let mut cursor = slab.header.sweep_cursor % capacity;
    let mut reclaimed = 0u32;
    let mut scanned = 0u32;

    while reclaimed < EXPIRY_SWEEP_MAX && scanned < SWEEP_SCAN_LIMIT {
        let expired = match slab.reservations.get(cursor) {
            Some(resv) => now_ms >= resv.expiry_ms,
            None => false,
        };

        if expired {
            // Committed holds already spent their slices; slice_head is NIL
            let slice_head = slab.reservations.get(cursor).unwrap().slice_head;
            release_slices(slab, slice_head)?;
            slab.reservations.free(cursor);
            reclaimed += 1;
        }

        cursor = (cursor + 1) % capacity;
        scanned += 1;
    }

    slab.header.sweep_cursor = cursor;
    Ok(())
}
