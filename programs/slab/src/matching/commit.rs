//! Commit: execute trades at reserved prices, and Cancel: unwind a hold
//!
//! Commit consumes a hold created by Reserve. Fills execute at the slice
//! prices captured during the walk; positions, funding, fees, the ARG
//! ledger, and the mark price all settle here. No partial state is
//! published on failure.

use crate::matching::book::{maybe_roll_epoch, remove_order};
use crate::matching::reserve::{release_slices, sweep_expired};
use crate::state::SlabState;
use percolator_common::*;

/// Commit result
#[derive(Debug, Clone, Copy)]
pub struct CommitResult {
    pub filled_qty: u64,
    pub vwap_px: u64,
    pub notional: u128,
    pub total_fee: u128,
    pub total_debit: u128,
}

/// Commit a reservation and execute its slices
pub fn commit(slab: &mut SlabState, hold_id: u64, now_ms: u64) -> Result<CommitResult, PercolatorError> {
    slab.fail_if_frozen()?;
    slab.header.update_timestamp(now_ms);
    sweep_expired(slab, now_ms)?;

    // A hold that was swept after expiry resolves the same as one that
    // expired a moment ago
    let resv_idx = match find_reservation(slab, hold_id) {
        Some(idx) => idx,
        None => return Err(PercolatorError::Expired),
    };

    let (account_idx, instrument_idx, side, slice_head, expiry_ms, committed) = {
        let resv = slab.reservations.get(resv_idx).unwrap();
        (
            resv.account_idx,
            resv.instrument_idx,
            resv.side,
            resv.slice_head,
            resv.expiry_ms,
            resv.committed,
        )
    };

    if committed {
        return Err(PercolatorError::AlreadyCommitted);
    }

    if now_ms >= expiry_ms {
        release_slices(slab, slice_head)?;
        slab.reservations.free(resv_idx);
        return Err(PercolatorError::Expired);
    }

    maybe_roll_epoch(slab, instrument_idx, now_ms)?;

    let exec = execute_slices(slab, slice_head, account_idx, instrument_idx, side, now_ms)?;

    let filled_qty = exec.filled_qty;
    let vwap_px = calculate_vwap(exec.weighted_sum, filled_qty);
    let notional_total = exec.weighted_sum / (PRICE_MULTIPLIER as u128);
    let taker_fee = fee_from_notional(notional_total, slab.header.params.taker_fee_bps);

    // Roundtrip guard: tax only the growth of min(buy, sell) notional
    // for this (account, instrument, epoch). The tax settles against slab
    // cash; the escrow debit stays within the reserved ceiling.
    let arg_tax = apply_arg_tax(slab, account_idx, instrument_idx, side, filled_qty, notional_total)?;

    let total_fee = taker_fee.saturating_add(arg_tax);
    let total_debit = notional_total.saturating_add(taker_fee);

    // Mark from last trade, clamped into the index band
    if exec.last_px != 0 {
        let mark_bound_bps = slab.header.params.mark_bound_bps;
        let instrument = slab.get_instrument_mut(instrument_idx).unwrap();
        instrument.mark_price = clamp_to_band(exec.last_px, instrument.index_price, mark_bound_bps);
        let oi = instrument.open_interest as i64 + exec.oi_delta;
        instrument.open_interest = oi.max(0) as u64;
    }

    // Consume the hold: slices are spent, the slot stays until expiry so a
    // replayed commit resolves AlreadyCommitted, then the sweep reclaims it
    free_slice_records(slab, slice_head);
    if let Some(resv) = slab.reservations.get_mut(resv_idx) {
        resv.committed = true;
        resv.slice_head = NIL;
    }

    slab.header.increment_seqno();

    Ok(CommitResult {
        filled_qty,
        vwap_px,
        notional: notional_total,
        total_fee,
        total_debit,
    })
}

/// Cancel a reservation, releasing every claimed slice.
/// Idempotent: unknown (already canceled or swept) holds return Ok.
pub fn cancel(slab: &mut SlabState, hold_id: u64, now_ms: u64) -> Result<(), PercolatorError> {
    slab.fail_if_frozen()?;
    slab.header.update_timestamp(now_ms);
    sweep_expired(slab, now_ms)?;

    let resv_idx = match find_reservation(slab, hold_id) {
        Some(idx) => idx,
        None => return Ok(()),
    };

    let (slice_head, committed) = {
        let resv = slab.reservations.get(resv_idx).unwrap();
        (resv.slice_head, resv.committed)
    };

    if committed {
        return Err(PercolatorError::AlreadyCommitted);
    }

    release_slices(slab, slice_head)?;
    slab.reservations.free(resv_idx);
    slab.header.increment_seqno();

    Ok(())
}

struct SliceExecution {
    filled_qty: u64,
    weighted_sum: u128,
    last_px: u64,
    oi_delta: i64,
}

/// Execute every slice in the chain at its captured price
fn execute_slices(
    slab: &mut SlabState,
    slice_head: u32,
    taker_account_idx: u32,
    instrument_idx: u16,
    side: Side,
    now_ms: u64,
) -> Result<SliceExecution, PercolatorError> {
    let maker_fee_bps = slab.header.params.maker_fee_bps;
    let batch_open_ms = slab
        .get_instrument(instrument_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .batch_open_ms;

    let mut curr_slice_idx = slice_head;
    let mut filled_qty = 0u64;
    let mut weighted_sum = 0u128;
    let mut last_px = 0u64;
    let mut oi_delta = 0i64;

    while curr_slice_idx != NIL {
        let (order_idx, order_gen, qty, price, next_slice) = {
            let slice = slab
                .slices
                .get(curr_slice_idx)
                .ok_or(PercolatorError::InvariantViolation)?;
            (
                slice.order_idx,
                slice.order_gen,
                slice.qty,
                slice.price,
                slice.next,
            )
        };

        // A slice pointing at a recycled or drifted order is corruption;
        // the instruction layer freezes the slab on these errors
        let maker = match slab.orders.get(order_idx) {
            Some(order) if order.gen == order_gen => {
                if qty > order.reserved_qty || qty > order.qty {
                    None
                } else {
                    Some((order.account_idx, order.order_id, order.created_ms))
                }
            }
            Some(_) => return Err(PercolatorError::StaleHandle),
            None => return Err(PercolatorError::StaleHandle),
        };
        let Some((maker_account_idx, maker_order_id, order_created_ms)) = maker else {
            return Err(PercolatorError::InvariantViolation);
        };

        let cum_funding = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?
            .cum_funding;

        let taker_qty = match side {
            Side::Buy => qty as i64,
            Side::Sell => -(qty as i64),
        };

        oi_delta += update_position(slab, taker_account_idx, instrument_idx, taker_qty, price, cum_funding)?;
        oi_delta += update_position(slab, maker_account_idx, instrument_idx, -taker_qty, price, cum_funding)?;

        // Maker fee per fill; a rebate is forfeited when the order was
        // posted inside the current batch window (JIT)
        let fill_notional = notional(qty, price);
        let maker_fee = fee_from_notional_signed(fill_notional, maker_fee_bps);
        let jit = order_created_ms >= batch_open_ms && batch_open_ms != 0;
        if let Some(maker) = slab.get_account_mut(maker_account_idx) {
            if maker_fee_bps >= 0 {
                maker.cash = maker.cash.saturating_sub(maker_fee as i128);
            } else if !jit {
                maker.cash = maker.cash.saturating_add(maker_fee as i128);
            }
        }

        slab.record_trade(Trade {
            ts: now_ms,
            maker_order_id,
            taker_account_idx,
            instrument_idx,
            side,
            _padding: 0,
            price,
            qty,
        });

        // Spend the claim out of the maker order
        let mut fully_filled = false;
        if let Some(order) = slab.orders.get_mut(order_idx) {
            order.qty -= qty;
            order.reserved_qty -= qty;
            fully_filled = order.qty == 0;
        }
        if fully_filled {
            remove_order(slab, instrument_idx, order_idx)?;
            slab.orders.free(order_idx);
        }

        filled_qty += qty;
        weighted_sum = weighted_sum.saturating_add(mul_u64(qty, price));
        last_px = price;

        curr_slice_idx = next_slice;
    }

    Ok(SliceExecution {
        filled_qty,
        weighted_sum,
        last_px,
        oi_delta,
    })
}

/// Update or create a position; settles funding on every touch.
/// Returns the long-open-interest delta contributed by this account.
fn update_position(
    slab: &mut SlabState,
    account_idx: u32,
    instrument_idx: u16,
    qty_delta: i64,
    price: u64,
    cum_funding: i128,
) -> Result<i64, PercolatorError> {
    let position_head = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .position_head;

    let mut position_idx = position_head;
    let mut found = None;

    while position_idx != NIL {
        let pos = slab
            .positions
            .get(position_idx)
            .ok_or(PercolatorError::InvariantViolation)?;
        if pos.instrument_idx == instrument_idx {
            found = Some(position_idx);
            break;
        }
        position_idx = pos.next_in_account;
    }

    if let Some(pos_idx) = found {
        let (old_qty, old_entry_px, last_funding) = {
            let pos = slab.positions.get(pos_idx).unwrap();
            (pos.qty, pos.entry_px, pos.last_funding)
        };

        // Funding accrued since the last touch settles into cash
        let funding = calculate_funding_payment(old_qty, cum_funding, last_funding);
        if funding != 0 {
            if let Some(account) = slab.get_account_mut(account_idx) {
                account.cash = account.cash.saturating_add(funding);
            }
        }

        let new_qty = old_qty + qty_delta;
        let oi_delta = new_qty.max(0) - old_qty.max(0);

        if new_qty == 0 {
            // Flat close: realize PnL, drop the position
            let pnl = calculate_pnl(old_qty, old_entry_px, price);
            if let Some(account) = slab.get_account_mut(account_idx) {
                account.cash = account.cash.saturating_add(pnl);
            }
            remove_position(slab, account_idx, pos_idx)?;
        } else if (old_qty > 0) == (new_qty > 0) && old_qty != 0 && old_qty.abs() < new_qty.abs() {
            // Adding to the same direction: entry price becomes the vwap
            let abs_old = old_qty.unsigned_abs();
            let abs_delta = qty_delta.unsigned_abs();
            let blended = mul_u64(abs_old, old_entry_px).saturating_add(mul_u64(abs_delta, price));
            let new_entry_px = calculate_vwap(blended, abs_old + abs_delta);

            if let Some(pos) = slab.positions.get_mut(pos_idx) {
                pos.entry_px = new_entry_px;
                pos.qty = new_qty;
                pos.last_funding = cum_funding;
            }
        } else if (old_qty > 0) == (new_qty > 0) {
            // Partial reduce: realize PnL on the closed portion
            let closed = old_qty - new_qty;
            let pnl = calculate_pnl(closed, old_entry_px, price);
            if let Some(account) = slab.get_account_mut(account_idx) {
                account.cash = account.cash.saturating_add(pnl);
            }
            if let Some(pos) = slab.positions.get_mut(pos_idx) {
                pos.qty = new_qty;
                pos.last_funding = cum_funding;
            }
        } else {
            // Flip: realize the whole old side, restart at the fill price
            let pnl = calculate_pnl(old_qty, old_entry_px, price);
            if let Some(account) = slab.get_account_mut(account_idx) {
                account.cash = account.cash.saturating_add(pnl);
            }
            if let Some(pos) = slab.positions.get_mut(pos_idx) {
                pos.qty = new_qty;
                pos.entry_px = price;
                pos.last_funding = cum_funding;
            }
        }

        Ok(oi_delta)
    } else if qty_delta != 0 {
        let handle = slab.positions.alloc().ok_or(PercolatorError::ArenaFull)?;

        if let Some(pos) = slab.positions.get_mut(handle.idx) {
            pos.account_idx = account_idx;
            pos.instrument_idx = instrument_idx;
            pos.qty = qty_delta;
            pos.entry_px = price;
            pos.last_funding = cum_funding;
            pos.next_in_account = position_head;
        }

        if let Some(account) = slab.get_account_mut(account_idx) {
            account.position_head = handle.idx;
        }

        Ok(qty_delta.max(0))
    } else {
        Ok(0)
    }
}

/// Unlink and free a position from the account chain
fn remove_position(
    slab: &mut SlabState,
    account_idx: u32,
    position_idx: u32,
) -> Result<(), PercolatorError> {
    let head = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .position_head;

    let mut curr = head;
    let mut prev = NIL;

    while curr != NIL {
        if curr == position_idx {
            let next = slab
                .positions
                .get(curr)
                .ok_or(PercolatorError::InvariantViolation)?
                .next_in_account;

            if prev == NIL {
                if let Some(account) = slab.get_account_mut(account_idx) {
                    account.position_head = next;
                }
            } else if let Some(prev_pos) = slab.positions.get_mut(prev) {
                prev_pos.next_in_account = next;
            }

            slab.positions.free(position_idx);
            return Ok(());
        }

        prev = curr;
        curr = slab
            .positions
            .get(curr)
            .ok_or(PercolatorError::InvariantViolation)?
            .next_in_account;
    }

    Ok(())
}

/// Free spent slice records without touching maker reserved quantities
/// (commit already consumed them)
fn free_slice_records(slab: &mut SlabState, slice_head: u32) {
    let mut curr = slice_head;
    while curr != NIL {
        let next = match slab.slices.get(curr) {
            Some(slice) => slice.next,
            None => break,
        };
        slab.slices.free(curr);
        curr = next;
    }
}

/// Record this commit in the aggressor ledger and tax the roundtrip overlap
/// growth at arg_tax_bps. The tax debits the taker and funds insurance.
fn apply_arg_tax(
    slab: &mut SlabState,
    account_idx: u32,
    instrument_idx: u16,
    side: Side,
    qty: u64,
    notional: u128,
) -> Result<u128, PercolatorError> {
    let epoch = slab
        .get_instrument(instrument_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .epoch;

    let entry_idx = find_or_create_aggressor_entry(slab, account_idx, instrument_idx, epoch)?;

    let tax_base = {
        let entry = slab.aggressor_ledger.get_mut(entry_idx).unwrap();
        let overlap_before = core::cmp::min(entry.buy_notional, entry.sell_notional);
        match side {
            Side::Buy => {
                entry.buy_qty = entry.buy_qty.saturating_add(qty);
                entry.buy_notional = entry.buy_notional.saturating_add(notional);
            }
            Side::Sell => {
                entry.sell_qty = entry.sell_qty.saturating_add(qty);
                entry.sell_notional = entry.sell_notional.saturating_add(notional);
            }
        }
        let overlap_after = core::cmp::min(entry.buy_notional, entry.sell_notional);
        overlap_after - overlap_before
    };

    if tax_base == 0 {
        return Ok(0);
    }

    let tax = fee_from_notional(tax_base, slab.header.params.arg_tax_bps);
    if tax > 0 {
        if let Some(account) = slab.get_account_mut(account_idx) {
            account.cash = account.cash.saturating_sub(tax as i128);
        }
        slab.header.insurance_fund = slab.header.insurance_fund.saturating_add(tax);
    }

    Ok(tax)
}

/// One ledger entry per (account, instrument); a stale epoch resets in place
fn find_or_create_aggressor_entry(
    slab: &mut SlabState,
    account_idx: u32,
    instrument_idx: u16,
    epoch: u16,
) -> Result<u32, PercolatorError> {
    for i in 0..slab.aggressor_ledger.capacity() {
        let matches = match slab.aggressor_ledger.get(i) {
            Some(entry) => entry.account_idx == account_idx && entry.instrument_idx == instrument_idx,
            None => false,
        };
        if matches {
            let entry = slab.aggressor_ledger.get_mut(i).unwrap();
            if entry.epoch != epoch {
                entry.epoch = epoch;
                entry.buy_qty = 0;
                entry.sell_qty = 0;
                entry.buy_notional = 0;
                entry.sell_notional = 0;
            }
            return Ok(i);
        }
    }

    let handle = slab
        .aggressor_ledger
        .alloc()
        .ok_or(PercolatorError::ArenaFull)?;

    let entry = slab.aggressor_ledger.get_mut(handle.idx).unwrap();
    entry.account_idx = account_idx;
    entry.instrument_idx = instrument_idx;
    entry.epoch = epoch;
    entry.buy_qty = 0;
    entry.sell_qty = 0;
    entry.buy_notional = 0;
    entry.sell_notional = 0;

    Ok(handle.idx)
}

/// Find a reservation slot by hold id (linear scan over the pool)
pub fn find_reservation(slab: &SlabState, hold_id: u64) -> Option<u32> {
    for i in 0..slab.reservations.capacity() {
        if let Some(resv) = slab.reservations.get(i) {
            if resv.hold_id == hold_id {
                return Some(i);
            }
        }
    }
    None
}
