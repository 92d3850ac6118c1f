//! Forced closure of underwater positions
//!
//! Callable by anyone once equity drops below maintenance margin. Closes the
//! largest adverse exposure first at mark shifted by the liquidation
//! penalty; the penalty funds the insurance pool.

use crate::matching::risk::{calculate_equity, calculate_margin_requirements, is_liquidatable};
use crate::state::SlabState;
use percolator_common::*;

/// Liquidation result
#[derive(Debug, Clone, Copy)]
pub struct LiquidationResult {
    pub closed_qty: u64,
    pub liq_px: u64,
    pub realized_pnl: i128,
    pub penalty: u128,
    pub remaining_deficit: u128,
}

/// Liquidate up to `qty_limit` of the target's worst position.
/// The largest adverse exposure is closed first regardless of which
/// instrument the caller nominated.
pub fn liquidate(
    slab: &mut SlabState,
    target_account_idx: u32,
    qty_limit: u64,
    now_ms: u64,
) -> Result<LiquidationResult, PercolatorError> {
    slab.fail_if_frozen()?;
    slab.header.update_timestamp(now_ms);

    if !is_liquidatable(slab, target_account_idx)? {
        return Err(PercolatorError::InvalidArgument);
    }

    let worst = find_largest_exposure(slab, target_account_idx)?;
    let Some((pos_idx, chosen_instrument)) = worst else {
        return Err(PercolatorError::InvalidArgument);
    };

    let (pos_qty, entry_px, last_funding) = {
        let pos = slab
            .positions
            .get(pos_idx)
            .ok_or(PercolatorError::InvariantViolation)?;
        (pos.qty, pos.entry_px, pos.last_funding)
    };

    let (mark_price, cum_funding) = {
        let instrument = slab
            .get_instrument(chosen_instrument)
            .ok_or(PercolatorError::InvariantViolation)?;
        (instrument.mark_price, instrument.cum_funding)
    };

    // Long inventory is dumped below mark, short is covered above it
    let penalty_bps = slab.header.params.liq_penalty_bps;
    let liq_px = if pos_qty > 0 {
        mark_price.saturating_sub((mul_u64(mark_price, penalty_bps) / BPS_DENOM) as u64)
    } else {
        mark_price.saturating_add((mul_u64(mark_price, penalty_bps) / BPS_DENOM) as u64)
    };

    let close_qty = core::cmp::min(pos_qty.unsigned_abs(), qty_limit);
    if close_qty == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    // Settle funding, then realize PnL on the closed portion at liq price
    let funding = calculate_funding_payment(pos_qty, cum_funding, last_funding);
    let closed_signed = if pos_qty > 0 {
        close_qty as i64
    } else {
        -(close_qty as i64)
    };
    let pnl = calculate_pnl(closed_signed, entry_px, liq_px);

    let penalty = fee_from_notional(notional(close_qty, mark_price), penalty_bps);

    {
        let account = slab
            .get_account_mut(target_account_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        account.cash = account
            .cash
            .saturating_add(funding)
            .saturating_add(pnl)
            .saturating_sub(penalty as i128);
    }
    slab.header.insurance_fund = slab.header.insurance_fund.saturating_add(penalty);

    let new_qty = pos_qty - closed_signed;
    if new_qty == 0 {
        unlink_position(slab, target_account_idx, pos_idx)?;
    } else if let Some(pos) = slab.positions.get_mut(pos_idx) {
        pos.qty = new_qty;
        pos.last_funding = cum_funding;
    }

    let oi_delta = new_qty.max(0) - pos_qty.max(0);
    if let Some(instrument) = slab.get_instrument_mut(chosen_instrument) {
        let oi = instrument.open_interest as i64 + oi_delta;
        instrument.open_interest = oi.max(0) as u64;
    }

    let equity_after = calculate_equity(slab, target_account_idx)?;
    let (_, mm_after) = calculate_margin_requirements(slab, target_account_idx)?;
    let remaining_deficit = if equity_after < mm_after as i128 {
        (mm_after as i128 - equity_after) as u128
    } else {
        0
    };

    slab.header.increment_seqno();

    Ok(LiquidationResult {
        closed_qty: close_qty,
        liq_px,
        realized_pnl: pnl,
        penalty,
        remaining_deficit,
    })
}

/// The position with the largest |qty| * mark exposure
fn find_largest_exposure(
    slab: &SlabState,
    account_idx: u32,
) -> Result<Option<(u32, u16)>, PercolatorError> {
    let account = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvalidArgument)?;

    let mut best: Option<(u32, u16, u128)> = None;
    let mut pos_idx = account.position_head;

    while pos_idx != NIL {
        let pos = slab
            .positions
            .get(pos_idx)
            .ok_or(PercolatorError::InvariantViolation)?;
        let mark = slab
            .get_instrument(pos.instrument_idx)
            .map(|i| i.mark_price)
            .unwrap_or(0);
        let exposure = notional(pos.qty.unsigned_abs(), mark);

        match best {
            Some((_, _, e)) if e >= exposure => {}
            _ => best = Some((pos_idx, pos.instrument_idx, exposure)),
        }

        pos_idx = pos.next_in_account;
    }

    Ok(best.map(|(idx, instrument, _)| (idx, instrument)))
}

fn unlink_position(
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
        let next = slab
            .positions
            .get(curr)
            .ok_or(PercolatorError::InvariantViolation)?
            .next_in_account;

        if curr == position_idx {
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
        curr = next;
    }

    Ok(())
}
