//! Risk calculations and margin checks

use crate::state::SlabState;
use percolator_common::*;

/// Account equity in the slab: cash + unrealized PnL - unsettled funding
pub fn calculate_equity(slab: &SlabState, account_idx: u32) -> Result<i128, PercolatorError> {
    let account = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvalidArgument)?;

    let mut equity = account.cash;

    let mut pos_idx = account.position_head;
    while pos_idx != NIL {
        let pos = slab
            .positions
            .get(pos_idx)
            .ok_or(PercolatorError::InvariantViolation)?;

        let instrument = slab
            .get_instrument(pos.instrument_idx)
            .ok_or(PercolatorError::InvariantViolation)?;

        let pnl = calculate_pnl(pos.qty, pos.entry_px, instrument.mark_price);
        let funding = calculate_funding_payment(pos.qty, instrument.cum_funding, pos.last_funding);

        equity = equity.saturating_add(pnl).saturating_add(funding);

        pos_idx = pos.next_in_account;
    }

    Ok(equity)
}

/// (IM, MM) totals across all positions, at mark
pub fn calculate_margin_requirements(
    slab: &SlabState,
    account_idx: u32,
) -> Result<(u128, u128), PercolatorError> {
    let account = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvalidArgument)?;

    let mut im_total = 0u128;
    let mut mm_total = 0u128;

    let mut pos_idx = account.position_head;
    while pos_idx != NIL {
        let pos = slab
            .positions
            .get(pos_idx)
            .ok_or(PercolatorError::InvariantViolation)?;

        let instrument = slab
            .get_instrument(pos.instrument_idx)
            .ok_or(PercolatorError::InvariantViolation)?;

        im_total = im_total.saturating_add(calculate_margin(
            pos.qty,
            instrument.mark_price,
            slab.header.params.imr_bps,
        ));
        mm_total = mm_total.saturating_add(calculate_margin(
            pos.qty,
            instrument.mark_price,
            slab.header.params.mmr_bps,
        ));

        pos_idx = pos.next_in_account;
    }

    Ok((im_total, mm_total))
}

/// Would the account still satisfy initial margin after adding qty_delta?
pub fn check_margin_pre_trade(
    slab: &SlabState,
    account_idx: u32,
    instrument_idx: u16,
    qty_delta: i64,
) -> Result<bool, PercolatorError> {
    let equity = calculate_equity(slab, account_idx)?;
    let (current_im, _) = calculate_margin_requirements(slab, account_idx)?;

    let mark_price = slab
        .get_instrument(instrument_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .mark_price;

    let current_qty = get_position_qty(slab, account_idx, instrument_idx);
    let new_qty = current_qty + qty_delta;

    let old_im = calculate_margin(current_qty, mark_price, slab.header.params.imr_bps);
    let new_im = calculate_margin(new_qty, mark_price, slab.header.params.imr_bps);

    let total_im = current_im.saturating_sub(old_im).saturating_add(new_im);

    Ok(equity >= total_im as i128)
}

/// Below maintenance margin?
pub fn is_liquidatable(slab: &SlabState, account_idx: u32) -> Result<bool, PercolatorError> {
    let equity = calculate_equity(slab, account_idx)?;
    let (_, mm) = calculate_margin_requirements(slab, account_idx)?;

    Ok(equity < mm as i128)
}

/// Position quantity for (account, instrument), zero when flat
pub fn get_position_qty(slab: &SlabState, account_idx: u32, instrument_idx: u16) -> i64 {
    if let Some(account) = slab.get_account(account_idx) {
        let mut pos_idx = account.position_head;
        while pos_idx != NIL {
            if let Some(pos) = slab.positions.get(pos_idx) {
                if pos.instrument_idx == instrument_idx {
                    return pos.qty;
                }
                pos_idx = pos.next_in_account;
            } else {
                break;
            }
        }
    }
    0
}

/// Refresh the cached margin fields on the account
pub fn update_account_margin(slab: &mut SlabState, account_idx: u32) -> Result<(), PercolatorError> {
    let (im, mm) = calculate_margin_requirements(slab, account_idx)?;

    if let Some(account) = slab.get_account_mut(account_idx) {
        account.im = im;
        account.mm = mm;
    }

    Ok(())
}
