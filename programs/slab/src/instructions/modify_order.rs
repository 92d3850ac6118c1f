//! ModifyOrder instruction - atomic cancel + place
//!
//! A pure size reduction at the same price resizes in place and keeps book
//! priority. Anything else is a cancel plus a fresh order with a new id and
//! arrival position.

use crate::instructions::place_order::{find_order_by_id, process_place_order};
use crate::matching::book::remove_order;
use crate::state::SlabState;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process modify_order; returns the id of the surviving order
pub fn process_modify_order(
    slab: &mut SlabState,
    owner: &Pubkey,
    order_id: u64,
    new_price: u64,
    new_qty: u64,
    now_ms: u64,
) -> Result<u64, PercolatorError> {
    slab.fail_if_frozen()?;

    let order_idx = find_order_by_id(slab, order_id).ok_or(PercolatorError::InvalidArgument)?;

    let (account_idx, instrument_idx, side, price, qty, tif, maker_class, reserved_qty) = {
        let order = slab.orders.get(order_idx).unwrap();
        (
            order.account_idx,
            order.instrument_idx,
            order.side,
            order.price,
            order.qty,
            order.tif,
            order.maker_class,
            order.reserved_qty,
        )
    };

    let account_key = slab
        .get_account(account_idx)
        .ok_or(PercolatorError::InvariantViolation)?
        .key;
    if &account_key != owner {
        return Err(PercolatorError::Unauthorized);
    }

    if reserved_qty > 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    let lot = slab
        .get_instrument(instrument_idx)
        .ok_or(PercolatorError::InvariantViolation)?
        .lot;

    // In-place shrink keeps time priority
    if new_price == price && new_qty < qty && new_qty > 0 && is_lot_aligned(new_qty, lot) {
        if let Some(order) = slab.orders.get_mut(order_idx) {
            order.qty = new_qty;
        }
        slab.header.increment_seqno();
        return Ok(order_id);
    }

    remove_order(slab, instrument_idx, order_idx)?;
    slab.orders.free(order_idx);

    process_place_order(
        slab,
        owner,
        instrument_idx,
        side,
        new_price,
        new_qty,
        tif,
        maker_class,
        now_ms,
    )
}
