//! PlaceOrder instruction - rest a limit order in the book

use crate::matching::book::{insert_order, maybe_roll_epoch, would_cross};
use crate::matching::risk::check_margin_pre_trade;
use crate::state::SlabState;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process place_order
///
/// Regular-class orders that would trade in the current batch are parked
/// Pending until the next epoch opens; DLP orders post Live immediately.
pub fn process_place_order(
    slab: &mut SlabState,
    owner: &Pubkey,
    instrument_idx: u16,
    side: Side,
    price: u64,
    qty: u64,
    tif: TimeInForce,
    maker_class: MakerClass,
    now_ms: u64,
) -> Result<u64, PercolatorError> {
    slab.fail_if_frozen()?;
    if now_ms == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    slab.header.update_timestamp(now_ms);

    maybe_roll_epoch(slab, instrument_idx, now_ms)?;

    let (tick, lot, min_order, halted, epoch) = {
        let instrument = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        (
            instrument.tick,
            instrument.lot,
            instrument.min_order,
            instrument.halted,
            instrument.epoch,
        )
    };

    if halted {
        return Err(PercolatorError::Halted);
    }
    if price == 0 || qty == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if !is_tick_aligned(price, tick) || !is_lot_aligned(qty, lot) {
        return Err(PercolatorError::InvalidArgument);
    }
    if qty < min_order {
        return Err(PercolatorError::InvalidArgument);
    }

    let account_idx = slab.find_or_create_account(owner)?;
    if slab.get_account(account_idx).map(|a| a.frozen).unwrap_or(true) {
        return Err(PercolatorError::Unauthorized);
    }

    let signed_qty = match side {
        Side::Buy => qty as i64,
        Side::Sell => -(qty as i64),
    };
    if !check_margin_pre_trade(slab, account_idx, instrument_idx, signed_qty)? {
        return Err(PercolatorError::InsufficientCollateral);
    }

    // JIT penalty: a Regular order eligible to trade right now waits out
    // the rest of this batch
    let crossing = would_cross(slab, instrument_idx, side, price);
    let (state, eligible_epoch) = match maker_class {
        MakerClass::Regular if crossing => (OrderState::Pending, epoch.wrapping_add(1)),
        _ => (OrderState::Live, epoch),
    };

    let handle = slab.orders.alloc().ok_or(PercolatorError::ArenaFull)?;
    let order_id = slab.header.next_order_id();

    if let Some(order) = slab.orders.get_mut(handle.idx) {
        order.order_id = order_id;
        order.account_idx = account_idx;
        order.instrument_idx = instrument_idx;
        order.side = side;
        order.tif = tif;
        order.maker_class = maker_class;
        order.state = state;
        order.eligible_epoch = eligible_epoch;
        order.created_ms = now_ms;
        order.price = price;
        order.qty = qty;
        order.reserved_qty = 0;
        order.qty_orig = qty;
        order.next = NIL;
        order.prev = NIL;
    }

    insert_order(slab, instrument_idx, handle.idx, side, price, state)?;

    Ok(order_id)
}

/// Find a live or pending order slot by its id
pub fn find_order_by_id(slab: &SlabState, order_id: u64) -> Option<u32> {
    for i in 0..slab.orders.capacity() {
        if let Some(order) = slab.orders.get(i) {
            if order.order_id == order_id {
                return Some(i);
            }
        }
    }
    None
}
