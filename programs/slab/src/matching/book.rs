//! Order book management with price-time priority
//!
//! Per instrument, each side is one intrusive doubly-linked list sorted by
//! (price, order id). Pending orders live on separate lists invisible to
//! reservation walks until their epoch begins.

use crate::state::SlabState;
use percolator_common::*;

/// Insert order into the book maintaining price-time priority
pub fn insert_order(
    slab: &mut SlabState,
    instrument_idx: u16,
    order_idx: u32,
    side: Side,
    price: u64,
    state: OrderState,
) -> Result<(), PercolatorError> {
    let head_ptr = {
        let instrument = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?;

        match (side, state) {
            (Side::Buy, OrderState::Live) => instrument.bids_head,
            (Side::Buy, OrderState::Pending) => instrument.bids_pending_head,
            (Side::Sell, OrderState::Live) => instrument.asks_head,
            (Side::Sell, OrderState::Pending) => instrument.asks_pending_head,
        }
    };

    if head_ptr == NIL {
        if let Some(order) = slab.orders.get_mut(order_idx) {
            order.next = NIL;
            order.prev = NIL;
        }

        set_head(slab, instrument_idx, side, state, order_idx);
        slab.header.increment_seqno();
        return Ok(());
    }

    let new_order_id = slab
        .orders
        .get(order_idx)
        .ok_or(PercolatorError::InvalidArgument)?
        .order_id;

    // Find the insertion point.
    // Buy: higher price first; Sell: lower price first; ties by arrival.
    let mut curr_idx = head_ptr;
    let mut prev_idx = NIL;

    while curr_idx != NIL {
        let curr_order = slab
            .orders
            .get(curr_idx)
            .ok_or(PercolatorError::InvariantViolation)?;

        let insert_before = match side {
            Side::Buy => {
                price > curr_order.price
                    || (price == curr_order.price && new_order_id < curr_order.order_id)
            }
            Side::Sell => {
                price < curr_order.price
                    || (price == curr_order.price && new_order_id < curr_order.order_id)
            }
        };

        if insert_before {
            break;
        }

        prev_idx = curr_idx;
        curr_idx = curr_order.next;
    }

    if let Some(order) = slab.orders.get_mut(order_idx) {
        order.next = curr_idx;
        order.prev = prev_idx;
    }

    if prev_idx == NIL {
        set_head(slab, instrument_idx, side, state, order_idx);
    } else if let Some(prev_order) = slab.orders.get_mut(prev_idx) {
        prev_order.next = order_idx;
    }

    if curr_idx != NIL {
        if let Some(curr_order) = slab.orders.get_mut(curr_idx) {
            curr_order.prev = order_idx;
        }
    }

    slab.header.increment_seqno();
    Ok(())
}

fn set_head(slab: &mut SlabState, instrument_idx: u16, side: Side, state: OrderState, idx: u32) {
    if let Some(instrument) = slab.get_instrument_mut(instrument_idx) {
        match (side, state) {
            (Side::Buy, OrderState::Live) => instrument.bids_head = idx,
            (Side::Buy, OrderState::Pending) => instrument.bids_pending_head = idx,
            (Side::Sell, OrderState::Live) => instrument.asks_head = idx,
            (Side::Sell, OrderState::Pending) => instrument.asks_pending_head = idx,
        }
    }
}

/// Unlink an order from its book list
pub fn remove_order(
    slab: &mut SlabState,
    instrument_idx: u16,
    order_idx: u32,
) -> Result<(), PercolatorError> {
    let (side, state, prev, next) = {
        let order = slab
            .orders
            .get(order_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        (order.side, order.state, order.prev, order.next)
    };

    if prev == NIL {
        set_head(slab, instrument_idx, side, state, next);
    } else if let Some(prev_order) = slab.orders.get_mut(prev) {
        prev_order.next = next;
    }

    if next != NIL {
        if let Some(next_order) = slab.orders.get_mut(next) {
            next_order.prev = prev;
        }
    }

    slab.header.increment_seqno();
    Ok(())
}

/// Best live price on a side, if any
pub fn best_price(slab: &SlabState, instrument_idx: u16, side: Side) -> Option<u64> {
    let instrument = slab.get_instrument(instrument_idx)?;
    let head = match side {
        Side::Buy => instrument.bids_head,
        Side::Sell => instrument.asks_head,
    };
    if head == NIL {
        return None;
    }
    slab.orders.get(head).map(|o| o.price)
}

/// Would a new order at `price` cross the live contra best?
pub fn would_cross(slab: &SlabState, instrument_idx: u16, side: Side, price: u64) -> bool {
    match best_price(slab, instrument_idx, side.contra()) {
        Some(contra_best) => match side {
            Side::Buy => price >= contra_best,
            Side::Sell => price <= contra_best,
        },
        None => false,
    }
}

/// Advance the batch epoch when the window has elapsed; promotes pending
/// orders that became eligible. Called lazily from every trading entry point.
pub fn maybe_roll_epoch(
    slab: &mut SlabState,
    instrument_idx: u16,
    now_ms: u64,
) -> Result<(), PercolatorError> {
    let (batch_ms, batch_open_ms) = {
        let instrument = slab
            .get_instrument(instrument_idx)
            .ok_or(PercolatorError::InvalidArgument)?;
        (slab.header.params.batch_ms, instrument.batch_open_ms)
    };

    if batch_ms == 0 || now_ms < batch_open_ms.saturating_add(batch_ms) {
        return Ok(());
    }

    let new_epoch = {
        let instrument = slab.get_instrument_mut(instrument_idx).unwrap();
        instrument.batch_open_ms = now_ms;
        instrument.epoch = instrument.epoch.wrapping_add(1);
        instrument.epoch
    };

    promote_pending(slab, instrument_idx, new_epoch)
}

/// Move epoch-eligible pending orders into the live book
pub fn promote_pending(
    slab: &mut SlabState,
    instrument_idx: u16,
    epoch: u16,
) -> Result<(), PercolatorError> {
    promote_side(slab, instrument_idx, Side::Buy, epoch)?;
    promote_side(slab, instrument_idx, Side::Sell, epoch)?;
    Ok(())
}

/// Promote one side, one order at a time to stay allocation-free
fn promote_side(
    slab: &mut SlabState,
    instrument_idx: u16,
    side: Side,
    epoch: u16,
) -> Result<(), PercolatorError> {
    loop {
        let pending_head = {
            let instrument = slab
                .get_instrument(instrument_idx)
                .ok_or(PercolatorError::InvalidArgument)?;
            match side {
                Side::Buy => instrument.bids_pending_head,
                Side::Sell => instrument.asks_pending_head,
            }
        };

        let mut curr_idx = pending_head;
        let mut found = None;

        while curr_idx != NIL {
            if let Some(order) = slab.orders.get(curr_idx) {
                if order.eligible_epoch <= epoch {
                    found = Some((curr_idx, order.price));
                    break;
                }
                curr_idx = order.next;
            } else {
                break;
            }
        }

        let Some((order_idx, price)) = found else {
            break;
        };

        remove_order(slab, instrument_idx, order_idx)?;

        if let Some(order) = slab.orders.get_mut(order_idx) {
            order.state = OrderState::Live;
        }

        insert_order(slab, instrument_idx, order_idx, side, price, OrderState::Live)?;
    }

    Ok(())
}

/// Best bid and ask for an instrument
pub fn get_best_prices(
    slab: &SlabState,
    instrument_idx: u16,
) -> Result<(Option<u64>, Option<u64>), PercolatorError> {
    if slab.get_instrument(instrument_idx).is_none() {
        return Err(PercolatorError::InvalidArgument);
    }
    Ok((
        best_price(slab, instrument_idx, Side::Buy),
        best_price(slab, instrument_idx, Side::Sell),
    ))
}
