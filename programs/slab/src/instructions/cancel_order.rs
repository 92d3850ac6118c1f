//! CancelOrder instruction - remove a resting order

use crate::instructions::place_order::find_order_by_id;
use crate::matching::book::remove_order;
use crate::state::SlabState;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process cancel_order
///
/// Fails while a reservation holds part of the order; the hold must commit
/// or cancel first.
pub fn process_cancel_order(
    slab: &mut SlabState,
    owner: &Pubkey,
    order_id: u64,
) -> Result<(), PercolatorError> {
    slab.fail_if_frozen()?;

    let order_idx = find_order_by_id(slab, order_id).ok_or(PercolatorError::InvalidArgument)?;

    let (account_idx, instrument_idx, reserved_qty) = {
        let order = slab.orders.get(order_idx).unwrap();
        (order.account_idx, order.instrument_idx, order.reserved_qty)
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

    remove_order(slab, instrument_idx, order_idx)?;
    slab.orders.free(order_idx);

    Ok(())
}
