//! RouterSeatInit: create an LP seat for (portfolio, slab)

use crate::state::LpSeat;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process router_seat_init
pub fn process_router_seat_init(
    seat: &mut LpSeat,
    router_id: Pubkey,
    portfolio: Pubkey,
    slab: Pubkey,
    bump: u8,
) -> Result<(), PercolatorError> {
    if seat.is_initialized() {
        return Err(PercolatorError::InvalidArgument);
    }

    seat.init(router_id, portfolio, slab, bump);
    Ok(())
}
