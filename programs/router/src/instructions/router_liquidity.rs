//! RouterLiquidity: move maker collateral between a portfolio and a seat

use crate::state::{LpSeat, Portfolio};
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Direction of the seat transfer
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatTransfer {
    Reserve = 0,
    Release = 1,
}

/// Process router_liquidity
pub fn process_router_liquidity(
    portfolio: &mut Portfolio,
    seat: &mut LpSeat,
    portfolio_key: &Pubkey,
    user: &Pubkey,
    direction: SeatTransfer,
    amount: u128,
) -> Result<(), PercolatorError> {
    if amount == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if &portfolio.user != user {
        return Err(PercolatorError::Unauthorized);
    }
    if &seat.portfolio != portfolio_key {
        return Err(PercolatorError::Unauthorized);
    }

    match direction {
        SeatTransfer::Reserve => {
            portfolio.lock_collateral(amount)?;
            if let Err(e) = seat.reserve(amount) {
                portfolio.unlock_collateral(amount);
                return Err(e);
            }
        }
        SeatTransfer::Release => {
            seat.release(amount)?;
            portfolio.unlock_collateral(amount);
        }
    }

    Ok(())
}
