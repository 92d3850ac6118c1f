//! InitializePortfolio: create a user's cross-slab portfolio

use crate::state::Portfolio;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process initialize_portfolio
pub fn process_initialize_portfolio(
    portfolio: &mut Portfolio,
    router_id: Pubkey,
    user: Pubkey,
    bump: u8,
) -> Result<(), PercolatorError> {
    if portfolio.is_initialized() {
        return Err(PercolatorError::InvalidArgument);
    }

    portfolio.init(router_id, user, bump);
    Ok(())
}
