//! Deposit: move collateral into the vault and credit the portfolio

use crate::state::{Portfolio, Vault};
use percolator_common::*;

/// Process deposit
pub fn process_deposit(
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    amount: u128,
) -> Result<(), PercolatorError> {
    if amount == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    vault.deposit(amount);
    portfolio.deposit(amount);

    Ok(())
}
