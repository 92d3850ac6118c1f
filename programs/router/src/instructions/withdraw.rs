//! Withdraw: release free collateral from the portfolio and vault

use crate::state::{Portfolio, Vault};
use percolator_common::*;

/// Process withdraw
///
/// Limited by the portfolio's free collateral and the vault's unpledged
/// balance; locked routes and margin stay untouchable.
pub fn process_withdraw(
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    amount: u128,
) -> Result<(), PercolatorError> {
    if amount == 0 {
        return Err(PercolatorError::InvalidArgument);
    }

    portfolio.withdraw(amount)?;
    if let Err(e) = vault.withdraw(amount) {
        // Roll the portfolio back so the failure publishes nothing
        portfolio.deposit(amount);
        return Err(e);
    }

    Ok(())
}
