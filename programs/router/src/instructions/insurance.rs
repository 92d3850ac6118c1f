//! Insurance pool top-up and governed withdrawal

use crate::state::{Portfolio, SlabRegistry, Vault};
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process top_up_insurance: moves free collateral into the pool
pub fn process_top_up_insurance(
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    user: &Pubkey,
    amount: u128,
) -> Result<(), PercolatorError> {
    if amount == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if &portfolio.user != user {
        return Err(PercolatorError::Unauthorized);
    }

    portfolio.withdraw(amount)?;
    vault.insurance = vault.insurance.saturating_add(amount);

    Ok(())
}

/// Process withdraw_insurance: governance-gated drain from the pool
pub fn process_withdraw_insurance(
    registry: &SlabRegistry,
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    governance: &Pubkey,
    amount: u128,
) -> Result<(), PercolatorError> {
    if amount == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if &registry.governance != governance {
        return Err(PercolatorError::Unauthorized);
    }
    if vault.insurance < amount {
        return Err(PercolatorError::InsufficientCollateral);
    }

    vault.insurance -= amount;
    portfolio.deposit(amount);

    Ok(())
}
