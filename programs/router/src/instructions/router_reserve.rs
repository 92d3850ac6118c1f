//! RouterReserve: lock collateral and mint a capability
//!
//! The split (two-transaction) flow: free collateral locks, the vault
//! pledges into the user's per-slab escrow, and a scoped single-use Cap is
//! written to its account for the later CommitFill.

use crate::state::{Cap, Escrow, Portfolio, Vault};
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process router_reserve
#[allow(clippy::too_many_arguments)]
pub fn process_router_reserve(
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    escrow: &mut Escrow,
    cap: &mut Cap,
    user: &Pubkey,
    slab: &Pubkey,
    amount_max: u128,
    route_id: u64,
    ttl_ms: u64,
    now_ms: u64,
    cap_bump: u8,
) -> Result<(), PercolatorError> {
    if amount_max == 0 || ttl_ms == 0 {
        return Err(PercolatorError::InvalidArgument);
    }
    if &portfolio.user != user {
        return Err(PercolatorError::Unauthorized);
    }
    if cap.burned || cap.amount_max != 0 {
        // A cap account is single-use; a spent or live cap cannot be reminted
        return Err(PercolatorError::BadCapability);
    }
    if escrow.frozen {
        return Err(PercolatorError::Halted);
    }

    portfolio.lock_collateral(amount_max)?;

    if let Err(e) = vault.pledge(amount_max) {
        portfolio.unlock_collateral(amount_max);
        return Err(e);
    }
    escrow.credit(amount_max);

    *cap = Cap::new(
        portfolio.router_id,
        route_id,
        *user,
        *slab,
        vault.mint,
        amount_max,
        escrow.nonce,
        now_ms,
        ttl_ms,
        cap_bump,
    );

    Ok(())
}
