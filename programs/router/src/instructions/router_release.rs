//! RouterRelease: return a capability's unused ceiling to free collateral
//!
//! Called after cancel or expiry. The cap burns; the escrowed amount flows
//! back through the vault pledge into the portfolio.

use crate::state::{Cap, Escrow, Portfolio, Vault};
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process router_release
pub fn process_router_release(
    portfolio: &mut Portfolio,
    vault: &mut Vault,
    escrow: &mut Escrow,
    cap: &mut Cap,
    user: &Pubkey,
    now_ms: u64,
) -> Result<(), PercolatorError> {
    if &portfolio.user != user {
        return Err(PercolatorError::Unauthorized);
    }
    if cap.burned {
        // Releasing a dead cap is a no-op
        return Ok(());
    }
    if &cap.scope_user != user || cap.scope_mint != vault.mint {
        return Err(PercolatorError::BadCapability);
    }
    // A live, unexpired cap can still be spent by a commit in flight;
    // only released capital comes back early via expiry or explicit cancel
    if !cap.is_expired(now_ms) && cap.remaining != cap.amount_max {
        return Err(PercolatorError::BadCapability);
    }

    let unused = cap.burn();
    if unused > 0 {
        escrow.debit(unused, escrow.nonce)?;
        vault.unpledge(unused);
        portfolio.unlock_collateral(unused);
    }

    Ok(())
}
