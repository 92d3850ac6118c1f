//! InitializeVault: create the custody vault for a mint

use crate::state::Vault;
use percolator_common::*;
use pinocchio::pubkey::Pubkey;

/// Process initialize_vault
pub fn process_initialize_vault(
    vault: &mut Vault,
    router_id: Pubkey,
    mint: Pubkey,
    token_account: Pubkey,
    bump: u8,
) -> Result<(), PercolatorError> {
    if vault.is_initialized() {
        return Err(PercolatorError::InvalidArgument);
    }

    vault.init(router_id, mint, token_account, bump);
    Ok(())
}
