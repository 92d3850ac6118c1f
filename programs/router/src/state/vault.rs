//! Vault: custody of collateral per (router, mint)
//!
//! The vault only tracks balances; the host chain moves the tokens. The
//! insurance pool for the deployment lives here as well, funded by ARG
//! taxes swept from slabs and by explicit top-ups.

use percolator_common::PercolatorError;
use pinocchio::pubkey::Pubkey;

/// Vault account, PDA ["vault", router_id, mint]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Vault {
    /// Router program ID
    pub router_id: Pubkey,
    /// Collateral mint
    pub mint: Pubkey,
    /// Token account holding the funds
    pub token_account: Pubkey,
    /// Total balance
    pub balance: u128,
    /// Amount pledged out to escrows
    pub total_pledged: u128,
    /// Insurance pool balance
    pub insurance: u128,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 7],
}

impl Vault {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize in place
    pub fn init(&mut self, router_id: Pubkey, mint: Pubkey, token_account: Pubkey, bump: u8) {
        self.router_id = router_id;
        self.mint = mint;
        self.token_account = token_account;
        self.balance = 0;
        self.total_pledged = 0;
        self.insurance = 0;
        self.bump = bump;
        self._padding = [0; 7];
    }

    pub fn is_initialized(&self) -> bool {
        self.router_id != Pubkey::default()
    }

    /// Balance not pledged to any escrow
    pub fn available(&self) -> u128 {
        self.balance.saturating_sub(self.total_pledged)
    }

    /// Pledge collateral toward an escrow
    pub fn pledge(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.available() < amount {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.total_pledged = self.total_pledged.saturating_add(amount);
        Ok(())
    }

    /// Return pledged collateral
    pub fn unpledge(&mut self, amount: u128) {
        self.total_pledged = self.total_pledged.saturating_sub(amount);
    }

    pub fn deposit(&mut self, amount: u128) {
        self.balance = self.balance.saturating_add(amount);
    }

    pub fn withdraw(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.available() < amount {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.balance = self.balance.saturating_sub(amount);
        Ok(())
    }
}
