//! Escrow: pledged balance per (router, slab, user, mint)
//!
//! Debits are replay-protected: every capability carries the escrow nonce
//! observed when it was minted, and a debit only succeeds while the nonce
//! still matches. A successful debit advances the nonce.

use percolator_common::PercolatorError;
use pinocchio::pubkey::Pubkey;

/// Escrow account, PDA ["escrow", router_id, slab, user, mint]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Escrow {
    /// Router program ID
    pub router_id: Pubkey,
    /// Slab the pledge is scoped to
    pub slab: Pubkey,
    /// User who pledged
    pub user: Pubkey,
    /// Collateral mint
    pub mint: Pubkey,
    /// Pledged balance
    pub balance: u128,
    /// Monotonic anti-replay nonce
    pub nonce: u64,
    /// Frozen flag (emergency)
    pub frozen: bool,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 6],
}

impl Escrow {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize in place
    pub fn init(&mut self, router_id: Pubkey, slab: Pubkey, user: Pubkey, mint: Pubkey, bump: u8) {
        self.router_id = router_id;
        self.slab = slab;
        self.user = user;
        self.mint = mint;
        self.balance = 0;
        self.nonce = 0;
        self.frozen = false;
        self.bump = bump;
        self._padding = [0; 6];
    }

    pub fn is_initialized(&self) -> bool {
        self.router_id != Pubkey::default()
    }

    /// Credit the escrow (pledge in)
    pub fn credit(&mut self, amount: u128) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Debit with nonce check; advances the nonce on success
    pub fn debit(&mut self, amount: u128, expected_nonce: u64) -> Result<(), PercolatorError> {
        if self.frozen {
            return Err(PercolatorError::Halted);
        }
        if expected_nonce != self.nonce {
            return Err(PercolatorError::BadCapability);
        }
        if self.balance < amount {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.balance = self.balance.saturating_sub(amount);
        self.nonce = self.nonce.wrapping_add(1);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }
}
