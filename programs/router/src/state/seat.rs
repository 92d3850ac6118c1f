//! LP seat: maker collateral a portfolio has committed to one slab

use percolator_common::PercolatorError;
use pinocchio::pubkey::Pubkey;

/// LP seat account, PDA ["seat", router_id, portfolio, slab]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LpSeat {
    /// Router program ID
    pub router_id: Pubkey,
    /// Owning portfolio account
    pub portfolio: Pubkey,
    /// Slab the seat provides on
    pub slab: Pubkey,
    /// Collateral reserved for making (1e6 scale)
    pub reserved: u128,
    /// Frozen flag
    pub frozen: bool,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 6],
}

impl LpSeat {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize in place
    pub fn init(&mut self, router_id: Pubkey, portfolio: Pubkey, slab: Pubkey, bump: u8) {
        self.router_id = router_id;
        self.portfolio = portfolio;
        self.slab = slab;
        self.reserved = 0;
        self.frozen = false;
        self.bump = bump;
        self._padding = [0; 6];
    }

    pub fn is_initialized(&self) -> bool {
        self.router_id != Pubkey::default()
    }

    /// Add reserved maker collateral
    pub fn reserve(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.frozen {
            return Err(PercolatorError::Halted);
        }
        self.reserved = self.reserved.saturating_add(amount);
        Ok(())
    }

    /// Release reserved maker collateral
    pub fn release(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.reserved < amount {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.reserved -= amount;
        Ok(())
    }
}
