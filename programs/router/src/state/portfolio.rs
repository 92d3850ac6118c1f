//! Portfolio: per-user cross-slab margin aggregate

use percolator_common::{PercolatorError, MAX_INSTRUMENTS, MAX_SLABS};
use pinocchio::pubkey::Pubkey;

/// One exposure row: (slab index, instrument index, net qty)
pub type Exposure = (u16, u16, i64);

/// User portfolio, PDA ["portfolio", router_id, user]
#[repr(C)]
pub struct Portfolio {
    /// Router program ID
    pub router_id: Pubkey,
    /// User pubkey
    pub user: Pubkey,
    /// Deposited cash (1e6 scale)
    pub cash: i128,
    /// Equity = cash + unrealized + realized PnL across slabs
    pub equity: i128,
    /// Initial margin requirement
    pub im: u128,
    /// Maintenance margin requirement
    pub mm: u128,
    /// Collateral locked by open routes and LP seats
    pub locked: u128,
    /// equity - im - locked
    pub free_collateral: i128,
    /// Last mark-to-market timestamp
    pub last_mark_ts: u64,
    /// Number of live exposures
    pub exposure_count: u16,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 5],
    /// Exposure table
    pub exposures: [Exposure; MAX_SLABS * MAX_INSTRUMENTS],
}

impl Portfolio {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Initialize in place
    pub fn init(&mut self, router_id: Pubkey, user: Pubkey, bump: u8) {
        self.router_id = router_id;
        self.user = user;
        self.cash = 0;
        self.equity = 0;
        self.im = 0;
        self.mm = 0;
        self.locked = 0;
        self.free_collateral = 0;
        self.last_mark_ts = 0;
        self.exposure_count = 0;
        self.bump = bump;
        self._padding = [0; 5];
    }

    pub fn is_initialized(&self) -> bool {
        self.router_id != Pubkey::default()
    }

    fn recompute_free(&mut self) {
        self.free_collateral = self
            .equity
            .saturating_sub(self.im as i128)
            .saturating_sub(self.locked as i128);
    }

    /// Deposit cash
    pub fn deposit(&mut self, amount: u128) {
        self.cash = self.cash.saturating_add(amount as i128);
        self.equity = self.equity.saturating_add(amount as i128);
        self.recompute_free();
    }

    /// Withdraw cash; limited by free collateral
    pub fn withdraw(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.free_collateral < amount as i128 {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.cash = self.cash.saturating_sub(amount as i128);
        self.equity = self.equity.saturating_sub(amount as i128);
        self.recompute_free();
        Ok(())
    }

    /// Lock free collateral behind a route or seat
    pub fn lock_collateral(&mut self, amount: u128) -> Result<(), PercolatorError> {
        if self.free_collateral < amount as i128 {
            return Err(PercolatorError::InsufficientCollateral);
        }
        self.locked = self.locked.saturating_add(amount);
        self.recompute_free();
        Ok(())
    }

    /// Release previously locked collateral
    pub fn unlock_collateral(&mut self, amount: u128) {
        self.locked = self.locked.saturating_sub(amount);
        self.recompute_free();
    }

    /// Settle a realized spend: locked collateral leaves the portfolio
    pub fn settle_spend(&mut self, locked_amount: u128, spent: u128) {
        self.locked = self.locked.saturating_sub(locked_amount);
        self.cash = self.cash.saturating_sub(spent as i128);
        self.equity = self.equity.saturating_sub(spent as i128);
        self.recompute_free();
    }

    /// Upsert the exposure row for (slab, instrument); zero removes it
    pub fn set_exposure(&mut self, slab_idx: u16, instrument_idx: u16, qty: i64) {
        for i in 0..self.exposure_count as usize {
            if self.exposures[i].0 == slab_idx && self.exposures[i].1 == instrument_idx {
                if qty == 0 {
                    let last = (self.exposure_count - 1) as usize;
                    self.exposures[i] = self.exposures[last];
                    self.exposures[last] = (0, 0, 0);
                    self.exposure_count -= 1;
                } else {
                    self.exposures[i].2 = qty;
                }
                return;
            }
        }

        if qty != 0 && (self.exposure_count as usize) < self.exposures.len() {
            self.exposures[self.exposure_count as usize] = (slab_idx, instrument_idx, qty);
            self.exposure_count += 1;
        }
    }

    /// Add a fill's signed quantity into the exposure row
    pub fn apply_fill(&mut self, slab_idx: u16, instrument_idx: u16, qty_delta: i64) {
        let current = self.get_exposure(slab_idx, instrument_idx);
        self.set_exposure(slab_idx, instrument_idx, current + qty_delta);
    }

    pub fn get_exposure(&self, slab_idx: u16, instrument_idx: u16) -> i64 {
        for i in 0..self.exposure_count as usize {
            if self.exposures[i].0 == slab_idx && self.exposures[i].1 == instrument_idx {
                return self.exposures[i].2;
            }
        }
        0
    }

    /// Refresh the margin requirements and free collateral
    pub fn update_margin(&mut self, im: u128, mm: u128, now_ms: u64) {
        self.im = im;
        self.mm = mm;
        self.last_mark_ts = now_ms;
        self.recompute_free();
    }

    pub fn has_sufficient_margin(&self) -> bool {
        self.equity >= self.im as i128
    }

    pub fn is_above_maintenance(&self) -> bool {
        self.equity >= self.mm as i128
    }
}
