//! Capability tokens: scoped, time-bounded, single-use debit authorizations

use percolator_common::{PercolatorError, CAP_TTL_MAX_MS};
use pinocchio::pubkey::Pubkey;

/// Capability token, PDA ["cap", router_id, route_id]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Cap {
    /// Router program ID
    pub router_id: Pubkey,
    /// Route this cap belongs to
    pub route_id: u64,
    /// User whose collateral may be debited
    pub scope_user: Pubkey,
    /// Slab allowed to spend
    pub scope_slab: Pubkey,
    /// Settlement mint
    pub scope_mint: Pubkey,
    /// Authorized ceiling
    pub amount_max: u128,
    /// Remaining spendable amount
    pub remaining: u128,
    /// Expiry timestamp (ms)
    pub expiry_ts: u64,
    /// Escrow nonce captured at mint time
    pub nonce: u64,
    /// Burned flag; absorbing
    pub burned: bool,
    /// Bump seed
    pub bump: u8,
    /// Padding
    pub _padding: [u8; 6],
}

impl Cap {
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Mint a new cap; TTL is clamped to the deployment maximum
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        router_id: Pubkey,
        route_id: u64,
        scope_user: Pubkey,
        scope_slab: Pubkey,
        scope_mint: Pubkey,
        amount_max: u128,
        escrow_nonce: u64,
        current_ts: u64,
        ttl_ms: u64,
        bump: u8,
    ) -> Self {
        let capped_ttl = core::cmp::min(ttl_ms, CAP_TTL_MAX_MS);
        Self {
            router_id,
            route_id,
            scope_user,
            scope_slab,
            scope_mint,
            amount_max,
            remaining: amount_max,
            expiry_ts: current_ts.saturating_add(capped_ttl),
            nonce: escrow_nonce,
            burned: false,
            bump,
            _padding: [0; 6],
        }
    }

    pub fn is_expired(&self, current_ts: u64) -> bool {
        current_ts >= self.expiry_ts
    }

    pub fn is_spendable(&self, current_ts: u64) -> bool {
        !self.burned && !self.is_expired(current_ts)
    }

    /// Validate the (user, slab, mint) scope
    pub fn validate_scope(&self, user: &Pubkey, slab: &Pubkey, mint: &Pubkey) -> bool {
        &self.scope_user == user && &self.scope_slab == slab && &self.scope_mint == mint
    }

    /// Debit the cap. Burns it when exhausted.
    pub fn debit(
        &mut self,
        amount: u128,
        user: &Pubkey,
        slab: &Pubkey,
        mint: &Pubkey,
        current_ts: u64,
    ) -> Result<(), PercolatorError> {
        if self.burned {
            return Err(PercolatorError::BadCapability);
        }
        if self.is_expired(current_ts) {
            return Err(PercolatorError::Expired);
        }
        if !self.validate_scope(user, slab, mint) {
            return Err(PercolatorError::BadCapability);
        }
        if self.remaining < amount {
            return Err(PercolatorError::CapExhausted);
        }

        self.remaining -= amount;
        if self.remaining == 0 {
            self.burned = true;
        }
        Ok(())
    }

    /// Burn and surrender whatever is left
    pub fn burn(&mut self) -> u128 {
        let unused = self.remaining;
        self.remaining = 0;
        self.burned = true;
        unused
    }
}
