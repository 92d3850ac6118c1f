//! Program derived address helpers for the slab program

use pinocchio::pubkey::{find_program_address, Pubkey};

/// Seed prefix for slab state accounts
pub const SLAB_SEED: &[u8] = b"slab";

/// Seed prefix for fill receipt accounts
pub const RECEIPT_SEED: &[u8] = b"receipt";

/// Derive the slab state PDA for a market
pub fn derive_slab_pda(market_id: &[u8], program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[SLAB_SEED, market_id], program_id)
}

/// Derive the fill receipt PDA for a route
pub fn derive_receipt_pda(slab: &Pubkey, route_id: u64, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[RECEIPT_SEED, slab.as_ref(), &route_id.to_le_bytes()], program_id)
}
