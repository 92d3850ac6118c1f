//! Program derived address helpers for the router program

use pinocchio::pubkey::{find_program_address, Pubkey};

/// Authority PDA the slabs trust as the router signer
pub const AUTHORITY_SEED: &[u8] = b"authority";

/// Registry PDA seed
pub const REGISTRY_SEED: &[u8] = b"registry";

/// Portfolio PDA seed
pub const PORTFOLIO_SEED: &[u8] = b"portfolio";

/// Vault PDA seed
pub const VAULT_SEED: &[u8] = b"vault";

/// Escrow PDA seed
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Capability PDA seed
pub const CAP_SEED: &[u8] = b"cap";

/// LP seat PDA seed
pub const SEAT_SEED: &[u8] = b"seat";

pub fn derive_authority_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[AUTHORITY_SEED], program_id)
}

pub fn derive_registry_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[REGISTRY_SEED], program_id)
}

pub fn derive_portfolio_pda(user: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[PORTFOLIO_SEED, user.as_ref()], program_id)
}

pub fn derive_vault_pda(mint: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[VAULT_SEED, mint.as_ref()], program_id)
}

pub fn derive_escrow_pda(
    slab: &Pubkey,
    user: &Pubkey,
    mint: &Pubkey,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    find_program_address(
        &[ESCROW_SEED, slab.as_ref(), user.as_ref(), mint.as_ref()],
        program_id,
    )
}

pub fn derive_cap_pda(route_id: u64, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[CAP_SEED, &route_id.to_le_bytes()], program_id)
}

pub fn derive_seat_pda(portfolio: &Pubkey, slab: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_program_address(&[SEAT_SEED, portfolio.as_ref(), slab.as_ref()], program_id)
}
