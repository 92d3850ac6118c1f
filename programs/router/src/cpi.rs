//! Cross-program invocation into slab programs
//!
//! Wire payload builders and return-data decoders for the slab's
//! two-phase liquidity interface. All payloads are packed little-endian
//! with the discriminator at byte 0.

use percolator_common::*;
use pinocchio::{
    account_info::AccountInfo,
    cpi::{get_return_data, invoke_signed},
    instruction::{AccountMeta, Instruction, Seed, Signer},
    pubkey::Pubkey,
};
use pinocchio_log::log;

/// Slab wire discriminators the router drives
pub mod slab_ix {
    pub const COMMIT_FILL: u8 = 1;
    pub const ADAPTER_LIQUIDITY: u8 = 2;
}

/// Reserve instruction size: discriminator + 71-byte payload + tif byte
pub const RESERVE_IX_LEN: usize = 73;
/// Canonical reserve size without the trailing tif byte
pub const RESERVE_IX_LEN_GTC: usize = 72;
/// Commit instruction size
pub const COMMIT_IX_LEN: usize = 17;
/// Cancel-hold instruction size
pub const CANCEL_IX_LEN: usize = 9;
/// Liquidate instruction size
pub const LIQUIDATE_IX_LEN: usize = 23;

use crate::pda::AUTHORITY_SEED;

/// Decoded reserve return data
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveResponse {
    pub hold_id: u64,
    pub vwap_px: u64,
    pub worst_px: u64,
    pub filled_qty: u64,
    pub max_charge: u128,
    pub expiry_ms: u64,
    pub seqno: u64,
}

impl ReserveResponse {
    pub fn from_return_data(data: &[u8]) -> Result<Self, PercolatorError> {
        let mut reader = InstructionReader::new(data);
        Ok(Self {
            hold_id: reader.read_u64()?,
            vwap_px: reader.read_u64()?,
            worst_px: reader.read_u64()?,
            filled_qty: reader.read_u64()?,
            max_charge: reader.read_u128()?,
            expiry_ms: reader.read_u64()?,
            seqno: reader.read_u64()?,
        })
    }
}

/// Decoded commit return data
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitResponse {
    pub filled_qty: u64,
    pub vwap_px: u64,
    pub notional: u128,
    pub total_fee: u128,
    pub total_debit: u128,
}

impl CommitResponse {
    pub fn from_return_data(data: &[u8]) -> Result<Self, PercolatorError> {
        let mut reader = InstructionReader::new(data);
        Ok(Self {
            filled_qty: reader.read_u64()?,
            vwap_px: reader.read_u64()?,
            notional: reader.read_u128()?,
            total_fee: reader.read_u128()?,
            total_debit: reader.read_u128()?,
        })
    }
}

/// Decoded liquidation return data
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidationResponse {
    pub closed_qty: u64,
    pub liq_px: u64,
    pub realized_pnl: i128,
    pub penalty: u128,
    pub remaining_deficit: u128,
}

impl LiquidationResponse {
    pub fn from_return_data(data: &[u8]) -> Result<Self, PercolatorError> {
        let mut reader = InstructionReader::new(data);
        Ok(Self {
            closed_qty: reader.read_u64()?,
            liq_px: reader.read_u64()?,
            realized_pnl: reader.read_i128()?,
            penalty: reader.read_u128()?,
            remaining_deficit: reader.read_u128()?,
        })
    }
}

/// Build the reserve instruction data (the canonical 72-byte form for GTC,
/// one trailing tif byte otherwise)
#[allow(clippy::too_many_arguments)]
pub fn serialize_reserve_data(
    account_idx: u32,
    instrument_idx: u16,
    side: Side,
    qty: u64,
    limit_px: u64,
    ttl_ms: u64,
    commitment_hash: &[u8; 32],
    route_id: u64,
    tif: TimeInForce,
) -> ([u8; RESERVE_IX_LEN], usize) {
    let mut data = [0u8; RESERVE_IX_LEN];
    data[0] = slab_ix::ADAPTER_LIQUIDITY;
    data[1..5].copy_from_slice(&account_idx.to_le_bytes());
    data[5..7].copy_from_slice(&instrument_idx.to_le_bytes());
    data[7] = side as u8;
    data[8..16].copy_from_slice(&(qty as i64).to_le_bytes());
    data[16..24].copy_from_slice(&(limit_px as i64).to_le_bytes());
    data[24..32].copy_from_slice(&ttl_ms.to_le_bytes());
    data[32..64].copy_from_slice(commitment_hash);
    data[64..72].copy_from_slice(&route_id.to_le_bytes());

    if tif == TimeInForce::GTC {
        (data, RESERVE_IX_LEN_GTC)
    } else {
        data[72] = tif as u8;
        (data, RESERVE_IX_LEN)
    }
}

/// Build the commit instruction data
pub fn serialize_commit_data(hold_id: u64, now_ts: u64) -> [u8; COMMIT_IX_LEN] {
    let mut data = [0u8; COMMIT_IX_LEN];
    data[0] = slab_ix::COMMIT_FILL;
    data[1..9].copy_from_slice(&hold_id.to_le_bytes());
    data[9..17].copy_from_slice(&now_ts.to_le_bytes());
    data
}

/// Build the cancel-hold instruction data
pub fn serialize_cancel_data(hold_id: u64) -> [u8; CANCEL_IX_LEN] {
    let mut data = [0u8; CANCEL_IX_LEN];
    data[0] = slab_ix::ADAPTER_LIQUIDITY;
    data[1..9].copy_from_slice(&hold_id.to_le_bytes());
    data
}

/// Build the liquidate instruction data
pub fn serialize_liquidate_data(
    target_account_idx: u32,
    instrument_idx: u16,
    qty_limit: u64,
    now_ts: u64,
) -> [u8; LIQUIDATE_IX_LEN] {
    let mut data = [0u8; LIQUIDATE_IX_LEN];
    data[0] = slab_ix::ADAPTER_LIQUIDITY;
    data[1..5].copy_from_slice(&target_account_idx.to_le_bytes());
    data[5..7].copy_from_slice(&instrument_idx.to_le_bytes());
    data[7..15].copy_from_slice(&(qty_limit as i64).to_le_bytes());
    data[15..23].copy_from_slice(&now_ts.to_le_bytes());
    data
}

fn invoke_slab(
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    router_authority: &AccountInfo,
    authority_bump: u8,
    data: &[u8],
) -> Result<(), PercolatorError> {
    let account_metas = [
        AccountMeta::writable(slab_state.key()),
        AccountMeta::readonly_signer(router_authority.key()),
    ];

    let instruction = Instruction {
        program_id: slab_program.key(),
        accounts: &account_metas,
        data,
    };

    let bump = [authority_bump];
    let seeds = [Seed::from(AUTHORITY_SEED), Seed::from(&bump)];
    let signer = Signer::from(&seeds[..]);

    invoke_signed(&instruction, &[slab_state, router_authority], &[signer]).map_err(|_| {
        log!("Error: slab CPI failed");
        PercolatorError::InvalidArgument
    })
}

fn take_return_data(slab_program: &Pubkey) -> Result<[u8; 64], PercolatorError> {
    let return_data = get_return_data().ok_or(PercolatorError::InvalidArgument)?;
    if return_data.program_id() != slab_program {
        log!("Error: return data from wrong program");
        return Err(PercolatorError::InvalidArgument);
    }
    let slice = return_data.as_slice();
    if slice.len() < 64 {
        return Err(PercolatorError::InvalidArgument);
    }
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&slice[..64]);
    Ok(bytes)
}

/// Reserve liquidity on a slab
#[allow(clippy::too_many_arguments)]
pub fn cpi_reserve(
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    router_authority: &AccountInfo,
    authority_bump: u8,
    account_idx: u32,
    instrument_idx: u16,
    side: Side,
    qty: u64,
    limit_px: u64,
    ttl_ms: u64,
    commitment_hash: &[u8; 32],
    route_id: u64,
    tif: TimeInForce,
) -> Result<ReserveResponse, PercolatorError> {
    let (data, len) = serialize_reserve_data(
        account_idx,
        instrument_idx,
        side,
        qty,
        limit_px,
        ttl_ms,
        commitment_hash,
        route_id,
        tif,
    );

    invoke_slab(slab_program, slab_state, router_authority, authority_bump, &data[..len])?;
    ReserveResponse::from_return_data(&take_return_data(slab_program.key())?)
}

/// Commit a hold on a slab
pub fn cpi_commit(
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    router_authority: &AccountInfo,
    authority_bump: u8,
    hold_id: u64,
    now_ts: u64,
) -> Result<CommitResponse, PercolatorError> {
    let data = serialize_commit_data(hold_id, now_ts);
    invoke_slab(slab_program, slab_state, router_authority, authority_bump, &data)?;
    CommitResponse::from_return_data(&take_return_data(slab_program.key())?)
}

/// Cancel a hold on a slab (best-effort unwind)
pub fn cpi_cancel(
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    router_authority: &AccountInfo,
    authority_bump: u8,
    hold_id: u64,
) -> Result<(), PercolatorError> {
    let data = serialize_cancel_data(hold_id);
    invoke_slab(slab_program, slab_state, router_authority, authority_bump, &data)
}

/// Drive a liquidation on a slab
pub fn cpi_liquidate(
    slab_program: &AccountInfo,
    slab_state: &AccountInfo,
    router_authority: &AccountInfo,
    authority_bump: u8,
    target_account_idx: u32,
    instrument_idx: u16,
    qty_limit: u64,
    now_ts: u64,
) -> Result<LiquidationResponse, PercolatorError> {
    let data = serialize_liquidate_data(target_account_idx, instrument_idx, qty_limit, now_ts);
    invoke_slab(slab_program, slab_state, router_authority, authority_bump, &data)?;
    LiquidationResponse::from_return_data(&take_return_data(slab_program.key())?)
}
