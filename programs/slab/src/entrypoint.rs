//! Slab program entrypoint
//!
//! Discriminator byte 0, packed little-endian payloads. Results are emitted
//! fixed-size through the return-data slot; CommitFill additionally writes
//! the fill receipt account when one is supplied.

use pinocchio::{
    account_info::AccountInfo,
    cpi::set_return_data,
    entrypoint,
    pubkey::Pubkey,
    sysvars::{clock::Clock, Sysvar},
    ProgramResult,
};
use pinocchio_log::log;

use crate::instructions::{
    process_cancel_hold, process_cancel_order, process_commit_fill, process_halt_trading,
    process_initialize, process_initialize_receipt, process_liquidate, process_modify_order,
    process_place_order, process_reserve, process_resume_trading, process_update_funding,
    InstrumentInit, SlabInstruction, CANCEL_PAYLOAD_LEN, INSTRUMENT_INIT_LEN,
    LIQUIDATE_PAYLOAD_LEN, RESERVE_PAYLOAD_LEN,
};
use crate::matching::reserve::ReserveResult;
use crate::matching::commit::CommitResult;
use crate::matching::liquidate::LiquidationResult;
use crate::state::{FillReceipt, SlabParams, SlabState};
use percolator_common::{
    borrow_account_data_mut, validate_owner, validate_signer, validate_writable,
    InstructionReader, PercolatorError, MAX_INSTRUMENTS,
};

entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if instruction_data.is_empty() {
        log!("Error: Instruction data is empty");
        return Err(PercolatorError::InvalidArgument.into());
    }

    let discriminator = instruction_data[0];
    let payload = &instruction_data[1..];

    let instruction = match discriminator {
        0 => SlabInstruction::Initialize,
        1 => SlabInstruction::CommitFill,
        2 => SlabInstruction::AdapterLiquidity,
        3 => SlabInstruction::PlaceOrder,
        4 => SlabInstruction::CancelOrder,
        5 => SlabInstruction::UpdateFunding,
        6 => SlabInstruction::HaltTrading,
        7 => SlabInstruction::ResumeTrading,
        8 => SlabInstruction::ModifyOrder,
        9 => SlabInstruction::InitializeReceipt,
        _ => {
            log!("Error: Unknown instruction");
            return Err(PercolatorError::InvalidArgument.into());
        }
    };

    match instruction {
        SlabInstruction::Initialize => {
            log!("Instruction: Initialize");
            process_initialize_inner(program_id, accounts, payload)
        }
        SlabInstruction::CommitFill => {
            log!("Instruction: CommitFill");
            process_commit_fill_inner(program_id, accounts, payload)
        }
        SlabInstruction::AdapterLiquidity => {
            log!("Instruction: AdapterLiquidity");
            process_adapter_liquidity_inner(program_id, accounts, payload)
        }
        SlabInstruction::PlaceOrder => {
            log!("Instruction: PlaceOrder");
            process_place_order_inner(program_id, accounts, payload)
        }
        SlabInstruction::CancelOrder => {
            log!("Instruction: CancelOrder");
            process_cancel_order_inner(program_id, accounts, payload)
        }
        SlabInstruction::UpdateFunding => {
            log!("Instruction: UpdateFunding");
            process_update_funding_inner(program_id, accounts, payload)
        }
        SlabInstruction::HaltTrading => {
            log!("Instruction: HaltTrading");
            process_halt_inner(program_id, accounts, true)
        }
        SlabInstruction::ResumeTrading => {
            log!("Instruction: ResumeTrading");
            process_halt_inner(program_id, accounts, false)
        }
        SlabInstruction::ModifyOrder => {
            log!("Instruction: ModifyOrder");
            process_modify_order_inner(program_id, accounts, payload)
        }
        SlabInstruction::InitializeReceipt => {
            log!("Instruction: InitializeReceipt");
            process_initialize_receipt_inner(program_id, accounts)
        }
    }
}

/// Host clock in milliseconds
fn now_ms() -> u64 {
    Clock::get()
        .map(|c| (c.unix_timestamp.max(0) as u64).saturating_mul(1_000))
        .unwrap_or(0)
}

/// Accounts:
/// 0. `[writable]` Slab state (zeroed, owned by this program)
/// 1. `[signer]` Authority
///
/// Payload: authority (32) + router (32) + params (12 fields) + bump (1)
/// + instrument count (1) + count * 40-byte instrument specs
fn process_initialize_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(&accounts[1])?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };

    let mut reader = InstructionReader::new(data);
    let authority = Pubkey::from(reader.read_bytes::<32>()?);
    let router_id = Pubkey::from(reader.read_bytes::<32>()?);

    let params = SlabParams {
        imr_bps: reader.read_u64()?,
        mmr_bps: reader.read_u64()?,
        maker_fee_bps: reader.read_i64()?,
        taker_fee_bps: reader.read_u64()?,
        batch_ms: reader.read_u64()?,
        freeze_levels: reader.read_u16()?,
        _padding: [0; 6],
        kill_band_bps: reader.read_u64()?,
        arg_tax_bps: reader.read_u64()?,
        ttl_max_ms: reader.read_u64()?,
        cap_ttl_max_ms: reader.read_u64()?,
        liq_penalty_bps: reader.read_u64()?,
        mark_bound_bps: reader.read_u64()?,
    };
    let bump = reader.read_u8()?;

    let count = reader.read_u8()? as usize;
    if count == 0 || count > MAX_INSTRUMENTS || reader.remaining() != count * INSTRUMENT_INIT_LEN {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let mut instruments = [InstrumentInit {
        symbol: [0; 8],
        tick: 0,
        lot: 0,
        min_order: 0,
        initial_px: 0,
    }; MAX_INSTRUMENTS];
    for spec in instruments.iter_mut().take(count) {
        spec.symbol = reader.read_bytes::<8>()?;
        spec.tick = reader.read_u64()?;
        spec.lot = reader.read_u64()?;
        spec.min_order = reader.read_u64()?;
        spec.initial_px = reader.read_u64()?;
    }

    process_initialize(slab, authority, router_id, params, bump, &instruments[..count])?;

    log!("Slab initialized");
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Router authority
/// 2. `[writable]` Fill receipt (optional)
///
/// Payload (16 bytes): hold_id u64, now_ts u64
fn process_commit_fill_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let router_account = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(router_account)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };
    if router_account.key() != &slab.header.router_id {
        log!("Error: commit not signed by router");
        return Err(PercolatorError::Unauthorized.into());
    }

    let mut reader = InstructionReader::new(data);
    let hold_id = reader.read_u64()?;
    let now_ts = reader.read_u64()?;

    let result = if accounts.len() > 2 {
        let receipt_account = &accounts[2];
        validate_writable(receipt_account)?;
        let receipt = unsafe { borrow_account_data_mut::<FillReceipt>(receipt_account)? };
        process_commit_fill(slab, hold_id, now_ts, Some(receipt))?
    } else {
        process_commit_fill(slab, hold_id, now_ts, None)?
    };

    set_return_data(&encode_commit_result(&result));
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Router authority (any signer for the liquidate form)
///
/// Payload length selects the form: 71 or 72 bytes reserve (optional
/// trailing tif byte), 8 bytes cancel-hold, 22 bytes liquidate.
fn process_adapter_liquidity_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let caller = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(caller)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };

    match data.len() {
        RESERVE_PAYLOAD_LEN | 72 => {
            if caller.key() != &slab.header.router_id {
                log!("Error: reserve not signed by router");
                return Err(PercolatorError::Unauthorized.into());
            }

            let mut reader = InstructionReader::new(data);
            let account_idx = reader.read_u32()?;
            let instrument_idx = reader.read_u16()?;
            let side = reader.read_side()?;
            let qty = reader.read_i64()?;
            let limit_px = reader.read_i64()?;
            let ttl_ms = reader.read_u64()?;
            let commitment_hash = reader.read_bytes::<32>()?;
            let route_id = reader.read_u64()?;
            let tif = if reader.remaining() > 0 {
                reader.read_tif()?
            } else {
                percolator_common::TimeInForce::GTC
            };

            if qty <= 0 || limit_px <= 0 {
                return Err(PercolatorError::InvalidArgument.into());
            }

            let result = process_reserve(
                slab,
                account_idx,
                instrument_idx,
                side,
                qty as u64,
                limit_px as u64,
                ttl_ms,
                tif,
                commitment_hash,
                route_id,
                now_ms(),
            )?;

            set_return_data(&encode_reserve_result(&result));
            Ok(())
        }
        CANCEL_PAYLOAD_LEN => {
            if caller.key() != &slab.header.router_id {
                log!("Error: cancel not signed by router");
                return Err(PercolatorError::Unauthorized.into());
            }

            let mut reader = InstructionReader::new(data);
            let hold_id = reader.read_u64()?;
            process_cancel_hold(slab, hold_id, now_ms())?;
            Ok(())
        }
        LIQUIDATE_PAYLOAD_LEN => {
            let mut reader = InstructionReader::new(data);
            let target_account_idx = reader.read_u32()?;
            let _instrument_idx = reader.read_u16()?;
            let qty_limit = reader.read_i64()?;
            let now_ts = reader.read_u64()?;

            if qty_limit <= 0 {
                return Err(PercolatorError::InvalidArgument.into());
            }

            let result = process_liquidate(slab, target_account_idx, qty_limit as u64, now_ts)?;
            set_return_data(&encode_liquidation_result(&result));
            Ok(())
        }
        _ => {
            log!("Error: bad adapter payload length");
            Err(PercolatorError::InvalidArgument.into())
        }
    }
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Order owner
///
/// Payload (21 bytes): instrument u16, side u8, price i64, qty i64,
/// tif u8, maker_class u8
fn process_place_order_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let owner = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(owner)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };

    let mut reader = InstructionReader::new(data);
    let instrument_idx = reader.read_u16()?;
    let side = reader.read_side()?;
    let price = reader.read_i64()?;
    let qty = reader.read_i64()?;
    let tif = reader.read_tif()?;
    let maker_class = reader.read_maker_class()?;

    if price <= 0 || qty <= 0 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let order_id = process_place_order(
        slab,
        owner.key(),
        instrument_idx,
        side,
        price as u64,
        qty as u64,
        tif,
        maker_class,
        now_ms(),
    )?;

    set_return_data(&order_id.to_le_bytes());
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Order owner
///
/// Payload (8 bytes): order_id u64
fn process_cancel_order_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let owner = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(owner)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };

    let mut reader = InstructionReader::new(data);
    let order_id = reader.read_u64()?;

    process_cancel_order(slab, owner.key(), order_id)?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Authority (oracle crank)
///
/// Payload (18 bytes): instrument u16, index_price u64, now u64
fn process_update_funding_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let authority = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(authority)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };
    if authority.key() != &slab.header.authority {
        return Err(PercolatorError::Unauthorized.into());
    }

    let mut reader = InstructionReader::new(data);
    let instrument_idx = reader.read_u16()?;
    let index_price = reader.read_u64()?;
    let now_ts = reader.read_u64()?;

    process_update_funding(slab, instrument_idx, index_price, now_ts)?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Authority
fn process_halt_inner(program_id: &Pubkey, accounts: &[AccountInfo], halt: bool) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let authority = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(authority)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };
    if authority.key() != &slab.header.authority {
        return Err(PercolatorError::Unauthorized.into());
    }

    if halt {
        process_halt_trading(slab)?;
    } else {
        process_resume_trading(slab)?;
    }
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Slab state
/// 1. `[signer]` Order owner
///
/// Payload (24 bytes): order_id u64, new_price i64, new_qty i64
fn process_modify_order_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let slab_account = &accounts[0];
    let owner = &accounts[1];
    validate_owner(slab_account, program_id)?;
    validate_writable(slab_account)?;
    validate_signer(owner)?;

    let slab = unsafe { borrow_account_data_mut::<SlabState>(slab_account)? };

    let mut reader = InstructionReader::new(data);
    let order_id = reader.read_u64()?;
    let new_price = reader.read_i64()?;
    let new_qty = reader.read_i64()?;

    if new_price <= 0 || new_qty <= 0 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let surviving_id = process_modify_order(
        slab,
        owner.key(),
        order_id,
        new_price as u64,
        new_qty as u64,
        now_ms(),
    )?;

    set_return_data(&surviving_id.to_le_bytes());
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Fill receipt (owned by this program)
/// 1. `[signer]` Payer
fn process_initialize_receipt_inner(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let receipt_account = &accounts[0];
    validate_owner(receipt_account, program_id)?;
    validate_writable(receipt_account)?;
    validate_signer(&accounts[1])?;

    let receipt = unsafe { borrow_account_data_mut::<FillReceipt>(receipt_account)? };
    process_initialize_receipt(receipt)?;
    Ok(())
}

/// 64-byte reserve result: hold, vwap, worst, filled, max_charge, expiry, seqno
fn encode_reserve_result(r: &ReserveResult) -> [u8; 64] {
    let mut bytes = [0u8; 64];
    bytes[0..8].copy_from_slice(&r.hold_id.to_le_bytes());
    bytes[8..16].copy_from_slice(&r.vwap_px.to_le_bytes());
    bytes[16..24].copy_from_slice(&r.worst_px.to_le_bytes());
    bytes[24..32].copy_from_slice(&r.filled_qty.to_le_bytes());
    bytes[32..48].copy_from_slice(&r.max_charge.to_le_bytes());
    bytes[48..56].copy_from_slice(&r.expiry_ms.to_le_bytes());
    bytes[56..64].copy_from_slice(&r.seqno.to_le_bytes());
    bytes
}

/// 64-byte commit result: filled, vwap, notional, fee, debit
fn encode_commit_result(r: &CommitResult) -> [u8; 64] {
    let mut bytes = [0u8; 64];
    bytes[0..8].copy_from_slice(&r.filled_qty.to_le_bytes());
    bytes[8..16].copy_from_slice(&r.vwap_px.to_le_bytes());
    bytes[16..32].copy_from_slice(&r.notional.to_le_bytes());
    bytes[32..48].copy_from_slice(&r.total_fee.to_le_bytes());
    bytes[48..64].copy_from_slice(&r.total_debit.to_le_bytes());
    bytes
}

/// 64-byte liquidation result: closed, px, pnl, penalty, remaining deficit
fn encode_liquidation_result(r: &LiquidationResult) -> [u8; 64] {
    let mut bytes = [0u8; 64];
    bytes[0..8].copy_from_slice(&r.closed_qty.to_le_bytes());
    bytes[8..16].copy_from_slice(&r.liq_px.to_le_bytes());
    bytes[16..32].copy_from_slice(&r.realized_pnl.to_le_bytes());
    bytes[32..48].copy_from_slice(&r.penalty.to_le_bytes());
    bytes[48..64].copy_from_slice(&r.remaining_deficit.to_le_bytes());
    bytes
}
