//! Router program entrypoint
//!
//! Discriminator byte 0, packed little-endian payloads. Cross-slab routes
//! emit their aggregate fill through the return-data slot.

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
    process_deposit, process_execute_cross_slab, process_initialize,
    process_initialize_portfolio, process_initialize_vault, process_liquidate_user,
    process_router_liquidity, process_router_release, process_router_reserve,
    process_router_seat_init, process_top_up_insurance, process_withdraw,
    process_withdraw_insurance, RouteCommitSummary, RouterInstruction, SeatTransfer, SlabReg,
    SlabSplit, MAX_SLABS_PER_ROUTE, SLAB_REG_LEN,
};
use crate::pda::derive_authority_pda;
use crate::state::{Cap, Escrow, LpSeat, Portfolio, SlabRegistry, Vault};
use percolator_common::{
    borrow_account_data, borrow_account_data_mut, validate_key, validate_owner, validate_signer,
    validate_writable, InstructionReader, PercolatorError,
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
        0 => RouterInstruction::Initialize,
        1 => RouterInstruction::InitializePortfolio,
        2 => RouterInstruction::InitializeVault,
        3 => RouterInstruction::Deposit,
        4 => RouterInstruction::Withdraw,
        5 => RouterInstruction::ExecuteCrossSlab,
        6 => RouterInstruction::LiquidateUser,
        10 => RouterInstruction::RouterReserve,
        11 => RouterInstruction::RouterRelease,
        12 => RouterInstruction::RouterLiquidity,
        13 => RouterInstruction::RouterSeatInit,
        14 => RouterInstruction::WithdrawInsurance,
        15 => RouterInstruction::TopUpInsurance,
        _ => {
            log!("Error: Unknown instruction");
            return Err(PercolatorError::InvalidArgument.into());
        }
    };

    match instruction {
        RouterInstruction::Initialize => {
            log!("Instruction: Initialize");
            process_initialize_inner(program_id, accounts, payload)
        }
        RouterInstruction::InitializePortfolio => {
            log!("Instruction: InitializePortfolio");
            process_initialize_portfolio_inner(program_id, accounts, payload)
        }
        RouterInstruction::InitializeVault => {
            log!("Instruction: InitializeVault");
            process_initialize_vault_inner(program_id, accounts, payload)
        }
        RouterInstruction::Deposit => {
            log!("Instruction: Deposit");
            process_transfer_inner(program_id, accounts, payload, true)
        }
        RouterInstruction::Withdraw => {
            log!("Instruction: Withdraw");
            process_transfer_inner(program_id, accounts, payload, false)
        }
        RouterInstruction::ExecuteCrossSlab => {
            log!("Instruction: ExecuteCrossSlab");
            process_execute_cross_slab_inner(program_id, accounts, payload)
        }
        RouterInstruction::LiquidateUser => {
            log!("Instruction: LiquidateUser");
            process_liquidate_user_inner(program_id, accounts, payload)
        }
        RouterInstruction::RouterReserve => {
            log!("Instruction: RouterReserve");
            process_router_reserve_inner(program_id, accounts, payload)
        }
        RouterInstruction::RouterRelease => {
            log!("Instruction: RouterRelease");
            process_router_release_inner(program_id, accounts)
        }
        RouterInstruction::RouterLiquidity => {
            log!("Instruction: RouterLiquidity");
            process_router_liquidity_inner(program_id, accounts, payload)
        }
        RouterInstruction::RouterSeatInit => {
            log!("Instruction: RouterSeatInit");
            process_router_seat_init_inner(program_id, accounts, payload)
        }
        RouterInstruction::WithdrawInsurance => {
            log!("Instruction: WithdrawInsurance");
            process_withdraw_insurance_inner(program_id, accounts, payload)
        }
        RouterInstruction::TopUpInsurance => {
            log!("Instruction: TopUpInsurance");
            process_top_up_insurance_inner(program_id, accounts, payload)
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
/// 0. `[writable]` Registry (owned by this program)
/// 1. `[signer]` Payer / governance
///
/// Payload: governance 32 + bump u8 + slab count u8 + count * 80-byte
/// registrations
fn process_initialize_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let registry_account = &accounts[0];
    validate_owner(registry_account, program_id)?;
    validate_writable(registry_account)?;
    validate_signer(&accounts[1])?;

    let registry = unsafe { borrow_account_data_mut::<SlabRegistry>(registry_account)? };

    let mut reader = InstructionReader::new(data);
    let governance = Pubkey::from(reader.read_bytes::<32>()?);
    let bump = reader.read_u8()?;
    let count = reader.read_u8()? as usize;

    if reader.remaining() != count * SLAB_REG_LEN {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let mut slabs = [SlabReg {
        program_id: Pubkey::default(),
        state: Pubkey::default(),
        imr_bps: 0,
        mmr_bps: 0,
    }; 16];
    if count > slabs.len() {
        return Err(PercolatorError::InvalidArgument.into());
    }
    for reg in slabs.iter_mut().take(count) {
        reg.program_id = Pubkey::from(reader.read_bytes::<32>()?);
        reg.state = Pubkey::from(reader.read_bytes::<32>()?);
        reg.imr_bps = reader.read_u64()?;
        reg.mmr_bps = reader.read_u64()?;
    }

    process_initialize(registry, *program_id, governance, bump, &slabs[..count], now_ms())?;

    log!("Router initialized");
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio (owned by this program)
/// 1. `[signer]` Payer
///
/// Payload: user 32 + bump u8
fn process_initialize_portfolio_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    validate_owner(portfolio_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_signer(&accounts[1])?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };

    let mut reader = InstructionReader::new(data);
    let user = Pubkey::from(reader.read_bytes::<32>()?);
    let bump = reader.read_u8()?;

    process_initialize_portfolio(portfolio, *program_id, user, bump)?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Vault (owned by this program)
/// 1. `[signer]` Payer
///
/// Payload: mint 32 + token account 32 + bump u8
fn process_initialize_vault_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 2 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let vault_account = &accounts[0];
    validate_owner(vault_account, program_id)?;
    validate_writable(vault_account)?;
    validate_signer(&accounts[1])?;

    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };

    let mut reader = InstructionReader::new(data);
    let mint = Pubkey::from(reader.read_bytes::<32>()?);
    let token_account = Pubkey::from(reader.read_bytes::<32>()?);
    let bump = reader.read_u8()?;

    process_initialize_vault(vault, *program_id, mint, token_account, bump)?;
    Ok(())
}

/// Accounts (Deposit and Withdraw):
/// 0. `[writable]` Portfolio
/// 1. `[writable]` Vault
/// 2. `[signer]` User
///
/// Payload: amount u64
fn process_transfer_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
    is_deposit: bool,
) -> ProgramResult {
    if accounts.len() < 3 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let vault_account = &accounts[1];
    let user = &accounts[2];
    validate_owner(portfolio_account, program_id)?;
    validate_owner(vault_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_writable(vault_account)?;
    validate_signer(user)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };

    validate_key(user, &portfolio.user)?;

    let mut reader = InstructionReader::new(data);
    let amount = reader.read_u64()? as u128;

    if is_deposit {
        process_deposit(portfolio, vault, amount)?;
    } else {
        process_withdraw(portfolio, vault, amount)?;
    }
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio
/// 1. `[signer]` User
/// 2. `[]` Registry
/// 3. `[]` Router authority PDA
/// 4..  per slab: `[]` slab program, `[writable]` slab state
///
/// Payload: mint 32 + route_id u64 + ttl_ms u64 + min_fill i64 +
/// count u8 + count * 23-byte splits
fn process_execute_cross_slab_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 6 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let user = &accounts[1];
    let registry_account = &accounts[2];
    let router_authority = &accounts[3];
    let slab_accounts = &accounts[4..];

    validate_owner(portfolio_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_signer(user)?;
    validate_owner(registry_account, program_id)?;

    let (authority_pda, authority_bump) = derive_authority_pda(program_id);
    validate_key(router_authority, &authority_pda)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let registry = unsafe { borrow_account_data::<SlabRegistry>(registry_account)? };

    let mut reader = InstructionReader::new(data);
    let mint = Pubkey::from(reader.read_bytes::<32>()?);
    let route_id = reader.read_u64()?;
    let ttl_ms = reader.read_u64()?;
    let min_fill = reader.read_i64()?;
    let count = reader.read_u8()? as usize;

    if min_fill < 0 || count == 0 || count > MAX_SLABS_PER_ROUTE {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let mut splits = [SlabSplit::default(); MAX_SLABS_PER_ROUTE];
    for split in splits.iter_mut().take(count) {
        split.account_idx = reader.read_u32()?;
        split.instrument_idx = reader.read_u16()?;
        split.side = reader.read_side()?;
        let qty = reader.read_i64()?;
        let limit_px = reader.read_i64()?;
        if qty <= 0 || limit_px <= 0 {
            return Err(PercolatorError::InvalidArgument.into());
        }
        split.qty = qty as u64;
        split.limit_px = limit_px as u64;
    }

    let summary = process_execute_cross_slab(
        portfolio,
        registry,
        router_authority,
        authority_bump,
        user.key(),
        &mint,
        slab_accounts,
        &splits[..count],
        min_fill as u64,
        ttl_ms,
        route_id,
        now_ms(),
    )?;

    set_return_data(&encode_route_summary(&summary));
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Target portfolio
/// 1. `[signer]` Liquidator (anyone)
/// 2. `[]` Registry
/// 3. `[]` Router authority PDA
/// 4. `[]` Slab program
/// 5. `[writable]` Slab state
///
/// Payload: target account idx u32 + instrument u16 + qty i64
fn process_liquidate_user_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 6 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let liquidator = &accounts[1];
    let registry_account = &accounts[2];
    let router_authority = &accounts[3];
    let slab_program = &accounts[4];
    let slab_state = &accounts[5];

    validate_owner(portfolio_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_signer(liquidator)?;
    validate_owner(registry_account, program_id)?;

    let (authority_pda, authority_bump) = derive_authority_pda(program_id);
    validate_key(router_authority, &authority_pda)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let registry = unsafe { borrow_account_data::<SlabRegistry>(registry_account)? };

    let mut reader = InstructionReader::new(data);
    let target_account_idx = reader.read_u32()?;
    let instrument_idx = reader.read_u16()?;
    let qty = reader.read_i64()?;
    if qty <= 0 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    process_liquidate_user(
        portfolio,
        registry,
        router_authority,
        authority_bump,
        slab_program,
        slab_state,
        target_account_idx,
        instrument_idx,
        qty as u64,
        now_ms(),
    )?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio
/// 1. `[signer]` User
/// 2. `[writable]` Vault
/// 3. `[writable]` Escrow
/// 4. `[writable]` Cap
///
/// Payload: slab 32 + amount_max u128 + route_id u64 + ttl_ms u64 + cap bump u8
fn process_router_reserve_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 5 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let user = &accounts[1];
    let vault_account = &accounts[2];
    let escrow_account = &accounts[3];
    let cap_account = &accounts[4];

    validate_owner(portfolio_account, program_id)?;
    validate_owner(vault_account, program_id)?;
    validate_owner(escrow_account, program_id)?;
    validate_owner(cap_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_writable(vault_account)?;
    validate_writable(escrow_account)?;
    validate_writable(cap_account)?;
    validate_signer(user)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };
    let escrow = unsafe { borrow_account_data_mut::<Escrow>(escrow_account)? };
    let cap = unsafe { borrow_account_data_mut::<Cap>(cap_account)? };

    let mut reader = InstructionReader::new(data);
    let slab = Pubkey::from(reader.read_bytes::<32>()?);
    let amount_max = reader.read_u128()?;
    let route_id = reader.read_u64()?;
    let ttl_ms = reader.read_u64()?;
    let cap_bump = reader.read_u8()?;

    // First use of the escrow account threads its identity in place
    if !escrow.is_initialized() {
        escrow.init(*program_id, slab, *user.key(), vault.mint, 0);
    }

    process_router_reserve(
        portfolio,
        vault,
        escrow,
        cap,
        user.key(),
        &slab,
        amount_max,
        route_id,
        ttl_ms,
        now_ms(),
        cap_bump,
    )?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio
/// 1. `[signer]` User
/// 2. `[writable]` Vault
/// 3. `[writable]` Escrow
/// 4. `[writable]` Cap
fn process_router_release_inner(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    if accounts.len() < 5 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let user = &accounts[1];
    let vault_account = &accounts[2];
    let escrow_account = &accounts[3];
    let cap_account = &accounts[4];

    validate_owner(portfolio_account, program_id)?;
    validate_owner(vault_account, program_id)?;
    validate_owner(escrow_account, program_id)?;
    validate_owner(cap_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_writable(vault_account)?;
    validate_writable(escrow_account)?;
    validate_writable(cap_account)?;
    validate_signer(user)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };
    let escrow = unsafe { borrow_account_data_mut::<Escrow>(escrow_account)? };
    let cap = unsafe { borrow_account_data_mut::<Cap>(cap_account)? };

    process_router_release(portfolio, vault, escrow, cap, user.key(), now_ms())?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio
/// 1. `[signer]` User
/// 2. `[writable]` LP seat
///
/// Payload: direction u8 + amount u128
fn process_router_liquidity_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 3 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let user = &accounts[1];
    let seat_account = &accounts[2];

    validate_owner(portfolio_account, program_id)?;
    validate_owner(seat_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_writable(seat_account)?;
    validate_signer(user)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let seat = unsafe { borrow_account_data_mut::<LpSeat>(seat_account)? };

    let mut reader = InstructionReader::new(data);
    let direction = match reader.read_u8()? {
        0 => SeatTransfer::Reserve,
        1 => SeatTransfer::Release,
        _ => return Err(PercolatorError::InvalidArgument.into()),
    };
    let amount = reader.read_u128()?;

    process_router_liquidity(
        portfolio,
        seat,
        portfolio_account.key(),
        user.key(),
        direction,
        amount,
    )?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` LP seat (owned by this program)
/// 1. `[]` Portfolio
/// 2. `[signer]` Payer
///
/// Payload: slab 32 + bump u8
fn process_router_seat_init_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 3 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let seat_account = &accounts[0];
    let portfolio_account = &accounts[1];
    validate_owner(seat_account, program_id)?;
    validate_owner(portfolio_account, program_id)?;
    validate_writable(seat_account)?;
    validate_signer(&accounts[2])?;

    let seat = unsafe { borrow_account_data_mut::<LpSeat>(seat_account)? };

    let mut reader = InstructionReader::new(data);
    let slab = Pubkey::from(reader.read_bytes::<32>()?);
    let bump = reader.read_u8()?;

    process_router_seat_init(seat, *program_id, *portfolio_account.key(), slab, bump)?;
    Ok(())
}

/// Accounts:
/// 0. `[]` Registry
/// 1. `[writable]` Vault
/// 2. `[writable]` Destination portfolio
/// 3. `[signer]` Governance
///
/// Payload: amount u128
fn process_withdraw_insurance_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 4 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let registry_account = &accounts[0];
    let vault_account = &accounts[1];
    let portfolio_account = &accounts[2];
    let governance = &accounts[3];

    validate_owner(registry_account, program_id)?;
    validate_owner(vault_account, program_id)?;
    validate_owner(portfolio_account, program_id)?;
    validate_writable(vault_account)?;
    validate_writable(portfolio_account)?;
    validate_signer(governance)?;

    let registry = unsafe { borrow_account_data::<SlabRegistry>(registry_account)? };
    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };
    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };

    let mut reader = InstructionReader::new(data);
    let amount = reader.read_u128()?;

    process_withdraw_insurance(registry, portfolio, vault, governance.key(), amount)?;
    Ok(())
}

/// Accounts:
/// 0. `[writable]` Portfolio
/// 1. `[writable]` Vault
/// 2. `[signer]` User
///
/// Payload: amount u128
fn process_top_up_insurance_inner(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    if accounts.len() < 3 {
        return Err(PercolatorError::InvalidArgument.into());
    }

    let portfolio_account = &accounts[0];
    let vault_account = &accounts[1];
    let user = &accounts[2];

    validate_owner(portfolio_account, program_id)?;
    validate_owner(vault_account, program_id)?;
    validate_writable(portfolio_account)?;
    validate_writable(vault_account)?;
    validate_signer(user)?;

    let portfolio = unsafe { borrow_account_data_mut::<Portfolio>(portfolio_account)? };
    let vault = unsafe { borrow_account_data_mut::<Vault>(vault_account)? };

    let mut reader = InstructionReader::new(data);
    let amount = reader.read_u128()?;

    process_top_up_insurance(portfolio, vault, user.key(), amount)?;
    Ok(())
}

/// 56-byte route summary: route_id, filled, vwap, fee, debit
fn encode_route_summary(s: &RouteCommitSummary) -> [u8; 56] {
    let mut bytes = [0u8; 56];
    bytes[0..8].copy_from_slice(&s.route_id.to_le_bytes());
    bytes[8..16].copy_from_slice(&s.total_filled.to_le_bytes());
    bytes[16..24].copy_from_slice(&s.blended_vwap.to_le_bytes());
    bytes[24..40].copy_from_slice(&s.total_fee.to_le_bytes());
    bytes[40..56].copy_from_slice(&s.total_debit.to_le_bytes());
    bytes
}
