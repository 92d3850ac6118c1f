//! Shared infrastructure for integration tests driving the built BPF
//! programs through solana-program-test.

#![allow(dead_code)]

use solana_program_test::*;
use solana_sdk::{
    account::Account,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;

pub const SLAB_PROGRAM_ID_STR: &str = "SLabZ6PsDLh2X6HzEoqxFDMqCVcJXDKCNEYuPzUvGPk";
pub const ROUTER_PROGRAM_ID_STR: &str = "RoutR1VdCpHqj89WEMJhb6TkGT9cPfr1rVjhM3e2YQr";

pub fn slab_program_id() -> Pubkey {
    Pubkey::from_str(SLAB_PROGRAM_ID_STR).unwrap()
}

pub fn router_program_id() -> Pubkey {
    Pubkey::from_str(ROUTER_PROGRAM_ID_STR).unwrap()
}

/// Slab state size (10 MB)
pub const SLAB_STATE_SIZE: usize = 10 * 1024 * 1024;

/// Registry account size upper bound
pub const REGISTRY_SIZE: usize = 32 * 1024;

/// Portfolio account size upper bound
pub const PORTFOLIO_SIZE: usize = 64 * 1024;

/// Vault account size
pub const VAULT_SIZE: usize = 256;

pub mod slab_ix {
    pub const INITIALIZE: u8 = 0;
    pub const COMMIT_FILL: u8 = 1;
    pub const ADAPTER_LIQUIDITY: u8 = 2;
    pub const PLACE_ORDER: u8 = 3;
    pub const CANCEL_ORDER: u8 = 4;
    pub const UPDATE_FUNDING: u8 = 5;
    pub const HALT_TRADING: u8 = 6;
    pub const RESUME_TRADING: u8 = 7;
    pub const MODIFY_ORDER: u8 = 8;
    pub const INITIALIZE_RECEIPT: u8 = 9;
}

pub mod router_ix {
    pub const INITIALIZE: u8 = 0;
    pub const INITIALIZE_PORTFOLIO: u8 = 1;
    pub const INITIALIZE_VAULT: u8 = 2;
    pub const DEPOSIT: u8 = 3;
    pub const WITHDRAW: u8 = 4;
    pub const EXECUTE_CROSS_SLAB: u8 = 5;
    pub const LIQUIDATE_USER: u8 = 6;
    pub const ROUTER_RESERVE: u8 = 10;
    pub const ROUTER_RELEASE: u8 = 11;
    pub const ROUTER_LIQUIDITY: u8 = 12;
    pub const ROUTER_SEAT_INIT: u8 = 13;
    pub const WITHDRAW_INSURANCE: u8 = 14;
    pub const TOP_UP_INSURANCE: u8 = 15;
}

/// True when the BPF binaries are reachable for program-test
pub fn bpf_available() -> bool {
    let dir = std::env::var("SBF_OUT_DIR")
        .or_else(|_| std::env::var("BPF_OUT_DIR"))
        .unwrap_or_else(|_| "target/deploy".to_string());
    std::path::Path::new(&dir).join("percolator_slab.so").exists()
}

pub struct TestContext {
    pub ctx: ProgramTestContext,
    pub slab_program_id: Pubkey,
    pub router_program_id: Pubkey,
}

impl TestContext {
    pub async fn new_with_slab() -> Self {
        let slab_id = slab_program_id();
        let router_id = router_program_id();

        let mut program_test = ProgramTest::default();
        program_test.add_program("percolator_slab", slab_id, None);
        program_test.set_compute_max_units(1_400_000);

        let ctx = program_test.start_with_context().await;

        Self {
            ctx,
            slab_program_id: slab_id,
            router_program_id: router_id,
        }
    }

    pub async fn new_with_both() -> Self {
        let slab_id = slab_program_id();
        let router_id = router_program_id();

        let mut program_test = ProgramTest::default();
        program_test.add_program("percolator_slab", slab_id, None);
        program_test.add_program("percolator_router", router_id, None);
        program_test.set_compute_max_units(1_400_000);

        let ctx = program_test.start_with_context().await;

        Self {
            ctx,
            slab_program_id: slab_id,
            router_program_id: router_id,
        }
    }

    pub async fn get_blockhash(&mut self) -> solana_sdk::hash::Hash {
        self.ctx.banks_client.get_latest_blockhash().await.unwrap()
    }

    pub async fn process_tx(&mut self, tx: Transaction) -> Result<(), BanksClientError> {
        self.ctx.banks_client.process_transaction(tx).await
    }

    /// Create a program-owned account of the given size
    pub async fn create_owned_account(&mut self, size: usize, owner: &Pubkey) -> Keypair {
        let account = Keypair::new();
        let rent = Rent::default();
        let lamports = rent.minimum_balance(size);

        let create_ix = solana_sdk::system_instruction::create_account(
            &self.ctx.payer.pubkey(),
            &account.pubkey(),
            lamports,
            size as u64,
            owner,
        );

        let blockhash = self.get_blockhash().await;
        let tx = Transaction::new_signed_with_payer(
            &[create_ix],
            Some(&self.ctx.payer.pubkey()),
            &[&self.ctx.payer, &account],
            blockhash,
        );

        self.process_tx(tx).await.unwrap();
        account
    }

    pub async fn create_slab_account(&mut self) -> Keypair {
        let owner = self.slab_program_id;
        self.create_owned_account(SLAB_STATE_SIZE, &owner).await
    }

    pub async fn get_account(&mut self, pubkey: &Pubkey) -> Option<Account> {
        self.ctx.banks_client.get_account(*pubkey).await.unwrap()
    }

    pub async fn send_ix(
        &mut self,
        ix: Instruction,
        extra_signers: &[&Keypair],
    ) -> Result<(), BanksClientError> {
        let blockhash = self.get_blockhash().await;
        let payer = self.ctx.payer.insecure_clone();
        let mut signers: Vec<&Keypair> = vec![&payer];
        signers.extend_from_slice(extra_signers);
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&payer.pubkey()),
            &signers,
            blockhash,
        );
        self.process_tx(tx).await
    }
}

/// Default deployment parameters used across tests, matching the unit
/// fixtures: 5% IM, 2.5% MM, -0.05%/0.2% fees, 100 ms batches
pub fn default_params_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&500u64.to_le_bytes()); // imr_bps
    data.extend_from_slice(&250u64.to_le_bytes()); // mmr_bps
    data.extend_from_slice(&(-5i64).to_le_bytes()); // maker_fee_bps
    data.extend_from_slice(&20u64.to_le_bytes()); // taker_fee_bps
    data.extend_from_slice(&100u64.to_le_bytes()); // batch_ms
    data.extend_from_slice(&3u16.to_le_bytes()); // freeze_levels
    data.extend_from_slice(&100u64.to_le_bytes()); // kill_band_bps
    data.extend_from_slice(&50u64.to_le_bytes()); // arg_tax_bps
    data.extend_from_slice(&120_000u64.to_le_bytes()); // ttl_max_ms
    data.extend_from_slice(&120_000u64.to_le_bytes()); // cap_ttl_max_ms
    data.extend_from_slice(&500u64.to_le_bytes()); // liq_penalty_bps
    data.extend_from_slice(&50u64.to_le_bytes()); // mark_bound_bps
    data
}

/// Build the slab Initialize instruction with a single BTC-PERP instrument
pub fn ix_initialize_slab(
    slab_program: &Pubkey,
    slab: &Pubkey,
    authority: &Pubkey,
    router_authority: &Pubkey,
) -> Instruction {
    let mut data = vec![slab_ix::INITIALIZE];
    data.extend_from_slice(authority.as_ref());
    data.extend_from_slice(router_authority.as_ref());
    data.extend_from_slice(&default_params_bytes());
    data.push(0); // bump
    data.push(1); // one instrument
    data.extend_from_slice(b"BTC-PERP");
    data.extend_from_slice(&1_000u64.to_le_bytes()); // tick
    data.extend_from_slice(&1_000u64.to_le_bytes()); // lot
    data.extend_from_slice(&1_000u64.to_le_bytes()); // min_order
    data.extend_from_slice(&100_000_000u64.to_le_bytes()); // initial px

    Instruction {
        program_id: *slab_program,
        accounts: vec![
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// Build a PlaceOrder instruction
pub fn ix_place_order(
    slab_program: &Pubkey,
    slab: &Pubkey,
    owner: &Pubkey,
    side: u8,
    price: i64,
    qty: i64,
    maker_class: u8,
) -> Instruction {
    let mut data = vec![slab_ix::PLACE_ORDER];
    data.extend_from_slice(&0u16.to_le_bytes()); // instrument
    data.push(side);
    data.extend_from_slice(&price.to_le_bytes());
    data.extend_from_slice(&qty.to_le_bytes());
    data.push(0); // tif = GTC
    data.push(maker_class);

    Instruction {
        program_id: *slab_program,
        accounts: vec![
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data,
    }
}

/// Build a CancelOrder instruction
pub fn ix_cancel_order(
    slab_program: &Pubkey,
    slab: &Pubkey,
    owner: &Pubkey,
    order_id: u64,
) -> Instruction {
    let mut data = vec![slab_ix::CANCEL_ORDER];
    data.extend_from_slice(&order_id.to_le_bytes());

    Instruction {
        program_id: *slab_program,
        accounts: vec![
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data,
    }
}

/// Build an UpdateFunding instruction
pub fn ix_update_funding(
    slab_program: &Pubkey,
    slab: &Pubkey,
    authority: &Pubkey,
    index_price: u64,
    now_ms: u64,
) -> Instruction {
    let mut data = vec![slab_ix::UPDATE_FUNDING];
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&index_price.to_le_bytes());
    data.extend_from_slice(&now_ms.to_le_bytes());

    Instruction {
        program_id: *slab_program,
        accounts: vec![
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// Build a HaltTrading / ResumeTrading instruction
pub fn ix_halt_resume(
    slab_program: &Pubkey,
    slab: &Pubkey,
    authority: &Pubkey,
    halt: bool,
) -> Instruction {
    let data = vec![if halt {
        slab_ix::HALT_TRADING
    } else {
        slab_ix::RESUME_TRADING
    }];

    Instruction {
        program_id: *slab_program,
        accounts: vec![
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// Router authority PDA
pub fn router_authority_pda() -> Pubkey {
    Pubkey::find_program_address(&[b"authority"], &router_program_id()).0
}

/// Build the router Initialize instruction registering one slab
pub fn ix_router_initialize(
    registry: &Pubkey,
    payer: &Pubkey,
    governance: &Pubkey,
    slab_program: &Pubkey,
    slab_state: &Pubkey,
) -> Instruction {
    let mut data = vec![router_ix::INITIALIZE];
    data.extend_from_slice(governance.as_ref());
    data.push(0); // bump
    data.push(1); // one slab
    data.extend_from_slice(slab_program.as_ref());
    data.extend_from_slice(slab_state.as_ref());
    data.extend_from_slice(&500u64.to_le_bytes());
    data.extend_from_slice(&250u64.to_le_bytes());

    Instruction {
        program_id: router_program_id(),
        accounts: vec![
            AccountMeta::new(*registry, false),
            AccountMeta::new_readonly(*payer, true),
        ],
        data,
    }
}

/// Build the InitializePortfolio instruction
pub fn ix_initialize_portfolio(portfolio: &Pubkey, payer: &Pubkey, user: &Pubkey) -> Instruction {
    let mut data = vec![router_ix::INITIALIZE_PORTFOLIO];
    data.extend_from_slice(user.as_ref());
    data.push(0);

    Instruction {
        program_id: router_program_id(),
        accounts: vec![
            AccountMeta::new(*portfolio, false),
            AccountMeta::new_readonly(*payer, true),
        ],
        data,
    }
}

/// Build the InitializeVault instruction
pub fn ix_initialize_vault(
    vault: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    token_account: &Pubkey,
) -> Instruction {
    let mut data = vec![router_ix::INITIALIZE_VAULT];
    data.extend_from_slice(mint.as_ref());
    data.extend_from_slice(token_account.as_ref());
    data.push(0);

    Instruction {
        program_id: router_program_id(),
        accounts: vec![
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*payer, true),
        ],
        data,
    }
}

/// Build a Deposit instruction
pub fn ix_deposit(portfolio: &Pubkey, vault: &Pubkey, user: &Pubkey, amount: u64) -> Instruction {
    let mut data = vec![router_ix::DEPOSIT];
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: router_program_id(),
        accounts: vec![
            AccountMeta::new(*portfolio, false),
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*user, true),
        ],
        data,
    }
}

/// Build an ExecuteCrossSlab instruction over a single slab
#[allow(clippy::too_many_arguments)]
pub fn ix_execute_cross_slab(
    portfolio: &Pubkey,
    user: &Pubkey,
    registry: &Pubkey,
    slab_program: &Pubkey,
    slab_state: &Pubkey,
    mint: &Pubkey,
    account_idx: u32,
    side: u8,
    qty: i64,
    limit_px: i64,
    min_fill: i64,
    route_id: u64,
) -> Instruction {
    let mut data = vec![router_ix::EXECUTE_CROSS_SLAB];
    data.extend_from_slice(mint.as_ref());
    data.extend_from_slice(&route_id.to_le_bytes());
    data.extend_from_slice(&60_000u64.to_le_bytes()); // ttl
    data.extend_from_slice(&min_fill.to_le_bytes());
    data.push(1); // one split
    data.extend_from_slice(&account_idx.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.push(side);
    data.extend_from_slice(&qty.to_le_bytes());
    data.extend_from_slice(&limit_px.to_le_bytes());

    Instruction {
        program_id: router_program_id(),
        accounts: vec![
            AccountMeta::new(*portfolio, false),
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*registry, false),
            AccountMeta::new_readonly(router_authority_pda(), false),
            AccountMeta::new_readonly(*slab_program, false),
            AccountMeta::new(*slab_state, false),
        ],
        data,
    }
}
