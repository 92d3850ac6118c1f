#![no_std]

pub mod state;
pub mod instructions;
pub mod cpi;
pub mod pda;

#[cfg(feature = "bpf-entrypoint")]
mod entrypoint;

// Panic handler for no_std builds (not needed in tests)
#[cfg(all(not(test), target_os = "solana"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

pub use state::*;

// Re-export without globs to keep names unambiguous
pub use instructions::RouterInstruction;
pub use cpi::{CommitResponse, LiquidationResponse, ReserveResponse};

pinocchio_pubkey::declare_id!("RoutR1VdCpHqj89WEMJhb6TkGT9cPfr1rVjhM3e2YQr");
