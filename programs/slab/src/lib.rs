#![no_std]

pub mod state;
pub mod instructions;
pub mod matching;
pub mod pda;

#[cfg(feature = "bpf-entrypoint")]
mod entrypoint;

#[cfg(test)]
mod tests;

// Panic handler for no_std builds (not needed in tests)
#[cfg(all(not(test), target_os = "solana"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

// On host builds, link std so it provides the panic handler (matches pinocchio's
// own default_panic_handler! pattern for non-"solana" targets).
#[cfg(not(target_os = "solana"))]
mod __private_panic_handler {
    extern crate std as __std;
}

pub use state::*;

// Re-export without globs to keep names unambiguous
pub use instructions::SlabInstruction;
pub use matching::{insert_order, promote_pending, remove_order, would_cross};
pub use matching::{calculate_equity, calculate_margin_requirements, is_liquidatable};

pinocchio_pubkey::declare_id!("SLabZ6PsDLh2X6HzEoqxFDMqCVcJXDKCNEYuPzUvGPk");
