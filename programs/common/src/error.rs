//! Status codes shared by the router and slab programs
//!
//! Every handler returns exactly one of these codes; the numeric values are
//! the wire exit codes the caller decodes.

use pinocchio::program_error::ProgramError;

/// Program status codes (0 is success and never constructed)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercolatorError {
    /// Malformed input: misaligned price/qty, bad index, bad payload
    InvalidArgument = 1,
    /// Missing signer, wrong owner, wrong authority
    Unauthorized = 2,
    /// Book could not satisfy the requested quantity
    InsufficientLiquidity = 3,
    /// Margin or balance below what the operation requires
    InsufficientCollateral = 4,
    /// Mark diverged from index beyond the kill band
    KillBandBreached = 5,
    /// Slab or instrument is frozen
    Halted = 6,
    /// Reservation or capability past its expiry
    Expired = 7,
    /// Arena handle generation mismatch (use-after-free)
    StaleHandle = 8,
    /// Arena freelist exhausted
    ArenaFull = 9,
    /// Capability scope, expiry, burn, or nonce check failed
    BadCapability = 10,
    /// Capability remaining amount below the requested debit
    CapExhausted = 11,
    /// Reservation was already committed
    AlreadyCommitted = 12,
    /// Internal invariant broke; the slab freezes itself
    InvariantViolation = 13,
    /// Per-account reservation budget exceeded for this epoch
    RateLimited = 14,
}

impl From<PercolatorError> for ProgramError {
    fn from(e: PercolatorError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl From<PercolatorError> for u64 {
    fn from(e: PercolatorError) -> u64 {
        e as u64
    }
}
