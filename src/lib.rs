//! Percolator - sharded perpetual futures exchange
//!
//! Root package providing test infrastructure over the on-chain programs.
//! The slab and router are no_std BPF programs loaded as binaries by the
//! integration tests; this crate only re-exports the shared types needed
//! to encode instructions and decode account state.

pub use percolator_common as common;

/// Deployed program IDs
pub mod program_ids {
    /// Slab program ID
    pub const SLAB: &str = "SLabZ6PsDLh2X6HzEoqxFDMqCVcJXDKCNEYuPzUvGPk";

    /// Router program ID
    pub const ROUTER: &str = "RoutR1VdCpHqj89WEMJhb6TkGT9cPfr1rVjhM3e2YQr";
}
