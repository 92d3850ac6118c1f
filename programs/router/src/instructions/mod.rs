pub mod initialize;
pub mod initialize_portfolio;
pub mod initialize_vault;
pub mod deposit;
pub mod withdraw;
pub mod execute_cross_slab;
pub mod liquidate_user;
pub mod multi_reserve;
pub mod multi_commit;
pub mod router_reserve;
pub mod router_release;
pub mod router_liquidity;
pub mod router_seat_init;
pub mod insurance;

pub use initialize::*;
pub use initialize_portfolio::*;
pub use initialize_vault::*;
pub use deposit::*;
pub use withdraw::*;
pub use execute_cross_slab::*;
pub use liquidate_user::*;
pub use multi_reserve::*;
pub use multi_commit::*;
pub use router_reserve::*;
pub use router_release::*;
pub use router_liquidity::*;
pub use router_seat_init::*;
pub use insurance::*;

/// Instruction discriminator
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterInstruction {
    /// Initialize registry and slab set
    Initialize = 0,
    /// Create a user portfolio
    InitializePortfolio = 1,
    /// Create a custody vault
    InitializeVault = 2,
    /// Deposit collateral
    Deposit = 3,
    /// Withdraw free collateral
    Withdraw = 4,
    /// Atomic cross-slab reserve + commit
    ExecuteCrossSlab = 5,
    /// Liquidate an underwater user on a slab
    LiquidateUser = 6,
    /// Lock collateral and mint a capability (split flow)
    RouterReserve = 10,
    /// Burn a capability and refund the unused ceiling
    RouterRelease = 11,
    /// Move maker collateral to or from an LP seat
    RouterLiquidity = 12,
    /// Create an LP seat
    RouterSeatInit = 13,
    /// Governance drain of the insurance pool
    WithdrawInsurance = 14,
    /// Fund the insurance pool
    TopUpInsurance = 15,
}
