pub mod vault;
pub mod escrow;
pub mod cap;
pub mod portfolio;
pub mod registry;
pub mod seat;

pub use vault::*;
pub use escrow::*;
pub use cap::*;
pub use portfolio::*;
pub use registry::*;
pub use seat::*;
