#![no_std]

pub mod types;
pub mod math;
pub mod error;
pub mod account;
pub mod serialize;


pub use types::*;
pub use math::*;
pub use error::*;
pub use account::*;
pub use serialize::*;
