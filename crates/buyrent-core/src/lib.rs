pub mod compounding;
pub mod error;
pub mod types;

#[cfg(feature = "amortization")]
pub mod amortization;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "dca")]
pub mod dca;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::BuyRentError;
pub use types::*;

/// Standard result type for all buy-vs-rent operations
pub type BuyRentResult<T> = Result<T, BuyRentError>;
