pub mod breakdown;
pub mod compose;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod reference;
pub mod subsidy;
pub mod types;

pub use error::TcoError;
pub use types::*;

/// Standard result type for all truck-tco operations
pub type TcoResult<T> = Result<T, TcoError>;
