pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "tariff")]
pub mod tariff;

#[cfg(feature = "savings")]
pub mod savings;

#[cfg(feature = "incentives")]
pub mod incentives;

#[cfg(feature = "acquisition")]
pub mod acquisition;

#[cfg(feature = "portfolio")]
pub mod portfolio;

pub use error::SolarEconError;
pub use types::*;

/// Standard result type for all solar-econ operations
pub type SolarEconResult<T> = Result<T, SolarEconError>;
