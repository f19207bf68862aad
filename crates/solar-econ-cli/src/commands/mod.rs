pub mod acquisition;
pub mod incentives;
pub mod portfolio;
pub mod savings;
pub mod tariff;
