pub mod billing;
pub mod schedule;
