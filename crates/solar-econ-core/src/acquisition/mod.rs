pub mod cashflow;
pub mod financing;
