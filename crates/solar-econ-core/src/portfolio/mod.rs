pub mod pricing;
pub mod rollup;
