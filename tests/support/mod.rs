pub mod builders;
pub mod fixtures;
pub mod harness;
