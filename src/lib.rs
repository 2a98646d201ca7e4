pub mod config;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod observability;
pub mod recon;
pub mod store;
pub mod types;

/// Decimal places of every fixed-point price/quantity/fee in this crate.
pub const FIXED_POINT_DECIMALS: u32 = 8;
