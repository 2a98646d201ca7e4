pub mod base;
pub mod position;
