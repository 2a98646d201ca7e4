pub mod calculator;
pub mod engine;
pub mod lock_table;
pub mod recovery;
pub mod transition;
