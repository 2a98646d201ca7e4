pub mod loader;

pub use loader::{AppConfig, LockConfig, RecoveryConfig};
