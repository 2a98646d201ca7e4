pub mod event_publisher;
pub mod journal;
pub mod store;
