pub mod balance;
pub mod ids;
pub mod order;
pub mod position;
pub mod price;
pub mod quantity;
pub mod ratio;
pub mod symbol;
pub mod timestamp;
