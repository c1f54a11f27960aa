//! Core business logic abstractions

pub mod audit;
pub mod config;
pub mod donation;
pub mod explorer;
pub mod history;
pub mod log;
pub mod price;
pub mod transaction;
pub mod units;

// Re-export main types for cleaner imports
pub use explorer::TransactionSource;
pub use price::{PricePoint, PriceProvider, PriceSnapshot};
pub use transaction::{Address, Transaction, TransactionClass};
pub use units::Wei;
