pub mod audit;
pub mod export;
pub mod prices;
pub mod setup;
pub mod ui;
