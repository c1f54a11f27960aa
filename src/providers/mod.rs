pub mod coingecko;
pub mod etherscan;

pub use coingecko::CoinGeckoProvider;
pub use etherscan::EtherscanProvider;
