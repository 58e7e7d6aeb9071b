mod lookback;
mod price_client;

pub mod chart;

pub use chart::CandleChart;
pub use lookback::Lookback;
pub use price_client::{Bar, PriceClient};
