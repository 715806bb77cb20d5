pub mod alpaca;
pub mod finnhub;
