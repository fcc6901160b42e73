/// Shared modules for the GEX dashboard
pub mod candle;
pub mod expirations;
pub mod format;
pub mod gex_view;
