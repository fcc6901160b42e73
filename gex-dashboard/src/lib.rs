/// GEX Dashboard - Shared Library
///
/// Backs the `gex-dashboard` terminal binary:
/// - Candle geometry for the price chart
/// - Default option-expiration derivation
/// - Time-scrub coordination over live and captured GEX snapshots
/// - Number formatting and ratatui widgets
pub mod shared;

pub use shared::candle::{candle_geometry, BarBounds, CandleGeometry, CandleGlyph, Ohlc, Segment, Wick};
pub use shared::expirations::{default_expirations, next_friday_after, third_friday};

pub use shared::gex_view::{
    CoordinatorConfig, CoordinatorError, ExpirationPicker, GexCoordinator, GexViewState, Phase,
    Selection, SeriesToggles,
};
