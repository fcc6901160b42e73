//! GEX view for the dashboard
//!
//! Provides:
//! - History slider state with a cancellable debounce
//! - Time-scrub coordinator driving fetches against a `GexSource`
//! - View state with strike rows, levels and series toggles
//! - Ratatui widgets for header, slider, GEX bars and candlesticks

mod coordinator;
mod scrub;
mod state;
mod widget;

pub use coordinator::{
    CoordinatorConfig, CoordinatorError, CoordinatorEvent, FetchResult, Fetched, GexCoordinator,
    Request, Slot, Ticket,
};
pub use scrub::{DebounceTimer, Selection, TimeScrubState, DEFAULT_DEBOUNCE};
pub use state::{ExpirationPicker, GexViewState, Phase, SeriesToggles};
pub use widget::{
    candle_segments, gex_bar, render_alert, render_candles, render_content,
    render_expiration_picker, render_expirations, render_gex_panel, render_header, render_help,
    render_slider, visible_window, ChartLayout,
};
