//! # GEX-Data
//! Typed access to the gamma exposure dashboard API: quotes, live and captured GEX snapshots,
//! option expiration lists and intraday price history.
//!
//! * [`GexSource`](client::GexSource) abstracts the API so consumers can be driven by a
//!   mock in tests; [`RestClient`](client::RestClient) is the `reqwest` implementation.
//! * [`model`] holds the wire types, [`levels`] the call wall / put wall / flip point
//!   derivations, and [`error`] the error taxonomy surfaced to the view.

/// All [`Error`](std::error::Error)s generated in GEX-Data.
pub mod error;

/// Wire model: quotes, GEX snapshots and price bars.
pub mod model;

/// REST client, endpoint URL construction and the [`GexSource`](client::GexSource) trait.
pub mod client;

/// Call wall, put wall, flip point and spot-strike derivations.
pub mod levels;

pub use client::{ClientConfig, GexSource, RestClient};
pub use error::ApiError;
pub use levels::{GexLevels, nearest_strike};
pub use model::{GexSnapshot, PriceBar, Quote, SnapshotSource, StrikeGex};
