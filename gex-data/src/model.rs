//! Wire model for the dashboard API.
//!
//! These types match the JSON served under `/api/v1`. Field names follow the server's
//! casing (`callGEX`, `closePrice`, ...) so every rename is spelled out explicitly.

use derive_more::Display;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One sampled OHLCV interval.
///
/// Invariant (as delivered by the server): `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriceBar {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    /// ISO-8601 timestamp of the interval start
    pub timestamp: String,
}

impl PriceBar {
    /// Time-of-day portion of the timestamp, used for chart axis labels.
    pub fn time_label(&self) -> &str {
        self.timestamp
            .split_once('T')
            .map(|(_, time)| time)
            .unwrap_or(&self.timestamp)
    }

    pub fn is_growing(&self) -> bool {
        self.open < self.close
    }

    pub fn high_f64(&self) -> Option<f64> {
        self.high.to_f64()
    }

    pub fn low_f64(&self) -> Option<f64> {
        self.low.to_f64()
    }
}

/// Candle as nested inside the price-history study envelope.
///
/// Every field is optional on the wire; bars missing a price are dropped on conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireCandle {
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
    #[serde(rename = "datetimeISO8601", alias = "timestamp")]
    pub datetime_iso8601: Option<String>,
}

impl WireCandle {
    pub fn into_price_bar(self) -> Option<PriceBar> {
        Some(PriceBar {
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume.unwrap_or_default(),
            timestamp: self.datetime_iso8601?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteStudy {
    #[serde(default)]
    pub candle: Option<WireCandle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryResponse {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub quote_studies: Vec<QuoteStudy>,
}

/// Price history body: either the study envelope or a bare array of candles.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceHistoryBody {
    Studies(PriceHistoryResponse),
    Bars(Vec<WireCandle>),
}

impl PriceHistoryBody {
    /// Convert into bars, preserving server order and skipping incomplete candles.
    pub fn into_bars(self) -> Vec<PriceBar> {
        let candles: Vec<WireCandle> = match self {
            PriceHistoryBody::Studies(response) => response
                .quote_studies
                .into_iter()
                .filter_map(|study| study.candle)
                .collect(),
            PriceHistoryBody::Bars(candles) => candles,
        };

        let total = candles.len();
        let bars: Vec<PriceBar> = candles
            .into_iter()
            .filter_map(WireCandle::into_price_bar)
            .collect();

        if bars.len() != total {
            debug!(
                skipped = total - bars.len(),
                total, "Dropped incomplete candles from price history"
            );
        }

        bars
    }
}

/// Instrument reference data attached to a quote.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteReference {
    pub description: Option<String>,
}

/// Quote fields; the brokerage omits any of them for some instruments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteFields {
    pub last_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub net_change: Option<Decimal>,
    pub net_percent_change: Option<Decimal>,
    pub total_volume: Option<i64>,
}

/// Current quote for an underlying.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Quote {
    pub symbol: String,
    pub reference: QuoteReference,
    pub quote: QuoteFields,
}

impl Quote {
    /// Human readable title, e.g. `SPDR S&P 500 ETF (SPY)`.
    pub fn title(&self) -> String {
        match &self.reference.description {
            Some(description) if !description.is_empty() => {
                format!("{} ({})", description, self.symbol)
            }
            _ => self.symbol.clone(),
        }
    }
}

/// Gamma exposure at one strike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrikeGex {
    pub strike: Decimal,
    #[serde(rename = "callGEX")]
    pub call_gex: Decimal,
    #[serde(rename = "putGEX")]
    pub put_gex: Decimal,
    #[serde(rename = "absoluteGEX")]
    pub absolute_gex: Decimal,
    #[serde(rename = "openInterest")]
    pub open_interest: Decimal,
    #[serde(rename = "callVolume")]
    pub call_volume: Decimal,
    #[serde(rename = "putVolume")]
    pub put_volume: Decimal,
    #[serde(rename = "totalGEX")]
    pub total_gex: Decimal,
}

/// Aggregate gamma exposure across the selected expirations.
///
/// The server reports "no level found" as zero, see [`GexSnapshot::call_wall`] and friends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GexSnapshot {
    #[serde(rename = "totalCallGEX")]
    pub total_call_gex: Decimal,
    #[serde(rename = "totalPutGEX")]
    pub total_put_gex: Decimal,
    #[serde(rename = "totalGEX")]
    pub total_gex: Decimal,
    #[serde(rename = "callWall")]
    pub call_wall: Decimal,
    #[serde(rename = "putWall")]
    pub put_wall: Decimal,
    #[serde(rename = "flipPoint")]
    pub flip_point: Decimal,
    #[serde(rename = "spotPrice")]
    pub spot_price: Decimal,
    #[serde(rename = "gexPerStrike")]
    pub gex_per_strike: BTreeMap<Decimal, StrikeGex>,
}

impl GexSnapshot {
    pub fn call_wall(&self) -> Option<Decimal> {
        non_zero(self.call_wall)
    }

    pub fn put_wall(&self) -> Option<Decimal> {
        non_zero(self.put_wall)
    }

    pub fn flip_point(&self) -> Option<Decimal> {
        non_zero(self.flip_point)
    }

    pub fn spot_price(&self) -> Option<Decimal> {
        non_zero(self.spot_price)
    }

    /// Per-strike rows keyed by the map key, which wins over a missing `strike` field.
    pub fn strikes(&self) -> impl Iterator<Item = StrikeGex> + '_ {
        self.gex_per_strike.iter().map(|(strike, row)| StrikeGex {
            strike: *strike,
            ..row.clone()
        })
    }
}

fn non_zero(value: Decimal) -> Option<Decimal> {
    (!value.is_zero()).then_some(value)
}

/// Whether a snapshot reflects the current expirations or a frozen capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SnapshotSource {
    #[display("live")]
    Live,
    #[display("captured {_0}")]
    Historical(chrono::NaiveDateTime),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_gex_snapshot() {
        let json = r#"{
            "totalCallGEX": 1250000.5,
            "totalPutGEX": -980000.25,
            "totalGEX": 270000.25,
            "callWall": 455,
            "putWall": 440,
            "flipPoint": 0,
            "spotPrice": 450.12,
            "gexPerStrike": {
                "440": { "strike": 440, "callGEX": 1000, "putGEX": -5000, "totalGEX": -4000, "openInterest": 1200 },
                "455": { "strike": 455, "callGEX": 9000, "putGEX": -100, "totalGEX": 8900, "callVolume": 310 }
            }
        }"#;

        let snapshot: GexSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.total_gex, dec!(270000.25));
        assert_eq!(snapshot.call_wall(), Some(dec!(455)));
        assert_eq!(snapshot.put_wall(), Some(dec!(440)));
        assert_eq!(snapshot.flip_point(), None);
        assert_eq!(snapshot.gex_per_strike.len(), 2);

        let row = &snapshot.gex_per_strike[&dec!(440)];
        assert_eq!(row.total_gex, dec!(-4000));
        assert_eq!(row.open_interest, dec!(1200));
        assert_eq!(row.call_volume, Decimal::ZERO);
    }

    #[test]
    fn test_strikes_use_map_key() {
        let json = r#"{ "gexPerStrike": { "101.5": { "totalGEX": 3 } } }"#;
        let snapshot: GexSnapshot = serde_json::from_str(json).unwrap();

        let rows: Vec<StrikeGex> = snapshot.strikes().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].strike, dec!(101.5));
        assert_eq!(rows[0].total_gex, dec!(3));
    }

    #[test]
    fn test_price_history_envelope() {
        let json = r#"{
            "symbol": "SPY",
            "quoteStudies": [
                { "candle": { "open": 100, "high": 106, "low": 99, "close": 105, "volume": 1200, "datetimeISO8601": "2025-03-05T09:30:00" }, "studies": {} },
                { "studies": {} },
                { "candle": { "open": 105, "close": 104, "volume": 800, "datetimeISO8601": "2025-03-05T09:31:00" } },
                { "candle": { "open": 105, "high": 105.5, "low": 103, "close": 104, "volume": 900, "datetimeISO8601": "2025-03-05T09:32:00" } }
            ]
        }"#;

        let body: PriceHistoryBody = serde_json::from_str(json).unwrap();
        let bars = body.into_bars();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(105));
        assert!(bars[0].is_growing());
        assert_eq!(bars[1].timestamp, "2025-03-05T09:32:00");
        assert_eq!(bars[1].time_label(), "09:32:00");
        assert!(!bars[1].is_growing());
    }

    #[test]
    fn test_price_history_bare_array() {
        let json = r#"[
            { "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10, "timestamp": "2025-03-05T10:00:00" }
        ]"#;

        let bars = serde_json::from_str::<PriceHistoryBody>(json)
            .unwrap()
            .into_bars();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].low, dec!(0.5));
    }

    #[test]
    fn test_quote_title() {
        let json = r#"{
            "symbol": "SPY",
            "reference": { "description": "SPDR S&P 500 ETF" },
            "quote": { "closePrice": 450.5, "netChange": -1.25, "netPercentChange": -0.27, "totalVolume": 51000000 }
        }"#;

        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.title(), "SPDR S&P 500 ETF (SPY)");
        assert_eq!(quote.quote.close_price, Some(dec!(450.5)));
        assert_eq!(quote.quote.last_price, None);
        assert_eq!(quote.quote.total_volume, Some(51_000_000));

        let bare = Quote {
            symbol: "QQQ".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.title(), "QQQ");
    }

    #[test]
    fn test_snapshot_source_display() {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();
        assert_eq!(SnapshotSource::Live.to_string(), "live");
        assert_eq!(
            SnapshotSource::Historical(at).to_string(),
            "captured 2025-03-05 10:15:00"
        );
    }
}
