//! Candlestick glyph geometry.
//!
//! The host chart assigns each bar a box spanning its open/close range: `y` is the pixel row
//! of `close` and `y + height` the pixel row of `open`, so `height` is negative for falling
//! bars. From that box and the bar's OHLC values we derive the body outline and both wicks.

use gex_data::PriceBar;
use rust_decimal::prelude::ToPrimitive;

/// Pixel-space box assigned to one bar by the host renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BarBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// OHLC values feeding the geometry. Any missing field yields an empty glyph.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ohlc {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl From<&PriceBar> for Ohlc {
    fn from(bar: &PriceBar) -> Self {
        Self {
            open: bar.open.to_f64(),
            high: bar.high.to_f64(),
            low: bar.low.to_f64(),
            close: bar.close.to_f64(),
        }
    }
}

/// Vertical wick at `x` from the body edge (`y_start`) to the extreme value (`y_end`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wick {
    pub x: f64,
    pub y_start: f64,
    pub y_end: f64,
}

/// Straight line between two pixel positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleGeometry {
    pub outline: BarBounds,
    pub wick_upper: Wick,
    pub wick_lower: Wick,
    pub is_growing: bool,
    /// Pixels per unit of price
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandleGlyph {
    /// Nothing to draw: missing values, a flat bar, or non-finite geometry.
    Empty,
    Candle(CandleGeometry),
}

impl CandleGlyph {
    pub fn is_empty(&self) -> bool {
        matches!(self, CandleGlyph::Empty)
    }

    pub fn geometry(&self) -> Option<&CandleGeometry> {
        match self {
            CandleGlyph::Empty => None,
            CandleGlyph::Candle(geometry) => Some(geometry),
        }
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.geometry()
            .map(CandleGeometry::segments)
            .unwrap_or_default()
    }
}

impl CandleGeometry {
    /// Closed rectangle through the four box corners.
    pub fn outline_path(&self) -> [Segment; 4] {
        let BarBounds {
            x,
            y,
            width,
            height,
        } = self.outline;
        [
            Segment { x1: x, y1: y, x2: x, y2: y + height },
            Segment { x1: x, y1: y + height, x2: x + width, y2: y + height },
            Segment { x1: x + width, y1: y + height, x2: x + width, y2: y },
            Segment { x1: x + width, y1: y, x2: x, y2: y },
        ]
    }

    /// Outline followed by the lower and upper wick.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = self.outline_path().to_vec();
        for wick in [self.wick_lower, self.wick_upper] {
            segments.push(Segment {
                x1: wick.x,
                y1: wick.y_start,
                x2: wick.x,
                y2: wick.y_end,
            });
        }
        segments
    }
}

/// Compute the candle glyph for one bar.
pub fn candle_geometry(bounds: BarBounds, ohlc: Ohlc) -> CandleGlyph {
    let (Some(open), Some(high), Some(low), Some(close)) =
        (ohlc.open, ohlc.high, ohlc.low, ohlc.close)
    else {
        return CandleGlyph::Empty;
    };

    let BarBounds {
        x,
        y,
        width,
        height,
    } = bounds;

    let is_growing = open < close;
    // open == close divides by zero; the finiteness check below rejects it
    let ratio = (height / (open - close)).abs();
    let x_center = x + width / 2.0;

    let close_high = (close - high) * ratio;
    let close_low = (close - low) * ratio;
    let open_high = (open - high) * ratio;
    let open_low = (open - low) * ratio;

    let (wick_upper, wick_lower) = if is_growing {
        (
            Wick { x: x_center, y_start: y, y_end: y + close_high },
            Wick { x: x_center, y_start: y + height, y_end: y + height + open_low },
        )
    } else {
        (
            Wick { x: x_center, y_start: y + height, y_end: y + height + open_high },
            Wick { x: x_center, y_start: y, y_end: y + close_low },
        )
    };

    let all_finite = [
        x,
        y,
        width,
        height,
        ratio,
        x_center,
        wick_upper.y_end,
        wick_lower.y_end,
        wick_upper.y_start,
        wick_lower.y_start,
    ]
    .iter()
    .all(|value| value.is_finite());

    if !all_finite {
        return CandleGlyph::Empty;
    }

    CandleGlyph::Candle(CandleGeometry {
        outline: bounds,
        wick_upper,
        wick_lower,
        is_growing,
        ratio,
    })
}
