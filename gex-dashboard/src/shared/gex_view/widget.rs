//! Ratatui widgets for the GEX view

use std::ops::Range;

use gex_data::PriceBar;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Clear, Paragraph, Wrap,
    },
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::state::{ExpirationPicker, GexViewState, Phase};
use crate::shared::candle::{candle_geometry, BarBounds, Ohlc, Segment};
use crate::shared::format::{compact, currency, number, percentage};

const C_BUY: Color = Color::Rgb(100, 220, 100);
const C_SELL: Color = Color::Rgb(220, 100, 100);
const C_NEUTRAL: Color = Color::Rgb(180, 180, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

/// Canvas height in virtual pixels; width is one unit per bar
const CHART_HEIGHT: f64 = 100.0;

/// Header: title, symbol entry or quote line
pub fn render_header(f: &mut Frame, area: Rect, state: &GexViewState, symbol_input: Option<&str>) {
    let block = Block::default()
        .title(" GEX DASHBOARD ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans = Vec::new();

    if let Some(input) = symbol_input {
        spans.push(Span::styled("Symbol: ", Style::default().fg(C_DIM)));
        spans.push(Span::styled(
            format!("{input}█"),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled("  Enter apply · Esc cancel", Style::default().fg(C_DIM)));
    } else {
        match (&state.quote, &state.symbol) {
            (Some(quote), _) => {
                spans.push(Span::styled(
                    quote.title(),
                    Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
                ));

                let fields = &quote.quote;
                if let Some(last) = fields.last_price.or(fields.close_price) {
                    spans.push(Span::styled(
                        format!("  {}", currency(last)),
                        Style::default().fg(C_BRIGHT),
                    ));
                }
                if let Some(change) = fields.net_change {
                    let color = if change >= Decimal::ZERO { C_BUY } else { C_SELL };
                    let arrow = if change >= Decimal::ZERO { "▲" } else { "▼" };
                    let pct = fields
                        .net_percent_change
                        .map(|pct| format!(" ({})", percentage(pct)))
                        .unwrap_or_default();
                    spans.push(Span::styled(
                        format!("  {arrow}{}{pct}", currency(change)),
                        Style::default().fg(color),
                    ));
                }
                if let Some(volume) = fields.total_volume {
                    spans.push(Span::styled(
                        format!("  Vol {}", number(Decimal::from(volume))),
                        Style::default().fg(C_DIM),
                    ));
                }
            }
            (None, Some(symbol)) => {
                spans.push(Span::styled(symbol.clone(), Style::default().fg(C_BRIGHT)));
            }
            (None, None) => {
                spans.push(Span::styled("Press / to enter a symbol", Style::default().fg(C_DIM)));
            }
        }
    }

    if state.is_loading() {
        spans.push(Span::styled(
            format!("  ⟳ loading ({})", state.loading),
            Style::default().fg(C_NEUTRAL),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// Selected expirations, locked while a captured snapshot is shown
pub fn render_expirations(f: &mut Frame, area: Rect, state: &GexViewState) {
    let dates = if state.expirations_selected.is_empty() {
        "none".to_string()
    } else {
        state
            .expirations_selected
            .iter()
            .map(|date| date.format("%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut spans = vec![
        Span::styled("EXP  ", Style::default().fg(C_DIM)),
        Span::styled(dates, Style::default().fg(C_BRIGHT)),
    ];
    if state.expirations_locked() {
        spans.push(Span::styled("  🔒 locked to capture", Style::default().fg(C_NEUTRAL)));
    } else {
        spans.push(Span::styled("  [e] edit", Style::default().fg(C_DIM)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// History slider: gauge over captures followed by `Now`
pub fn render_slider(f: &mut Frame, area: Rect, state: &GexViewState) {
    let (phase_text, phase_color) = match state.phase {
        Phase::Live => ("LIVE", C_BUY),
        Phase::Scrubbing => ("SCRUB", C_NEUTRAL),
        Phase::Historical(_) => ("HIST", C_ACCENT),
    };

    let stops = state.scrub.available().len() + 1;
    let index = state.scrub.pending_index();
    let gauge_width = (area.width as usize).saturating_sub(46).max(10);

    let mut spans = vec![
        Span::styled(
            format!("{phase_text:<6}"),
            Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("◀ ", Style::default().fg(C_DIM)),
        Span::styled(slider_gauge(index, stops, gauge_width), Style::default().fg(phase_color)),
        Span::styled(" ▶ ", Style::default().fg(C_DIM)),
        Span::styled(
            state.scrub.pending.to_string(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" [{}/{}]", index + 1, stops), Style::default().fg(C_DIM)),
    ];
    if state.scrub.pending != state.scrub.committed {
        spans.push(Span::styled(
            format!("  showing {}", state.scrub.committed),
            Style::default().fg(C_DIM),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Content area: the error alert replaces it entirely
pub fn render_content(f: &mut Frame, area: Rect, state: &GexViewState) {
    if let Some(error) = &state.error {
        render_alert(f, area, error);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_gex_panel(f, chunks[0], state);
    render_candles(f, chunks[1], state);
}

pub fn render_alert(f: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .title(" ERROR ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_SELL));

    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(C_SELL).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Pick a symbol, edit expirations or move the slider to retry",
            Style::default().fg(C_DIM),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

/// GEX summary plus per-strike bars centred on the spot strike
pub fn render_gex_panel(f: &mut Frame, area: Rect, state: &GexViewState) {
    let block = Block::default()
        .title(format!(" GEX · {} ", state.snapshot_source))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(snapshot) = &state.snapshot else {
        let text = if state.is_loading() { "Loading GEX..." } else { "No GEX data" };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(C_DIM))),
            inner,
        );
        return;
    };

    let levels = state.levels();
    let level = |value: Option<Decimal>| value.map(number).unwrap_or_else(|| "--".to_string());
    let gex_color = |value: Decimal| if value >= Decimal::ZERO { C_BUY } else { C_SELL };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("NET ", Style::default().fg(C_DIM)),
            Span::styled(
                compact(snapshot.total_gex),
                Style::default()
                    .fg(gex_color(snapshot.total_gex))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  CALL ", Style::default().fg(C_DIM)),
            Span::styled(compact(snapshot.total_call_gex), Style::default().fg(C_BUY)),
            Span::styled("  PUT ", Style::default().fg(C_DIM)),
            Span::styled(compact(snapshot.total_put_gex), Style::default().fg(C_SELL)),
            Span::styled("  SPOT ", Style::default().fg(C_DIM)),
            Span::styled(
                snapshot
                    .spot_price()
                    .map(currency)
                    .unwrap_or_else(|| "--".to_string()),
                Style::default().fg(C_BRIGHT),
            ),
        ]),
        Line::from(vec![
            Span::styled("CW ", Style::default().fg(C_DIM)),
            Span::styled(level(levels.call_wall), Style::default().fg(C_BUY)),
            Span::styled("  PW ", Style::default().fg(C_DIM)),
            Span::styled(level(levels.put_wall), Style::default().fg(C_SELL)),
            Span::styled("  FLIP ", Style::default().fg(C_DIM)),
            Span::styled(level(levels.flip_point), Style::default().fg(C_NEUTRAL)),
        ]),
        Line::from(""),
    ];

    let rows = state.strike_rows();
    let spot_strike = state.spot_strike();
    let max_abs = rows
        .iter()
        .map(|row| row.total_gex.abs())
        .max()
        .and_then(|max| max.to_f64())
        .unwrap_or(0.0);

    let series = state.series;
    let extra_columns = [series.call, series.put, series.absolute, series.open_interest]
        .iter()
        .filter(|shown| **shown)
        .count()
        + if series.volume { 2 } else { 0 };
    let bar_width = (inner.width as usize)
        .saturating_sub(26 + extra_columns * 9)
        .max(10);

    let focus = spot_strike
        .and_then(|spot| rows.iter().position(|row| row.strike == spot))
        .unwrap_or(rows.len() / 2);
    let visible = (inner.height as usize).saturating_sub(lines.len());

    for row in &rows[visible_window(rows.len(), focus, visible)] {
        let total = row.total_gex.to_f64().unwrap_or(0.0);
        let mut spans = vec![
            Span::styled(format!("{:>8} ", number(row.strike)), Style::default().fg(C_BRIGHT)),
            Span::styled(
                gex_bar(total, max_abs, bar_width),
                Style::default().fg(gex_color(row.total_gex)),
            ),
            Span::styled(
                format!(" {:>8}", compact(row.total_gex)),
                Style::default().fg(gex_color(row.total_gex)),
            ),
        ];

        let columns = [
            (series.call, row.call_gex, C_BUY),
            (series.put, row.put_gex, C_SELL),
            (series.absolute, row.absolute_gex, C_ACCENT),
            (series.open_interest, row.open_interest, C_DIM),
            (series.volume, row.call_volume, C_BUY),
            (series.volume, row.put_volume, C_SELL),
        ];
        for (shown, value, color) in columns {
            if shown {
                spans.push(Span::styled(format!(" {:>8}", compact(value)), Style::default().fg(color)));
            }
        }

        let mut markers = Vec::new();
        if spot_strike == Some(row.strike) {
            markers.push(("◀ SPOT", C_BRIGHT));
        }
        if levels.call_wall == Some(row.strike) {
            markers.push(("CW", C_BUY));
        }
        if levels.put_wall == Some(row.strike) {
            markers.push(("PW", C_SELL));
        }
        if levels.flip_point == Some(row.strike) {
            markers.push(("FLIP", C_NEUTRAL));
        }
        for (marker, color) in markers {
            spans.push(Span::styled(
                format!(" {marker}"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
        }

        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Candlestick chart of the loaded price bars
pub fn render_candles(f: &mut Frame, area: Rect, state: &GexViewState) {
    let day = state
        .price_bars
        .first()
        .and_then(|bar| bar.timestamp.split_once('T'))
        .map(|(day, _)| day.to_string())
        .unwrap_or_default();

    // One terminal column per bar
    let capacity = (area.width as usize).saturating_sub(2).max(1);
    let bars = &state.price_bars[state.price_bars.len().saturating_sub(capacity)..];

    let Some(layout) = ChartLayout::fit(bars) else {
        let block = Block::default()
            .title(" PRICE ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_ACCENT));
        f.render_widget(
            Paragraph::new(Span::styled("No price history", Style::default().fg(C_DIM))).block(block),
            area,
        );
        return;
    };

    let block = Block::default()
        .title(format!(
            " PRICE {day}  H {}  L {} ",
            number(Decimal::try_from(layout.max).unwrap_or_default()),
            number(Decimal::try_from(layout.min).unwrap_or_default()),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let segments = candle_segments(bars, &layout);
    let levels = state.levels();
    let walls: Vec<(f64, Color)> = [
        (levels.call_wall, Color::Rgb(60, 140, 60)),
        (levels.put_wall, Color::Rgb(140, 60, 60)),
    ]
        .into_iter()
        .filter_map(|(level, color)| Some((level?.to_f64()?, color)))
        .filter(|(price, _)| (layout.min..=layout.max).contains(price))
        .map(|(price, color)| (layout.canvas_y(layout.price_to_y(price)), color))
        .collect();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, layout.width])
        .y_bounds([0.0, CHART_HEIGHT])
        .paint(|ctx| {
            for (y, color) in &walls {
                ctx.draw(&CanvasLine {
                    x1: 0.0,
                    y1: *y,
                    x2: layout.width,
                    y2: *y,
                    color: *color,
                });
            }
            for (segment, growing) in &segments {
                ctx.draw(&CanvasLine {
                    x1: segment.x1,
                    y1: layout.canvas_y(segment.y1),
                    x2: segment.x2,
                    y2: layout.canvas_y(segment.y2),
                    color: if *growing { C_BUY } else { C_SELL },
                });
            }
        });

    f.render_widget(canvas, area);
}

/// Expiration multi-select popup over `area`
pub fn render_expiration_picker(f: &mut Frame, area: Rect, picker: &ExpirationPicker) {
    let popup = centered(area, 34, 16);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(" EXPIRATIONS ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let mut lines: Vec<Line> = picker
        .options()
        .enumerate()
        .map(|(index, (date, checked))| {
            let cursor = if index == picker.cursor() { "›" } else { " " };
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if index == picker.cursor() {
                Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)
            } else if checked {
                Style::default().fg(C_BUY)
            } else {
                Style::default().fg(C_DIM)
            };
            Line::from(Span::styled(
                format!("{cursor} {mark} {}", date.format("%a %Y-%m-%d")),
                style,
            ))
        })
        .collect();

    if lines.is_empty() {
        lines.push(Line::from(Span::styled("No expirations", Style::default().fg(C_DIM))));
    }

    // Keep the cursor in view
    let height = popup.height.saturating_sub(3) as usize;
    let window = visible_window(lines.len(), picker.cursor(), height);
    let mut lines: Vec<Line> = lines.drain(window).collect();
    lines.push(Line::from(Span::styled(
        "↑↓ move · Space toggle · Enter apply",
        Style::default().fg(C_DIM),
    )));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Key help footer, with a rejected-action notice in front when present
pub fn render_help(f: &mut Frame, area: Rect, notice: Option<&str>) {
    let keys = [
        ("/", "symbol"),
        ("e", "expirations"),
        ("←→", "history"),
        ("c p a o v", "columns"),
        ("q", "quit"),
    ];

    let mut spans: Vec<Span> = notice
        .map(|notice| Span::styled(format!("{notice}  "), Style::default().fg(C_NEUTRAL)))
        .into_iter()
        .collect();
    spans.extend(keys.iter().flat_map(|(key, action)| {
        [
            Span::styled(format!(" {key} "), Style::default().fg(C_ACCENT)),
            Span::styled(format!("{action} "), Style::default().fg(C_DIM)),
        ]
    }));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Maps price bars onto a virtual pixel grid: one unit of width per bar,
/// `CHART_HEIGHT` rows with row 0 at the top (the highest price).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub min: f64,
    pub max: f64,
}

impl ChartLayout {
    /// Price range spanning every bar's low and high. `None` without usable bars.
    pub fn fit(bars: &[PriceBar]) -> Option<Self> {
        let lows = bars.iter().filter_map(PriceBar::low_f64);
        let highs = bars.iter().filter_map(PriceBar::high_f64);

        let min = lows.fold(f64::INFINITY, f64::min);
        let max = highs.fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        // Flat range still needs a scale
        let (min, max) = if max > min { (min, max) } else { (min - 1.0, max + 1.0) };

        Some(Self {
            width: bars.len() as f64,
            min,
            max,
        })
    }

    pub fn price_to_y(&self, price: f64) -> f64 {
        (self.max - price) / (self.max - self.min) * CHART_HEIGHT
    }

    /// Box for bar `index`: `y` at the close row, `y + height` at the open row.
    pub fn bar_bounds(&self, index: usize, open: f64, close: f64) -> BarBounds {
        let y = self.price_to_y(close);
        BarBounds {
            x: index as f64 + 0.2,
            y,
            width: 0.6,
            height: self.price_to_y(open) - y,
        }
    }

    /// Canvas y grows upward
    pub fn canvas_y(&self, y: f64) -> f64 {
        CHART_HEIGHT - y
    }
}

/// Segments for every drawable bar, tagged with whether the bar closed up.
pub fn candle_segments(bars: &[PriceBar], layout: &ChartLayout) -> Vec<(Segment, bool)> {
    bars.iter()
        .enumerate()
        .flat_map(|(index, bar)| {
            let ohlc = Ohlc::from(bar);
            let glyph = match (ohlc.open, ohlc.close) {
                (Some(open), Some(close)) => {
                    candle_geometry(layout.bar_bounds(index, open, close), ohlc)
                }
                _ => return Vec::new(),
            };
            let growing = glyph.geometry().is_some_and(|geometry| geometry.is_growing);
            glyph
                .segments()
                .into_iter()
                .map(|segment| (segment, growing))
                .collect()
        })
        .collect()
}

/// Bar that fills from the centre toward `value`, scaled so `max_abs` reaches the edge
pub fn gex_bar(value: f64, max_abs: f64, width: usize) -> String {
    if width < 5 {
        return String::new();
    }

    let center = width / 2;
    let reach = if max_abs > 0.0 {
        ((value.abs() / max_abs) * center as f64).round() as usize
    } else {
        0
    }
    .min(center);

    let mut bar = String::with_capacity(width * 3);
    for i in 0..width {
        let filled = if value < 0.0 {
            i < center && i >= center - reach
        } else {
            i > center && i <= center + reach
        };

        if i == center {
            bar.push('│');
        } else if filled {
            bar.push('█');
        } else {
            bar.push('░');
        }
    }
    bar
}

/// Window of `len` items, at most `height` long, keeping `focus` as central as possible.
pub fn visible_window(len: usize, focus: usize, height: usize) -> Range<usize> {
    if len <= height {
        return 0..len;
    }

    let start = focus.saturating_sub(height / 2).min(len - height);
    start..start + height
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Slider gauge: `●` at the pending stop on a `═` track
fn slider_gauge(index: usize, stops: usize, width: usize) -> String {
    let position = if stops > 1 {
        (index * (width - 1)) / (stops - 1)
    } else {
        width - 1
    };

    (0..width)
        .map(|i| if i == position { '●' } else { '═' })
        .collect()
}
