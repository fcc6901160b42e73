//! View state for the GEX dashboard

use chrono::{NaiveDate, NaiveDateTime};
use gex_data::{nearest_strike, GexLevels, GexSnapshot, PriceBar, Quote, SnapshotSource, StrikeGex};
use rust_decimal::Decimal;

use super::scrub::TimeScrubState;

/// Where the view sits in the live / scrub / history cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tracking the current symbol and expirations
    Live,
    /// Slider moved, waiting for the debounce to commit
    Scrubbing,
    /// A captured snapshot was committed
    Historical(NaiveDateTime),
}

/// Optional per-strike columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesToggles {
    pub call: bool,
    pub put: bool,
    pub absolute: bool,
    pub open_interest: bool,
    pub volume: bool,
}

impl Default for SeriesToggles {
    fn default() -> Self {
        Self {
            call: true,
            put: true,
            absolute: false,
            open_interest: false,
            volume: false,
        }
    }
}

impl SeriesToggles {
    /// Flip the column bound to `key`. Returns false for unbound keys.
    pub fn toggle(&mut self, key: char) -> bool {
        let flag = match key {
            'c' => &mut self.call,
            'p' => &mut self.put,
            'a' => &mut self.absolute,
            'o' => &mut self.open_interest,
            'v' => &mut self.volume,
            _ => return false,
        };
        *flag = !*flag;
        true
    }
}

/// Everything the GEX view renders
#[derive(Debug, Clone, PartialEq)]
pub struct GexViewState {
    pub symbol: Option<String>,
    pub quote: Option<Quote>,

    // Expirations
    pub expirations_available: Vec<NaiveDate>,
    pub expirations_selected: Vec<NaiveDate>,

    // History slider
    pub scrub: TimeScrubState,
    pub phase: Phase,

    // Last good snapshot and what it reflects
    pub snapshot: Option<GexSnapshot>,
    pub snapshot_source: SnapshotSource,

    pub price_bars: Vec<PriceBar>,

    pub error: Option<String>,
    /// In-flight fetch count
    pub loading: usize,

    pub series: SeriesToggles,
}

impl Default for GexViewState {
    fn default() -> Self {
        Self {
            symbol: None,
            quote: None,
            expirations_available: Vec::new(),
            expirations_selected: Vec::new(),
            scrub: TimeScrubState::default(),
            phase: Phase::Live,
            snapshot: None,
            snapshot_source: SnapshotSource::Live,
            price_bars: Vec::new(),
            error: None,
            loading: 0,
            series: SeriesToggles::default(),
        }
    }
}

impl GexViewState {
    /// Clear everything tied to the previous symbol. Series toggles and the loading count survive.
    pub fn reset_for_symbol(&mut self, symbol: String, expirations: Vec<NaiveDate>) {
        *self = Self {
            symbol: Some(symbol),
            expirations_selected: expirations,
            loading: self.loading,
            series: self.series,
            ..Self::default()
        };
    }

    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }

    /// The expiration picker is disabled while a captured snapshot is committed.
    pub fn expirations_locked(&self) -> bool {
        !self.scrub.committed.is_now()
    }

    /// Per-strike rows, highest strike first. Built fresh; the snapshot stays untouched.
    pub fn strike_rows(&self) -> Vec<StrikeGex> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };

        let mut rows: Vec<StrikeGex> = snapshot.strikes().collect();
        rows.sort_by(|a, b| b.strike.cmp(&a.strike));
        rows
    }

    /// Strike closest to spot; marks the spot row in the per-strike view.
    pub fn spot_strike(&self) -> Option<Decimal> {
        let snapshot = self.snapshot.as_ref()?;
        let spot = snapshot.spot_price()?;
        // Descending so ties keep the higher strike
        nearest_strike(snapshot.gex_per_strike.keys().rev(), spot)
    }

    pub fn levels(&self) -> GexLevels {
        self.snapshot
            .as_ref()
            .map(GexLevels::resolve)
            .unwrap_or_default()
    }
}

/// Multi-select over expiration dates, open while the picker popup is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationPicker {
    options: Vec<NaiveDate>,
    checked: Vec<bool>,
    cursor: usize,
}

impl ExpirationPicker {
    /// Options are the fetched dates plus any selected date the server did not list.
    pub fn new(available: &[NaiveDate], selected: &[NaiveDate]) -> Self {
        let mut options: Vec<NaiveDate> = available.iter().chain(selected).copied().collect();
        options.sort_unstable();
        options.dedup();

        let checked = options.iter().map(|date| selected.contains(date)).collect();
        Self {
            options,
            checked,
            cursor: 0,
        }
    }

    pub fn options(&self) -> impl Iterator<Item = (NaiveDate, bool)> + '_ {
        self.options.iter().copied().zip(self.checked.iter().copied())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.options.len().saturating_sub(1) as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    pub fn toggle(&mut self) {
        if let Some(checked) = self.checked.get_mut(self.cursor) {
            *checked = !*checked;
        }
    }

    /// Checked dates in calendar order
    pub fn selection(&self) -> Vec<NaiveDate> {
        self.options()
            .filter_map(|(date, checked)| checked.then_some(date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::gex_view::scrub::Selection;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn snapshot(rows: &[(Decimal, Decimal)], spot: Decimal) -> GexSnapshot {
        let gex_per_strike: BTreeMap<Decimal, StrikeGex> = rows
            .iter()
            .map(|(strike, total)| {
                (
                    *strike,
                    StrikeGex {
                        strike: *strike,
                        total_gex: *total,
                        ..Default::default()
                    },
                )
            })
            .collect();

        GexSnapshot {
            spot_price: spot,
            gex_per_strike,
            ..Default::default()
        }
    }

    #[test]
    fn test_strike_rows_descending_without_mutation() {
        let state = GexViewState {
            snapshot: Some(snapshot(
                &[(dec!(440), dec!(-10)), (dec!(450), dec!(5)), (dec!(445), dec!(1))],
                dec!(446),
            )),
            ..Default::default()
        };

        let strikes: Vec<Decimal> = state.strike_rows().iter().map(|row| row.strike).collect();
        assert_eq!(strikes, vec![dec!(450), dec!(445), dec!(440)]);

        let stored: Vec<Decimal> = state
            .snapshot
            .as_ref()
            .unwrap()
            .gex_per_strike
            .keys()
            .copied()
            .collect();
        assert_eq!(stored, vec![dec!(440), dec!(445), dec!(450)]);
    }

    #[test]
    fn test_spot_strike() {
        struct TestCase {
            spot: Decimal,
            expected: Option<Decimal>,
        }

        let strikes = [(dec!(440), dec!(1)), (dec!(445), dec!(1)), (dec!(450), dec!(1))];

        let tests = vec![
            TestCase {
                // TC0: closest strike below spot
                spot: dec!(446.1),
                expected: Some(dec!(445)),
            },
            TestCase {
                // TC1: halfway keeps the higher strike
                spot: dec!(447.5),
                expected: Some(dec!(450)),
            },
            TestCase {
                // TC2: zero spot means unknown
                spot: dec!(0),
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let state = GexViewState {
                snapshot: Some(snapshot(&strikes, test.spot)),
                ..Default::default()
            };
            assert_eq!(state.spot_strike(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_levels_fill_zero_server_values() {
        let mut gex = snapshot(
            &[
                (dec!(430), dec!(-50)),
                (dec!(440), dec!(-20)),
                (dec!(450), dec!(15)),
                (dec!(460), dec!(40)),
            ],
            dec!(445),
        );
        gex.call_wall = dec!(455);

        let state = GexViewState {
            snapshot: Some(gex),
            ..Default::default()
        };
        let levels = state.levels();

        assert_eq!(levels.call_wall, Some(dec!(455)));
        assert_eq!(levels.put_wall, Some(dec!(430)));
        assert_eq!(levels.flip_point, Some(dec!(450)));
        assert_eq!(GexViewState::default().levels(), GexLevels::default());
    }

    #[test]
    fn test_reset_for_symbol_keeps_toggles() {
        let mut state = GexViewState {
            quote: Some(Quote::default()),
            error: Some("boom".to_string()),
            loading: 2,
            ..Default::default()
        };
        state.series.toggle('o');
        state.scrub.committed = Selection::At(NaiveDateTime::default());

        let expirations = vec![NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()];
        state.reset_for_symbol("QQQ".to_string(), expirations.clone());

        assert_eq!(state.symbol.as_deref(), Some("QQQ"));
        assert_eq!(state.expirations_selected, expirations);
        assert!(state.quote.is_none() && state.error.is_none());
        assert_eq!(state.loading, 2);
        assert!(state.series.open_interest);
        assert!(!state.expirations_locked());
    }

    #[test]
    fn test_series_toggle_keys() {
        let mut series = SeriesToggles::default();
        assert!(series.toggle('c'));
        assert!(!series.call);
        assert!(series.toggle('v'));
        assert!(series.volume);
        assert!(!series.toggle('x'));
    }

    #[test]
    fn test_expiration_picker() {
        let day = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let mut picker = ExpirationPicker::new(&[day(7), day(14), day(21)], &[day(5), day(21)]);

        let options: Vec<(NaiveDate, bool)> = picker.options().collect();
        assert_eq!(
            options,
            vec![(day(5), true), (day(7), false), (day(14), false), (day(21), true)]
        );

        picker.move_cursor(-3);
        assert_eq!(picker.cursor(), 0);
        picker.toggle();
        picker.move_cursor(2);
        picker.toggle();
        picker.move_cursor(10);
        assert_eq!(picker.cursor(), 3);

        assert_eq!(picker.selection(), vec![day(14), day(21)]);
    }

    #[test]
    fn test_empty_expiration_picker() {
        let mut picker = ExpirationPicker::new(&[], &[]);
        picker.move_cursor(1);
        picker.toggle();
        assert_eq!(picker.cursor(), 0);
        assert!(picker.selection().is_empty());
    }
}
