//! Time-scrub coordinator for the GEX view.
//!
//! Owns the [`GexViewState`] and turns user actions (symbol, expirations, slider) into fetches
//! against a [`GexSource`]. Fetches run as tokio tasks and report back over an mpsc channel;
//! the caller feeds those events through [`GexCoordinator::drain`] or [`GexCoordinator::settle`].
//!
//! Every fetch carries a [`Ticket`] naming the state slot it writes and the generation of that
//! slot when it was issued. A newer action on the same slot bumps the generation, so late
//! responses for superseded requests are dropped instead of overwriting newer state.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use gex_data::{ApiError, GexSnapshot, GexSource, PriceBar, Quote, SnapshotSource};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::scrub::{DebounceTimer, Selection, DEFAULT_DEBOUNCE};
use super::state::{GexViewState, Phase};
use crate::shared::expirations::default_expirations;

/// Coordinator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Quiet period after the last slider movement before it is committed
    pub debounce: Duration,
    /// How far back capture timestamps are requested
    pub history_lookback: TimeDelta,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            history_lookback: TimeDelta::days(30),
        }
    }
}

impl CoordinatorConfig {
    /// Defaults overridden by `GEX_DEBOUNCE_MS` and `GEX_HISTORY_DAYS` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(millis) = env_number("GEX_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(millis);
        }
        if let Some(days) = env_number("GEX_HISTORY_DAYS").and_then(|days| i64::try_from(days).ok()) {
            if let Some(lookback) = TimeDelta::try_days(days) {
                config.history_lookback = lookback;
            }
        }

        config
    }

    /// Set debounce delay
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set history lookback window
    pub fn with_history_lookback(mut self, lookback: TimeDelta) -> Self {
        self.history_lookback = lookback;
        self
    }
}

fn env_number(key: &str) -> Option<u64> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!(%key, %value, "Ignoring non-numeric environment override");
            None
        }
    }
}

/// Rejected user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("expirations are fixed while a historical snapshot is shown")]
    ExpirationsLocked,

    #[error("no symbol selected")]
    NoSymbol,
}

/// State slot a fetch writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Expiration list and capture timestamps
    Symbol,
    /// Quote and GEX snapshot
    Snapshot,
    /// Price bars
    Chart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Quote,
    LiveGex,
    HistoricalGex,
    Expirations,
    HistoryTimestamps,
    PriceHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Quote(Quote),
    LiveGex(GexSnapshot),
    HistoricalGex {
        at: NaiveDateTime,
        snapshot: GexSnapshot,
    },
    Expirations(Vec<NaiveDate>),
    HistoryTimestamps(Vec<NaiveDateTime>),
    PriceHistory(Vec<PriceBar>),
}

#[derive(Debug)]
pub struct FetchResult {
    pub ticket: Ticket,
    pub request: Request,
    pub outcome: Result<Fetched, ApiError>,
}

#[derive(Debug)]
pub enum CoordinatorEvent {
    Fetched(FetchResult),
    DebounceElapsed { token: u64 },
}

/// Current generation per slot
#[derive(Debug, Clone, Copy, Default)]
struct Generations {
    symbol: u64,
    snapshot: u64,
    chart: u64,
}

impl Generations {
    fn bump(&mut self, slot: Slot) -> Ticket {
        let generation = match slot {
            Slot::Symbol => &mut self.symbol,
            Slot::Snapshot => &mut self.snapshot,
            Slot::Chart => &mut self.chart,
        };
        *generation += 1;
        Ticket {
            slot,
            generation: *generation,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        let current = match ticket.slot {
            Slot::Symbol => self.symbol,
            Slot::Snapshot => self.snapshot,
            Slot::Chart => self.chart,
        };
        current == ticket.generation
    }
}

/// A transition whose snapshot has not arrived yet
#[derive(Debug, Clone)]
struct PendingCommit {
    previous: Selection,
    /// Bars shown before the commit replaced the chart, if it did
    previous_bars: Option<Vec<PriceBar>>,
    /// Expirations selected before an expiration change, if one is in flight
    previous_expirations: Option<Vec<NaiveDate>>,
}

impl PendingCommit {
    fn starting_at(committed: Selection) -> Self {
        Self {
            previous: committed,
            previous_bars: None,
            previous_expirations: None,
        }
    }
}

pub struct GexCoordinator<S> {
    source: Arc<S>,
    config: CoordinatorConfig,
    state: GexViewState,
    event_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    event_rx: mpsc::UnboundedReceiver<CoordinatorEvent>,
    debounce: DebounceTimer,
    generations: Generations,
    pending_commit: Option<PendingCommit>,
    /// Viewer's local date at the last symbol selection
    today: Option<NaiveDate>,
}

impl<S> GexCoordinator<S>
where
    S: GexSource,
{
    pub fn new(source: Arc<S>, config: CoordinatorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            source,
            config,
            state: GexViewState::default(),
            event_tx,
            event_rx,
            debounce: DebounceTimer::new(config.debounce),
            generations: Generations::default(),
            pending_commit: None,
            today: None,
        }
    }

    pub fn state(&self) -> &GexViewState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GexViewState {
        &mut self.state
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Switch to `symbol`, resetting to the live view with default expirations for `now`.
    pub fn select_symbol(
        &mut self,
        symbol: &str,
        now: NaiveDateTime,
    ) -> Result<(), CoordinatorError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoordinatorError::NoSymbol);
        }

        self.debounce.cancel();
        self.pending_commit = None;

        let today = now.date();
        let expirations = default_expirations(today);
        info!(%symbol, ?expirations, "Selecting symbol");

        self.today = Some(today);
        self.state.reset_for_symbol(symbol.clone(), expirations);

        let ticket = self.generations.bump(Slot::Symbol);
        let owned = symbol.clone();
        self.spawn_fetch(ticket, Request::Expirations, move |source| async move {
            source.expirations(&owned).await.map(Fetched::Expirations)
        });

        let start = now
            .checked_sub_signed(self.config.history_lookback)
            .unwrap_or(now);
        self.spawn_fetch(ticket, Request::HistoryTimestamps, move |source| async move {
            source
                .history_timestamps(&symbol, start, now)
                .await
                .map(Fetched::HistoryTimestamps)
        });

        self.fetch_live();
        self.fetch_price_history(today);

        Ok(())
    }

    /// Replace the selected expirations and refresh the live snapshot and quote.
    pub fn select_expirations(&mut self, dates: Vec<NaiveDate>) -> Result<(), CoordinatorError> {
        if self.state.symbol.is_none() {
            return Err(CoordinatorError::NoSymbol);
        }
        if self.state.expirations_locked() {
            return Err(CoordinatorError::ExpirationsLocked);
        }

        info!(expirations = ?dates, "Selecting expirations");
        self.state.error = None;

        let previous = std::mem::replace(&mut self.state.expirations_selected, dates);
        let mut pending = self
            .pending_commit
            .take()
            .unwrap_or_else(|| PendingCommit::starting_at(self.state.scrub.committed));
        pending.previous_expirations.get_or_insert(previous);
        self.pending_commit = Some(pending);

        self.fetch_live();

        Ok(())
    }

    /// Move the slider thumb. The selection is committed once the slider rests for the debounce period.
    pub fn move_slider(&mut self, selection: Selection) -> Result<(), CoordinatorError> {
        if self.state.symbol.is_none() {
            return Err(CoordinatorError::NoSymbol);
        }

        self.state.error = None;
        self.state.scrub.pending = selection;
        self.state.phase = Phase::Scrubbing;

        let tx = self.event_tx.clone();
        self.debounce.schedule(move |token| {
            let _ = tx.send(CoordinatorEvent::DebounceElapsed { token });
        });

        Ok(())
    }

    /// Move the slider `delta` stops from the pending selection.
    pub fn step_slider(&mut self, delta: isize) -> Result<(), CoordinatorError> {
        let selection = self.state.scrub.step(delta);
        self.move_slider(selection)
    }

    /// Apply every event that is already waiting. Returns true if anything was applied.
    pub fn drain(&mut self) -> bool {
        let mut applied = false;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            applied = true;
        }
        applied
    }

    /// Process events until no fetch or debounce is outstanding.
    pub async fn settle(&mut self) {
        while self.state.is_loading() || self.debounce.is_pending() {
            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    /// Cancel the pending commit and stop accepting fetch results.
    pub fn teardown(&mut self) {
        self.debounce.cancel();
        self.event_rx.close();
    }

    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::DebounceElapsed { token } => {
                if self.debounce.accept(token) {
                    self.commit();
                } else {
                    debug!(token, "Ignoring superseded debounce");
                }
            }
            CoordinatorEvent::Fetched(result) => self.apply(result),
        }
    }

    fn commit(&mut self) {
        let Some(symbol) = self.state.symbol.clone() else {
            return;
        };

        let selection = self.state.scrub.pending;
        info!(%symbol, %selection, "Committing slider selection");

        // A commit still in flight never reached the screen; roll back past it
        let mut pending = self
            .pending_commit
            .take()
            .unwrap_or_else(|| PendingCommit::starting_at(self.state.scrub.committed));
        self.state.scrub.committed = selection;

        match selection {
            Selection::Now => {
                self.state.phase = Phase::Live;
                self.fetch_live();

                // Leaving a captured day, or superseding a commit that requested one,
                // puts the current session back on the chart
                let chart_replaced =
                    pending.previous.timestamp().is_some() || pending.previous_bars.is_some();
                if let Some(today) = self.today.filter(|_| chart_replaced) {
                    pending
                        .previous_bars
                        .get_or_insert_with(|| self.state.price_bars.clone());
                    self.fetch_price_history(today);
                }
            }
            Selection::At(at) => {
                self.state.phase = Phase::Historical(at);

                let ticket = self.generations.bump(Slot::Snapshot);
                self.spawn_fetch(ticket, Request::HistoricalGex, move |source| async move {
                    source
                        .historical_gex(&symbol, at)
                        .await
                        .map(|snapshot| Fetched::HistoricalGex { at, snapshot })
                });

                pending
                    .previous_bars
                    .get_or_insert_with(|| self.state.price_bars.clone());
                self.fetch_price_history(at.date());
            }
        }

        self.pending_commit = Some(pending);
    }

    fn apply(&mut self, result: FetchResult) {
        let FetchResult {
            ticket,
            request,
            outcome,
        } = result;

        self.state.loading = self.state.loading.saturating_sub(1);

        if !self.generations.is_current(ticket) {
            debug!(?request, ?ticket, "Discarding stale response");
            return;
        }

        let fetched = match outcome {
            Ok(fetched) => fetched,
            Err(error) => {
                error!(?request, %error, "Fetch failed");
                self.state.error = Some(error.to_string());
                if ticket.slot == Slot::Snapshot {
                    self.rollback();
                }
                return;
            }
        };

        match fetched {
            Fetched::Quote(quote) => {
                self.state.quote = Some(quote);
            }
            Fetched::LiveGex(snapshot) => {
                debug!(strikes = snapshot.gex_per_strike.len(), "Live snapshot received");
                self.state.snapshot = Some(snapshot);
                self.state.snapshot_source = SnapshotSource::Live;
                self.pending_commit = None;
            }
            Fetched::HistoricalGex { at, snapshot } => {
                debug!(%at, strikes = snapshot.gex_per_strike.len(), "Historical snapshot received");
                self.state.snapshot = Some(snapshot);
                self.state.snapshot_source = SnapshotSource::Historical(at);
                self.pending_commit = None;
            }
            Fetched::Expirations(expirations) => {
                self.state.expirations_available = expirations;
            }
            Fetched::HistoryTimestamps(timestamps) => {
                debug!(count = timestamps.len(), "Capture timestamps received");
                self.state.scrub.set_available(&timestamps);
            }
            Fetched::PriceHistory(bars) => {
                self.state.price_bars = bars;
            }
        }
    }

    /// Abort the outstanding transition, restoring the selection and expirations whose snapshot
    /// is still on screen.
    fn rollback(&mut self) {
        let Some(pending) = self.pending_commit.take() else {
            return;
        };

        warn!(restored = %pending.previous, "Rolling back pending transition");

        // Drop whatever the failed commit still has in flight
        self.generations.bump(Slot::Snapshot);
        if let Some(bars) = pending.previous_bars {
            self.generations.bump(Slot::Chart);
            self.state.price_bars = bars;
        }
        if let Some(expirations) = pending.previous_expirations {
            self.state.expirations_selected = expirations;
        }

        self.state.scrub.committed = pending.previous;
        self.state.scrub.pending = pending.previous;
        self.state.phase = match pending.previous {
            Selection::Now => Phase::Live,
            Selection::At(at) => Phase::Historical(at),
        };
    }

    fn fetch_live(&mut self) {
        let Some(symbol) = self.state.symbol.clone() else {
            return;
        };
        let ticket = self.generations.bump(Slot::Snapshot);

        let owned = symbol.clone();
        self.spawn_fetch(ticket, Request::Quote, move |source| async move {
            source.quote(&owned).await.map(Fetched::Quote)
        });

        let expirations = self.state.expirations_selected.clone();
        self.spawn_fetch(ticket, Request::LiveGex, move |source| async move {
            source
                .live_gex(&symbol, &expirations)
                .await
                .map(Fetched::LiveGex)
        });
    }

    fn fetch_price_history(&mut self, day: NaiveDate) {
        let Some(symbol) = self.state.symbol.clone() else {
            return;
        };
        let ticket = self.generations.bump(Slot::Chart);

        self.spawn_fetch(ticket, Request::PriceHistory, move |source| async move {
            source
                .price_history(&symbol, day, day)
                .await
                .map(Fetched::PriceHistory)
        });
    }

    fn spawn_fetch<F, Fut>(&mut self, ticket: Ticket, request: Request, fetch: F)
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: Future<Output = Result<Fetched, ApiError>> + Send + 'static,
    {
        self.state.loading += 1;

        let tx = self.event_tx.clone();
        let fetch = fetch(Arc::clone(&self.source));
        tokio::spawn(async move {
            let outcome = fetch.await;
            let _ = tx.send(CoordinatorEvent::Fetched(FetchResult {
                ticket,
                request,
                outcome,
            }));
        });
    }
}
