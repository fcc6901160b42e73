//! REST client for the dashboard API.
//!
//! All endpoints are read-only `GET`s under `/api/v1`. Non-2xx responses carry a
//! `{"message": "..."}` body which is surfaced through [`ApiError::Api`].

use crate::{
    error::ApiError,
    model::{GexSnapshot, PriceBar, PriceHistoryBody, Quote},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Date format used in query strings and expiration lists.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local date-time format; fractional seconds are only printed when present so a
/// capture timestamp round-trips exactly.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// REST client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dashboard API server
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with custom base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read `GEX_API_URL` from the environment, falling back to the default.
    pub fn from_env() -> Self {
        std::env::var("GEX_API_URL")
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// One API endpoint with its parameters.
#[derive(Debug, Clone, Copy)]
pub enum Endpoint<'a> {
    Quote {
        symbol: &'a str,
    },
    LiveGex {
        symbol: &'a str,
        expirations: &'a [NaiveDate],
    },
    Expirations {
        symbol: &'a str,
    },
    HistoryTimestamps {
        symbol: &'a str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    HistoricalGex {
        symbol: &'a str,
        at: NaiveDateTime,
    },
    PriceHistory {
        symbol: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Endpoint<'_> {
    /// Resolve the endpoint against the API base URL.
    pub fn url(&self, base: &Url) -> Result<Url, ApiError> {
        let mut url = base.clone();
        url.set_query(None);

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Url(format!("cannot be a base: {base}")))?;
            segments.pop_if_empty().extend(["api", "v1"]);

            match *self {
                Endpoint::Quote { .. } => {
                    segments.push("price");
                }
                Endpoint::LiveGex { symbol, .. } => {
                    segments.extend(["gex", symbol]);
                }
                Endpoint::Expirations { symbol } => {
                    segments.extend(["gex", "expirations", symbol]);
                }
                Endpoint::HistoryTimestamps { symbol, .. } => {
                    segments.extend(["gex", "history", "datetimes", symbol]);
                }
                Endpoint::HistoricalGex { symbol, .. } => {
                    segments.extend(["gex", "history", symbol]);
                }
                Endpoint::PriceHistory { symbol, .. } => {
                    segments.extend(["price-history", symbol]);
                }
            }
        }

        match *self {
            Endpoint::Quote { symbol } => {
                url.query_pairs_mut().append_pair("symbol", symbol);
            }
            Endpoint::LiveGex { expirations, .. } => {
                let mut query = url.query_pairs_mut();
                query.append_pair("suppressDetails", "true");
                for expiration in expirations.iter() {
                    query.append_pair("expDate", &expiration.format(DATE_FORMAT).to_string());
                }
            }
            Endpoint::HistoryTimestamps { start, end, .. } => {
                url.query_pairs_mut()
                    .append_pair("start", &start.format(DATE_TIME_FORMAT).to_string())
                    .append_pair("end", &end.format(DATE_TIME_FORMAT).to_string());
            }
            Endpoint::HistoricalGex { at, .. } => {
                url.query_pairs_mut()
                    .append_pair("dateTime", &at.format(DATE_TIME_FORMAT).to_string());
            }
            Endpoint::PriceHistory { start, end, .. } => {
                url.query_pairs_mut()
                    .append_pair("start", &start.format(DATE_FORMAT).to_string())
                    .append_pair("end", &end.format(DATE_FORMAT).to_string());
            }
            Endpoint::Expirations { .. } => {}
        }

        Ok(url)
    }
}

/// Parse a server local date-time. Seconds are optional because the server drops `:00`.
pub fn parse_local_date_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Source of quotes, GEX snapshots and price history.
#[async_trait]
pub trait GexSource: Send + Sync + 'static {
    async fn quote(&self, symbol: &str) -> Result<Quote, ApiError>;

    async fn live_gex(
        &self,
        symbol: &str,
        expirations: &[NaiveDate],
    ) -> Result<GexSnapshot, ApiError>;

    async fn expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, ApiError>;

    async fn history_timestamps(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, ApiError>;

    async fn historical_gex(
        &self,
        symbol: &str,
        at: NaiveDateTime,
    ) -> Result<GexSnapshot, ApiError>;

    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ApiError>;
}

/// [`GexSource`] backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
}

impl RestClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T, ApiError> {
        let url = endpoint.url(&self.base)?;
        debug!(%url, "GET");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_error_body(status.as_u16(), &body);
            warn!(%url, status = status.as_u16(), %error, "API request failed");
            return Err(error);
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GexSource for RestClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, ApiError> {
        self.get(Endpoint::Quote { symbol }).await
    }

    async fn live_gex(
        &self,
        symbol: &str,
        expirations: &[NaiveDate],
    ) -> Result<GexSnapshot, ApiError> {
        self.get(Endpoint::LiveGex {
            symbol,
            expirations,
        })
        .await
    }

    async fn expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, ApiError> {
        self.get(Endpoint::Expirations { symbol }).await
    }

    async fn history_timestamps(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, ApiError> {
        let raw: Vec<String> = self
            .get(Endpoint::HistoryTimestamps { symbol, start, end })
            .await?;

        Ok(raw
            .iter()
            .filter_map(|value| {
                let parsed = parse_local_date_time(value);
                if parsed.is_none() {
                    warn!(%value, "Skipping unparseable GEX capture timestamp");
                }
                parsed
            })
            .collect())
    }

    async fn historical_gex(
        &self,
        symbol: &str,
        at: NaiveDateTime,
    ) -> Result<GexSnapshot, ApiError> {
        self.get(Endpoint::HistoricalGex { symbol, at }).await
    }

    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ApiError> {
        let body: PriceHistoryBody = self
            .get(Endpoint::PriceHistory { symbol, start, end })
            .await?;
        Ok(body.into_bars())
    }
}
