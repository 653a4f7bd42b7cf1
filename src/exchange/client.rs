//! Smarkets exchange client and the `ExchangeProvider` seam.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::types::{
    is_match_winner_market, lay_price_from_bids, ContractsResponse, EventsResponse,
    ExchangeContract, ExchangeEvent, MarketsResponse, PopularEventIdsResponse, QuotesResponse,
};
use crate::config::Config;
use crate::error::ProviderError;
use crate::metrics;
use crate::odds::Venue;

/// Source of exchange events and lay prices.
///
/// Fetching is a fan-out: one listing call, then several calls per event.
#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    /// Ids of events currently worth scanning.
    async fn popular_event_ids(&self) -> Result<Vec<String>, ProviderError>;

    /// Event details with match-winner contracts and lay prices.
    async fn event_book(&self, event_id: &str) -> Result<ExchangeEvent, ProviderError>;
}

/// HTTP client for the Smarkets v3 API.
#[derive(Debug, Clone)]
pub struct SmarketsClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, e.g. `https://api.smarkets.com/v3`.
    base_url: String,
    /// Venue attached to every quote.
    venue: Venue,
}

impl SmarketsClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.exchange_api_url.trim_end_matches('/').to_string(),
            venue: Venue::new("smarkets", "Smarkets"),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        target: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        metrics::record_http_latency(start, "exchange");

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, target = %target, "Exchange request failed");
            return Err(ProviderError::FetchFailed {
                target: target.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse {} response: {}", target, e))
        })
    }

    async fn market_contracts(
        &self,
        market_id: &str,
    ) -> Result<Vec<ExchangeContract>, ProviderError> {
        let contracts: ContractsResponse = self
            .get_json(&format!("/markets/{}/contracts/", market_id), market_id)
            .await?;
        let quotes: QuotesResponse = self
            .get_json(&format!("/markets/{}/quotes/", market_id), market_id)
            .await?;

        Ok(contracts
            .contracts
            .into_iter()
            .map(|c| {
                let lay_price = quotes.get(&c.id).and_then(|q| lay_price_from_bids(&q.bids));
                ExchangeContract {
                    id: c.id,
                    market_id: market_id.to_string(),
                    name: c.name,
                    lay_price,
                }
            })
            .collect())
    }
}

#[async_trait]
impl ExchangeProvider for SmarketsClient {
    #[instrument(skip(self))]
    async fn popular_event_ids(&self) -> Result<Vec<String>, ProviderError> {
        let response: PopularEventIdsResponse = self
            .get_json("/popular/event_ids/", "popular events")
            .await?;
        debug!(count = response.popular_event_ids.len(), "Fetched popular events");
        Ok(response.popular_event_ids)
    }

    #[instrument(skip(self))]
    async fn event_book(&self, event_id: &str) -> Result<ExchangeEvent, ProviderError> {
        let events: EventsResponse = self
            .get_json(&format!("/events/{}/", event_id), event_id)
            .await?;
        let event = events
            .events
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::FetchFailed {
                target: event_id.to_string(),
                reason: "event not found".to_string(),
            })?;

        let markets: MarketsResponse = self
            .get_json(&format!("/events/{}/markets/", event_id), event_id)
            .await?;

        let mut contracts = Vec::new();
        for market in markets
            .markets
            .iter()
            .filter(|m| is_match_winner_market(&m.name))
        {
            contracts.extend(self.market_contracts(&market.id).await?);
        }

        debug!(
            event = %event.name,
            contracts = contracts.len(),
            "Fetched exchange event"
        );

        Ok(ExchangeEvent {
            id: event.id,
            name: event.name,
            start: event.start_datetime,
            venue: self.venue.clone(),
            contracts,
        })
    }
}
