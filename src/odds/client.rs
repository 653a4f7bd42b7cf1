//! The Odds API client and the `OddsProvider` seam the scanner depends on.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::types::{Event, MarketKind, OddsEventResponse, Sport};
use crate::config::Config;
use crate::error::ProviderError;
use crate::metrics;

/// Source of sports and back/lay odds.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// List every sport the provider knows about.
    async fn sports(&self) -> Result<Vec<Sport>, ProviderError>;

    /// Fetch upcoming events with head-to-head back and lay markets for a sport.
    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, ProviderError>;
}

/// HTTP client for The Odds API (v4).
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, e.g. `https://api.the-odds-api.com/v4`.
    base_url: String,
    /// API key sent as the `apiKey` query parameter.
    api_key: String,
    /// Bookmaker regions (comma-separated).
    regions: String,
}

impl OddsApiClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.odds_api_url.trim_end_matches('/').to_string(),
            api_key: config.odds_api_key.clone(),
            regions: config.odds_regions.clone(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Markets requested per sport.
    fn markets_param() -> String {
        format!("{},{}", MarketKind::H2h, MarketKind::H2hLay)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        target: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        metrics::record_http_latency(start, "odds");

        if let Some(remaining) = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
        {
            debug!(remaining = %remaining, "Odds API quota");
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized(format!(
                "odds API returned HTTP {}",
                status
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, target = %target, "Odds API request failed");
            return Err(ProviderError::FetchFailed {
                target: target.to_string(),
                reason: format!("HTTP {} - {}", status, body),
            });
        }

        response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse {} response: {}", target, e))
        })
    }
}

#[async_trait]
impl OddsProvider for OddsApiClient {
    #[instrument(skip(self))]
    async fn sports(&self) -> Result<Vec<Sport>, ProviderError> {
        let sports: Vec<Sport> = self.get_json("/sports", "sports", &[]).await?;
        debug!(count = sports.len(), "Fetched sports");
        Ok(sports)
    }

    #[instrument(skip(self))]
    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, ProviderError> {
        let markets = Self::markets_param();
        let raw: Vec<OddsEventResponse> = self
            .get_json(
                &format!("/sports/{}/odds", sport_key),
                sport_key,
                &[
                    ("regions", self.regions.as_str()),
                    ("markets", markets.as_str()),
                    ("oddsFormat", "decimal"),
                    ("dateFormat", "iso"),
                ],
            )
            .await?;

        let total = raw.len();
        let events: Vec<Event> = raw.into_iter().filter_map(Event::from_wire).collect();
        if events.len() < total {
            debug!(
                dropped = total - events.len(),
                "Dropped events without participant names"
            );
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OddsApiClient {
        let mut config = Config::with_api_key("test-key");
        config.odds_api_url = base_url.to_string();
        OddsApiClient::new(&config).unwrap()
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = test_client("https://api.the-odds-api.com/v4/");
        assert_eq!(client.base_url(), "https://api.the-odds-api.com/v4");
    }

    #[test]
    fn requests_back_and_lay_markets() {
        assert_eq!(OddsApiClient::markets_param(), "h2h,h2h_lay");
    }

    #[tokio::test]
    async fn fetches_sports() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "key": "soccer_epl",
                    "group": "Soccer",
                    "title": "EPL",
                    "active": true,
                    "has_outrights": false
                },
                {
                    "key": "golf_masters_tournament_winner",
                    "group": "Golf",
                    "title": "Masters",
                    "active": true,
                    "has_outrights": true
                }
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let sports = client.sports().await.unwrap();

        assert_eq!(sports.len(), 2);
        assert_eq!(sports[0].key, "soccer_epl");
        assert!(sports[1].has_outrights);
    }

    #[tokio::test]
    async fn fetches_events_for_sport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .and(query_param("markets", "h2h,h2h_lay"))
            .and(query_param("oddsFormat", "decimal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": "evt-1",
                    "sport_key": "soccer_epl",
                    "sport_title": "EPL",
                    "commence_time": "2025-03-01T15:00:00Z",
                    "home_team": "Arsenal",
                    "away_team": "Chelsea",
                    "bookmakers": [{
                        "key": "williamhill",
                        "title": "William Hill",
                        "markets": [{"key": "h2h", "outcomes": [{"name": "Arsenal", "price": 2.5}]}]
                    }]
                },
                {
                    "id": "evt-2",
                    "sport_key": "soccer_epl",
                    "commence_time": "2025-03-01T17:30:00Z",
                    "bookmakers": []
                }
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let events = client.events("soccer_epl").await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "evt-1");
        assert_eq!(events[0].quotes[0].price, dec!(2.5));
    }

    #[tokio::test]
    async fn maps_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.sports().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn maps_server_error_to_fetch_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/tennis_atp/odds"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.events("tennis_atp").await.unwrap_err();
        match err {
            ProviderError::FetchFailed { target, reason } => {
                assert_eq!(target, "tennis_atp");
                assert!(reason.contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
