//! Mock odds provider for unit testing.
//!
//! Serves canned sports and events without making network requests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::client::OddsProvider;
use super::types::{Event, MarketKind, OutcomeQuote, Sport, Venue};
use crate::error::ProviderError;

/// In-memory odds provider.
#[derive(Debug, Clone, Default)]
pub struct MockOddsProvider {
    sports: Arc<Mutex<Vec<Sport>>>,
    events: Arc<Mutex<HashMap<String, Vec<Event>>>>,
    failing_sports: Arc<Mutex<HashSet<String>>>,
    fail_listing: Arc<Mutex<bool>>,
}

impl MockOddsProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active sport.
    pub fn add_sport(&self, key: &str, title: &str) {
        self.sports.lock().unwrap().push(Sport {
            key: key.to_string(),
            group: String::new(),
            title: title.to_string(),
            active: true,
            has_outrights: false,
        });
    }

    /// Register a sport with explicit flags.
    pub fn add_sport_raw(&self, sport: Sport) {
        self.sports.lock().unwrap().push(sport);
    }

    /// Add an event under its sport key.
    pub fn add_event(&self, event: Event) {
        self.events
            .lock()
            .unwrap()
            .entry(event.sport_key.clone())
            .or_default()
            .push(event);
    }

    /// Make the events request for one sport fail.
    pub fn fail_sport(&self, key: &str) {
        self.failing_sports.lock().unwrap().insert(key.to_string());
    }

    /// Make the sports listing fail (or succeed again).
    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }
}

#[async_trait]
impl OddsProvider for MockOddsProvider {
    async fn sports(&self) -> Result<Vec<Sport>, ProviderError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(ProviderError::FetchFailed {
                target: "sports".to_string(),
                reason: "Mock sports failure".to_string(),
            });
        }
        Ok(self.sports.lock().unwrap().clone())
    }

    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, ProviderError> {
        if self.failing_sports.lock().unwrap().contains(sport_key) {
            return Err(ProviderError::FetchFailed {
                target: sport_key.to_string(),
                reason: "Mock events failure".to_string(),
            });
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(sport_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Builder for events with back and lay quotes.
pub struct MockEventBuilder {
    event: Event,
}

impl MockEventBuilder {
    /// Start an event between two participants.
    pub fn new(id: &str, sport_key: &str, home: &str, away: &str) -> Self {
        Self {
            event: Event {
                id: id.to_string(),
                sport_key: sport_key.to_string(),
                sport_title: sport_key.to_string(),
                home: home.to_string(),
                away: away.to_string(),
                commence_time: OffsetDateTime::UNIX_EPOCH,
                quotes: Vec::new(),
                skipped_quotes: 0,
            },
        }
    }

    /// Set the sport title.
    pub fn sport_title(mut self, title: &str) -> Self {
        self.event.sport_title = title.to_string();
        self
    }

    /// Set the start time.
    pub fn commence_time(mut self, at: OffsetDateTime) -> Self {
        self.event.commence_time = at;
        self
    }

    /// Add a back (h2h) price from a bookmaker.
    pub fn back(self, outcome: &str, price: Decimal, bookmaker: &str) -> Self {
        self.quote(outcome, price, bookmaker, MarketKind::H2h)
    }

    /// Add a lay (h2h_lay) price from an exchange.
    pub fn lay(self, outcome: &str, price: Decimal, exchange: &str) -> Self {
        self.quote(outcome, price, exchange, MarketKind::H2hLay)
    }

    fn quote(mut self, outcome: &str, price: Decimal, venue: &str, market: MarketKind) -> Self {
        self.event.quotes.push(OutcomeQuote {
            outcome: outcome.to_string(),
            price,
            venue: Venue::new(venue, venue),
            role: market.role(),
            market,
        });
        self
    }

    /// Build the event.
    pub fn build(self) -> Event {
        self.event
    }
}
