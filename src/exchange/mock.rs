//! Mock exchange provider for unit testing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::client::ExchangeProvider;
use super::types::{ExchangeContract, ExchangeEvent};
use crate::error::ProviderError;
use crate::odds::Venue;

/// In-memory exchange provider.
#[derive(Debug, Clone, Default)]
pub struct MockExchangeProvider {
    events: Arc<Mutex<Vec<ExchangeEvent>>>,
    failing_events: Arc<Mutex<HashSet<String>>>,
    fail_listing: Arc<Mutex<bool>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockExchangeProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event; its id joins the popular list.
    pub fn add_event(&self, event: ExchangeEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Make the book request for one event fail.
    pub fn fail_event(&self, event_id: &str) {
        self.failing_events
            .lock()
            .unwrap()
            .insert(event_id.to_string());
    }

    /// Make the popular listing fail.
    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    /// How many times `event_book` was requested for an id.
    pub fn book_calls(&self, event_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(event_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ExchangeProvider for MockExchangeProvider {
    async fn popular_event_ids(&self) -> Result<Vec<String>, ProviderError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(ProviderError::FetchFailed {
                target: "popular events".to_string(),
                reason: "Mock listing failure".to_string(),
            });
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect())
    }

    async fn event_book(&self, event_id: &str) -> Result<ExchangeEvent, ProviderError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_default() += 1;

        if self.failing_events.lock().unwrap().contains(event_id) {
            return Err(ProviderError::FetchFailed {
                target: event_id.to_string(),
                reason: "Mock event failure".to_string(),
            });
        }

        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or_else(|| ProviderError::FetchFailed {
                target: event_id.to_string(),
                reason: "event not found".to_string(),
            })
    }
}

/// Builder for exchange events.
pub struct MockExchangeEventBuilder {
    event: ExchangeEvent,
}

impl MockExchangeEventBuilder {
    /// Start an event with the given exchange name ("A vs B").
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            event: ExchangeEvent {
                id: id.to_string(),
                name: name.to_string(),
                start: None,
                venue: Venue::new("smarkets", "Smarkets"),
                contracts: Vec::new(),
            },
        }
    }

    /// Set the start time.
    pub fn start(mut self, at: OffsetDateTime) -> Self {
        self.event.start = Some(at);
        self
    }

    /// Add a contract with a lay price.
    pub fn lay(mut self, name: &str, price: Decimal) -> Self {
        let id = format!("{}-c{}", self.event.id, self.event.contracts.len());
        self.event.contracts.push(ExchangeContract {
            id,
            market_id: format!("{}-m", self.event.id),
            name: name.to_string(),
            lay_price: Some(price),
        });
        self
    }

    /// Build the event.
    pub fn build(self) -> ExchangeEvent {
        self.event
    }
}
