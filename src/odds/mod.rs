//! Odds-provider module (bookmaker back prices and exchange lay prices).
//!
//! This module handles:
//! - Sport, event and quote types
//! - The Odds API client behind the `OddsProvider` trait
//! - Mock provider for testing

pub mod client;
pub mod mock;
pub mod types;

pub use client::{OddsApiClient, OddsProvider};
pub use mock::{MockEventBuilder, MockOddsProvider};
pub use types::{Event, MarketKind, OutcomeQuote, Sport, Venue, VenueRole};
