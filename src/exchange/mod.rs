//! Betting-exchange module (lay prices).
//!
//! This module handles:
//! - Exchange event, contract and quote types
//! - Smarkets client behind the `ExchangeProvider` trait
//! - Mock provider for testing

pub mod client;
pub mod mock;
pub mod types;

pub use client::{ExchangeProvider, SmarketsClient};
pub use mock::{MockExchangeEventBuilder, MockExchangeProvider};
pub use types::{ExchangeContract, ExchangeEvent};
