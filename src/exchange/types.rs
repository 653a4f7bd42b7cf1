//! Betting-exchange types: events, contracts and lay quotes.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::odds::Venue;

/// Exchange prices are quoted in basis points of implied probability.
pub const BASIS_POINTS: u32 = 10_000;

/// Market names that carry match-winner contracts.
pub const MATCH_WINNER_MARKETS: &[&str] = &[
    "full-time result",
    "match odds",
    "match winner",
    "winner",
    "moneyline",
    "to win",
];

/// One contract (selectable outcome) with its best lay price.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeContract {
    /// Contract id.
    pub id: String,
    /// Market the contract belongs to.
    pub market_id: String,
    /// Outcome name ("Arsenal", "Draw").
    pub name: String,
    /// Best available lay price in decimal odds, if anyone is bidding.
    pub lay_price: Option<Decimal>,
}

/// Exchange event with match-winner contracts and lay prices.
#[derive(Debug, Clone)]
pub struct ExchangeEvent {
    /// Exchange event id.
    pub id: String,
    /// Event name, usually "Home vs Away".
    pub name: String,
    /// Scheduled start, if published.
    pub start: Option<OffsetDateTime>,
    /// Venue the quotes come from.
    pub venue: Venue,
    /// Contracts from match-winner markets.
    pub contracts: Vec<ExchangeContract>,
}

impl ExchangeEvent {
    /// Contracts that currently have a lay price.
    pub fn quotable_contracts(&self) -> impl Iterator<Item = &ExchangeContract> + '_ {
        self.contracts.iter().filter(|c| c.lay_price.is_some())
    }
}

/// Whether a market name denotes a match-winner market.
pub fn is_match_winner_market(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    MATCH_WINNER_MARKETS.iter().any(|m| *m == name)
}

/// Convert the best bid (basis points) into decimal lay odds.
///
/// Laying against the highest bid gives the lowest odds, so the best bid
/// is the highest one. Odds are truncated to 2 dp so rounding never
/// flatters the margin.
pub fn lay_price_from_bids(bids: &[QuoteLevel]) -> Option<Decimal> {
    let best = bids.iter().map(|l| l.price).max()?;
    if best == 0 || best >= BASIS_POINTS {
        return None;
    }
    let odds = Decimal::from(BASIS_POINTS) / Decimal::from(best);
    Some(odds.round_dp_with_strategy(2, RoundingStrategy::ToZero))
}

/// `GET /popular/event_ids/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PopularEventIdsResponse {
    /// Popular event ids.
    #[serde(default)]
    pub popular_event_ids: Vec<String>,
}

/// `GET /events/{id}/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    /// Matching events.
    #[serde(default)]
    pub events: Vec<EventResponse>,
}

/// Exchange event record.
#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    /// Event id.
    pub id: String,
    /// Event name.
    pub name: String,
    /// Start time.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_datetime: Option<OffsetDateTime>,
}

/// `GET /events/{id}/markets/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    /// Markets on the event.
    #[serde(default)]
    pub markets: Vec<MarketResponse>,
}

/// Exchange market record.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketResponse {
    /// Market id.
    pub id: String,
    /// Market name.
    pub name: String,
}

/// `GET /markets/{id}/contracts/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsResponse {
    /// Contracts in the market.
    #[serde(default)]
    pub contracts: Vec<ContractResponse>,
}

/// Exchange contract record.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResponse {
    /// Contract id.
    pub id: String,
    /// Contract name.
    pub name: String,
}

/// `GET /markets/{id}/quotes/` response, keyed by contract id.
pub type QuotesResponse = HashMap<String, ContractQuotes>;

/// Bid and offer ladders for a contract.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractQuotes {
    /// Buy orders (backers).
    #[serde(default)]
    pub bids: Vec<QuoteLevel>,
    /// Sell orders (layers).
    #[serde(default)]
    pub offers: Vec<QuoteLevel>,
}

/// Single ladder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QuoteLevel {
    /// Price in basis points of probability.
    pub price: u32,
    /// Stake available.
    #[serde(default)]
    pub quantity: u64,
}
