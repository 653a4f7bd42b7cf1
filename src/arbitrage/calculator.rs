//! Margin and profit calculations for back/lay pairs.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use time::OffsetDateTime;

use super::matcher::MatchKind;
use crate::odds::{Event, MarketKind, OutcomeQuote, Venue};

/// Prices at or below this are never considered; no venue offers even money or worse.
pub const MIN_VIABLE_PRICE: Decimal = dec!(1.01);

/// Result of comparing one back price with one lay price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginResult {
    /// Sum of reciprocals, `1/back + 1/lay`.
    pub margin: Decimal,
    /// `(1 - margin) * 100`, two decimal places.
    pub profit_pct: Decimal,
}

/// A lay price matched to an outcome, with how it was matched.
#[derive(Debug, Clone, PartialEq)]
pub struct LayQuote {
    /// Decimal lay odds.
    pub price: Decimal,
    /// Exchange offering the lay.
    pub venue: Venue,
    /// Exact key or fuzzy name match.
    pub match_kind: MatchKind,
}

/// Detected arbitrage opportunity.
#[derive(Debug, Clone)]
pub struct ArbitrageOpportunity {
    /// Odds-provider event id.
    pub event_id: String,
    /// Sport key.
    pub sport_key: String,
    /// Sport display title.
    pub sport_title: String,
    /// "Home vs Away".
    pub event_name: String,
    /// Scheduled start.
    pub commence_time: OffsetDateTime,
    /// Market the back price came from.
    pub market: MarketKind,
    /// Outcome name.
    pub outcome: String,
    /// Back price.
    pub back_price: Decimal,
    /// Bookmaker offering the back price.
    pub back_venue: Venue,
    /// Lay price.
    pub lay_price: Decimal,
    /// Exchange offering the lay price.
    pub lay_venue: Venue,
    /// How the lay side was matched.
    pub match_kind: MatchKind,
    /// Sum of reciprocals.
    pub margin: Decimal,
    /// Profit percentage, two decimal places.
    pub profit_pct: Decimal,
    /// Display-only profit estimate for the configured bankroll.
    pub estimated_profit: Decimal,
    /// Bankroll the estimate is based on.
    pub bankroll: Decimal,
    /// When the opportunity was detected.
    pub detected_at: OffsetDateTime,
}

/// Whether a price can take part in an arbitrage.
pub fn is_viable_price(price: Decimal) -> bool {
    price > MIN_VIABLE_PRICE
}

/// Compare a back price with a lay price.
///
/// Returns `None` when either price is at or below [`MIN_VIABLE_PRICE`] or
/// when the pair is not an arbitrage (`margin >= 1`).
pub fn evaluate_margin(back_price: Decimal, lay_price: Decimal) -> Option<MarginResult> {
    if !is_viable_price(back_price) || !is_viable_price(lay_price) {
        return None;
    }

    let margin = Decimal::ONE / back_price + Decimal::ONE / lay_price;
    if margin >= Decimal::ONE {
        return None;
    }

    let profit_pct = ((Decimal::ONE - margin) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Some(MarginResult { margin, profit_pct })
}

/// Profit on `bankroll` at `profit_pct`, two decimal places. Display only.
pub fn bankroll_profit(profit_pct: Decimal, bankroll: Decimal) -> Decimal {
    (bankroll * profit_pct / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Build an opportunity for a back quote and a matched lay quote.
pub fn calculate_opportunity(
    event: &Event,
    back: &OutcomeQuote,
    lay: &LayQuote,
    bankroll: Decimal,
) -> Option<ArbitrageOpportunity> {
    let result = evaluate_margin(back.price, lay.price)?;

    Some(ArbitrageOpportunity {
        event_id: event.id.clone(),
        sport_key: event.sport_key.clone(),
        sport_title: event.sport_title.clone(),
        event_name: event.name(),
        commence_time: event.commence_time,
        market: back.market,
        outcome: back.outcome.clone(),
        back_price: back.price,
        back_venue: back.venue.clone(),
        lay_price: lay.price,
        lay_venue: lay.venue.clone(),
        match_kind: lay.match_kind,
        margin: result.margin,
        profit_pct: result.profit_pct,
        estimated_profit: bankroll_profit(result.profit_pct, bankroll),
        bankroll,
        detected_at: OffsetDateTime::now_utc(),
    })
}
