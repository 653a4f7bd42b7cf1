//! Alert deduplication and message formatting.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use time::OffsetDateTime;

use super::calculator::ArbitrageOpportunity;
use super::matcher::normalize;
use crate::odds::MarketKind;

/// Normalized outcome name used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutcomeKey(String);

impl OutcomeKey {
    /// Key for an outcome name.
    pub fn new(name: &str) -> Self {
        Self(normalize(name))
    }

    /// Normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of an alert: one per sport, event, outcome and market.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    /// Sport key.
    pub sport: String,
    /// Odds-provider event id.
    pub event_id: String,
    /// Outcome.
    pub outcome: OutcomeKey,
    /// Market.
    pub market: MarketKind,
}

impl AlertKey {
    /// Key for an opportunity.
    pub fn for_opportunity(opp: &ArbitrageOpportunity) -> Self {
        Self {
            sport: opp.sport_key.clone(),
            event_id: opp.event_id.clone(),
            outcome: OutcomeKey::new(&opp.outcome),
            market: opp.market,
        }
    }
}

/// Alerts already sent during this process lifetime.
///
/// Never evicts; a restart clears it.
#[derive(Debug, Clone, Default)]
pub struct SeenAlerts {
    keys: HashSet<AlertKey>,
}

impl SeenAlerts {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key. Returns `true` if it had not been seen.
    pub fn insert(&mut self, key: AlertKey) -> bool {
        self.keys.insert(key)
    }

    /// Number of keys seen.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Render an opportunity as a chat message.
pub fn format_alert(opp: &ArbitrageOpportunity, tz: Tz) -> String {
    let kickoff = format_kickoff(opp.commence_time, tz);

    let mut message = format!(
        "📈 Arb Opportunity\n\
         🏆 {sport}\n\
         🏟 {event}\n\
         🕒 {kickoff}\n\
         📋 Market: {market_label} ({market})\n\
         🔁 Outcome: {outcome}\n\
         ✅ Back @ {back} ({back_venue})\n\
         ❌ Lay @ {lay} ({lay_venue})\n\
         📊 Profit: {pct}%\n\
         💰 Est. profit on {bankroll}: {est}",
        sport = opp.sport_title,
        event = opp.event_name,
        kickoff = kickoff,
        market_label = opp.market.label(),
        market = opp.market,
        outcome = opp.outcome,
        back = opp.back_price,
        back_venue = opp.back_venue.title,
        lay = opp.lay_price,
        lay_venue = opp.lay_venue.title,
        pct = opp.profit_pct,
        bankroll = opp.bankroll,
        est = opp.estimated_profit,
    );

    if opp.match_kind.is_fuzzy() {
        message.push_str(&format!(
            "\n🔎 Fuzzy name match (score {:.2}), verify before acting",
            opp.match_kind.score()
        ));
    }

    message
}

/// Render a scan failure as a chat message.
pub fn format_failure(error: &str, consecutive_failures: u32) -> String {
    format!(
        "⚠️ Arb scan failed ({} in a row)\n{}",
        consecutive_failures, error
    )
}

/// Kick-off in the display zone, with its abbreviation (GMT/BST).
fn format_kickoff(at: OffsetDateTime, tz: Tz) -> String {
    match Utc.timestamp_opt(at.unix_timestamp(), 0).single() {
        Some(utc) => utc
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M %Z")
            .to_string(),
        None => at.to_string(),
    }
}
