//! Odds-provider types: sports, events, bookmakers and outcome quotes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Market key on the odds provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum MarketKind {
    /// Head-to-head (match winner) back prices.
    #[strum(serialize = "h2h")]
    #[serde(rename = "h2h")]
    H2h,
    /// Head-to-head lay prices from exchanges.
    #[strum(serialize = "h2h_lay")]
    #[serde(rename = "h2h_lay")]
    H2hLay,
}

impl MarketKind {
    /// Human-readable label used in alerts.
    pub fn label(&self) -> &'static str {
        match self {
            MarketKind::H2h => "Match Winner",
            MarketKind::H2hLay => "Match Winner (lay)",
        }
    }

    /// Role implied by quotes in this market.
    pub fn role(&self) -> VenueRole {
        match self {
            MarketKind::H2h => VenueRole::Back,
            MarketKind::H2hLay => VenueRole::Lay,
        }
    }
}

/// Whether a quote is a back price or a lay price.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VenueRole {
    /// Price for backing the outcome (bookmaker or exchange back side).
    Back,
    /// Price for laying the outcome (exchange only).
    Lay,
}

/// A bookmaker or exchange that quoted a price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Venue {
    /// Provider key (e.g. "williamhill", "betfair_ex_uk").
    pub key: String,
    /// Display title (e.g. "William Hill").
    pub title: String,
}

impl Venue {
    /// Create a venue.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

/// Single decimal price for one outcome at one venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeQuote {
    /// Participant or outcome name as the provider spells it.
    pub outcome: String,
    /// Decimal odds.
    pub price: Decimal,
    /// Where the price comes from.
    pub venue: Venue,
    /// Back or lay.
    pub role: VenueRole,
    /// Which market the quote belongs to.
    pub market: MarketKind,
}

/// Sport listed by the odds provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sport {
    /// Sport key (e.g. "soccer_epl").
    pub key: String,
    /// Sport group (e.g. "Soccer").
    #[serde(default)]
    pub group: String,
    /// Display title (e.g. "EPL").
    pub title: String,
    /// Whether the sport currently has events.
    #[serde(default)]
    pub active: bool,
    /// Outright (futures) sports have no head-to-head markets.
    #[serde(default)]
    pub has_outrights: bool,
}

/// One sporting event with all bookmaker quotes collected for it.
#[derive(Debug, Clone)]
pub struct Event {
    /// Provider event id.
    pub id: String,
    /// Sport key.
    pub sport_key: String,
    /// Sport display title.
    pub sport_title: String,
    /// Home participant.
    pub home: String,
    /// Away participant.
    pub away: String,
    /// Scheduled start.
    pub commence_time: OffsetDateTime,
    /// Every usable quote across bookmakers and markets.
    pub quotes: Vec<OutcomeQuote>,
    /// Quotes dropped while parsing (missing name or unusable price).
    pub skipped_quotes: usize,
}

impl Event {
    /// Display name, "Home vs Away".
    pub fn name(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }

    /// Participants in home/away order.
    pub fn participants(&self) -> [&str; 2] {
        [&self.home, &self.away]
    }

    /// Quotes with the given role.
    pub fn quotes_with_role(&self, role: VenueRole) -> impl Iterator<Item = &OutcomeQuote> {
        self.quotes.iter().filter(move |q| q.role == role)
    }

    /// Convert a wire event, dropping malformed quotes.
    ///
    /// Returns `None` when a participant name is missing.
    pub fn from_wire(raw: OddsEventResponse) -> Option<Self> {
        let home = raw.home_team.filter(|s| !s.trim().is_empty())?;
        let away = raw.away_team.filter(|s| !s.trim().is_empty())?;

        let mut quotes = Vec::new();
        let mut skipped_quotes = 0;

        for book in raw.bookmakers {
            let venue = Venue::new(book.key, book.title);
            for market in book.markets {
                let Ok(kind) = market.key.parse::<MarketKind>() else {
                    continue;
                };
                for outcome in market.outcomes {
                    match (outcome.name, outcome.price) {
                        (Some(name), Some(price))
                            if !name.trim().is_empty() && price > Decimal::ZERO =>
                        {
                            quotes.push(OutcomeQuote {
                                outcome: name,
                                price,
                                venue: venue.clone(),
                                role: kind.role(),
                                market: kind,
                            });
                        }
                        _ => skipped_quotes += 1,
                    }
                }
            }
        }

        Some(Self {
            id: raw.id,
            sport_key: raw.sport_key,
            sport_title: raw.sport_title,
            home,
            away,
            commence_time: raw.commence_time,
            quotes,
            skipped_quotes,
        })
    }
}

/// Event as returned by the odds endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEventResponse {
    /// Event id.
    pub id: String,
    /// Sport key.
    pub sport_key: String,
    /// Sport title.
    #[serde(default)]
    pub sport_title: String,
    /// Start time (ISO 8601).
    #[serde(with = "time::serde::rfc3339")]
    pub commence_time: OffsetDateTime,
    /// Home team or first player.
    #[serde(default)]
    pub home_team: Option<String>,
    /// Away team or second player.
    #[serde(default)]
    pub away_team: Option<String>,
    /// Bookmakers with markets.
    #[serde(default)]
    pub bookmakers: Vec<BookmakerResponse>,
}

/// Bookmaker block of an odds event.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerResponse {
    /// Bookmaker key.
    pub key: String,
    /// Bookmaker title.
    pub title: String,
    /// Markets offered.
    #[serde(default)]
    pub markets: Vec<MarketResponse>,
}

/// Market block of a bookmaker.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketResponse {
    /// Market key ("h2h", "h2h_lay", ...).
    pub key: String,
    /// Outcome prices.
    #[serde(default)]
    pub outcomes: Vec<OutcomeResponse>,
}

/// Outcome price inside a market.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeResponse {
    /// Outcome name.
    #[serde(default)]
    pub name: Option<String>,
    /// Decimal price.
    #[serde(default)]
    pub price: Option<Decimal>,
}
