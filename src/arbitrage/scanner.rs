//! Opportunity scanner: one pass over every sport, event and outcome.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use chrono_tz::Tz;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::alert::{format_alert, AlertKey, OutcomeKey, SeenAlerts};
use super::calculator::{calculate_opportunity, ArbitrageOpportunity, LayQuote};
use super::matcher::{match_event, match_outcomes, MatchKind, MatchPolicy};
use crate::config::Config;
use crate::error::ProviderError;
use crate::exchange::{ExchangeEvent, ExchangeProvider};
use crate::metrics;
use crate::notify::Notifier;
use crate::odds::{Event, OddsProvider, OutcomeQuote, Sport, VenueRole};

/// Scanner parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Minimum profit percentage worth an alert.
    pub min_profit_pct: Decimal,
    /// Bankroll for the display-only profit estimate.
    pub bankroll: Decimal,
    /// Name matching parameters.
    pub match_policy: MatchPolicy,
    /// Bookmakers whose h2h prices are used as back prices; empty accepts
    /// any bookmaker that is not a lay exchange.
    pub back_bookmakers: HashSet<String>,
    /// Exchanges whose h2h_lay prices are used as lay prices.
    pub lay_exchanges: HashSet<String>,
    /// Sports to scan; empty means every active sport.
    pub sports: HashSet<String>,
    /// Cap on exchange events fetched per pass.
    pub exchange_event_limit: usize,
    /// Zone used for kick-off times in alerts.
    pub display_tz: Tz,
}

impl ScannerConfig {
    /// Derive scanner parameters from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_profit_pct: config.min_profit_pct,
            bankroll: config.bankroll,
            match_policy: MatchPolicy {
                cutoff: config.match_cutoff,
            },
            back_bookmakers: config.back_bookmaker_set(),
            lay_exchanges: config.lay_exchange_set(),
            sports: config.sport_filter(),
            exchange_event_limit: config.exchange_event_limit,
            display_tz: config.display_tz().unwrap_or_else(|e| {
                warn!("{}, showing kick-off times in UTC", e);
                Tz::UTC
            }),
        }
    }
}

/// Which upstream call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Odds for one sport.
    Odds,
    /// Exchange popular-event listing.
    ExchangeListing,
    /// Exchange book for one event.
    ExchangeEvent,
}

/// One failed sub-fetch that the pass skipped over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// Which call failed.
    pub source: FetchSource,
    /// Sport key or event id.
    pub target: String,
    /// Error text.
    pub reason: String,
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Sports whose odds were requested.
    pub sports_scanned: usize,
    /// Events examined.
    pub events_scanned: usize,
    /// Exchange events fetched.
    pub exchange_events_scanned: usize,
    /// Opportunities at or above the profit threshold.
    pub opportunities: Vec<ArbitrageOpportunity>,
    /// Arbitrages found below the profit threshold.
    pub below_threshold: usize,
    /// Alerts handed to the notifier.
    pub alerts_sent: usize,
    /// Opportunities already alerted earlier in the process lifetime.
    pub duplicates_suppressed: usize,
    /// Notifier errors (logged and swallowed).
    pub notify_failures: usize,
    /// Malformed quotes dropped while parsing.
    pub skipped_quotes: usize,
    /// Sub-fetches that failed and were skipped.
    pub failures: Vec<FetchFailure>,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl ScanReport {
    /// Failures from a given source.
    pub fn failures_from(&self, source: FetchSource) -> impl Iterator<Item = &FetchFailure> + '_ {
        self.failures.iter().filter(move |f| f.source == source)
    }

    /// Every requested sport failed.
    pub fn is_degraded(&self) -> bool {
        self.sports_scanned > 0
            && self.failures_from(FetchSource::Odds).count() == self.sports_scanned
    }

    /// Why the pass is degraded, if it is.
    pub fn degraded_reason(&self) -> Option<String> {
        if !self.is_degraded() {
            return None;
        }
        let first = self
            .failures_from(FetchSource::Odds)
            .next()
            .map(|f| f.reason.as_str())
            .unwrap_or_default();
        Some(format!(
            "all {} sport fetches failed: {}",
            self.sports_scanned, first
        ))
    }

    fn record_failure(&mut self, source: FetchSource, target: &str, error: &ProviderError) {
        warn!(%source, target = %target, error = %error, "Fetch failed, skipping");
        metrics::inc_fetch_failures(&source.to_string());
        self.failures.push(FetchFailure {
            source,
            target: target.to_string(),
            reason: error.to_string(),
        });
    }
}

/// Cumulative counters across passes, exposed on the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Passes that completed.
    pub scans_completed: u64,
    /// Passes that failed outright or were degraded.
    pub scans_failed: u64,
    /// Passes where every sport fetch failed.
    pub scans_degraded: u64,
    /// Current run of failed passes.
    pub consecutive_failures: u32,
    /// Opportunities at or above threshold.
    pub opportunities_found: u64,
    /// Alerts sent.
    pub alerts_sent: u64,
    /// Duplicate alerts suppressed.
    pub duplicates_suppressed: u64,
    /// Sub-fetch failures.
    pub fetch_failures: u64,
    /// Completion time of the last successful pass.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_scan_at: Option<OffsetDateTime>,
    /// Error of the last failed pass.
    pub last_error: Option<String>,
}

impl ScanStats {
    /// Fold in a completed pass.
    pub fn record_success(&mut self, report: &ScanReport) {
        self.scans_completed += 1;
        self.consecutive_failures = 0;
        self.opportunities_found += report.opportunities.len() as u64;
        self.alerts_sent += report.alerts_sent as u64;
        self.duplicates_suppressed += report.duplicates_suppressed as u64;
        self.fetch_failures += report.failures.len() as u64;
        self.last_scan_at = Some(OffsetDateTime::now_utc());
        self.last_error = None;
    }

    /// Fold in a degraded pass; it counts as a failed pass.
    pub fn record_degraded(&mut self, report: &ScanReport, reason: &str) {
        self.scans_degraded += 1;
        self.fetch_failures += report.failures.len() as u64;
        self.record_failure(reason);
    }

    /// Fold in a failed pass.
    pub fn record_failure(&mut self, error: &str) {
        self.scans_failed += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }
}

/// Typed event identity for lay lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey(String);

impl EventKey {
    /// Key for an odds-provider event.
    pub fn new(event_id: &str) -> Self {
        Self(event_id.to_string())
    }
}

/// Best lay quote per (event, outcome) for one pass.
#[derive(Debug, Clone, Default)]
pub struct LayBook {
    quotes: HashMap<(EventKey, OutcomeKey), LayQuote>,
}

impl LayBook {
    /// Offer a lay quote.
    ///
    /// Exact-key quotes replace fuzzy ones; otherwise the lower price wins.
    pub fn offer(&mut self, event: EventKey, outcome: OutcomeKey, quote: LayQuote) {
        let key = (event, outcome);
        let replace = match self.quotes.get(&key) {
            None => true,
            Some(current) => match (current.match_kind.is_fuzzy(), quote.match_kind.is_fuzzy()) {
                (true, false) => true,
                (false, true) => false,
                _ => quote.price < current.price,
            },
        };
        if replace {
            self.quotes.insert(key, quote);
        }
    }

    /// Best lay quote for an outcome.
    pub fn get(&self, event: &EventKey, outcome: &OutcomeKey) -> Option<&LayQuote> {
        self.quotes.get(&(event.clone(), outcome.clone()))
    }

    /// Number of quoted outcomes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether nothing is quoted.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Finds back/lay arbitrages and sends one alert per new opportunity.
pub struct Scanner {
    config: ScannerConfig,
    odds: Box<dyn OddsProvider>,
    exchange: Option<Box<dyn ExchangeProvider>>,
    notifier: Arc<dyn Notifier>,
    seen: SeenAlerts,
}

impl Scanner {
    /// Create a scanner without an exchange feed.
    pub fn new(
        config: ScannerConfig,
        odds: impl OddsProvider + 'static,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            odds: Box::new(odds),
            exchange: None,
            notifier,
            seen: SeenAlerts::new(),
        }
    }

    /// Add an exchange feed.
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl ExchangeProvider + 'static) -> Self {
        self.exchange = Some(Box::new(exchange));
        self
    }

    /// The notifier alerts go through.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Alerts sent so far.
    pub fn seen_alerts(&self) -> &SeenAlerts {
        &self.seen
    }

    /// Run one full pass.
    ///
    /// Only a failure to list sports fails the pass; every other upstream
    /// error is recorded in the report and skipped.
    #[instrument(skip(self))]
    pub async fn scan_once(&mut self) -> Result<ScanReport, ProviderError> {
        let _timer = metrics::timer_scan();
        let started = Instant::now();
        let mut report = ScanReport::default();

        let sports: Vec<Sport> = self
            .odds
            .sports()
            .await?
            .into_iter()
            .filter(|s| self.wants_sport(s))
            .collect();

        if sports.is_empty() {
            info!("No active sports to scan");
            report.duration = started.elapsed();
            return Ok(report);
        }

        let exchange_events = self.fetch_exchange(&mut report).await;
        let mut lay_book = LayBook::default();

        for sport in &sports {
            report.sports_scanned += 1;
            let events = match self.odds.events(&sport.key).await {
                Ok(events) => events,
                Err(e) => {
                    report.record_failure(FetchSource::Odds, &sport.key, &e);
                    continue;
                }
            };

            debug!(sport = %sport.key, events = events.len(), "Scanning sport");

            for event in &events {
                report.events_scanned += 1;
                report.skipped_quotes += event.skipped_quotes;
                self.collect_lays(event, &exchange_events, &mut lay_book);
                self.evaluate_event(event, &lay_book, &mut report).await;
            }
        }

        report.duration = started.elapsed();
        info!(
            sports = report.sports_scanned,
            events = report.events_scanned,
            exchange_events = report.exchange_events_scanned,
            opportunities = report.opportunities.len(),
            alerts = report.alerts_sent,
            duplicates = report.duplicates_suppressed,
            failures = report.failures.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "Scan complete"
        );

        Ok(report)
    }

    fn is_back_venue(&self, key: &str) -> bool {
        if self.config.back_bookmakers.is_empty() {
            !self.config.lay_exchanges.contains(key)
        } else {
            self.config.back_bookmakers.contains(key)
        }
    }

    fn wants_sport(&self, sport: &Sport) -> bool {
        sport.active
            && !sport.has_outrights
            && (self.config.sports.is_empty() || self.config.sports.contains(&sport.key))
    }

    async fn fetch_exchange(&self, report: &mut ScanReport) -> Vec<ExchangeEvent> {
        let Some(exchange) = &self.exchange else {
            return Vec::new();
        };

        let ids = match exchange.popular_event_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                report.record_failure(FetchSource::ExchangeListing, "popular events", &e);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for id in ids.iter().take(self.config.exchange_event_limit) {
            match exchange.event_book(id).await {
                Ok(event) => events.push(event),
                Err(e) => report.record_failure(FetchSource::ExchangeEvent, id, &e),
            }
        }

        report.exchange_events_scanned = events.len();
        events
    }

    /// Gather lay quotes for one event: exact keys from the odds feed's lay
    /// markets, then exchange contracts via event-then-outcome matching.
    fn collect_lays(&self, event: &Event, exchange_events: &[ExchangeEvent], book: &mut LayBook) {
        let event_key = EventKey::new(&event.id);

        for quote in event
            .quotes_with_role(VenueRole::Lay)
            .filter(|q| self.config.lay_exchanges.contains(&q.venue.key))
        {
            book.offer(
                event_key.clone(),
                OutcomeKey::new(&quote.outcome),
                LayQuote {
                    price: quote.price,
                    venue: quote.venue.clone(),
                    match_kind: MatchKind::Exact,
                },
            );
        }

        let policy = &self.config.match_policy;
        let Some((matched, event_kind)) = match_event(event, exchange_events, policy) else {
            return;
        };

        let outcomes: Vec<&str> = event
            .quotes_with_role(VenueRole::Back)
            .filter(|q| self.is_back_venue(&q.venue.key))
            .map(|q| q.outcome.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let assigned = match_outcomes(&outcomes, matched.quotable_contracts(), policy);
        for (outcome, contract, outcome_kind) in assigned {
            let Some(price) = contract.lay_price else {
                continue;
            };
            book.offer(
                event_key.clone(),
                OutcomeKey::new(outcome),
                LayQuote {
                    price,
                    venue: matched.venue.clone(),
                    match_kind: event_kind.and(outcome_kind),
                },
            );
        }
    }

    async fn evaluate_event(&mut self, event: &Event, lay_book: &LayBook, report: &mut ScanReport) {
        let event_key = EventKey::new(&event.id);

        let mut best_backs: BTreeMap<OutcomeKey, &OutcomeQuote> = BTreeMap::new();
        for quote in event
            .quotes_with_role(VenueRole::Back)
            .filter(|q| self.is_back_venue(&q.venue.key))
        {
            best_backs
                .entry(OutcomeKey::new(&quote.outcome))
                .and_modify(|best| {
                    if quote.price > best.price {
                        *best = quote;
                    }
                })
                .or_insert(quote);
        }

        for (outcome_key, back) in best_backs {
            let Some(lay) = lay_book.get(&event_key, &outcome_key) else {
                continue;
            };
            let Some(opportunity) = calculate_opportunity(event, back, lay, self.config.bankroll)
            else {
                continue;
            };

            if opportunity.profit_pct < self.config.min_profit_pct {
                debug!(
                    event = %opportunity.event_name,
                    outcome = %opportunity.outcome,
                    profit_pct = %opportunity.profit_pct,
                    "Arbitrage below profit threshold"
                );
                report.below_threshold += 1;
                continue;
            }

            metrics::inc_opportunities_detected();
            info!(
                event = %opportunity.event_name,
                outcome = %opportunity.outcome,
                back = %opportunity.back_price,
                back_venue = %opportunity.back_venue.key,
                lay = %opportunity.lay_price,
                lay_venue = %opportunity.lay_venue.key,
                profit_pct = %opportunity.profit_pct,
                fuzzy = opportunity.match_kind.is_fuzzy(),
                "Arbitrage opportunity detected"
            );

            if !self.seen.insert(AlertKey::for_opportunity(&opportunity)) {
                metrics::inc_alerts_suppressed();
                report.duplicates_suppressed += 1;
                report.opportunities.push(opportunity);
                continue;
            }

            let message = format_alert(&opportunity, self.config.display_tz);
            match self.notifier.send(&message).await {
                Ok(()) => {
                    metrics::inc_alerts_sent();
                    report.alerts_sent += 1;
                }
                Err(e) => {
                    warn!(notifier = self.notifier.name(), error = %e, "Failed to deliver alert");
                    metrics::inc_notify_failures();
                    report.notify_failures += 1;
                }
            }
            report.opportunities.push(opportunity);
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_config(&Config::with_api_key(""))
    }
}
