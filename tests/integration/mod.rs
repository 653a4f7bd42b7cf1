//! Integration tests for the back/lay arbitrage scanner.
//!
//! These drive the scanner and poll loop end to end through the in-memory
//! odds, exchange and notifier doubles. No network access is needed.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use backlay_arb::api::AppState;
use backlay_arb::arbitrage::{FetchSource, Scanner, ScannerConfig};
use backlay_arb::exchange::{MockExchangeEventBuilder, MockExchangeProvider};
use backlay_arb::notify::RecordingNotifier;
use backlay_arb::odds::{MockEventBuilder, MockOddsProvider};
use backlay_arb::poller::{Poller, PollerConfig};

fn scanner(odds: MockOddsProvider, notifier: &RecordingNotifier) -> Scanner {
    Scanner::new(ScannerConfig::default(), odds, Arc::new(notifier.clone()))
}

fn team_a_market() -> MockOddsProvider {
    let odds = MockOddsProvider::new();
    odds.add_sport("soccer_epl", "EPL");
    odds.add_event(
        MockEventBuilder::new("ev-a", "soccer_epl", "Team A", "Team B")
            .back("Team A", dec!(2.50), "williamhill")
            .lay("Team A", dec!(2.30), "betfair_ex_uk")
            .build(),
    );
    odds
}

#[tokio::test]
async fn profitable_pair_sends_exactly_one_alert() {
    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(team_a_market(), &notifier);

    let report = scanner.scan_once().await.unwrap();

    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.opportunities[0].profit_pct, dec!(16.52));
    assert_eq!(report.alerts_sent, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("2.50"));
    assert!(messages[0].contains("2.30"));
    assert!(messages[0].contains("williamhill"));
    assert!(messages[0].contains("betfair_ex_uk"));
    assert!(messages[0].contains("16.52"));
}

#[tokio::test]
async fn repeated_scans_do_not_resend() {
    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(team_a_market(), &notifier);

    scanner.scan_once().await.unwrap();
    let second = scanner.scan_once().await.unwrap();
    let third = scanner.scan_once().await.unwrap();

    assert_eq!(notifier.count(), 1);
    assert_eq!(second.alerts_sent, 0);
    assert_eq!(second.duplicates_suppressed, 1);
    assert_eq!(third.duplicates_suppressed, 1);
    assert_eq!(scanner.seen_alerts().len(), 1);
}

#[tokio::test]
async fn unprofitable_pair_is_silent() {
    let odds = MockOddsProvider::new();
    odds.add_sport("soccer_epl", "EPL");
    odds.add_event(
        MockEventBuilder::new("ev-b", "soccer_epl", "Team A", "Team B")
            .back("Team A", dec!(1.80), "williamhill")
            .lay("Team A", dec!(1.90), "betfair_ex_uk")
            .build(),
    );
    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(odds, &notifier);

    let report = scanner.scan_once().await.unwrap();

    assert!(report.opportunities.is_empty());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn exchange_failure_for_one_event_keeps_the_rest() {
    let odds = MockOddsProvider::new();
    odds.add_sport("soccer_epl", "EPL");
    odds.add_event(
        MockEventBuilder::new("ev-ars", "soccer_epl", "Arsenal", "Chelsea")
            .back("Arsenal", dec!(2.40), "williamhill")
            .build(),
    );

    let exchange = MockExchangeProvider::new();
    exchange.add_event(
        MockExchangeEventBuilder::new("x-broken", "Liverpool vs Everton")
            .lay("Liverpool", dec!(1.50))
            .build(),
    );
    exchange.add_event(
        MockExchangeEventBuilder::new("x-ars", "Arsenal vs Chelsea")
            .lay("Arsenal", dec!(2.10))
            .lay("Chelsea", dec!(3.60))
            .build(),
    );
    exchange.fail_event("x-broken");

    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(odds, &notifier).with_exchange(exchange.clone());

    let report = scanner.scan_once().await.unwrap();

    assert_eq!(report.opportunities.len(), 1);
    let opp = &report.opportunities[0];
    assert_eq!(opp.outcome, "Arsenal");
    assert_eq!(opp.lay_venue.key, "smarkets");
    assert_eq!(opp.profit_pct, dec!(10.71));

    let failed: Vec<_> = report.failures_from(FetchSource::ExchangeEvent).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target, "x-broken");
    assert_eq!(exchange.book_calls("x-broken"), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn fuzzy_exchange_names_are_flagged_in_alert() {
    let odds = MockOddsProvider::new();
    odds.add_sport("soccer_epl", "EPL");
    odds.add_event(
        MockEventBuilder::new("ev-mu", "soccer_epl", "Manchester United", "Chelsea")
            .back("Manchester United", dec!(2.60), "williamhill")
            .build(),
    );

    let exchange = MockExchangeProvider::new();
    exchange.add_event(
        MockExchangeEventBuilder::new("x-mu", "Man Utd vs Chelsea")
            .lay("Man Utd", dec!(2.20))
            .lay("Chelsea", dec!(3.40))
            .build(),
    );

    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(odds, &notifier).with_exchange(exchange);

    let report = scanner.scan_once().await.unwrap();

    assert_eq!(report.opportunities.len(), 1);
    assert!(report.opportunities[0].match_kind.is_fuzzy());
    assert_eq!(report.opportunities[0].lay_price, dec!(2.20));
    assert!(notifier.messages()[0].contains("Fuzzy name match"));
}

#[tokio::test]
async fn one_failing_sport_does_not_abort_the_pass() {
    let odds = team_a_market();
    odds.add_sport("basketball_nba", "NBA");
    odds.fail_sport("basketball_nba");

    let notifier = RecordingNotifier::new();
    let mut scanner = scanner(odds, &notifier);

    let report = scanner.scan_once().await.unwrap();

    assert_eq!(report.sports_scanned, 2);
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.failures_from(FetchSource::Odds).count(), 1);
    assert!(!report.is_degraded());
}

#[tokio::test]
async fn poller_recovers_after_listing_outage() {
    let odds = team_a_market();
    odds.set_fail_listing(true);
    let notifier = RecordingNotifier::new();
    let app = AppState::new();

    let mut poller = Poller::new(
        scanner(odds.clone(), &notifier),
        PollerConfig {
            interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(200),
            escalation_threshold: 2,
            notify_on_error: true,
        },
    )
    .with_app_state(app.clone());

    assert_eq!(poller.step().await, Duration::from_secs(120));
    assert_eq!(poller.step().await, Duration::from_secs(200));
    assert_eq!(poller.step().await, Duration::from_secs(200));
    assert!(!app.is_ready());
    assert_eq!(app.stats.read().await.consecutive_failures, 3);

    odds.set_fail_listing(false);
    assert_eq!(poller.step().await, Duration::from_secs(60));
    assert!(app.is_ready());

    let stats = app.stats.read().await;
    assert_eq!(stats.scans_failed, 3);
    assert_eq!(stats.scans_completed, 1);
    assert_eq!(stats.consecutive_failures, 0);

    // three failure reports plus one alert
    let messages = notifier.messages();
    assert_eq!(messages.len(), 4);
    assert!(messages[3].contains("Team A"));
}

#[tokio::test]
async fn every_sport_failing_is_not_reported_as_healthy() {
    let odds = team_a_market();
    odds.fail_sport("soccer_epl");
    let notifier = RecordingNotifier::new();
    let app = AppState::new();

    let mut poller = Poller::new(
        scanner(odds, &notifier),
        PollerConfig {
            interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(600),
            escalation_threshold: 3,
            notify_on_error: true,
        },
    )
    .with_app_state(app.clone());

    assert_eq!(poller.step().await, Duration::from_secs(120));
    assert_eq!(poller.step().await, Duration::from_secs(240));
    assert!(!app.is_ready());

    let stats = app.stats.read().await;
    assert_eq!(stats.scans_completed, 0);
    assert_eq!(stats.scans_degraded, 2);
    assert_eq!(stats.consecutive_failures, 2);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("2 in a row"));
    assert!(messages[1].contains("all 1 sport fetches failed"));
}
