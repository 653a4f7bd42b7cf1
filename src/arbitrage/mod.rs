//! Arbitrage module for detecting and reporting opportunities.
//!
//! This module handles:
//! - Back/lay margin and profit calculations
//! - Cross-provider event and outcome matching
//! - Alert deduplication and formatting
//! - The scan pass tying providers, calculator and notifier together

pub mod alert;
pub mod calculator;
pub mod matcher;
pub mod scanner;

pub use alert::{format_alert, AlertKey, OutcomeKey, SeenAlerts};
pub use calculator::{
    bankroll_profit, calculate_opportunity, evaluate_margin, ArbitrageOpportunity, LayQuote,
    MarginResult, MIN_VIABLE_PRICE,
};
pub use matcher::{
    best_match, match_event, match_outcomes, split_fixture, MatchKind, MatchPolicy,
};
pub use scanner::{
    EventKey, FetchFailure, FetchSource, LayBook, ScanReport, ScanStats, Scanner, ScannerConfig,
};
