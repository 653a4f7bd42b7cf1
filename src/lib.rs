//! Back/lay sports betting arbitrage scanner.
//!
//! Backing an outcome at a bookmaker and laying the same outcome on an
//! exchange locks in a profit whenever the combined implied probability is
//! below one:
//!
//! ```text
//! Back "Team A" @ 2.50  -> 1/2.50 = 0.4000
//! Lay  "Team A" @ 2.30  -> 1/2.30 = 0.4348
//! ──────────────────────────────────────
//! Margin:                  0.8348 < 1.00 ✅
//! Profit:                  16.52%
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Bookmaker odds provider (back and exchange lay prices)
//! - [`exchange`]: Betting exchange provider (lay prices)
//! - [`notify`]: Alert delivery
//! - [`arbitrage`]: Margin calculation, name matching and the scan pass
//! - [`poller`]: Poll loop with backoff
//! - [`api`]: HTTP API for health/status/metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod notify;
pub mod odds;
pub mod poller;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
