//! Application configuration loaded from environment variables.

use std::collections::HashSet;
use std::time::Duration;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::BotError;

/// UK back-only bookmakers scanned by default.
pub const DEFAULT_BACK_BOOKMAKERS: &[&str] = &[
    "williamhill",
    "ladbrokes_uk",
    "coral",
    "skybet",
    "betway",
    "sport888",
    "betvictor",
    "paddypower",
    "boylesports",
    "unibet_uk",
    "casumo",
    "virginbet",
    "livescorebet",
    "leovegas",
    "grosvenor",
];

/// Lay-capable exchanges reported through the odds provider by default.
pub const DEFAULT_LAY_EXCHANGES: &[&str] = &["betfair_ex_uk", "matchbook", "smarkets"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Provider ===
    /// The Odds API key.
    pub odds_api_key: String,

    /// Odds API base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Comma-separated bookmaker regions (e.g. "uk", "uk,eu").
    #[serde(default = "default_regions")]
    pub odds_regions: String,

    /// Comma-separated sport keys to scan; empty scans every active sport.
    #[serde(default)]
    pub sports: String,

    // === Exchange Provider ===
    /// Exchange API base URL.
    #[serde(default = "default_exchange_api_url")]
    pub exchange_api_url: String,

    /// Maximum popular exchange events fetched per scan.
    #[serde(default = "default_exchange_event_limit")]
    pub exchange_event_limit: usize,

    /// Disable the exchange feed and rely on odds-provider lay markets only.
    #[serde(default)]
    pub exchange_disabled: bool,

    // === Notifier ===
    /// Telegram bot token.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat to deliver alerts to.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,

    /// Send a message when a whole scan fails.
    #[serde(default = "default_true")]
    pub notify_on_error: bool,

    // === Scan Parameters ===
    /// Minimum profit percentage that triggers an alert (1.0 = 1%).
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: Decimal,

    /// Bankroll used for the display-only profit estimate.
    #[serde(default = "default_bankroll")]
    pub bankroll: Decimal,

    /// Similarity cutoff for fuzzy name matching, in (0, 1].
    #[serde(default = "default_match_cutoff")]
    pub match_cutoff: f64,

    /// Comma-separated back bookmaker keys. Unset uses the built-in UK list;
    /// set but empty accepts any bookmaker that is not a lay exchange.
    #[serde(default = "default_back_bookmakers")]
    pub back_bookmakers: String,

    /// Comma-separated lay exchange keys; empty uses the built-in list.
    #[serde(default)]
    pub lay_exchanges: String,

    /// IANA zone used when printing kick-off times.
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,

    // === Poll Loop ===
    /// Seconds between scans.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound for the failure backoff.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Consecutive failed scans before logging escalates to error.
    #[serde(default = "default_escalation_threshold")]
    pub failure_escalation_threshold: u32,

    // === HTTP ===
    /// Per-request timeout for every upstream call.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_regions() -> String {
    "uk".to_string()
}

fn default_back_bookmakers() -> String {
    DEFAULT_BACK_BOOKMAKERS.join(",")
}

fn default_display_timezone() -> String {
    "Europe/London".to_string()
}

fn default_exchange_api_url() -> String {
    "https://api.smarkets.com/v3".to_string()
}

fn default_exchange_event_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_min_profit_pct() -> Decimal {
    Decimal::new(10, 1) // 1.0%
}

fn default_bankroll() -> Decimal {
    Decimal::new(100, 0) // £100
}

fn default_match_cutoff() -> f64 {
    0.6
}

fn default_poll_interval() -> u64 {
    600
}

fn default_max_backoff() -> u64 {
    3600
}

fn default_escalation_threshold() -> u32 {
    3
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Split a comma-separated list, trimming blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load configuration and reject invalid settings.
    pub fn from_env() -> crate::Result<Self> {
        let config = Self::load()?;
        config.validate().map_err(BotError::InvalidConfig)?;
        Ok(config)
    }

    /// Build a config with every optional field at its default.
    pub fn with_api_key(odds_api_key: impl Into<String>) -> Self {
        Self {
            odds_api_key: odds_api_key.into(),
            odds_api_url: default_odds_api_url(),
            odds_regions: default_regions(),
            sports: String::new(),
            exchange_api_url: default_exchange_api_url(),
            exchange_event_limit: default_exchange_event_limit(),
            exchange_disabled: false,
            telegram_bot_token: None,
            telegram_chat_id: None,
            notify_on_error: true,
            min_profit_pct: default_min_profit_pct(),
            bankroll: default_bankroll(),
            match_cutoff: default_match_cutoff(),
            back_bookmakers: default_back_bookmakers(),
            lay_exchanges: String::new(),
            display_timezone: default_display_timezone(),
            poll_interval_secs: default_poll_interval(),
            max_backoff_secs: default_max_backoff(),
            failure_escalation_threshold: default_escalation_threshold(),
            http_timeout_ms: default_http_timeout_ms(),
            port: default_port(),
            rust_log: default_log_level(),
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.odds_api_key.trim().is_empty() {
            return Err("ODDS_API_KEY is required".to_string());
        }

        url::Url::parse(&self.odds_api_url)
            .map_err(|e| format!("ODDS_API_URL is not a valid URL: {}", e))?;

        if !self.exchange_disabled {
            url::Url::parse(&self.exchange_api_url)
                .map_err(|e| format!("EXCHANGE_API_URL is not a valid URL: {}", e))?;
        }

        if self.bankroll <= Decimal::ZERO {
            return Err("BANKROLL must be positive".to_string());
        }

        if self.min_profit_pct < Decimal::ZERO {
            return Err("MIN_PROFIT_PCT must not be negative".to_string());
        }

        if !(self.match_cutoff > 0.0 && self.match_cutoff <= 1.0) {
            return Err("MATCH_CUTOFF must be in (0, 1]".to_string());
        }

        if self.poll_interval_secs == 0 {
            return Err("POLL_INTERVAL_SECS must be at least 1".to_string());
        }

        if self.max_backoff_secs < self.poll_interval_secs {
            return Err("MAX_BACKOFF_SECS must be >= POLL_INTERVAL_SECS".to_string());
        }

        self.display_tz()?;

        if self.telegram_bot_token.is_some() != self.telegram_chat_id.is_some() {
            return Err(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
            );
        }

        Ok(())
    }

    /// Sport keys to restrict the scan to (empty = all active sports).
    pub fn sport_filter(&self) -> HashSet<String> {
        split_list(&self.sports).into_iter().collect()
    }

    /// Back bookmaker whitelist; empty means any non-exchange bookmaker.
    pub fn back_bookmaker_set(&self) -> HashSet<String> {
        split_list(&self.back_bookmakers).into_iter().collect()
    }

    /// Lay exchange whitelist.
    pub fn lay_exchange_set(&self) -> HashSet<String> {
        let list = split_list(&self.lay_exchanges);
        if list.is_empty() {
            DEFAULT_LAY_EXCHANGES.iter().map(|s| s.to_string()).collect()
        } else {
            list.into_iter().collect()
        }
    }

    /// Whether Telegram delivery is configured.
    pub fn has_telegram(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }

    /// Zone for kick-off times.
    pub fn display_tz(&self) -> Result<Tz, String> {
        self.display_timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| {
                format!(
                    "DISPLAY_TIMEZONE '{}' is not a known zone",
                    self.display_timezone
                )
            })
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Normal sleep between scans.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Ceiling for the failure backoff.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_min_profit_pct(), dec!(1.0));
        assert_eq!(default_bankroll(), dec!(100));
        assert_eq!(default_poll_interval(), 600);
        assert!((default_match_cutoff() - 0.6).abs() < f64::EPSILON);
        assert!(default_true());
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = Config::with_api_key("key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = Config::with_api_key("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_cutoff_out_of_range() {
        let mut config = Config::with_api_key("key");
        config.match_cutoff = 0.0;
        assert!(config.validate().is_err());
        config.match_cutoff = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_configured_telegram() {
        let mut config = Config::with_api_key("key");
        config.telegram_bot_token = Some("123:abc".to_string());
        assert!(config.validate().is_err());

        config.telegram_chat_id = Some("42".to_string());
        assert!(config.validate().is_ok());
        assert!(config.has_telegram());
    }

    #[test]
    fn validate_rejects_backoff_below_interval() {
        let mut config = Config::with_api_key("key");
        config.poll_interval_secs = 600;
        config.max_backoff_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bookmaker_lists_fall_back_to_defaults() {
        let mut config = Config::with_api_key("key");
        assert!(config.back_bookmaker_set().contains("williamhill"));
        assert!(config.lay_exchange_set().contains("betfair_ex_uk"));

        config.back_bookmakers = "bet365, ,paddypower".to_string();
        let backs = config.back_bookmaker_set();
        assert_eq!(backs.len(), 2);
        assert!(backs.contains("bet365"));
        assert!(!backs.contains("williamhill"));
    }

    #[test]
    fn empty_back_list_means_any_bookmaker() {
        let mut config = Config::with_api_key("key");
        config.back_bookmakers = " ".to_string();
        assert!(config.back_bookmaker_set().is_empty());
    }

    #[test]
    fn display_timezone_must_be_known() {
        let mut config = Config::with_api_key("key");
        assert_eq!(config.display_tz(), Ok(Tz::Europe__London));

        config.display_timezone = "Australia/Sydney".to_string();
        assert_eq!(config.display_tz(), Ok(Tz::Australia__Sydney));

        config.display_timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn sport_filter_splits_and_trims() {
        let mut config = Config::with_api_key("key");
        assert!(config.sport_filter().is_empty());

        config.sports = "soccer_epl, tennis_atp_french_open".to_string();
        let sports = config.sport_filter();
        assert!(sports.contains("soccer_epl"));
        assert!(sports.contains("tennis_atp_french_open"));
    }
}
