//! Poll loop: scan, sleep, repeat, with exponential backoff on failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::api::AppState;
use crate::arbitrage::alert::format_failure;
use crate::arbitrage::{Scanner, ScannerConfig};
use crate::config::Config;
use crate::exchange::SmarketsClient;
use crate::metrics;
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::odds::OddsApiClient;

/// Telegram when both credentials are set, log-only otherwise.
pub fn notifier_for(config: &Config) -> crate::Result<Arc<dyn Notifier>> {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) if config.has_telegram() => Ok(Arc::new(TelegramNotifier::new(
            token.as_str(),
            chat_id.as_str(),
            config.http_timeout(),
        )?)),
        _ => {
            warn!("Telegram credentials not set, alerts will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// A scan pass is running.
    Scanning,
    /// Waiting before the next pass.
    Sleeping(Duration),
}

/// Loop timing and failure handling parameters.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep after a successful pass.
    pub interval: Duration,
    /// Upper bound on the backoff sleep.
    pub max_backoff: Duration,
    /// Consecutive failures after which failures log at error.
    pub escalation_threshold: u32,
    /// Send failed passes to the notifier.
    pub notify_on_error: bool,
}

impl PollerConfig {
    /// Derive loop parameters from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_backoff: config.max_backoff(),
            escalation_threshold: config.failure_escalation_threshold,
            notify_on_error: config.notify_on_error,
        }
    }
}

/// Drives a [`Scanner`] forever.
pub struct Poller {
    scanner: Scanner,
    config: PollerConfig,
    state: PollState,
    consecutive_failures: u32,
    app_state: Option<AppState>,
}

impl Poller {
    /// Create a poller.
    pub fn new(scanner: Scanner, config: PollerConfig) -> Self {
        Self {
            scanner,
            config,
            state: PollState::Scanning,
            consecutive_failures: 0,
            app_state: None,
        }
    }

    /// Wire the live odds feed, exchange and notifier from configuration.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let notifier = notifier_for(config)?;
        info!("Notifier: {}", notifier.name());

        let mut scanner = Scanner::new(
            ScannerConfig::from_config(config),
            OddsApiClient::new(config)?,
            notifier,
        );
        if config.exchange_disabled {
            info!("Exchange feed disabled");
        } else {
            scanner = scanner.with_exchange(SmarketsClient::new(config)?);
        }

        Ok(Self::new(scanner, PollerConfig::from_config(config)))
    }

    /// Publish readiness and stats to the HTTP API.
    #[must_use]
    pub fn with_app_state(mut self, state: AppState) -> Self {
        self.app_state = Some(state);
        self
    }

    /// Current loop state.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Current run of failed passes.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Sleep before the next pass after `failures` consecutive failures.
    ///
    /// `min(interval * 2^failures, max_backoff)`; zero failures is the plain
    /// interval.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.config
            .interval
            .checked_mul(factor)
            .unwrap_or(self.config.max_backoff)
            .min(self.config.max_backoff)
    }

    /// Run one pass and return how long to sleep afterwards.
    ///
    /// A pass where every sport fetch failed is treated like a failed pass:
    /// it backs off, escalates and is reported.
    pub async fn step(&mut self) -> Duration {
        self.state = PollState::Scanning;

        let sleep = match self.scanner.scan_once().await {
            Ok(report) => match report.degraded_reason() {
                None => {
                    metrics::inc_scans_completed();
                    self.consecutive_failures = 0;
                    info!("Next scan in {}s", self.config.interval.as_secs());

                    if let Some(app) = &self.app_state {
                        app.stats.write().await.record_success(&report);
                        app.set_ready(true);
                    }

                    self.config.interval
                }
                Some(reason) => {
                    if let Some(app) = &self.app_state {
                        app.stats.write().await.record_degraded(&report, &reason);
                    }
                    self.on_failure(&reason).await
                }
            },
            Err(e) => {
                let reason = e.to_string();
                if let Some(app) = &self.app_state {
                    app.stats.write().await.record_failure(&reason);
                }
                self.on_failure(&reason).await
            }
        };

        self.state = PollState::Sleeping(sleep);
        sleep
    }

    async fn on_failure(&mut self, reason: &str) -> Duration {
        metrics::inc_scans_failed();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let failures = self.consecutive_failures;
        let backoff = self.backoff_for(failures);

        if failures >= self.config.escalation_threshold {
            error!(
                consecutive_failures = failures,
                backoff_secs = backoff.as_secs(),
                "Scan failed: {}",
                reason
            );
        } else {
            warn!(
                consecutive_failures = failures,
                backoff_secs = backoff.as_secs(),
                "Scan failed: {}",
                reason
            );
        }

        if self.config.notify_on_error {
            let message = format_failure(reason, failures);
            if let Err(e) = self.scanner.notifier().send(&message).await {
                metrics::inc_notify_failures();
                warn!("Failed to report scan failure: {}", e);
            }
        }

        backoff
    }

    /// Alternate scanning and sleeping until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let sleep = tokio::select! {
                sleep = self.step() => sleep,
                _ = &mut shutdown => break,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Poll loop stopped");
    }
}
