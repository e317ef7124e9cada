//! Main application orchestration.
//!
//! One pipeline per process:
//! feed connection → decode → rule evaluation → message rendering →
//! notification dispatch.
//!
//! Decoding and evaluation are synchronous and run on the pipeline task in
//! arrival order. Notifications leave through the dispatcher queue so a slow
//! provider never stalls ingestion.

use crate::config::{AppConfig, NotifierConfig};
use crate::error::{AppError, AppResult};
use coinwatch_detector::{AlertOccurrence, RuleEvaluator};
use coinwatch_feed::{decode, DecodeError};
use coinwatch_notify::{
    DynNotifier, LogNotifier, MessageFormatter, NotificationDispatcher, NotifyError,
    SmsCredentials, SmsNotifier,
};
use coinwatch_telemetry::Metrics;
use coinwatch_ws::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Raw payloads buffered between the connection task and the pipeline.
const FEED_CHANNEL_CAPACITY: usize = 1024;

/// Time the connection task gets to send its Close frame on shutdown.
const WS_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the notifier for this run.
///
/// Dry run → log notifier. Otherwise SMS when all provider credentials are
/// present in `lookup`, log notifier with a warning when they are not.
pub fn build_notifier<F>(config: &NotifierConfig, lookup: F) -> AppResult<DynNotifier>
where
    F: Fn(&str) -> Option<String>,
{
    if config.dry_run {
        info!("Dry run: notifications are logged, not sent");
        return Ok(Arc::new(LogNotifier::new()));
    }

    match SmsCredentials::from_lookup(lookup) {
        Ok(credentials) => {
            let notifier =
                SmsNotifier::new(&config.base_url, credentials, config.request_timeout())?;
            info!(url = notifier.messages_url(), "SMS notifier configured");
            Ok(Arc::new(notifier))
        }
        Err(e) => {
            warn!(error = %e, "SMS credentials incomplete, falling back to log notifier");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    evaluator: RuleEvaluator,
    formatter: MessageFormatter,
    dispatcher: NotificationDispatcher,
}

impl Application {
    /// Create a new application. Spawns the notification worker, so this
    /// must be called inside a tokio runtime.
    pub fn new(config: AppConfig, notifier: DynNotifier) -> AppResult<Self> {
        config.validate()?;

        let rules = config.detector_config().rules()?;
        let evaluator = RuleEvaluator::new(rules);
        let formatter = MessageFormatter::new(config.asset_name.clone());
        let dispatcher =
            NotificationDispatcher::spawn(notifier, config.notifier.dispatcher_config());

        info!(
            product_id = %config.product_id,
            channels = ?config.channels,
            large_order_threshold = %config.large_order_threshold,
            price_deviation_ratio = %config.price_deviation_ratio,
            notifier = dispatcher.notifier_name(),
            "Application initialized"
        );

        Ok(Self {
            config,
            evaluator,
            formatter,
            dispatcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Run one raw feed payload through the pipeline.
    ///
    /// Returns the alerts raised; each has already been handed to the
    /// dispatcher. A payload that fails to decode is logged and skipped
    /// without touching evaluator state.
    pub fn process_message(&mut self, raw: &[u8]) -> Vec<AlertOccurrence> {
        Metrics::feed_message();

        let events = match decode(raw) {
            Ok(events) => events,
            Err(e) => {
                Metrics::decode_failure(e.reason());
                match &e {
                    e if e.is_control() => debug!(error = %e, "Ignoring control message"),
                    DecodeError::FeedError(message) => {
                        warn!(%message, "Feed reported an error")
                    }
                    _ => warn!(
                        error = %e,
                        payload = %String::from_utf8_lossy(raw),
                        "Failed to decode feed message"
                    ),
                }
                return Vec::new();
            }
        };

        let mut raised = Vec::new();
        for event in &events {
            Metrics::event_evaluated(event.kind().as_str());

            for alert in self.evaluator.evaluate(event) {
                Metrics::alert_fired(alert.kind.as_str());
                info!(
                    kind = alert.kind.as_str(),
                    product_id = %alert.product_id,
                    amount = %alert.amount,
                    reference = %alert.reference_value,
                    threshold = %alert.threshold,
                    source = alert.source.as_str(),
                    "Alert raised"
                );

                let message = self.formatter.render(&alert);
                match self.dispatcher.dispatch(message) {
                    Ok(()) | Err(NotifyError::QueueFull) => {}
                    Err(e) => warn!(error = %e, "Failed to queue notification"),
                }
                raised.push(alert);
            }
        }

        raised
    }

    /// Run until ctrl-c or until the feed connection gives up.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
            signal_token.cancel();
        });

        self.run_until(shutdown).await
    }

    /// Run until `shutdown` is cancelled or the feed connection gives up.
    pub async fn run_until(mut self, shutdown: CancellationToken) -> AppResult<()> {
        let (message_tx, mut message_rx) = mpsc::channel::<Vec<u8>>(FEED_CHANNEL_CAPACITY);
        let manager = Arc::new(ConnectionManager::new(
            self.config.connection_config(),
            message_tx,
        ));

        let ws_manager = manager.clone();
        let mut ws_handle = tokio::spawn(async move { ws_manager.run().await });

        let stats_enabled = self.config.telemetry.stats_interval_secs > 0;
        let stats_period = Duration::from_secs(self.config.telemetry.stats_interval_secs.max(1));
        let mut stats_interval =
            tokio::time::interval_at(tokio::time::Instant::now() + stats_period, stats_period);

        info!(endpoint = %self.config.feed_endpoint, "Starting feed pipeline");

        let mut ws_finished = false;
        let result = loop {
            tokio::select! {
                Some(raw) = message_rx.recv() => {
                    self.process_message(&raw);
                }
                joined = &mut ws_handle => {
                    ws_finished = true;
                    break match joined {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => {
                            error!(error = %e, "Feed connection gave up");
                            Err(AppError::from(e))
                        }
                        Err(e) => Err(AppError::Task(e.to_string())),
                    };
                }
                _ = stats_interval.tick(), if stats_enabled => {
                    log_stats("Pipeline stats");
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
        };

        if !ws_finished {
            manager.shutdown();
            if tokio::time::timeout(WS_SHUTDOWN_TIMEOUT, &mut ws_handle)
                .await
                .is_err()
            {
                warn!("Feed connection did not close in time, aborting");
                ws_handle.abort();
            }
        }

        // Payloads that arrived before the connection stopped
        while let Ok(raw) = message_rx.try_recv() {
            self.process_message(&raw);
        }

        self.shutdown().await;
        result
    }

    /// Flush pending notifications within the configured grace period.
    ///
    /// Returns false when notifications had to be abandoned.
    pub async fn shutdown(self) -> bool {
        let grace = self.config.notifier.shutdown_grace();
        let drained = self.dispatcher.shutdown(grace).await;
        log_stats("Final stats");
        drained
    }
}

fn log_stats(label: &'static str) {
    let stats = Metrics::snapshot();
    info!(
        feed_messages = stats.feed_messages,
        decode_failures = stats.decode_failures,
        events = stats.events,
        alerts = stats.alerts,
        notifications_sent = stats.notifications_sent,
        notifications_failed = stats.notifications_failed,
        notifications_dropped = stats.notifications_dropped,
        reconnects = stats.reconnects,
        "{label}"
    );
}
