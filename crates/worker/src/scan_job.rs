//! Daily subscription scan loop.
//!
//! Polls on a short interval and fires [`ExpiryScanner::run_once`] once per
//! local calendar day, at or after the configured hour. The loop is a
//! single sequential task, so at most one scan is ever active; a failed run
//! does not record the day and is retried on the next poll.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio_util::sync::CancellationToken;

use opsdesk_core::schedule::{is_scan_due, DEFAULT_SCAN_HOUR};
use opsdesk_db::DbPool;
use opsdesk_engine::ExpiryScanner;

/// How often the loop checks whether a scan is due.
const POLL_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Address reminders fall back to when a creator cannot be resolved.
const DEFAULT_FALLBACK_EMAIL: &str = "operations@opsdesk.local";

/// Run the daily expiry scan loop until cancelled.
///
/// | Variable              | Default                      |
/// |-----------------------|------------------------------|
/// | `SCAN_HOUR`           | `8` (08:00 local)            |
/// | `SCAN_FALLBACK_EMAIL` | `operations@opsdesk.local`   |
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    let run_hour: u32 = std::env::var("SCAN_HOUR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SCAN_HOUR);
    let fallback_email = std::env::var("SCAN_FALLBACK_EMAIL")
        .unwrap_or_else(|_| DEFAULT_FALLBACK_EMAIL.to_string());

    let scanner = ExpiryScanner::new(pool, fallback_email);

    tracing::info!(run_hour, "Subscription scan job started");

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let mut last_run: Option<NaiveDate> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Subscription scan job stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Local::now();
                if !is_scan_due(now, last_run, run_hour) {
                    continue;
                }
                let today = now.date_naive();
                match scanner.run_once(today).await {
                    Ok(summary) => {
                        last_run = Some(today);
                        if summary.changed() {
                            tracing::info!(
                                expired = summary.expired,
                                reminders = summary.reminders,
                                "Daily expiry scan applied changes"
                            );
                        } else {
                            tracing::debug!(scanned = summary.scanned, "Daily expiry scan: no changes");
                        }
                    }
                    Err(e) => {
                        // last_run stays unset: the next poll retries, and
                        // the flag guards make the retry safe.
                        tracing::error!(error = %e, "Daily expiry scan failed");
                    }
                }
            }
        }
    }
}
