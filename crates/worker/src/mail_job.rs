//! Mail queue drain loop.
//!
//! Periodically delivers unsent `mail_queue` rows over SMTP. Delivery is
//! best-effort: a failed message is logged and left queued for the next
//! cycle (no retry within the same run). Without SMTP configuration the
//! loop does not start at all — queued rows simply accumulate until an
//! operator configures the relay.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use opsdesk_db::repositories::MailRepo;
use opsdesk_db::DbPool;
use opsdesk_engine::delivery::{EmailConfig, SmtpMailer};

/// How often the queue is drained.
const DRAIN_INTERVAL: Duration = Duration::from_secs(60);

/// Messages picked up per cycle.
const DRAIN_BATCH: i64 = 50;

/// Run the mail drain loop until cancelled.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    let Some(config) = EmailConfig::from_env() else {
        tracing::warn!("SMTP_HOST not set; outbound mail will stay queued");
        return;
    };
    let mailer = SmtpMailer::new(config);

    tracing::info!("Mail drain job started");

    let mut interval = tokio::time::interval(DRAIN_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Mail drain job stopping");
                break;
            }
            _ = interval.tick() => {
                drain_once(&pool, &mailer).await;
            }
        }
    }
}

/// Deliver one batch of unsent messages.
async fn drain_once(pool: &DbPool, mailer: &SmtpMailer) {
    let batch = match MailRepo::list_unsent(pool, DRAIN_BATCH).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(error = %e, "Mail drain: queue read failed");
            return;
        }
    };

    for mail in &batch {
        match mailer.deliver(mail).await {
            Ok(()) => match MailRepo::mark_sent(pool, mail.id).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(mail_id = mail.id, error = %e, "Mail drain: failed to stamp sent_at");
                }
            },
            Err(e) => {
                tracing::warn!(mail_id = mail.id, error = %e, "Mail drain: delivery failed; left queued");
            }
        }
    }
}
