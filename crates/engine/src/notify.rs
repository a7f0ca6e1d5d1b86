//! Notification requests and the sink they are handed to.
//!
//! [`NotificationSink::enqueue`] is the single seam between the engine and
//! outbound mail. The production impl writes to the `mail_queue` table; the
//! external mail system owns delivery semantics. Sink failures are
//! non-fatal to the entities they document: callers catch them at the call
//! site and log a warning.

use async_trait::async_trait;

use opsdesk_core::subscription::ReminderLevel;
use opsdesk_db::models::subscription::Subscription;
use opsdesk_db::models::ticket::Ticket;
use opsdesk_db::repositories::MailRepo;
use opsdesk_db::DbPool;

// ---------------------------------------------------------------------------
// NotificationRequest
// ---------------------------------------------------------------------------

/// One outbound notification. Write-once: built, enqueued, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Error type for notification enqueue failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Mail queue write failed: {0}")]
    Queue(#[from] sqlx::Error),
}

/// Fire-and-forget notification sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn enqueue(&self, request: &NotificationRequest) -> Result<(), SinkError>;
}

/// Production sink: appends to the `mail_queue` table.
pub struct MailQueueSink {
    pool: DbPool,
}

impl MailQueueSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for MailQueueSink {
    async fn enqueue(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        let mut conn = self.pool.acquire().await?;
        MailRepo::enqueue(&mut conn, &request.to, &request.subject, &request.body).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

/// Notification sent to the operations address when a ticket is created.
pub fn ticket_created(ticket: &Ticket, ops_email: &str) -> NotificationRequest {
    NotificationRequest {
        to: vec![ops_email.to_string()],
        subject: format!("[Ticket #{}] New {} priority ticket", ticket.id, ticket.priority),
        body: format!(
            "Ticket #{}: {}\n\n{}\n\nRespond by: {}\nResolve by: {}",
            ticket.id,
            ticket.title,
            ticket.description,
            ticket.sla_response_target,
            ticket.sla_resolution_target,
        ),
    }
}

/// Notification sent to a technician when a ticket is assigned to them.
pub fn ticket_assigned(ticket: &Ticket, tech_email: &str) -> NotificationRequest {
    NotificationRequest {
        to: vec![tech_email.to_string()],
        subject: format!("[Ticket #{}] Assigned to you", ticket.id),
        body: format!(
            "Ticket #{}: {}\nPriority: {}\nResolve by: {}",
            ticket.id, ticket.title, ticket.priority, ticket.sla_resolution_target,
        ),
    }
}

/// Reminder for one expiry threshold, addressed to the subscription's
/// creator (or the fallback operations address).
pub fn subscription_reminder(
    subscription: &Subscription,
    level: ReminderLevel,
    recipient: &str,
) -> NotificationRequest {
    NotificationRequest {
        to: vec![recipient.to_string()],
        subject: format!(
            "[{}] Subscription \"{}\" expires on {}",
            level.label(),
            subscription.name,
            subscription.expiry_date,
        ),
        body: format!(
            "Subscription \"{}\" ({}) expires on {}.\n\
             Reminder level: {}.\n\
             Renew it before the expiry date to avoid interruption.",
            subscription.name,
            subscription.vendor,
            subscription.expiry_date,
            level.label(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
