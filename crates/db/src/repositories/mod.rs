//! Repository structs, one per table.

pub mod audit_repo;
pub mod mail_repo;
pub mod subscription_repo;
pub mod ticket_repo;
pub mod user_repo;

pub use audit_repo::AuditRepo;
pub use mail_repo::MailRepo;
pub use subscription_repo::SubscriptionRepo;
pub use ticket_repo::TicketRepo;
pub use user_repo::UserRepo;
