//! The lifecycle engine: ticket state machine service, subscription expiry
//! scanner, notification sink, and SMTP delivery.
//!
//! Storage and the mail sink are passed in explicitly — no ambient global
//! clients. Entity mutations and their audit entries share one transaction
//! ("exactly-once, transactional"); outbound email is post-commit and
//! best-effort ("at-least-once").

pub mod delivery;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod scanner;

pub use error::{EngineError, EngineResult};
pub use lifecycle::TicketLifecycle;
pub use scanner::{ExpiryScanner, ScanSummary};
