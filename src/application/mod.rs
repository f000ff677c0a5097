//! Application layer - Use cases and application services
//!
//! This layer orchestrates the call registry and the event broadcaster to
//! fulfill use cases. It's responsible for:
//! - Applying vendor webhooks in delivery order
//! - Issuing call control and SMS commands to the vendor

pub mod call_control;
pub mod switchboard;
pub mod webhook_ingester;

pub use call_control::{
    AnswerOutcome, BulkSmsResult, BulkSmsSummary, CallControlError, CallControlService,
    CallControlSettings, MediaPath,
};
pub use switchboard::Switchboard;
pub use webhook_ingester::{WebhookIngester, WebhookQueue};
