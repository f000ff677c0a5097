//! Switchboard - Telnyx call tracking for the agency CRM
//!
//! Ingests Telnyx call-control webhooks, keeps an in-memory registry of live
//! call sessions, pushes changes to browser clients over Server-Sent Events,
//! and exposes REST endpoints for placing and controlling calls and SMS.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
