//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST endpoints used by the CRM
//! - Telnyx webhook callbacks
//! - The Server-Sent Events stream
//! - Request/response formatting

pub mod api;
