//! Infrastructure layer - Adapters to the outside world
//!
//! This layer contains:
//! - The Telnyx REST client and webhook signature checks
//! - The Server-Sent Events broadcaster

pub mod sse;
pub mod telnyx;
