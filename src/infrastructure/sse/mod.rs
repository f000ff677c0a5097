//! Server-Sent Events infrastructure

pub mod broadcaster;

pub use broadcaster::{BroadcastReport, EventBroadcaster, Frame, Subscription};
