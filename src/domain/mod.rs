//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Entities: Call sessions with identity
//! - Value Objects: Directions and status vocabularies
//! - Domain Events: Frames pushed to browser clients
//! - The session registry

pub mod call;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
