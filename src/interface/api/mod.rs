//! API interface implementations

pub mod calls_handler;
pub mod dto;
pub mod error;
pub mod events_handler;
pub mod metrics_handler;
pub mod router;
pub mod state;
pub mod webhook_handler;

pub use error::{ApiError, ApiResult};
pub use metrics_handler::init_metrics;
pub use router::build_router;
pub use state::AppState;
