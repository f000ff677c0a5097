//! Call bounded context - tracks live telephony sessions

pub mod entity;
pub mod event;
pub mod registry;
pub mod value_object;
pub mod vendor_event;

pub use entity::{CallSession, SessionPatch};
pub use event::CallEvent;
pub use registry::CallSessionRegistry;
pub use value_object::{CallDirection, SessionStatus, UiCallStatus};
pub use vendor_event::{VendorEvent, WebhookEnvelope};
