//! Telnyx carrier integration: REST client and webhook authentication

pub mod api;
pub mod client;
pub mod error;
pub mod signature;

pub use api::{DialRequest, DialResponse, SmsRequest, SmsResponse, TelephonyApi, VendorCallStatus};
pub use client::TelnyxClient;
pub use error::TelnyxError;
pub use signature::{SignatureError, WebhookVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
