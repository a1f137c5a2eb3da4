//! Signing service adapter.
//!
//! `transport` performs single HTTP exchanges, `client` maps paths and
//! statuses, and `protocol` holds the JSON bodies of every call.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::RestPkiClient;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, RemoteServiceConfig, Transport};
