//! Adapter layer modules for external system integration.
//!
//! Provides the HTTPS adapter to the remote signing service: the transport
//! seam, the client that maps paths and statuses, and the wire protocol.

pub mod remote;
