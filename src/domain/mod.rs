//! Domain layer: value types and rules with no I/O.

pub mod constants;
pub mod digest;
pub mod opened;
pub mod session;
pub mod types;
pub mod validation;
pub mod visual;
pub mod xml;
