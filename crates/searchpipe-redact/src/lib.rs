//! searchpipe-redact
//!
//! Response stage that masks forbidden substrings in hit fields and
//! document bodies. See `mask` for the replacement rule and
//! `processor` for the stage itself.

pub mod mask;
pub mod processor;

pub use processor::{RedactConfig, RedactProcessor};
