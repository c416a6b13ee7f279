//! callctl Dispatch — drives commands across the transport.
//!
//! The send path moves a command through `request` and `execute`; the
//! receive path routes each inbound response to its pending command by
//! request id.

pub mod config;
pub mod dispatcher;
pub mod error;
