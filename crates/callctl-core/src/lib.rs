//! callctl Core — command lifecycle abstractions.
//!
//! This crate defines the command state machine and the write-once
//! response future that bridges an asynchronously delivered response to
//! a blocking caller, plus the transport seam it is dispatched through.

pub mod clock;
pub mod command;
pub mod error;
pub mod future;
pub mod request_id;
pub mod transport;
