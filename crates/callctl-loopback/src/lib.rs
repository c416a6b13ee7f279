//! callctl loopback — wires the dispatcher to an in-process echo server.

pub mod config;
pub mod echo;
pub mod error;
