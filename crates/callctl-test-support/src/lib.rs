//! Shared test doubles for callctl crates.

mod clock;
mod ids;
mod transport;

pub use clock::FixedClock;
pub use ids::SequenceIdGenerator;
pub use transport::{FailingTransport, RecordingTransport};
