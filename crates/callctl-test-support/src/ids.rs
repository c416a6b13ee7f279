//! Test id generator — predictable request identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use callctl_core::request_id::{IdGenerator, RequestId};

/// Hands out `"{prefix}-1"`, `"{prefix}-2"`, ... in order.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: &'static str,
    next: AtomicU64,
}

impl SequenceIdGenerator {
    /// Create a generator whose ids start at `{prefix}-1`.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId::new(format!("{}-{n}", self.prefix))
    }
}
