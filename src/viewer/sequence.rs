use std::sync::atomic::{AtomicU64, Ordering};

/// Number captured when a selection starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceToken(u64);

impl SequenceToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic request counter.
///
/// Work that cannot be cancelled captures a token when it starts and checks
/// it before touching shared state. A superseded token means the result is
/// dropped.
#[derive(Debug, Default)]
pub struct RequestSequence {
    current: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request and supersedes every earlier token.
    pub fn next(&self) -> SequenceToken {
        SequenceToken(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> SequenceToken {
        SequenceToken(self.current.load(Ordering::Acquire))
    }

    pub fn is_current(&self, token: SequenceToken) -> bool {
        self.current() == token
    }
}
