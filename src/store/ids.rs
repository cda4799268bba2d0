use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out registration sequence numbers.
pub trait IdAllocator: Send + Sync {
    /// Increments and returns the new value; the first call on a fresh
    /// allocator returns 1.
    fn next_sequence(&self) -> u32;

    /// Last value handed out, 0 if none.
    fn current(&self) -> u32;
}

/// In-process counter. Not persisted: a new process starts again at 0
/// unless seeded with [`SequentialIds::starting_after`].
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_after(last: u32) -> Self {
        Self {
            counter: AtomicU32::new(last),
        }
    }
}

impl IdAllocator for SequentialIds {
    fn next_sequence(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }
}
