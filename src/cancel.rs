//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A process-wide boolean flipped by an interrupt and polled at I/O
/// checkpoints. Setting it does not raise an error by itself; callers that
/// poll it return the benign `Aborted` sentinel and discard partial work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A process-wide boolean that a signal handler can flip at runtime and
/// any collaborator can read back, e.g. jdupes.c's `sigusr1()` toggling
/// `F_SOFTABORT` mid-run instead of only reading it once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeFlag(Arc<AtomicBool>);

impl RuntimeFlag {
    pub fn new(initial: bool) -> Self {
        RuntimeFlag(Arc::new(AtomicBool::new(initial)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::SeqCst);
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}
