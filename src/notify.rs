// src/notify.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ErrorCode;

/// Progress and status reporting sink for a running [`crate::engine::Engine`].
/// Generalizes the teacher's GUI-coupled `notifyUser`/`updateStatus`/
/// `updateProgressBar` triad into something a CLI, GUI or test harness can
/// each implement; `Engine` only ever depends on this trait, never on a
/// concrete UI type.
pub trait Notifier {
    fn message(&self, text: &str);
    fn progress(&self, percent: u8);
    fn warn(&self, code: ErrorCode, text: &str);
}

/// A [`Notifier`] that discards everything. The default for library
/// consumers who only want the returned `ResultBundle`; `log` output still
/// happens independently at the relevant call sites.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn message(&self, _text: &str) {}
    fn progress(&self, _percent: u8) {}
    fn warn(&self, _code: ErrorCode, _text: &str) {}
}

/// Cooperative cancellation flag shared between a caller and a running
/// `Engine::run`. Checked at the sequential suspension points named in the
/// concurrency model: once per top-level octree voxel during pass 1, once
/// per x-slab during pass 2, and once per cavity component during
/// connected-component labeling. Cloning shares the same underlying flag.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn request_abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
