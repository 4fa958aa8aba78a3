//! Shared pause/shutdown/flatten signalling between an operator surface
//! (`twe-daemon`'s ControlPlane, or `twe-cli`) and [`crate::bar_loop::run_bar_loop`].
//!
//! Flags are plain atomics, not a mutex-guarded struct, because the bar
//! loop only ever needs to peek them once per iteration — the //! ordering guarantee ("commands take effect between ticks, never inside
//! one") falls out naturally from checking them once at the top of the
//! loop and nowhere else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RuntimeControl {
    inner: Arc<Flags>,
}

#[derive(Default)]
struct Flags {
    paused: AtomicBool,
    shutdown: AtomicBool,
    flatten_requested: AtomicBool,
}

impl RuntimeControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    pub fn request_flatten(&self) {
        self.inner.flatten_requested.store(true, Ordering::SeqCst);
    }

    /// Consume the pending flatten request, if any. `run_bar_loop` calls
    /// this once per iteration so a flatten fires exactly once per request.
    pub fn take_flatten_request(&self) -> bool {
        self.inner.flatten_requested.swap(false, Ordering::SeqCst)
    }
}
