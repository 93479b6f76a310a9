//! `Context` carries the active version reference through every call,
//! rather than stashing it as ambient mutable state inside an object
//! (spec §9's REDESIGN FLAGS: "do not hide it inside an object; carry it on
//! the context that flows through every call. The Index registry is the
//! only module that reads it.").
//!
//! Also the vehicle for cancellation (spec §4.I/§5): a `Context` can be
//! cancelled from any thread and observed from any other, the way a
//! `context.Context` is used in the Go source this spec distills. Rust has
//! no stdlib equivalent, so this is a minimal hand-rolled flag —
//! `prataprc-rdms` has nothing like it to ground on (it is single-process,
//! single-call-at-a-time), so this follows the shape of a cooperative
//! cancellation token rather than importing an async runtime's
//! `CancellationToken` for what is otherwise a synchronous library.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The version reference a call should operate under, plus a cooperative
/// cancellation flag. Cheap to clone (one `Arc` each).
#[derive(Clone)]
pub struct Context {
    version_ref: Arc<str>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new(version_ref: impl Into<Arc<str>>) -> Self {
        Context { version_ref: version_ref.into(), cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn version_ref(&self) -> &str {
        &self.version_ref
    }

    /// A child context with a different active version reference, sharing
    /// this context's cancellation flag.
    pub fn with_version_ref(&self, version_ref: impl Into<Arc<str>>) -> Self {
        Context { version_ref: version_ref.into(), cancelled: self.cancelled.clone() }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
