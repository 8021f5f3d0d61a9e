//! Observability hooks.
//!
//! A thin `Reporter` interface the executor and revision store notify on
//! plan start, every action state transition, rollback triggers, and
//! revision persistence. These calls are best-effort: nothing in the
//! correctness contract of §5 depends on them running or succeeding.

pub trait Reporter: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Default reporter: every call is a no-op. Used when embedding the core
/// as a library with no terminal or logging backend wired up.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

/// Forwards to the `tracing` crate, so a binary built on this core gets
/// structured, leveled logging for free by installing a subscriber.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }
    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }
    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}
