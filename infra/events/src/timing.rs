use nanoid::nanoid;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::trace;

// Excludes visually ambiguous characters (I, O, l, 0, 1).
const CORRELATION_ALPHABET: [char; 55] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const CORRELATION_LEN: usize = 12;

/// Opaque token tying one emission to its instrumentation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instrumentation hook wrapped around every emission.
///
/// [`Timing::start`] is called once per `emit` with a label of the form
/// `dispatcher('event')`. The returned handle's completion runs exactly once,
/// after both dispatch phases, whether or not a listener failed.
pub trait Timing: Send + Sync + fmt::Debug {
    fn start(&self, label: &str) -> TimingHandle;
}

/// A started timing record: a correlation token plus a completion callback.
#[must_use = "Dropping the handle completes the timing record immediately."]
pub struct TimingHandle {
    correlation: CorrelationId,
    on_finish: Option<Box<dyn FnOnce() + Send>>,
}

impl TimingHandle {
    pub fn new(correlation: CorrelationId, on_finish: impl FnOnce() + Send + 'static) -> Self {
        Self { correlation, on_finish: Some(Box::new(on_finish)) }
    }

    /// A handle whose completion does nothing.
    pub fn detached(correlation: CorrelationId) -> Self {
        Self { correlation, on_finish: None }
    }

    #[must_use]
    pub const fn correlation(&self) -> &CorrelationId {
        &self.correlation
    }

    /// Runs the completion callback. Dropping the handle has the same effect.
    pub fn finish(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        if let Some(on_finish) = self.on_finish.take() {
            on_finish();
        }
    }
}

impl Drop for TimingHandle {
    fn drop(&mut self) {
        self.complete();
    }
}

impl fmt::Debug for TimingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingHandle")
            .field("correlation", &self.correlation)
            .field("pending", &self.on_finish.is_some())
            .finish()
    }
}

/// Default collaborator: nanoid correlation tokens and `trace`-level timing records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTiming;

impl Timing for TracingTiming {
    fn start(&self, label: &str) -> TimingHandle {
        let correlation = CorrelationId::from(nanoid!(CORRELATION_LEN, &CORRELATION_ALPHABET));
        trace!(label = %label, correlation = %correlation, "Emission started");

        let label = label.to_owned();
        let started = Instant::now();
        let token = correlation.clone();
        TimingHandle::new(correlation, move || {
            let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            trace!(label = %label, correlation = %token, elapsed_us, "Emission finished");
        })
    }
}

/// Collaborator stub: sequential correlation tokens, no records.
#[derive(Debug, Default)]
pub struct NoopTiming {
    sequence: AtomicU64,
}

impl NoopTiming {
    #[must_use]
    pub const fn new() -> Self {
        Self { sequence: AtomicU64::new(0) }
    }
}

impl Timing for NoopTiming {
    fn start(&self, _label: &str) -> TimingHandle {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        TimingHandle::detached(CorrelationId::from(seq.to_string()))
    }
}
