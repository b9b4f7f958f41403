use crate::error::ListenerError;
use crate::event::EventId;
use crate::timing::CorrelationId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a listener sees for one invocation.
///
/// Named listeners get the arguments exactly as passed to `emit`. Wildcard
/// listeners additionally get the emitted event and the emission's correlation token.
#[derive(Debug)]
pub struct Call<'a, A> {
    args: &'a [A],
    event: Option<&'a EventId>,
    correlation: Option<&'a CorrelationId>,
}

impl<'a, A> Call<'a, A> {
    pub(crate) const fn named(args: &'a [A]) -> Self {
        Self { args, event: None, correlation: None }
    }

    pub(crate) const fn wildcard(
        event: &'a EventId,
        args: &'a [A],
        correlation: &'a CorrelationId,
    ) -> Self {
        Self { args, event: Some(event), correlation: Some(correlation) }
    }

    #[must_use]
    pub const fn args(&self) -> &'a [A] {
        self.args
    }

    /// The first argument, if any.
    #[must_use]
    pub fn arg(&self) -> Option<&'a A> {
        self.args.first()
    }

    /// The emitted event; `None` for named listeners.
    #[must_use]
    pub const fn event(&self) -> Option<&'a EventId> {
        self.event
    }

    /// The emission's correlation token; `None` for named listeners.
    #[must_use]
    pub const fn correlation(&self) -> Option<&'a CorrelationId> {
        self.correlation
    }
}

type Handler<A> = dyn Fn(&Call<'_, A>) -> Result<(), ListenerError> + Send + Sync;

/// A shareable listener handle.
///
/// Clones share one identity: registering a handle and later removing a clone
/// of it removes the same entry.
pub struct Listener<A> {
    id: ListenerId,
    handler: Arc<Handler<A>>,
}

impl<A> Listener<A> {
    /// Wraps a fallible callback. An `Err` aborts the emission that invoked it.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Call<'_, A>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self::with_id(ListenerId::next(), handler)
    }

    /// Wraps a callback that cannot fail.
    pub fn infallible<F>(handler: F) -> Self
    where
        F: Fn(&Call<'_, A>) + Send + Sync + 'static,
    {
        Self::new(move |call| {
            handler(call);
            Ok(())
        })
    }

    pub(crate) fn with_id<F>(id: ListenerId, handler: F) -> Self
    where
        F: Fn(&Call<'_, A>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self { id, handler: Arc::new(handler) }
    }

    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Invokes the listener directly, outside any emission.
    ///
    /// # Errors
    /// Returns whatever the wrapped callback returns.
    pub fn call(&self, call: &Call<'_, A>) -> Result<(), ListenerError> {
        (self.handler)(call)
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self { id: self.id, handler: Arc::clone(&self.handler) }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.id.0).finish()
    }
}
