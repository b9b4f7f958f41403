use crate::bus::Dispatcher;
use crate::config::TimingMode;
use crate::timing::{NoopTiming, Timing, TracingTiming};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) const DEFAULT_NAME: &str = "tinybus";

/// A builder for [`Dispatcher`] instances.
pub struct DispatcherBuilder<A> {
    name: Cow<'static, str>,
    timing: Arc<dyn Timing>,
    _payload: PhantomData<fn() -> A>,
}

impl<A: 'static> DispatcherBuilder<A> {
    #[must_use = "Builder must be finished with `build`"]
    pub fn new() -> Self {
        Self { name: Cow::Borrowed(DEFAULT_NAME), timing: Arc::new(TracingTiming), _payload: PhantomData }
    }

    /// Sets the name used in timing labels, e.g. `name('event')`.
    #[must_use = "Builder must be finished with `build`"]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Installs a custom timing collaborator.
    #[must_use = "Builder must be finished with `build`"]
    pub fn timing(mut self, timing: impl Timing + 'static) -> Self {
        self.timing = Arc::new(timing);
        self
    }

    /// Installs a timing collaborator that is shared with other owners.
    #[must_use = "Builder must be finished with `build`"]
    pub fn shared_timing(mut self, timing: Arc<dyn Timing>) -> Self {
        self.timing = timing;
        self
    }

    /// Selects one of the built-in timing collaborators.
    #[must_use = "Builder must be finished with `build`"]
    pub fn timing_mode(self, mode: TimingMode) -> Self {
        match mode {
            TimingMode::Tracing => self.timing(TracingTiming),
            TimingMode::Disabled => self.timing(NoopTiming::new()),
        }
    }

    #[must_use]
    pub fn build(self) -> Dispatcher<A> {
        Dispatcher::from_parts(self.name, self.timing)
    }
}

impl<A: 'static> Default for DispatcherBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for DispatcherBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("name", &self.name)
            .field("timing", &self.timing)
            .finish()
    }
}
