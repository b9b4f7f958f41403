use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tinybus::{CorrelationId, Dispatcher, Listener, NoopTiming, Timing, TimingHandle};

/// A dispatcher whose timing collaborator records nothing.
#[must_use]
pub fn quiet_bus<A: 'static>() -> Dispatcher<A> {
    Dispatcher::builder().name("test").timing(NoopTiming::new()).build()
}

/// Shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// A listener that bumps this counter on every invocation.
    #[must_use]
    pub fn listener<A: 'static>(&self) -> Listener<A> {
        let counter = self.clone();
        Listener::infallible(move |_| counter.bump())
    }
}

/// Ordered record of which listeners ran.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// A listener that appends `tag` on every invocation.
    #[must_use]
    pub fn listener<A: 'static>(&self, tag: &'static str) -> Listener<A> {
        let journal = self.clone();
        Listener::infallible(move |_| journal.record(tag))
    }
}

/// Timing collaborator that counts starts/completions and keeps labels and tokens.
#[derive(Debug, Default)]
pub struct CountingTiming {
    started: AtomicUsize,
    finished: Arc<AtomicUsize>,
    labels: Mutex<Vec<String>>,
    tokens: Mutex<Vec<CorrelationId>>,
}

impl CountingTiming {
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }

    #[must_use]
    pub fn tokens(&self) -> Vec<CorrelationId> {
        self.tokens.lock().clone()
    }
}

impl Timing for CountingTiming {
    fn start(&self, label: &str) -> TimingHandle {
        let seq = self.started.fetch_add(1, Ordering::SeqCst);
        let token = CorrelationId::from(format!("token-{seq}"));
        self.labels.lock().push(label.to_owned());
        self.tokens.lock().push(token.clone());

        let finished = self.finished.clone();
        TimingHandle::new(token, move || {
            finished.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// A dispatcher wired to a [`CountingTiming`] the test can inspect.
#[must_use]
pub fn timed_bus<A: 'static>(name: &'static str) -> (Dispatcher<A>, Arc<CountingTiming>) {
    let timing = Arc::new(CountingTiming::default());
    let bus = Dispatcher::builder().name(name).shared_timing(timing.clone()).build();
    (bus, timing)
}

/// Observes whether a [`DropGuard`] handed out by [`DropFlag::guard`] has been dropped.
#[derive(Debug, Clone, Default)]
pub struct DropFlag(Arc<AtomicBool>);

impl DropFlag {
    #[must_use]
    pub fn guard(&self) -> DropGuard {
        DropGuard(self.0.clone())
    }

    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raises its [`DropFlag`] when dropped.
#[derive(Debug)]
pub struct DropGuard(Arc<AtomicBool>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
