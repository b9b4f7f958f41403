use crate::builder::DispatcherBuilder;
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchErrorExt, ListenerError};
use crate::event::{EventId, IntoEventId};
use crate::listener::{Call, Listener, ListenerId};
use crate::timing::Timing;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Listener lists are shared with in-flight emissions and copied on write.
type ListenerList<A> = Arc<Vec<Listener<A>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Append,
    Prepend,
}

struct Registry<A> {
    named: FxHashMap<EventId, ListenerList<A>>,
    wildcard: ListenerList<A>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self { named: FxHashMap::default(), wildcard: Arc::default() }
    }
}

impl<A> Registry<A> {
    fn list(&self, event: &EventId) -> Option<&ListenerList<A>> {
        if event.is_wildcard() { Some(&self.wildcard) } else { self.named.get(event) }
    }

    fn insert(&mut self, event: &EventId, listener: Listener<A>, placement: Placement) {
        let list = if event.is_wildcard() {
            &mut self.wildcard
        } else {
            self.named.entry(event.clone()).or_default()
        };

        let list = Arc::make_mut(list);
        match placement {
            Placement::Append => list.push(listener),
            Placement::Prepend => list.insert(0, listener),
        }
    }

    fn remove(&mut self, event: &EventId, id: ListenerId) -> bool {
        let list = if event.is_wildcard() { Some(&mut self.wildcard) } else { self.named.get_mut(event) };
        let Some(list) = list else {
            return false;
        };
        let Some(index) = list.iter().position(|listener| listener.id() == id) else {
            return false;
        };

        Arc::make_mut(list).remove(index);
        true
    }

    /// The list an emission iterates; `None` when there is nothing to invoke.
    fn snapshot(&self, event: &EventId) -> Option<ListenerList<A>> {
        self.named.get(event).filter(|list| !list.is_empty()).cloned()
    }

    fn wildcard_snapshot(&self) -> Option<ListenerList<A>> {
        (!self.wildcard.is_empty()).then(|| Arc::clone(&self.wildcard))
    }
}

struct Shared<A> {
    name: Cow<'static, str>,
    timing: Arc<dyn Timing>,
    registry: RwLock<Registry<A>>,
}

impl<A> Shared<A> {
    fn remove(&self, event: &EventId, id: ListenerId) -> bool {
        let removed = self.registry.write().remove(event, id);
        trace!(dispatcher = %self.name, event = %event, listener = ?id, removed, "Listener removal");
        removed
    }
}

/// A synchronous, in-process event dispatcher.
///
/// Listeners are registered per event id or on the wildcard token `"*"`, and
/// [`emit`](Self::emit) invokes them in registration order before returning.
/// The dispatcher is a cheap handle: clones share the same registry, and every
/// operation may be called reentrantly from inside a listener.
///
/// # Example
/// ```rust
/// use tinybus::{Dispatcher, Listener};
///
/// # fn main() -> Result<(), tinybus::DispatchError> {
/// let bus = Dispatcher::<u32>::named("orders");
/// bus.on("order:placed", Listener::infallible(|call| assert_eq!(call.args(), &[7])))?;
/// bus.emit("order:placed", &[7])?;
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<A> {
    shared: Arc<Shared<A>>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.read();
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.name)
            .field("timing", &self.shared.timing)
            .field("events", &registry.named.len())
            .field("wildcard_listeners", &registry.wildcard.len())
            .finish()
    }
}

impl<A: 'static> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// A non-owning handle to a [`Dispatcher`], obtained with [`Dispatcher::downgrade`].
pub struct WeakDispatcher<A> {
    shared: Weak<Shared<A>>,
}

impl<A> WeakDispatcher<A> {
    /// The dispatcher, if any strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Dispatcher<A>> {
        self.shared.upgrade().map(|shared| Dispatcher { shared })
    }
}

impl<A> Clone for WeakDispatcher<A> {
    fn clone(&self) -> Self {
        Self { shared: Weak::clone(&self.shared) }
    }
}

impl<A> fmt::Debug for WeakDispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDispatcher").field("alive", &(self.shared.strong_count() > 0)).finish()
    }
}

impl<A: 'static> Dispatcher<A> {
    /// Creates a dispatcher with the default name and tracing-backed timing.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a dispatcher whose name prefixes its timing labels.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::builder().name(name).build()
    }

    /// Creates a dispatcher from deserialized settings.
    #[must_use]
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::builder().name(config.name.clone()).timing_mode(config.timing).build()
    }

    /// Returns a [`DispatcherBuilder`] for a custom name or timing collaborator.
    #[must_use]
    pub fn builder() -> DispatcherBuilder<A> {
        DispatcherBuilder::new()
    }

    pub(crate) fn from_parts(name: Cow<'static, str>, timing: Arc<dyn Timing>) -> Self {
        Self {
            shared: Arc::new(Shared { name, timing, registry: RwLock::new(Registry::default()) }),
        }
    }

    /// The name used in timing labels.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// A handle that does not keep the dispatcher alive.
    ///
    /// Listeners that call back into their own dispatcher should capture this
    /// instead of a clone: a clone stored in the registry keeps the registry
    /// alive forever.
    ///
    /// # Example
    /// ```rust
    /// use tinybus::{Dispatcher, Listener};
    ///
    /// # fn main() -> Result<(), tinybus::DispatchError> {
    /// let bus = Dispatcher::<u32>::named("chain");
    /// let weak = bus.downgrade();
    /// bus.on("first", Listener::new(move |call| {
    ///     if let Some(bus) = weak.upgrade() {
    ///         bus.emit("second", call.args())?;
    ///     }
    ///     Ok(())
    /// }))?;
    /// bus.emit("first", &[1])?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn downgrade(&self) -> WeakDispatcher<A> {
        WeakDispatcher { shared: Arc::downgrade(&self.shared) }
    }

    /// Appends `listener` to the list of `event` (or to the wildcard list for `"*"`).
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn on(&self, event: impl IntoEventId, listener: Listener<A>) -> Result<&Self, DispatchError> {
        let event = event.into_event_id().context("on")?;
        self.insert(&event, listener, Placement::Append);
        Ok(self)
    }

    /// Alias of [`on`](Self::on).
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn add_listener(
        &self,
        event: impl IntoEventId,
        listener: Listener<A>,
    ) -> Result<&Self, DispatchError> {
        self.on(event, listener)
    }

    /// Inserts `listener` at the front of the list of `event`.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn prepend_listener(
        &self,
        event: impl IntoEventId,
        listener: Listener<A>,
    ) -> Result<&Self, DispatchError> {
        let event = event.into_event_id().context("prepend_listener")?;
        self.insert(&event, listener, Placement::Prepend);
        Ok(self)
    }

    /// Appends a one-shot wrapper around `listener`.
    ///
    /// The wrapper runs `listener` at most once, then removes itself from the list
    /// it was registered in. The wrapper, not `listener`, is what
    /// [`listeners`](Self::listeners) reports.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn once(&self, event: impl IntoEventId, listener: Listener<A>) -> Result<&Self, DispatchError> {
        let event = event.into_event_id().context("once")?;
        let wrapper = self.once_wrapper(event.clone(), listener);
        self.insert(&event, wrapper, Placement::Append);
        Ok(self)
    }

    /// Inserts a one-shot wrapper around `listener` at the front of the list of `event`.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn prepend_once_listener(
        &self,
        event: impl IntoEventId,
        listener: Listener<A>,
    ) -> Result<&Self, DispatchError> {
        let event = event.into_event_id().context("prepend_once_listener")?;
        let wrapper = self.once_wrapper(event.clone(), listener);
        self.insert(&event, wrapper, Placement::Prepend);
        Ok(self)
    }

    /// Removes the first registration of `listener` from the list of `event`.
    ///
    /// Returns `Ok(false)` when the event has no list or the listener is not in it.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn remove_listener(
        &self,
        event: impl IntoEventId,
        listener: &Listener<A>,
    ) -> Result<bool, DispatchError> {
        let event = event.into_event_id().context("remove_listener")?;
        Ok(self.shared.remove(&event, listener.id()))
    }

    /// Alias of [`remove_listener`](Self::remove_listener).
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier.
    pub fn off(&self, event: impl IntoEventId, listener: &Listener<A>) -> Result<bool, DispatchError> {
        self.remove_listener(event, listener)
    }

    /// Empties the list of one event, or resets the whole dispatcher with `None`.
    ///
    /// `Some(EventId::WILDCARD)` only clears the wildcard list. A named event keeps
    /// its (now empty) entry. `None` clears the wildcard list and drops every event.
    /// An invalid identifier (the empty name) has no listeners and changes nothing.
    pub fn remove_all_listeners(&self, event: Option<EventId>) -> &Self {
        let event = match event.map(IntoEventId::into_event_id).transpose() {
            Ok(event) => event,
            Err(err) => {
                trace!(dispatcher = %self.shared.name, error = %err, "Listeners not cleared");
                return self;
            },
        };
        {
            let mut registry = self.shared.registry.write();
            match &event {
                Some(event) if event.is_wildcard() => registry.wildcard = Arc::default(),
                Some(event) => {
                    registry.named.insert(event.clone(), Arc::default());
                },
                None => {
                    registry.wildcard = Arc::default();
                    registry.named.clear();
                },
            }
        }
        trace!(dispatcher = %self.shared.name, event = ?event, "Listeners cleared");
        self
    }

    /// Invokes the listeners of `event`, then the wildcard listeners.
    ///
    /// Each phase iterates the list as it was when the phase started; listeners
    /// added or removed meanwhile are not observed by this emission. The first
    /// listener error aborts the emission, skipping every later listener of both
    /// phases.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if `event` is not a valid identifier,
    /// or [`DispatchError::Listener`] carrying the first listener failure.
    pub fn emit(&self, event: impl IntoEventId, args: &[A]) -> Result<&Self, DispatchError> {
        let event = event.into_event_id().context("emit")?;
        let timing = self.shared.timing.start(&format!("{}('{event}')", self.shared.name));

        let named = self.shared.registry.read().snapshot(&event);
        if let Some(listeners) = named {
            let call = Call::named(args);
            for listener in listeners.iter() {
                listener.call(&call).map_err(|source| self.failed(&event, listener, source))?;
            }
        }

        let wildcard = self.shared.registry.read().wildcard_snapshot();
        if let Some(listeners) = wildcard {
            let call = Call::wildcard(&event, args, timing.correlation());
            for listener in listeners.iter() {
                listener.call(&call).map_err(|source| self.failed(&event, listener, source))?;
            }
        }

        timing.finish();
        Ok(self)
    }

    /// A detached copy of the listeners currently registered for `event`.
    ///
    /// Invalid identifiers have no listeners and yield an empty vector.
    #[must_use]
    pub fn listeners(&self, event: impl IntoEventId) -> Vec<Listener<A>> {
        let Ok(event) = event.into_event_id() else {
            return Vec::new();
        };
        self.shared.registry.read().list(&event).map(|list| list.to_vec()).unwrap_or_default()
    }

    /// Number of listeners registered for `event`; zero for invalid identifiers.
    #[must_use]
    pub fn listener_count(&self, event: impl IntoEventId) -> usize {
        let Ok(event) = event.into_event_id() else {
            return 0;
        };
        self.shared.registry.read().list(&event).map_or(0, |list| list.len())
    }

    /// Events that currently have at least one named listener.
    #[must_use]
    pub fn event_names(&self) -> Vec<EventId> {
        self.shared
            .registry
            .read()
            .named
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(event, _)| event.clone())
            .collect()
    }

    fn insert(&self, event: &EventId, listener: Listener<A>, placement: Placement) {
        trace!(
            dispatcher = %self.shared.name,
            event = %event,
            listener = ?listener.id(),
            ?placement,
            "Listener registered"
        );
        self.shared.registry.write().insert(event, listener, placement);
    }

    fn once_wrapper(&self, event: EventId, listener: Listener<A>) -> Listener<A> {
        let id = ListenerId::next();
        let shared = Arc::downgrade(&self.shared);
        let fired = AtomicBool::new(false);

        Listener::with_id(id, move |call| {
            if fired.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            let result = listener.call(call);
            if let Some(shared) = shared.upgrade() {
                shared.remove(&event, id);
            }
            result
        })
    }

    fn failed(&self, event: &EventId, listener: &Listener<A>, source: ListenerError) -> DispatchError {
        debug!(
            dispatcher = %self.shared.name,
            event = %event,
            listener = ?listener.id(),
            error = %source,
            "Listener failed; aborting emission"
        );
        DispatchError::Listener { source, context: Some(format!("emitting '{event}'").into()) }
    }
}
