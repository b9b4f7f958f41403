use crate::error::DispatchError;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// An opaque, unique event token.
///
/// Two symbols are equal only if one is a clone of the other; the description
/// is informational and never takes part in comparisons.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    /// Creates a new unique symbol with a human-readable description.
    #[must_use]
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self { id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed), description: Some(description.into()) }
    }

    /// Creates a new unique symbol without a description.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed), description: None }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol#{}({})", self.id, self.description().unwrap_or_default())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or_default())
    }
}

/// Identifies an event: either a string name or an opaque [`Symbol`].
///
/// The name `"*"` is reserved for wildcard registrations, see [`EventId::WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    Name(Cow<'static, str>),
    Symbol(Symbol),
}

impl EventId {
    /// The reserved token that subscribes a listener to every event.
    pub const WILDCARD: Self = Self::Name(Cow::Borrowed("*"));

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Name(name) if name == "*")
    }

    fn validated(self) -> Result<Self, DispatchError> {
        match &self {
            Self::Name(name) if name.is_empty() => Err(DispatchError::InvalidArgument {
                message: "event name should be a non-empty string or a symbol".into(),
                context: None,
            }),
            _ => Ok(self),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => fmt::Display::fmt(symbol, f),
        }
    }
}

impl From<&'static str> for EventId {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for EventId {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<Symbol> for EventId {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

/// Conversion into a validated [`EventId`].
///
/// Every dispatcher operation takes its event through this trait, so invalid
/// identifiers are rejected before any state is touched.
pub trait IntoEventId {
    /// # Errors
    /// Returns [`DispatchError::InvalidArgument`] if the value is not a usable
    /// event identifier (an empty name, or a non-string dynamic value).
    fn into_event_id(self) -> Result<EventId, DispatchError>;
}

impl IntoEventId for EventId {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        self.validated()
    }
}

impl IntoEventId for &EventId {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        self.clone().validated()
    }
}

impl IntoEventId for &'static str {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        EventId::from(self).validated()
    }
}

impl IntoEventId for String {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        EventId::from(self).validated()
    }
}

impl IntoEventId for Symbol {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        Ok(EventId::Symbol(self))
    }
}

impl IntoEventId for &Symbol {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        Ok(EventId::Symbol(self.clone()))
    }
}

/// Event names arriving as untyped JSON; only strings are accepted.
impl IntoEventId for &Value {
    fn into_event_id(self) -> Result<EventId, DispatchError> {
        match self {
            Value::String(name) => EventId::from(name.clone()).validated(),
            other => Err(DispatchError::InvalidArgument {
                message: format!("event name should be a string or a symbol, got {other}").into(),
                context: None,
            }),
        }
    }
}
