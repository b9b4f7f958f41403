use std::borrow::Cow;

/// Error type returned by listener bodies.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during dispatcher operations.
#[tinybus_derive::tinybus_error]
pub enum DispatchError {
    /// The event identifier is not a non-empty string or a symbol.
    /// Raised before any state mutation or dispatch.
    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A listener failed; the emission was aborted at that listener.
    #[error("Listener failed{}: {source}", format_context(.context))]
    Listener { source: ListenerError, context: Option<Cow<'static, str>> },
}

