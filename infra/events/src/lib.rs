//! # tinybus
//!
//! A small, synchronous, in-process event dispatcher.
//!
//! ## Overview
//!
//! Callers register listeners on named events (or on the wildcard token `"*"`)
//! and [`Dispatcher::emit`] invokes the matching listeners in registration order
//! before returning.
//!
//! * **Two phases**: listeners of the emitted event run first, then wildcard
//!   listeners, which also receive the event id and a correlation token.
//! * **One-shot listeners**: [`Dispatcher::once`] wraps a listener so it runs at
//!   most once and then unregisters itself.
//! * **Reentrancy**: listeners may register, remove and emit on the same
//!   dispatcher. Listener lists are copy-on-write, so an emission in flight
//!   always iterates the list as it was when its phase started.
//! * **Fail-fast**: the first listener error aborts the emission and is returned
//!   to the caller.
//! * **Instrumentation**: every emission is wrapped by a [`Timing`] collaborator
//!   (`tracing` records by default).
//!
//! # Example
//!
//! ```rust
//! use serde_json::{Value, json};
//! use tinybus::{Dispatcher, DispatchError, EventId, Listener};
//!
//! fn main() -> Result<(), DispatchError> {
//!     let bus = Dispatcher::<Value>::named("app");
//!
//!     bus.on("user:created", Listener::infallible(|call| {
//!         assert_eq!(call.arg(), Some(&json!({ "id": 42 })));
//!     }))?;
//!     bus.on("*", Listener::infallible(|call| {
//!         assert_eq!(call.event(), Some(&EventId::from("user:created")));
//!     }))?;
//!
//!     bus.emit("user:created", &[json!({ "id": 42 })])?;
//!     Ok(())
//! }
//! ```

mod builder;
mod bus;
mod config;
mod error;
mod event;
mod listener;
mod timing;

pub use crate::builder::DispatcherBuilder;
pub use crate::bus::{Dispatcher, WeakDispatcher};
pub use crate::config::{ConfigError, ConfigErrorExt, DispatcherConfig, TimingMode, load_config};
pub use crate::error::{DispatchError, DispatchErrorExt, ListenerError};
pub use crate::event::{EventId, IntoEventId, Symbol};
pub use crate::listener::{Call, Listener, ListenerId};
pub use crate::timing::{CorrelationId, NoopTiming, Timing, TimingHandle, TracingTiming};
