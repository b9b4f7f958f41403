//! Wires config, logging and a [`Dispatcher`] together and replays the
//! wildcard churn scenario used by the dispatch benchmark.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tinybus::{DispatchError, Dispatcher, DispatcherConfig, EventId, Listener};
use tinybus_logger::LoggingConfig;
use tracing::info;

/// Contents of `demo.toml`, overlaid with `TINYBUS__*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dispatcher: DispatcherConfig,
    pub logging: LoggingConfig,
}

/// Runs the scenario and returns the running invocation count after each emission.
///
/// # Errors
/// Propagates the first [`DispatchError`] raised by the dispatcher.
pub fn replay_wildcard_scenario(bus: &Dispatcher<Value>) -> Result<Vec<usize>, DispatchError> {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();
    let handler = Listener::infallible(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut counts = Vec::new();
    let mut step = |label: &str| {
        let count = invocations.load(Ordering::SeqCst);
        info!(step = label, count, "Emitted");
        counts.push(count);
    };

    bus.on("foo:bar", handler.clone())?.on("bin:baz", handler.clone())?.on("*", handler.clone())?;

    bus.emit("foo:bar", &[])?;
    step("named + wildcard");
    bus.emit("bin:baz", &[])?;
    step("second named + wildcard");

    bus.remove_all_listeners(Some("bin:baz".into())).emit("bin:baz", &[])?;
    step("cleared name, wildcard only");

    bus.remove_listener("*", &handler)?;
    bus.emit("foo:bar", &[])?;
    step("wildcard removed");

    bus.on("*", handler.clone())?.emit("foo:bar", &[])?;
    step("wildcard re-added");

    bus.remove_all_listeners(Some(EventId::WILDCARD)).emit("foo:bar", &[])?;
    step("wildcard list cleared");

    bus.on("*", handler.clone())?.emit("foo:bar", &[])?;
    step("wildcard re-added again");

    bus.remove_all_listeners(None).emit("foo:bar", &[])?;
    step("everything cleared");

    bus.once("*", handler)?.emit("foo:bar", &[])?;
    step("once wildcard");
    bus.emit("foo:bar", &[])?;
    step("once wildcard spent");

    Ok(counts)
}
