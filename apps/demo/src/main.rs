use anyhow::Context;
use tinybus::{Dispatcher, load_config};
use tinybus_demo::{AppConfig, replay_wildcard_scenario};
use tinybus_logger::Logger;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cfg: AppConfig =
        load_config(Some("demo.toml")).context("Critical: Configuration is malformed")?;

    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).configure(&cfg.logging)?.init()?;

    let bus = Dispatcher::from_config(&cfg.dispatcher);
    let counts = replay_wildcard_scenario(&bus).context("Scenario aborted")?;

    info!(
        dispatcher = bus.name(),
        steps = counts.len(),
        total = counts.last().copied().unwrap_or_default(),
        "Scenario finished"
    );
    Ok(())
}
