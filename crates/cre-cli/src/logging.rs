use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use tracing_tree::time::Uptime;

/// How verbose `cre-cli`'s own events should be; dependency crates are
/// always capped at `WARN` regardless (see [`setup_logging`]).
pub(crate) enum Level {
    Quiet,
    Default,
    Verbose,
}

pub(crate) fn setup_logging(level: Level) -> Result<()> {
    let default = match level {
        Level::Quiet => LevelFilter::ERROR,
        Level::Default => LevelFilter::INFO,
        Level::Verbose => LevelFilter::TRACE,
    };

    let targets = Targets::new()
        .with_target("regex", LevelFilter::WARN)
        .with_default(default);

    let subscriber = Registry::default().with(
        tracing_tree::HierarchicalLayer::default()
            .with_targets(true)
            .with_writer(|| Box::new(std::io::stderr()))
            .with_timer(Uptime::default())
            .with_filter(EnvFilter::from_default_env())
            .with_filter(targets),
    );
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
