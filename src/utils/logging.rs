use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(application_data_path.join("logs"))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    // Explicit level wins, then RUST_LOG, then info.
    let level = log_level
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(level)?)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Only this crate's events pass, everything else is off.
fn crate_filter(level: LevelFilter) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::OFF.into())
        .parse(format!("{}={level}", env!("CARGO_CRATE_NAME")))?)
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tracing::level_filters::LevelFilter;

    use super::crate_filter;

    #[test]
    fn test_crate_filter() -> Result<()> {
        let filter = crate_filter(LevelFilter::DEBUG)?;
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = crate_filter(LevelFilter::INFO)?;
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        Ok(())
    }
}
