//! Logging to stderr.

use anyhow::Context as _;
use log::Log as _;

/// A [`clap::Args`] struct for options controlling log output to stderr.
#[derive(Clone, Debug, clap::Args)]
pub struct LoggingArgs {
    /// Additional logging to stderr, including per-tick details.
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Remove timestamps from logs so that they are closer to deterministic.
    ///
    /// This option is intended for internal tests only.
    #[arg(long = "simplify-log-format", hide = true)]
    pub simplify_log_format: bool,
}

/// Install a [`log`] global logger based on user-provided `options`.
pub fn install(options: &LoggingArgs) -> Result<(), anyhow::Error> {
    use log::LevelFilter::{Debug, Error, Off, Trace};

    let &LoggingArgs {
        verbose,
        simplify_log_format,
    } = options;

    let stderr_logger = *simplelog::WriteLogger::new(
        if verbose { Trace } else { Debug },
        // Note: This has no target filters because `SimLogger` calls
        // `util::log::standard_filter` to do it.
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .set_time_level(if simplify_log_format { Off } else { Error })
            .build(),
        std::io::stderr(),
    );
    let max_level = simplelog::SharedLogger::level(&stderr_logger);

    log::set_boxed_logger(Box::new(SimLogger { stderr_logger }))
        .context("failed to initialize logging")?;
    log::set_max_level(max_level);
    Ok(())
}

/// [`log::Log`] implementation that [`install()`] registers globally.
struct SimLogger {
    stderr_logger: simplelog::WriteLogger<std::io::Stderr>,
}

impl log::Log for SimLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        tread::util::log::standard_filter(metadata) && self.stderr_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !tread::util::log::standard_filter(record.metadata()) {
            return;
        }
        self.stderr_logger.log(record);
    }

    fn flush(&self) {
        self.stderr_logger.flush();
    }
}
