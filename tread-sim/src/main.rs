//! Binary for running tread physics scenarios without graphics.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use std::time::Instant;

use clap::Parser as _;

use tread::time::TickNumber;
use tread_sim::config_files::ConfigArgs;
use tread_sim::logging::{self, LoggingArgs};
use tread_sim::scenario::Scenario;

#[derive(Clone, Debug, clap::Parser)]
#[command(author, about, version)]
struct TreadSimArgs {
    /// Which scenario to run.
    #[arg(long = "scenario", short = 's', value_enum, default_value = "drop")]
    scenario: Scenario,

    /// Number of ticks to simulate.
    #[arg(long = "ticks", short = 'n', default_value_t = 600)]
    ticks: TickNumber,

    #[command(flatten)]
    logging: LoggingArgs,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<(), anyhow::Error> {
    let TreadSimArgs {
        scenario,
        ticks,
        logging: logging_args,
        config: config_args,
    } = TreadSimArgs::parse();

    logging::install(&logging_args)?;
    let config = config_args.build_config()?;
    log::debug!("running {scenario:?} for {ticks} ticks at {} Hz", config.ticks_per_second);

    let start_time = Instant::now();
    let summary = scenario.run(&config, ticks);
    log::debug!(
        "simulated {ticks} ticks in {:.3} s",
        start_time.elapsed().as_secs_f32()
    );

    println!("{summary}");
    Ok(())
}
