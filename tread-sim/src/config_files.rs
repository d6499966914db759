//! Loading [`SimConfig`] from files and command-line overrides.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use tread::config::SimConfig;

/// [`clap::Args`] argument group struct for args that affect the simulation configuration.
#[derive(Clone, Debug, clap::Args)]
pub struct ConfigArgs {
    /// JSON file to read the configuration from. Sections and fields it leaves out keep
    /// their default values.
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[expect(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override one top-level section or value of the configuration.
    ///
    /// The value is specified as a key-value pair where the key is an unquoted string, the
    /// separator is “=”, and the value is a JSON value; for example:
    /// --set ticks_per_second=120 or --set 'net={"max_warp_ticks":5}'.
    /// A section given this way replaces the whole section, with defaults for fields it
    /// leaves out.
    #[arg(long = "set", short = 'S', value_parser = parse_override, value_name = "NAME=JSON")]
    pub set: Vec<(String, serde_json::Value)>,
}

impl ConfigArgs {
    /// Constructs the configuration these args ask for.
    pub fn build_config(self) -> Result<SimConfig, anyhow::Error> {
        let Self {
            config: path,
            set: overrides,
        } = self;

        let config = match path {
            Some(path) => read_config_file(&path)?,
            None => SimConfig::default(),
        };
        apply_overrides(config, overrides)
    }
}

fn read_config_file(path: &Path) -> Result<SimConfig, anyhow::Error> {
    let file = File::open(path)
        .with_context(|| format!("could not open config file {}", path.display()))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid config file {}", path.display()))?;
    log::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

/// Replaces top-level entries of the JSON form of `config`.
pub(crate) fn apply_overrides(
    config: SimConfig,
    overrides: Vec<(String, serde_json::Value)>,
) -> Result<SimConfig, anyhow::Error> {
    if overrides.is_empty() {
        return Ok(config);
    }
    let serde_json::Value::Object(mut fields) = serde_json::to_value(config)? else {
        anyhow::bail!("configuration did not serialize as a JSON object");
    };
    for (key, value) in overrides {
        if !fields.contains_key(&key) {
            anyhow::bail!("--set {key}: no such configuration section");
        }
        fields.insert(key, value);
    }
    serde_json::from_value(serde_json::Value::Object(fields))
        .context("--set did not produce a valid configuration")
}

fn parse_override(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}
