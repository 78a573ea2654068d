mod config;
mod logging;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use jsharness_host::{DefaultResolver, ResourceBundle, ScriptValue, Session, StderrReporter};
use tracing::{debug, info};

use crate::config::HarnessConfig;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to run once all includes have been evaluated
    main: PathBuf,

    /// Values exposed to scripts as `arguments`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Bootstrap script to evaluate before MAIN (repeatable, runs after config includes)
    #[arg(short, long = "include", value_name = "FILE")]
    includes: Vec<PathBuf>,

    /// Directory searched for resources not found on disk
    #[arg(short, long = "resource-root", value_name = "DIR")]
    resource_roots: Vec<PathBuf>,

    /// Global binding; the value is read as TOML, or as a plain string
    #[arg(short, long = "global", value_name = "KEY=VALUE", value_parser = parse_global)]
    globals: Vec<(String, toml::Value)>,

    /// Config file to use instead of the default location
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enables debug mode
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn parse_global(raw: &str) -> Result<(String, toml::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing name in `{raw}`"));
    }
    Ok((key.to_string(), parse_global_value(value)))
}

fn parse_global_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = HarnessConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let _log_guard =
        logging::init_logging(cli.debug, config.log_to_file).context("Failed to set up logging")?;

    let bundle = config
        .resource_roots
        .iter()
        .chain(&cli.resource_roots)
        .fold(ResourceBundle::new(), |bundle, root| {
            debug!("Resource root {}", root.display());
            bundle.with_root(root)
        });

    let includes: Vec<PathBuf> = config
        .includes
        .iter()
        .chain(&cli.includes)
        .cloned()
        .collect();

    let mut globals: BTreeMap<String, ScriptValue> = config
        .globals
        .into_iter()
        .map(|(name, value)| (name, value.into()))
        .collect();
    for (name, value) in cli.globals {
        globals.insert(name, value.into());
    }

    info!("Starting jsharness for {}", cli.main.display());

    let session = Session::builder()
        .resolver(DefaultResolver::new(bundle))
        .reporter(Rc::new(StderrReporter))
        .arguments(cli.args)
        .globals(globals)
        .build()
        .context("Failed to start script session")?;
    session.execute(&includes, &cli.main);

    Ok(())
}
