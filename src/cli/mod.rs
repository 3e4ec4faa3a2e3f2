mod deploy;
mod profile;

use crate::conf;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "stevedore")]
#[clap(about = "Stevedore loads container cargo onto cloud infrastructure.")]
#[clap(
    long_about = "Stevedore loads container cargo onto cloud infrastructure.\n\n One command takes a named
    profile through the whole voyage: converge the declared infrastructure, read back the registry it
    provisioned, build and publish the container image, then force the running service to pick the new
    image up. Nothing is remembered between runs; every deployment re-derives its targets from the
    profile and the freshly converged state."
)]
#[clap(version)]
struct Args {
    /// Set configuration path; if empty default paths are used
    #[clap(long = "config", value_name = "PATH", global = true)]
    config_path: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand, Clone)]
enum Commands {
    /// Run a full deployment for a configured profile.
    Deploy(deploy::DeployArgs),

    /// Inspect the deployment profiles configuration knows about.
    Profile(profile::ProfileSubcommands),
}

pub struct Cli {
    args: Args,
    conf: conf::cli::Config,
}

impl Cli {
    pub fn new() -> Result<Self> {
        let args = match Args::try_parse() {
            Ok(args) => args,
            Err(e) => {
                // Usage problems exit 1; asking for help or the version is not an error.
                let _ = e.print();
                match e.kind() {
                    clap::error::ErrorKind::DisplayHelp
                    | clap::error::ErrorKind::DisplayVersion => std::process::exit(0),
                    _ => std::process::exit(1),
                }
            }
        };

        let conf = conf::parse(&args.config_path)
            .map_err(|e| anyhow!("Could not parse configuration; {e}"))?;

        init_tracing(&conf.general.log_level)?;

        Ok(Cli { args, conf })
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.args.command.clone() {
            Commands::Deploy(args) => self.deploy(args).await,
            Commands::Profile(profile) => self.handle_profile_subcommands(profile).await,
        }
    }
}

/// Logs go to stderr so tables and templates on stdout stay machine-readable.
/// STEVEDORE_LOG takes precedence over the configured level and accepts full filter
/// directives.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match std::env::var("STEVEDORE_LOG") {
        Ok(directive) => EnvFilter::try_new(directive),
        Err(_) => EnvFilter::try_new(log_level),
    }
    .context("Could not parse log filter; use a level like 'info' or a full directive")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
