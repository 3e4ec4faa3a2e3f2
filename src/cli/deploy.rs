use crate::cli::Cli;
use crate::orchestrator::{Orchestrator, State};
use crate::secrets::DeploySecrets;
use crate::{builder, converger, registry, scheduler};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use polyfmt::{println, success, Spinner};
use std::path::PathBuf;

#[derive(Debug, Args, Clone)]
pub struct DeployArgs {
    /// Name of the configured profile to deploy.
    pub profile: String,

    /// Read deployment secrets from this dotenv-format file instead of the configured
    /// one. Process environment variables still win over the file.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    /// Runs the whole voyage for one profile: converge, read the registry address
    /// back, authenticate, build, publish, force the rollout. Any stage failing stops
    /// the run right there.
    pub async fn deploy(&self, args: DeployArgs) -> Result<()> {
        let converger = converger::new(&self.conf.converger)
            .context("Could not initialize convergence engine")?;
        let registry =
            registry::new(&self.conf.registry).context("Could not initialize registry engine")?;
        let builder =
            builder::new(&self.conf.builder).context("Could not initialize build engine")?;
        let scheduler = scheduler::new(&self.conf.scheduler)
            .context("Could not initialize scheduler engine")?;

        let orchestrator = Orchestrator::new(
            self.conf.profiles.clone(),
            converger,
            registry,
            builder,
            scheduler,
        );

        let env_file = args
            .env_file
            .clone()
            .unwrap_or_else(|| self.conf.general.env_file.clone());
        let secrets =
            DeploySecrets::load(&env_file).context("Could not load deployment secrets")?;

        let spinner = Spinner::create("Deploying");

        let result = orchestrator
            .run(&args.profile, &secrets, |state| {
                if let Some(message) = stage_message(state) {
                    spinner.set_message(message.to_string());
                }
            })
            .await;

        drop(spinner);

        let deployment = result
            .with_context(|| format!("Could not deploy profile '{}'", args.profile))?;

        success!(
            "Deployed '{}'; service '{}' is rolling out {}",
            args.profile.blue(),
            deployment.service,
            deployment.remote_tag.magenta()
        );
        println!(
            "  Watch the rollout: {}",
            format!(
                "aws ecs describe-services --cluster {} --services {}",
                deployment.cluster, deployment.service
            )
            .cyan()
        );

        Ok(())
    }
}

/// What the spinner shows while a stage runs. Idle and the terminal states pass in
/// silence; the surrounding command reports those itself.
fn stage_message(state: State) -> Option<&'static str> {
    match state {
        State::Converging => Some("Converging infrastructure"),
        State::Extracting => Some("Reading registry address"),
        State::Authenticating => Some("Authenticating to registry"),
        State::Building => Some("Building image"),
        State::Publishing => Some("Publishing image"),
        State::RollingOut => Some("Requesting service rollout"),
        State::Idle | State::Done | State::Aborted => None,
    }
}
