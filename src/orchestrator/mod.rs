#[cfg(test)]
mod tests;

use crate::builder::{BuildRequest, Builder, LoginRequest, PublishRequest};
use crate::conf::cli::Profile;
use crate::converger::{ApplyRequest, Converger, OutputRequest};
use crate::registry::{self, CredentialRequest, Registry};
use crate::scheduler::{RedeployRequest, Scheduler};
use crate::secrets::DeploySecrets;
use strum::Display;
use tracing::debug;

/// Represents the failure possibilities of each deployment stage. Every failure is
/// fatal: the run stops where it is and nothing is rolled back. The stage's own error
/// text passes through untouched; the variant marks which stage gave up.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DeployError {
    /// The requested profile is not in configuration. Nothing has run.
    #[error("unknown profile '{name}'; configured profiles are: {known}")]
    InvalidProfile { name: String, known: String },

    /// The secrets failed upfront validation. Nothing has run.
    #[error("{0}")]
    InvalidSecrets(String),

    #[error("{0}")]
    Convergence(String),

    #[error("{0}")]
    OutputMissing(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Build(String),

    #[error("{0}")]
    Publish(String),

    #[error("{0}")]
    Rollout(String),
}

/// Where a run currently stands. The flow is a linear chain: every state either
/// advances to the next or drops to Aborted. No retries, no other transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum State {
    Idle,
    Converging,
    Extracting,
    Authenticating,
    Building,
    Publishing,
    RollingOut,
    Done,
    Aborted,
}

/// What a successful run produced: where the image went and which service is picking
/// it up. Nothing here is retained between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub registry_address: String,
    pub local_tag: String,
    pub remote_tag: String,
    pub cluster: String,
    pub service: String,
}

/// Walks one deployment through the state chain, calling each engine exactly once per
/// stage. Holds no state of its own between runs; every run starts from Idle and
/// re-derives everything from the profile and the convergence outputs.
#[derive(Debug)]
pub struct Orchestrator {
    profiles: Vec<Profile>,
    converger: Box<dyn Converger>,
    registry: Box<dyn Registry>,
    builder: Box<dyn Builder>,
    scheduler: Box<dyn Scheduler>,
}

impl Orchestrator {
    pub fn new(
        profiles: Vec<Profile>,
        converger: Box<dyn Converger>,
        registry: Box<dyn Registry>,
        builder: Box<dyn Builder>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        Self {
            profiles,
            converger,
            registry,
            builder,
            scheduler,
        }
    }

    /// Runs the full flow for one profile. `observe` sees every state the run enters,
    /// in order, ending with Done or Aborted; the CLI mirrors it onto its spinner and
    /// tests record it.
    pub async fn run(
        &self,
        profile_name: &str,
        secrets: &DeploySecrets,
        mut observe: impl FnMut(State),
    ) -> Result<Deployment, DeployError> {
        let result = self.execute(profile_name, secrets, &mut observe).await;
        if result.is_err() {
            enter(&mut observe, State::Aborted);
        }
        result
    }

    async fn execute(
        &self,
        profile_name: &str,
        secrets: &DeploySecrets,
        observe: &mut impl FnMut(State),
    ) -> Result<Deployment, DeployError> {
        enter(observe, State::Idle);

        // Profile resolution and secret validation both happen before any side
        // effect; a bad argument or bad input never touches the provider.
        let profile = self
            .profiles
            .iter()
            .find(|profile| profile.name == profile_name)
            .ok_or_else(|| DeployError::InvalidProfile {
                name: profile_name.to_string(),
                known: self
                    .profiles
                    .iter()
                    .map(|profile| profile.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        secrets
            .validate()
            .map_err(|e| DeployError::InvalidSecrets(e.to_string()))?;

        enter(observe, State::Converging);
        self.converger
            .apply(ApplyRequest {
                definition_path: profile.definition_path.clone(),
                variables: secrets.as_variables(),
            })
            .await
            .map_err(|e| DeployError::Convergence(e.to_string()))?;

        enter(observe, State::Extracting);
        let registry_address = self
            .converger
            .output(OutputRequest {
                definition_path: profile.definition_path.clone(),
                name: profile.registry_output.clone(),
            })
            .await
            .map_err(|e| DeployError::OutputMissing(e.to_string()))?;

        enter(observe, State::Authenticating);
        let auth = self
            .registry
            .credentials(CredentialRequest {
                registry_address: registry_address.clone(),
                region: profile.region.clone(),
            })
            .await
            .map_err(|e| DeployError::Auth(e.to_string()))?;

        self.builder
            .login(LoginRequest {
                host: registry::registry_host(&registry_address).to_string(),
                auth,
            })
            .await
            .map_err(|e| DeployError::Auth(e.to_string()))?;

        enter(observe, State::Building);
        let local_tag = profile.local_image_tag();
        self.builder
            .build(BuildRequest {
                context: profile.build_context.clone(),
                platform: profile.platform.clone(),
                tag: local_tag.clone(),
            })
            .await
            .map_err(|e| DeployError::Build(e.to_string()))?;

        enter(observe, State::Publishing);
        // The remote tag derives from the address extracted moments ago in this same
        // run; a stale or hand-entered registry can never receive the push.
        let remote_tag = profile.remote_image_tag(&registry_address);
        self.builder
            .publish(PublishRequest {
                local_tag: local_tag.clone(),
                remote_tag: remote_tag.clone(),
            })
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;

        enter(observe, State::RollingOut);
        self.scheduler
            .force_redeploy(RedeployRequest {
                cluster: profile.cluster_name(),
                service: profile.service_name(),
                region: profile.region.clone(),
            })
            .await
            .map_err(|e| DeployError::Rollout(e.to_string()))?;

        enter(observe, State::Done);

        Ok(Deployment {
            registry_address,
            local_tag,
            remote_tag,
            cluster: profile.cluster_name(),
            service: profile.service_name(),
        })
    }
}

fn enter(observe: &mut impl FnMut(State), state: State) {
    debug!(%state, "deployment state changed");
    observe(state);
}
