use crate::{builder, converger, registry, scheduler};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub general: General,
    pub converger: Converger,
    pub registry: Registry,
    pub builder: Builder,
    pub scheduler: Scheduler,
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Resolve a profile by the name given on the command line.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct General {
    /// Base tracing filter; the STEVEDORE_LOG environment variable beats it.
    pub log_level: String,

    /// Secrets file read before the process environment is consulted. A missing file
    /// is fine; the environment alone can supply everything.
    pub env_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Converger {
    pub engine: converger::Engine,
    pub terraform: Option<TerraformConverger>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TerraformConverger {
    /// Binary to drive; any terraform-compatible tool works.
    pub binary: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Registry {
    pub engine: registry::Engine,
    pub ecr: Option<EcrRegistry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EcrRegistry {
    pub binary: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Builder {
    pub engine: builder::Engine,
    pub docker: Option<DockerBuilder>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DockerBuilder {
    /// Binary to drive; any docker-compatible client (podman, finch) works.
    pub binary: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Scheduler {
    pub engine: scheduler::Engine,
    pub ecs: Option<EcsScheduler>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EcsScheduler {
    pub binary: String,
}

/// A named variant of the deployable infrastructure. Everything a single run needs to
/// know lives on the profile, so selecting one fully determines the deployment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Unique profile name; the CLI argument selecting this variant.
    pub name: String,

    /// Directory holding the declarative infrastructure definition for this variant.
    pub definition_path: PathBuf,

    /// Application the profile deploys; image tags and derived resource names start
    /// with it.
    pub app_name: String,

    /// Directory holding the container build context.
    pub build_context: PathBuf,

    /// Target platform images are built for. Must match the profile's compute
    /// architecture no matter what machine runs the build.
    pub platform: String,

    /// Provider region the profile's resources live in.
    pub region: String,

    /// Name of the convergence output that carries the registry address.
    pub registry_output: String,
}

impl Profile {
    /// Compute cluster name, derived deterministically so every run addresses the same
    /// cluster without storing anything between runs.
    pub fn cluster_name(&self) -> String {
        format!("{}-{}", self.app_name, self.name)
    }

    /// Service name on the cluster; same derivation as the cluster.
    pub fn service_name(&self) -> String {
        format!("{}-{}", self.app_name, self.name)
    }

    /// Tag the image is built under on the local daemon.
    pub fn local_image_tag(&self) -> String {
        format!("{}:latest", self.app_name)
    }

    /// Remote tag for a just-extracted registry address. Callers must pass the address
    /// read back from the convergence that ran in the same invocation, never a stored
    /// one.
    pub fn remote_image_tag(&self, registry_address: &str) -> String {
        format!("{registry_address}:latest")
    }
}
