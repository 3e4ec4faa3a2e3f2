pub mod docker;

use crate::registry::RegistryAuth;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Represents different image build and publish failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BuilderError {
    /// Failed to start due to misconfigured settings, usually from a misconfigured
    /// settings file.
    #[error("could not init builder; {0}")]
    FailedPrecondition(String),

    /// The registry session could not be established.
    #[error("could not log in to registry; {0}")]
    Login(String),

    /// The image could not be produced from the requested build context.
    #[error("could not build image; {0}")]
    Build(String),

    /// The built image could not be re-tagged or uploaded.
    #[error("could not publish image; {0}")]
    Publish(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Registry host the session is established against; the address without its
    /// repository suffix.
    pub host: String,

    /// Short-lived credentials minted earlier in the same run.
    pub auth: RegistryAuth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Directory holding the image build context.
    pub context: PathBuf,

    /// Target platform, e.g. linux/arm64. Must match the compute the image will run
    /// on no matter which machine builds it.
    pub platform: String,

    /// Local tag given to the finished image.
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Local tag produced by the build.
    pub local_tag: String,

    /// Remote tag carrying the registry address.
    pub remote_tag: String,
}

/// The builder trait defines how stevedore turns a build context into a published
/// container image: one login per run, then build, then re-tag and upload.
#[async_trait]
pub trait Builder: Debug + Send + Sync {
    /// Establish a registry session that the rest of the run's pushes ride on.
    async fn login(&self, req: LoginRequest) -> Result<(), BuilderError>;

    /// Produce an image from the build context and tag it locally.
    async fn build(&self, req: BuildRequest) -> Result<(), BuilderError>;

    /// Re-tag the local image for the registry and upload it.
    async fn publish(&self, req: PublishRequest) -> Result<(), BuilderError>;
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")] // This handles case insensitivity during deserialization
pub enum Engine {
    #[default]
    Docker,
}

pub fn new(config: &crate::conf::cli::Builder) -> Result<Box<dyn Builder>, BuilderError> {
    #[allow(clippy::match_single_binding)]
    match config.engine {
        Engine::Docker => {
            if let Some(settings) = &config.docker {
                Ok(Box::new(docker::Engine::new(settings)))
            } else {
                Err(BuilderError::FailedPrecondition(
                    "docker engine settings not found in config".into(),
                ))
            }
        }
    }
}
