pub mod ecs;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use strum::{Display, EnumString};

/// Represents different compute platform failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// Failed to start due to misconfigured settings, usually from a misconfigured
    /// settings file.
    #[error("could not init scheduler; {0}")]
    FailedPrecondition(String),

    /// The platform refused or failed to accept the redeploy request.
    #[error("could not request redeploy; {0}")]
    Rollout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeployRequest {
    /// Cluster the service runs on.
    pub cluster: String,

    /// Service to cycle.
    pub service: String,

    /// Provider region the cluster lives in.
    pub region: String,
}

/// The scheduler trait defines the narrow slice of a compute platform stevedore
/// consumes: ask an already-running service to pick up the latest published image.
/// Acceptance of the request is success; nothing waits for the rollout to settle.
#[async_trait]
pub trait Scheduler: Debug + Send + Sync {
    async fn force_redeploy(&self, req: RedeployRequest) -> Result<(), SchedulerError>;
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")] // This handles case insensitivity during deserialization
pub enum Engine {
    #[default]
    Ecs,
}

pub fn new(config: &crate::conf::cli::Scheduler) -> Result<Box<dyn Scheduler>, SchedulerError> {
    #[allow(clippy::match_single_binding)]
    match config.engine {
        Engine::Ecs => {
            if let Some(settings) = &config.ecs {
                Ok(Box::new(ecs::Engine::new(settings)))
            } else {
                Err(SchedulerError::FailedPrecondition(
                    "ecs engine settings not found in config".into(),
                ))
            }
        }
    }
}
