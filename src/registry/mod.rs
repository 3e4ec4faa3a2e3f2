pub mod ecr;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use strum::{Display, EnumString};

/// Represents different registry credential failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Failed to start due to misconfigured settings, usually from a misconfigured
    /// settings file.
    #[error("could not init registry; {0}")]
    FailedPrecondition(String),

    /// The provider refused or failed to mint a credential.
    #[error("could not obtain registry credential; {0}")]
    Auth(String),
}

/// Short-lived credentials for one registry session. Never persisted; the expected
/// lifetime covers a single deployment run.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub user: String,
    pub pass: String,
}

// The credential ends up in logs otherwise; Debug keeps the user visible for
// troubleshooting and nothing else.
impl Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    /// Registry address the credential must be valid for.
    pub registry_address: String,

    /// Provider region minting the credential.
    pub region: String,
}

/// The registry trait defines how stevedore obtains short-lived credentials for the
/// artifact registry that infrastructure convergence produced.
#[async_trait]
pub trait Registry: Debug + Send + Sync {
    async fn credentials(&self, req: CredentialRequest) -> Result<RegistryAuth, RegistryError>;
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")] // This handles case insensitivity during deserialization
pub enum Engine {
    #[default]
    Ecr,
}

pub fn new(config: &crate::conf::cli::Registry) -> Result<Box<dyn Registry>, RegistryError> {
    #[allow(clippy::match_single_binding)]
    match config.engine {
        Engine::Ecr => {
            if let Some(settings) = &config.ecr {
                Ok(Box::new(ecr::Engine::new(settings)))
            } else {
                Err(RegistryError::FailedPrecondition(
                    "ecr engine settings not found in config".into(),
                ))
            }
        }
    }
}

/// The host component of a registry address; what a login session is established
/// against. The address itself usually carries a repository suffix.
pub fn registry_host(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}
