pub mod terraform;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Represents different convergence failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConvergerError {
    /// Failed to start due to misconfigured settings, usually from a misconfigured
    /// settings file.
    #[error("could not init converger; {0}")]
    FailedPrecondition(String),

    /// The convergence tool could not be launched at all.
    #[error("could not launch convergence tool; {0}")]
    Launch(String),

    /// The tool ran but could not reconcile the definition with remote state.
    #[error("could not converge infrastructure; {0}")]
    Apply(String),

    /// The converged state does not expose an output the flow depends on.
    #[error("could not read output '{name}' from converged state; {reason}")]
    MissingOutput { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    /// Directory holding the declarative definition to reconcile.
    pub definition_path: PathBuf,

    /// Variables handed to the definition. Secret values travel here and must never
    /// be logged or placed on a command line.
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Directory holding the definition whose converged state is read.
    pub definition_path: PathBuf,

    /// Name of the string output to read back.
    pub name: String,
}

/// The converger trait defines the interface between stevedore and the tool that
/// reconciles declared infrastructure with actual remote resource state. Applying must
/// be idempotent: re-running with unchanged inputs produces no additional changes.
#[async_trait]
pub trait Converger: Debug + Send + Sync {
    /// Reconcile the definition at the requested path against remote provider state.
    async fn apply(&self, req: ApplyRequest) -> Result<(), ConvergerError>;

    /// Read back a named string output from the converged state.
    async fn output(&self, req: OutputRequest) -> Result<String, ConvergerError>;
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")] // This handles case insensitivity during deserialization
pub enum Engine {
    #[default]
    Terraform,
}

pub fn new(config: &crate::conf::cli::Converger) -> Result<Box<dyn Converger>, ConvergerError> {
    #[allow(clippy::match_single_binding)]
    match config.engine {
        Engine::Terraform => {
            if let Some(settings) = &config.terraform {
                Ok(Box::new(terraform::Engine::new(settings)))
            } else {
                Err(ConvergerError::FailedPrecondition(
                    "terraform engine settings not found in config".into(),
                ))
            }
        }
    }
}
