use super::{CredentialRequest, Registry, RegistryAuth, RegistryError};
use crate::conf;
use crate::exec;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// ECR login usernames are fixed by the provider; only the password rotates.
const ECR_USER: &str = "AWS";

/// Mints registry credentials with the aws CLI. The token arrives on the tool's stdout
/// and lives only as long as this process needs to hand it to the builder's login.
#[derive(Debug, Clone)]
pub struct Engine {
    binary: String,
}

impl Engine {
    pub fn new(settings: &conf::cli::EcrRegistry) -> Self {
        Self {
            binary: settings.binary.clone(),
        }
    }
}

#[async_trait]
impl Registry for Engine {
    async fn credentials(&self, req: CredentialRequest) -> Result<RegistryAuth, RegistryError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["ecr", "get-login-password", "--region", &req.region]);

        let output = exec::run(cmd)
            .await
            .map_err(|e| RegistryError::Auth(e.to_string()))?;

        let pass = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if pass.is_empty() {
            return Err(RegistryError::Auth(
                "provider returned an empty login token".to_string(),
            ));
        }

        debug!(registry = %req.registry_address, region = %req.region, "registry credential obtained");

        Ok(RegistryAuth {
            user: ECR_USER.to_string(),
            pass,
        })
    }
}
