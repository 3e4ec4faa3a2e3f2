use super::{ApplyRequest, Converger, ConvergerError, OutputRequest};
use crate::conf;
use crate::exec;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Drives the terraform binary (or a compatible substitute like tofu) against a
/// definition directory. Uses -chdir instead of changing our own working directory so
/// relative paths elsewhere in the run keep meaning what the operator wrote.
#[derive(Debug, Clone)]
pub struct Engine {
    binary: String,
}

impl Engine {
    pub fn new(settings: &conf::cli::TerraformConverger) -> Self {
        Self {
            binary: settings.binary.clone(),
        }
    }

    fn command(&self, definition_path: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(format!("-chdir={}", definition_path.display()));
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl Converger for Engine {
    async fn apply(&self, req: ApplyRequest) -> Result<(), ConvergerError> {
        if !req.definition_path.is_dir() {
            return Err(ConvergerError::FailedPrecondition(format!(
                "definition directory '{}' does not exist",
                req.definition_path.display()
            )));
        }

        // Init is idempotent and nearly free once providers are cached, so every apply
        // starts with one; a fresh checkout converges without manual steps.
        let init = self.command(&req.definition_path, &["init", "-input=false"]);
        run_step(init, &req.variables).await?;

        let apply = self.command(
            &req.definition_path,
            &["apply", "-auto-approve", "-input=false"],
        );
        run_step(apply, &req.variables).await?;

        debug!(definition = %req.definition_path.display(), "infrastructure converged");
        Ok(())
    }

    async fn output(&self, req: OutputRequest) -> Result<String, ConvergerError> {
        let cmd = self.command(&req.definition_path, &["output", "-raw", &req.name]);

        let output = exec::run(cmd).await.map_err(|e| match e {
            exec::ExecError::Launch { .. } => ConvergerError::Launch(e.to_string()),
            exec::ExecError::Failed { .. } => ConvergerError::MissingOutput {
                name: req.name.clone(),
                reason: e.to_string(),
            },
        })?;

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(ConvergerError::MissingOutput {
                name: req.name,
                reason: "output exists but is empty".to_string(),
            });
        }

        Ok(value)
    }
}

/// Variables ride on the environment as TF_VAR_* so secret values never show up in
/// argv or in our own debug logging of command lines.
async fn run_step(
    mut cmd: Command,
    variables: &std::collections::HashMap<String, String>,
) -> Result<(), ConvergerError> {
    for (key, value) in variables {
        cmd.env(format!("TF_VAR_{key}"), value);
    }

    exec::run(cmd).await.map(|_| ()).map_err(|e| match e {
        exec::ExecError::Launch { .. } => ConvergerError::Launch(e.to_string()),
        exec::ExecError::Failed { .. } => ConvergerError::Apply(e.to_string()),
    })
}
