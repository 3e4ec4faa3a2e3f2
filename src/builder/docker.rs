use super::{BuildRequest, Builder, BuilderError, LoginRequest, PublishRequest};
use crate::conf;
use crate::exec;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Drives the docker client binary (or a compatible substitute like podman or finch).
/// Only client-side commands are used; the daemon does the heavy lifting.
#[derive(Debug, Clone)]
pub struct Engine {
    binary: String,
}

impl Engine {
    pub fn new(settings: &conf::cli::DockerBuilder) -> Self {
        Self {
            binary: settings.binary.clone(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl Builder for Engine {
    async fn login(&self, req: LoginRequest) -> Result<(), BuilderError> {
        // The credential travels over stdin; it must never appear in argv.
        let cmd = self.command(&["login", "-u", &req.auth.user, "--password-stdin", &req.host]);

        exec::run_with_stdin(cmd, req.auth.pass.as_bytes())
            .await
            .map_err(|e| BuilderError::Login(e.to_string()))?;

        debug!(host = %req.host, user = %req.auth.user, "registry session established");
        Ok(())
    }

    async fn build(&self, req: BuildRequest) -> Result<(), BuilderError> {
        if !req.context.is_dir() {
            return Err(BuilderError::FailedPrecondition(format!(
                "build context '{}' does not exist",
                req.context.display()
            )));
        }

        let context = req.context.display().to_string();
        let cmd = self.command(&["build", "--platform", &req.platform, "-t", &req.tag, &context]);

        exec::run(cmd)
            .await
            .map_err(|e| BuilderError::Build(e.to_string()))?;

        debug!(tag = %req.tag, platform = %req.platform, "image built");
        Ok(())
    }

    async fn publish(&self, req: PublishRequest) -> Result<(), BuilderError> {
        let tag = self.command(&["tag", &req.local_tag, &req.remote_tag]);
        exec::run(tag)
            .await
            .map_err(|e| BuilderError::Publish(e.to_string()))?;

        let push = self.command(&["push", &req.remote_tag]);
        exec::run(push)
            .await
            .map_err(|e| BuilderError::Publish(e.to_string()))?;

        debug!(tag = %req.remote_tag, "image published");
        Ok(())
    }
}
