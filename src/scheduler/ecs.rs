use super::{RedeployRequest, Scheduler, SchedulerError};
use crate::conf;
use crate::exec;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Asks ECS to cycle a service through the aws CLI. The update call returns once the
/// platform accepts the request; the replacement tasks start in the background.
#[derive(Debug, Clone)]
pub struct Engine {
    binary: String,
}

impl Engine {
    pub fn new(settings: &conf::cli::EcsScheduler) -> Self {
        Self {
            binary: settings.binary.clone(),
        }
    }
}

#[async_trait]
impl Scheduler for Engine {
    async fn force_redeploy(&self, req: RedeployRequest) -> Result<(), SchedulerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "ecs",
            "update-service",
            "--cluster",
            &req.cluster,
            "--service",
            &req.service,
            "--force-new-deployment",
            "--region",
            &req.region,
        ]);

        exec::run(cmd)
            .await
            .map_err(|e| SchedulerError::Rollout(e.to_string()))?;

        debug!(cluster = %req.cluster, service = %req.service, "redeploy requested");
        Ok(())
    }
}
