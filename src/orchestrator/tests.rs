use super::*;
use crate::builder::BuilderError;
use crate::converger::ConvergerError;
use crate::registry::{RegistryAuth, RegistryError};
use crate::scheduler::SchedulerError;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const ECR_ADDRESS: &str = "123456789012.dkr.ecr.eu-central-1.amazonaws.com/svitlo-monitor";

/// One engine invocation as the fakes saw it. Secret values never land here, only
/// variable names, matching what the real engines are allowed to log.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Apply {
        definition: PathBuf,
        variable_keys: Vec<String>,
    },
    Output {
        definition: PathBuf,
        name: String,
    },
    Credentials {
        registry_address: String,
        region: String,
    },
    Login {
        host: String,
        user: String,
    },
    Build {
        context: PathBuf,
        platform: String,
        tag: String,
    },
    Publish {
        local_tag: String,
        remote_tag: String,
    },
    Redeploy {
        cluster: String,
        service: String,
        region: String,
    },
}

#[derive(Debug, Clone, Default)]
struct Ledger(Arc<Mutex<Vec<Call>>>);

impl Ledger {
    fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nowhere,
    Apply,
    Output,
    Credentials,
    Login,
    Build,
    Publish,
    Redeploy,
}

#[derive(Debug)]
struct FakeConverger {
    ledger: Ledger,
    fail_at: FailAt,
    registry_address: Arc<Mutex<String>>,
}

#[async_trait]
impl Converger for FakeConverger {
    async fn apply(&self, req: ApplyRequest) -> Result<(), ConvergerError> {
        let mut variable_keys: Vec<String> = req.variables.keys().cloned().collect();
        variable_keys.sort();
        self.ledger.record(Call::Apply {
            definition: req.definition_path,
            variable_keys,
        });

        if self.fail_at == FailAt::Apply {
            return Err(ConvergerError::Apply("provider refused the plan".to_string()));
        }
        Ok(())
    }

    async fn output(&self, req: OutputRequest) -> Result<String, ConvergerError> {
        self.ledger.record(Call::Output {
            definition: req.definition_path,
            name: req.name.clone(),
        });

        if self.fail_at == FailAt::Output {
            return Err(ConvergerError::MissingOutput {
                name: req.name,
                reason: "output not declared".to_string(),
            });
        }
        Ok(self.registry_address.lock().unwrap().clone())
    }
}

#[derive(Debug)]
struct FakeRegistry {
    ledger: Ledger,
    fail_at: FailAt,
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn credentials(&self, req: CredentialRequest) -> Result<RegistryAuth, RegistryError> {
        self.ledger.record(Call::Credentials {
            registry_address: req.registry_address,
            region: req.region,
        });

        if self.fail_at == FailAt::Credentials {
            return Err(RegistryError::Auth("token request denied".to_string()));
        }
        Ok(RegistryAuth {
            user: "AWS".to_string(),
            pass: "session-token".to_string(),
        })
    }
}

#[derive(Debug)]
struct FakeBuilder {
    ledger: Ledger,
    fail_at: FailAt,
}

#[async_trait]
impl Builder for FakeBuilder {
    async fn login(&self, req: LoginRequest) -> Result<(), BuilderError> {
        self.ledger.record(Call::Login {
            host: req.host,
            user: req.auth.user,
        });

        if self.fail_at == FailAt::Login {
            return Err(BuilderError::Login("login rejected".to_string()));
        }
        Ok(())
    }

    async fn build(&self, req: BuildRequest) -> Result<(), BuilderError> {
        self.ledger.record(Call::Build {
            context: req.context,
            platform: req.platform,
            tag: req.tag,
        });

        if self.fail_at == FailAt::Build {
            return Err(BuilderError::Build("compile step failed".to_string()));
        }
        Ok(())
    }

    async fn publish(&self, req: PublishRequest) -> Result<(), BuilderError> {
        self.ledger.record(Call::Publish {
            local_tag: req.local_tag,
            remote_tag: req.remote_tag,
        });

        if self.fail_at == FailAt::Publish {
            return Err(BuilderError::Publish("push timed out".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FakeScheduler {
    ledger: Ledger,
    fail_at: FailAt,
}

#[async_trait]
impl Scheduler for FakeScheduler {
    async fn force_redeploy(&self, req: RedeployRequest) -> Result<(), SchedulerError> {
        self.ledger.record(Call::Redeploy {
            cluster: req.cluster,
            service: req.service,
            region: req.region,
        });

        if self.fail_at == FailAt::Redeploy {
            return Err(SchedulerError::Rollout("update-service denied".to_string()));
        }
        Ok(())
    }
}

struct TestHarness {
    ledger: Ledger,
    registry_address: Arc<Mutex<String>>,
    orchestrator: Orchestrator,
}

impl TestHarness {
    fn new(fail_at: FailAt) -> Self {
        let ledger = Ledger::default();
        let registry_address = Arc::new(Mutex::new(ECR_ADDRESS.to_string()));

        let orchestrator = Orchestrator::new(
            profiles(),
            Box::new(FakeConverger {
                ledger: ledger.clone(),
                fail_at,
                registry_address: registry_address.clone(),
            }),
            Box::new(FakeRegistry {
                ledger: ledger.clone(),
                fail_at,
            }),
            Box::new(FakeBuilder {
                ledger: ledger.clone(),
                fail_at,
            }),
            Box::new(FakeScheduler {
                ledger: ledger.clone(),
                fail_at,
            }),
        );

        Self {
            ledger,
            registry_address,
            orchestrator,
        }
    }

    async fn run(
        &self,
        profile: &str,
        secrets: &DeploySecrets,
    ) -> (Result<Deployment, DeployError>, Vec<State>) {
        let mut states = vec![];
        let result = self
            .orchestrator
            .run(profile, secrets, |state| states.push(state))
            .await;
        (result, states)
    }
}

fn profiles() -> Vec<Profile> {
    vec![
        Profile {
            name: "ec2-low-cost".to_string(),
            definition_path: PathBuf::from("infra/ec2-low-cost"),
            app_name: "svitlo-monitor".to_string(),
            build_context: PathBuf::from("app"),
            platform: "linux/arm64".to_string(),
            region: "eu-central-1".to_string(),
            registry_output: "registry_url".to_string(),
        },
        Profile {
            name: "serverless-compute".to_string(),
            definition_path: PathBuf::from("infra/serverless-compute"),
            app_name: "svitlo-monitor".to_string(),
            build_context: PathBuf::from("app"),
            platform: "linux/arm64".to_string(),
            region: "eu-central-1".to_string(),
            registry_output: "registry_url".to_string(),
        },
    ]
}

fn secrets() -> DeploySecrets {
    DeploySecrets {
        bot_token: "123456:telegram-token".to_string(),
        chat_id: "-1001234567890".to_string(),
        monitor_config: r#"[{"id": 1, "name": "Group 1", "url": "https://example.com/1"}]"#
            .to_string(),
        proxy_url: "http://proxy.internal:3128".to_string(),
    }
}

/// The happy path walks every state once, in order, and each engine sees exactly the
/// derived inputs the selected profile dictates.
#[tokio::test]
async fn full_run_walks_every_stage_in_order() {
    let harness = TestHarness::new(FailAt::Nowhere);

    let (result, states) = harness.run("ec2-low-cost", &secrets()).await;

    assert_eq!(
        result.unwrap(),
        Deployment {
            registry_address: ECR_ADDRESS.to_string(),
            local_tag: "svitlo-monitor:latest".to_string(),
            remote_tag: format!("{ECR_ADDRESS}:latest"),
            cluster: "svitlo-monitor-ec2-low-cost".to_string(),
            service: "svitlo-monitor-ec2-low-cost".to_string(),
        }
    );

    assert_eq!(
        states,
        vec![
            State::Idle,
            State::Converging,
            State::Extracting,
            State::Authenticating,
            State::Building,
            State::Publishing,
            State::RollingOut,
            State::Done,
        ]
    );

    assert_eq!(
        harness.ledger.calls(),
        vec![
            Call::Apply {
                definition: PathBuf::from("infra/ec2-low-cost"),
                variable_keys: vec![
                    "bot_token".to_string(),
                    "chat_id".to_string(),
                    "monitor_config".to_string(),
                    "proxy_url".to_string(),
                ],
            },
            Call::Output {
                definition: PathBuf::from("infra/ec2-low-cost"),
                name: "registry_url".to_string(),
            },
            Call::Credentials {
                registry_address: ECR_ADDRESS.to_string(),
                region: "eu-central-1".to_string(),
            },
            Call::Login {
                host: "123456789012.dkr.ecr.eu-central-1.amazonaws.com".to_string(),
                user: "AWS".to_string(),
            },
            Call::Build {
                context: PathBuf::from("app"),
                platform: "linux/arm64".to_string(),
                tag: "svitlo-monitor:latest".to_string(),
            },
            Call::Publish {
                local_tag: "svitlo-monitor:latest".to_string(),
                remote_tag: format!("{ECR_ADDRESS}:latest"),
            },
            Call::Redeploy {
                cluster: "svitlo-monitor-ec2-low-cost".to_string(),
                service: "svitlo-monitor-ec2-low-cost".to_string(),
                region: "eu-central-1".to_string(),
            },
        ]
    );
}

/// A profile name outside configuration stops the run before anything touches the
/// provider, and the error lists what is configured.
#[tokio::test]
async fn unknown_profile_aborts_before_any_engine_runs() {
    let harness = TestHarness::new(FailAt::Nowhere);

    let (result, states) = harness.run("production", &secrets()).await;

    assert_eq!(
        result.unwrap_err(),
        DeployError::InvalidProfile {
            name: "production".to_string(),
            known: "ec2-low-cost, serverless-compute".to_string(),
        }
    );
    assert_eq!(states, vec![State::Idle, State::Aborted]);
    assert_eq!(harness.ledger.calls(), vec![]);
}

/// Secret validation runs before convergence, so a missing value never reaches the
/// provider even though the profile resolved fine.
#[tokio::test]
async fn invalid_secrets_abort_before_any_engine_runs() {
    let harness = TestHarness::new(FailAt::Nowhere);
    let mut secrets = secrets();
    secrets.bot_token = String::new();

    let (result, states) = harness.run("ec2-low-cost", &secrets).await;

    assert_eq!(
        result.unwrap_err(),
        DeployError::InvalidSecrets("required secret 'BOT_TOKEN' is missing or empty".to_string())
    );
    assert_eq!(states, vec![State::Idle, State::Aborted]);
    assert_eq!(harness.ledger.calls(), vec![]);
}

/// With both a bad profile and bad secrets, the profile is reported; there is nothing
/// to validate secrets against.
#[tokio::test]
async fn profile_resolution_is_checked_first() {
    let harness = TestHarness::new(FailAt::Nowhere);
    let mut secrets = secrets();
    secrets.chat_id = String::new();

    let (result, _) = harness.run("production", &secrets).await;

    assert!(matches!(
        result.unwrap_err(),
        DeployError::InvalidProfile { .. }
    ));
}

/// Every stage failure stops the run exactly where it happened: engines later in the
/// chain are never called and the run lands in Aborted instead of Done.
#[rstest]
#[case::apply(
    FailAt::Apply,
    State::Converging,
    1,
    DeployError::Convergence("could not converge infrastructure; provider refused the plan".to_string())
)]
#[case::output(
    FailAt::Output,
    State::Extracting,
    2,
    DeployError::OutputMissing(
        "could not read output 'registry_url' from converged state; output not declared".to_string()
    )
)]
#[case::credentials(
    FailAt::Credentials,
    State::Authenticating,
    3,
    DeployError::Auth("could not obtain registry credential; token request denied".to_string())
)]
#[case::login(
    FailAt::Login,
    State::Authenticating,
    4,
    DeployError::Auth("could not log in to registry; login rejected".to_string())
)]
#[case::build(
    FailAt::Build,
    State::Building,
    5,
    DeployError::Build("could not build image; compile step failed".to_string())
)]
#[case::publish(
    FailAt::Publish,
    State::Publishing,
    6,
    DeployError::Publish("could not publish image; push timed out".to_string())
)]
#[case::redeploy(
    FailAt::Redeploy,
    State::RollingOut,
    7,
    DeployError::Rollout("could not request redeploy; update-service denied".to_string())
)]
#[tokio::test]
async fn stage_failures_stop_the_run_where_they_happen(
    #[case] fail_at: FailAt,
    #[case] reached: State,
    #[case] calls_made: usize,
    #[case] expected: DeployError,
) {
    let harness = TestHarness::new(fail_at);

    let (result, states) = harness.run("ec2-low-cost", &secrets()).await;

    assert_eq!(result.unwrap_err(), expected);
    assert_eq!(harness.ledger.calls().len(), calls_made);
    assert_eq!(states[states.len() - 2], reached);
    assert_eq!(states.last(), Some(&State::Aborted));
    assert!(!states.contains(&State::Done));
}

/// Back-to-back runs each re-converge and re-read the registry address; the push goes
/// to whatever address the run's own convergence reported, never a remembered one.
#[tokio::test]
async fn published_tag_tracks_the_current_runs_convergence() {
    let harness = TestHarness::new(FailAt::Nowhere);

    harness.run("ec2-low-cost", &secrets()).await.0.unwrap();

    *harness.registry_address.lock().unwrap() =
        "123456789012.dkr.ecr.eu-central-1.amazonaws.com/svitlo-monitor-v2".to_string();

    let (result, _) = harness.run("ec2-low-cost", &secrets()).await;
    let deployment = result.unwrap();

    assert_eq!(
        deployment.remote_tag,
        "123456789012.dkr.ecr.eu-central-1.amazonaws.com/svitlo-monitor-v2:latest"
    );

    let calls = harness.ledger.calls();
    let applies = calls
        .iter()
        .filter(|call| matches!(call, Call::Apply { .. }))
        .count();
    assert_eq!(applies, 2);

    let publishes: Vec<&Call> = calls
        .iter()
        .filter(|call| matches!(call, Call::Publish { .. }))
        .collect();
    assert_eq!(
        publishes,
        vec![
            &Call::Publish {
                local_tag: "svitlo-monitor:latest".to_string(),
                remote_tag: format!("{ECR_ADDRESS}:latest"),
            },
            &Call::Publish {
                local_tag: "svitlo-monitor:latest".to_string(),
                remote_tag:
                    "123456789012.dkr.ecr.eu-central-1.amazonaws.com/svitlo-monitor-v2:latest"
                        .to_string(),
            },
        ]
    );
}
