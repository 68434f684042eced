//! Deploy logic for the bootstrap service

use log::{debug, info, warn};

use crate::aws::cli::CommandOutput;
use crate::aws::oidc_provider::get_or_create_oidc_provider;
use crate::aws::stack::{
    deploy_stack, describe_stack_outputs, ensure_template_exists, role_name_from_arn,
    ROLE_ARN_OUTPUT,
};
use crate::config::PublishConfig;
use crate::error::{BootstrapError, BootstrapResult};
use crate::github::{propagate_variable, GitHubClient, PropagationReport};
use crate::repos::{first_repo_in_org, read_repo_list, RepoRef};
use crate::template::manual_instructions;

/// Inputs for a deploy
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Use this provider instead of looking it up (or creating it) in IAM
    pub oidc_provider_arn: Option<String>,
    pub publish: PublishConfig,
}

/// How the role ARN was handed to the allowed repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleArnDelivery {
    /// Written as a repository variable through the GitHub API
    Propagated(PropagationReport),
    /// No token was available; instructions for setting the variable by hand
    Manual(String),
}

/// Role declared by the deployed stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedRole {
    pub arn: String,
    pub delivery: RoleArnDelivery,
}

impl DeployedRole {
    pub fn name(&self) -> &str {
        role_name_from_arn(&self.arn)
    }
}

/// Result of a successful deploy
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub oidc_provider_arn: String,
    /// Output of `aws cloudformation deploy`
    pub output: CommandOutput,
    /// `None` when the stack declares no `RoleArn` output
    pub role: Option<DeployedRole>,
}

/// Publication target, resolved before anything is deployed.
enum PublishTarget {
    GitHub {
        client: GitHubClient,
        repos: Vec<RepoRef>,
        org: String,
    },
    Manual {
        org: Option<String>,
        repo: Option<String>,
    },
}

impl PublishTarget {
    fn prepare(config: &PublishConfig) -> BootstrapResult<Self> {
        match &config.github {
            Some(github) => {
                let org = config.github_org.clone().ok_or_else(|| {
                    BootstrapError::configuration(
                        "a GitHub organization (--github-org) is required to set repository variables",
                    )
                })?;
                let repos = read_repo_list(&config.repos_file)?;
                let client = GitHubClient::new(github)?;
                Ok(Self::GitHub { client, repos, org })
            }
            None => {
                let repos = match read_repo_list(&config.repos_file) {
                    Ok(repos) => repos,
                    Err(e) if e.is_missing_input() => {
                        debug!("No repository list; instructions will omit the direct link");
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };
                let org = config.github_org.clone();
                let repo = org
                    .as_deref()
                    .and_then(|org| first_repo_in_org(&repos, org))
                    .map(str::to_string);
                Ok(Self::Manual { org, repo })
            }
        }
    }

    async fn deliver(&self, role_arn: &str, var_name: &str, region: &str) -> RoleArnDelivery {
        match self {
            Self::GitHub { client, repos, org } => RoleArnDelivery::Propagated(
                propagate_variable(client, repos, org, var_name, role_arn).await,
            ),
            Self::Manual { org, repo } => RoleArnDelivery::Manual(manual_instructions(
                role_arn,
                org.as_deref(),
                repo.as_deref(),
                var_name,
                region,
            )),
        }
    }
}

impl super::service::BootstrapService {
    /// Resolve the OIDC provider, deploy the stack, read back the role ARN, and
    /// publish it to the allowed repositories.
    ///
    /// Stops at the first failing step. A missing template, a missing allow-list
    /// when a token is configured, or a token without an organization is reported
    /// before any AWS call is made. Per-repository variable failures are part of
    /// the result, not errors.
    pub async fn deploy(&self, request: &DeployRequest) -> BootstrapResult<DeployResult> {
        ensure_template_exists(&self.stack.template_path)?;
        let target = PublishTarget::prepare(&request.publish)?;

        let oidc_provider_arn = match &request.oidc_provider_arn {
            Some(arn) => arn.clone(),
            None => get_or_create_oidc_provider(self.oidc.as_ref()).await?,
        };
        info!("Using OIDC provider {oidc_provider_arn}");

        let output = deploy_stack(&self.stack, &oidc_provider_arn, self.runner.as_ref()).await?;

        let outputs = describe_stack_outputs(&self.stack, self.runner.as_ref()).await?;
        let role = match outputs.get(ROLE_ARN_OUTPUT) {
            Some(arn) => Some(DeployedRole {
                arn: arn.clone(),
                delivery: target
                    .deliver(arn, &request.publish.var_name, &self.stack.region)
                    .await,
            }),
            None => {
                warn!(
                    "Stack {} declares no {ROLE_ARN_OUTPUT} output",
                    self.stack.stack_name
                );
                None
            }
        };

        Ok(DeployResult {
            oidc_provider_arn,
            output,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::cli::fake::{ok, FakeRunner};
    use crate::aws::cli::CommandRunner;
    use crate::aws::oidc_provider::fake::FakeOidcApi;
    use crate::commands::service::BootstrapService;
    use crate::config::{GitHubConfig, StackConfig};
    use crate::github::VariableOutcome;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/gha-role";
    const DESCRIBE_OUTPUT: &str = r#"{"Stacks": [{"Outputs": [
        {"OutputKey": "RoleArn", "OutputValue": "arn:aws:iam::123456789012:role/gha-role"}
    ]}]}"#;

    struct SharedRunner(Arc<FakeRunner>);

    #[async_trait::async_trait]
    impl CommandRunner for SharedRunner {
        async fn run(&self, program: &str, args: &[String]) -> BootstrapResult<CommandOutput> {
            self.0.run(program, args).await
        }
    }

    fn service(
        dir: &TempDir,
        oidc: FakeOidcApi,
        responses: Vec<CommandOutput>,
    ) -> (BootstrapService, Arc<FakeRunner>) {
        let template_path = dir.path().join("iam_role.yaml");
        std::fs::write(&template_path, "Resources: {}\n").unwrap();
        let runner = Arc::new(FakeRunner::with_responses(responses));
        let service = BootstrapService::with_clients(
            StackConfig {
                template_path,
                ..StackConfig::default()
            },
            Box::new(oidc),
            Box::new(SharedRunner(Arc::clone(&runner))),
        );
        (service, runner)
    }

    fn repos_file(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("allowed_repos.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn manual_request(dir: &TempDir) -> DeployRequest {
        DeployRequest {
            oidc_provider_arn: None,
            publish: PublishConfig {
                repos_file: dir.path().join("absent.txt"),
                ..PublishConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_deploy_creates_provider_and_reads_role_arn() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok("Successfully created/updated stack"), ok(DESCRIBE_OUTPUT)],
        );

        let result = service.deploy(&manual_request(&dir)).await.unwrap();
        assert_eq!(
            result.oidc_provider_arn,
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
        );
        let role = result.role.unwrap();
        assert_eq!(role.arn, ROLE_ARN);
        assert_eq!(role.name(), "gha-role");

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1[1], "deploy");
        assert_eq!(calls[1].1[1], "describe-stacks");
    }

    #[tokio::test]
    async fn test_deploy_with_explicit_provider_skips_lookup() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok(""), ok(r#"{"Stacks": [{}]}"#)],
        );

        let request = DeployRequest {
            oidc_provider_arn: Some("arn:aws:iam::1:oidc-provider/custom".to_string()),
            ..manual_request(&dir)
        };
        let result = service.deploy(&request).await.unwrap();
        assert_eq!(result.oidc_provider_arn, "arn:aws:iam::1:oidc-provider/custom");
        assert!(result.role.is_none());
        assert!(runner.calls()[0]
            .1
            .contains(&"OIDCProviderArn=arn:aws:iam::1:oidc-provider/custom".to_string()));
    }

    #[tokio::test]
    async fn test_failed_deploy_stops_before_describe() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(
            &dir,
            FakeOidcApi::with_existing(vec![
                "arn:aws:iam::1:oidc-provider/token.actions.githubusercontent.com",
            ]),
            vec![CommandOutput {
                code: 255,
                stdout: String::new(),
                stderr: "An error occurred (ValidationError)".to_string(),
            }],
        );

        let error = service.deploy(&manual_request(&dir)).await.unwrap_err();
        assert!(matches!(
            error,
            BootstrapError::ExternalCommand { code: 255, .. }
        ));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_template_skips_provider_lookup() {
        let dir = TempDir::new().unwrap();
        let service = BootstrapService::with_clients(
            StackConfig {
                template_path: dir.path().join("absent.yaml"),
                ..StackConfig::default()
            },
            Box::new(FakeOidcApi::with_existing(vec![])),
            Box::new(FakeRunner::default()),
        );

        let error = service.deploy(&manual_request(&dir)).await.unwrap_err();
        assert!(error.is_missing_input());
    }

    #[tokio::test]
    async fn test_token_propagates_role_arn_to_allowed_repositories() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/widgets/actions/variables/GHA_OIDC_ROLE_ARN"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/other/gadgets/actions/variables/GHA_OIDC_ROLE_ARN"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/other/gadgets/actions/variables"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let (service, _) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok(""), ok(DESCRIBE_OUTPUT)],
        );
        let request = DeployRequest {
            oidc_provider_arn: None,
            publish: PublishConfig {
                github_org: Some("acme".to_string()),
                github: Some(GitHubConfig::new("token").with_api_url(server.uri())),
                repos_file: repos_file(&dir, "widgets\nother/gadgets\n"),
                ..PublishConfig::default()
            },
        };

        let role = service.deploy(&request).await.unwrap().role.unwrap();
        match role.delivery {
            RoleArnDelivery::Propagated(report) => {
                assert!(report.all_succeeded());
                assert_eq!(report.variable, "GHA_OIDC_ROLE_ARN");
                assert_eq!(report.results[0].full_name(), "acme/widgets");
                assert_eq!(report.results[0].outcome, VariableOutcome::Updated);
                assert_eq!(report.results[1].outcome, VariableOutcome::Created);
            }
            other => panic!("Expected Propagated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_without_org_fails_before_deploying() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(&dir, FakeOidcApi::with_existing(vec![]), vec![]);
        let request = DeployRequest {
            oidc_provider_arn: None,
            publish: PublishConfig {
                github: Some(GitHubConfig::new("token")),
                repos_file: repos_file(&dir, "acme/widgets\n"),
                ..PublishConfig::default()
            },
        };

        let error = service.deploy(&request).await.unwrap_err();
        assert!(matches!(error, BootstrapError::Configuration(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_token_with_missing_repos_file_fails_before_deploying() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(&dir, FakeOidcApi::with_existing(vec![]), vec![]);
        let request = DeployRequest {
            oidc_provider_arn: None,
            publish: PublishConfig {
                github_org: Some("acme".to_string()),
                github: Some(GitHubConfig::new("token")),
                repos_file: dir.path().join("absent.txt"),
                ..PublishConfig::default()
            },
        };

        let error = service.deploy(&request).await.unwrap_err();
        assert!(error.is_missing_input());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_token_links_first_repository_in_org() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok(""), ok(DESCRIBE_OUTPUT)],
        );
        let request = DeployRequest {
            oidc_provider_arn: None,
            publish: PublishConfig {
                github_org: Some("acme".to_string()),
                repos_file: repos_file(&dir, "other/tools\nacme/widgets\nacme/gadgets\n"),
                ..PublishConfig::default()
            },
        };

        let role = service.deploy(&request).await.unwrap().role.unwrap();
        match role.delivery {
            RoleArnDelivery::Manual(text) => {
                assert!(text.contains("https://github.com/acme/widgets/settings/variables/actions"));
                assert!(text.contains(&format!("role-to-assume: {ROLE_ARN}")));
                assert!(text.contains("aws-region: us-east-1"));
            }
            other => panic!("Expected Manual, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_without_token_tolerates_missing_repos_file() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok(""), ok(DESCRIBE_OUTPUT)],
        );
        let request = DeployRequest {
            publish: PublishConfig {
                github_org: Some("acme".to_string()),
                ..manual_request(&dir).publish
            },
            ..manual_request(&dir)
        };

        let role = service.deploy(&request).await.unwrap().role.unwrap();
        match role.delivery {
            RoleArnDelivery::Manual(text) => {
                assert!(!text.contains("settings/variables/actions"));
            }
            other => panic!("Expected Manual, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_runs_validate_template() {
        let dir = TempDir::new().unwrap();
        let (service, runner) = service(
            &dir,
            FakeOidcApi::with_existing(vec![]),
            vec![ok("{}")],
        );

        service.validate().await.unwrap();
        assert_eq!(runner.calls()[0].1[1], "validate-template");
        assert_eq!(service.stack().stack_name, "gha-aws-oidc-bootstrap");
    }
}
