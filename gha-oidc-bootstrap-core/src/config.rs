//! Explicit configuration passed into each operation.

use std::path::PathBuf;

/// Default values shared by the CLI and the library.
pub mod defaults {
    /// CloudFormation stack that owns the OIDC role
    pub const STACK_NAME: &str = "gha-aws-oidc-bootstrap";
    pub const REGION: &str = "us-east-1";
    /// Rendered template consumed by `validate-template` and `deploy`
    pub const TEMPLATE_PATH: &str = "cloudformation/generated/iam_role.yaml";
    pub const TRUST_POLICY_PATH: &str = "cloudformation/generated/trust_policy.json";
    pub const POLICIES_DIR: &str = "policies";
    pub const REPOS_FILE: &str = "allowed_repos.txt";
    pub const AWS_CLI: &str = "aws";
    pub const VARIABLE_NAME: &str = "GHA_OIDC_ROLE_ARN";
    pub const GITHUB_API_URL: &str = "https://api.github.com";
    /// Account id used when synthesizing a role ARN without AWS access
    pub const PLACEHOLDER_ACCOUNT_ID: &str = "123456789012";
    /// Indent of policy documents under `Policies[].PolicyDocument`
    pub const POLICY_BLOCK_INDENT: usize = 12;
}

/// Stack operations configuration
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// CloudFormation stack name
    pub stack_name: String,
    /// Rendered template to validate or deploy
    pub template_path: PathBuf,
    /// AWS region
    pub region: String,
    /// AWS CLI executable
    pub aws_cli: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: defaults::STACK_NAME.to_string(),
            template_path: PathBuf::from(defaults::TEMPLATE_PATH),
            region: defaults::REGION.to_string(),
            aws_cli: defaults::AWS_CLI.to_string(),
        }
    }
}

/// Configuration for rendering the CloudFormation template
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Template file. `None` selects the embedded default template.
    pub template: Option<PathBuf>,
    pub trust_policy_path: PathBuf,
    /// Directory of standalone IAM policy JSON documents
    pub policies_dir: PathBuf,
    /// Extra fragment attached as `CustomPolicy`
    pub custom_policy: Option<PathBuf>,
    pub output: PathBuf,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Explicit `RoleName` for the role resource
    pub role_name: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template: None,
            trust_policy_path: PathBuf::from(defaults::TRUST_POLICY_PATH),
            policies_dir: PathBuf::from(defaults::POLICIES_DIR),
            custom_policy: None,
            output: PathBuf::from(defaults::TEMPLATE_PATH),
            owner: None,
            repo: None,
            role_name: None,
        }
    }
}

/// GitHub REST API access
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: String,
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: defaults::GITHUB_API_URL.to_string(),
            token: token.into(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// Where a deployed role ARN is published
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Organization for allow-list entries without one
    pub github_org: Option<String>,
    /// GitHub API access. `None` selects manual setup instructions.
    pub github: Option<GitHubConfig>,
    pub repos_file: PathBuf,
    /// Repository variable that receives the ARN
    pub var_name: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            github_org: None,
            github: None,
            repos_file: PathBuf::from(defaults::REPOS_FILE),
            var_name: defaults::VARIABLE_NAME.to_string(),
        }
    }
}
