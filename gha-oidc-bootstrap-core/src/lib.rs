//! GHA OIDC Bootstrap Core Library
//!
//! Builds the pieces needed to let GitHub Actions workflows assume an AWS IAM role
//! through OIDC: the role trust policy, the CloudFormation template that declares the
//! role, the stack deployment, the IAM OIDC identity provider, and the repository
//! variable that publishes the role ARN to workflows.

pub mod aws;
pub mod commands;
pub mod config;
pub mod error;
pub mod github;
pub mod repos;
pub mod template;
pub mod trust_policy;

pub use commands::{BootstrapService, DeployRequest, DeployResult, DeployedRole, RoleArnDelivery};
pub use config::{defaults, GitHubConfig, PublishConfig, RenderConfig, StackConfig};
pub use error::{BootstrapError, BootstrapResult};
pub use repos::{first_repo_in_org, read_repo_list, RepoRef};
pub use trust_policy::{generate_trust_policy, FederatedPrincipal, SubjectSource, TrustPolicy};
