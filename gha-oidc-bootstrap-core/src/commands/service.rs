//! GHA OIDC Bootstrap Service Layer
//!
//! Holds the IAM client, the AWS CLI runner, and the stack configuration that the
//! stack-level operations (validate, deploy) share.

use aws_sdk_iam::config::Region;
use aws_sdk_iam::Client as IamClient;

use crate::aws::cli::{CommandOutput, CommandRunner, ProcessRunner};
use crate::aws::iam_client::AwsIamClient;
use crate::aws::oidc_provider::OidcProviderApi;
use crate::aws::stack::validate_template;
use crate::config::StackConfig;
use crate::error::BootstrapResult;

/// Main service struct for stack operations
pub struct BootstrapService {
    pub(crate) oidc: Box<dyn OidcProviderApi>,
    pub(crate) runner: Box<dyn CommandRunner>,
    pub(crate) stack: StackConfig,
}

impl BootstrapService {
    /// Create a service backed by the real AWS CLI and an IAM client for the
    /// configured region.
    ///
    /// Credentials come from the default provider chain and are resolved lazily, on
    /// the first IAM call.
    pub async fn new(stack: StackConfig) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(stack.region.clone()))
            .load()
            .await;

        Self {
            oidc: Box::new(AwsIamClient::new(IamClient::new(&config))),
            runner: Box::new(ProcessRunner),
            stack,
        }
    }

    /// Create a service from explicit collaborators
    pub fn with_clients(
        stack: StackConfig,
        oidc: Box<dyn OidcProviderApi>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            oidc,
            runner,
            stack,
        }
    }

    pub fn stack(&self) -> &StackConfig {
        &self.stack
    }

    /// Validate the configured template with the AWS CLI
    pub async fn validate(&self) -> BootstrapResult<CommandOutput> {
        validate_template(&self.stack, self.runner.as_ref()).await
    }

    // deploy() is implemented in deploy.rs
}
