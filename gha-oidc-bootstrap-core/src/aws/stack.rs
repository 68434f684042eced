//! CloudFormation stack operations through the AWS CLI.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use super::cli::{CommandOutput, CommandRunner};
use super::AwsError;
use crate::config::StackConfig;
use crate::error::{BootstrapError, BootstrapResult};
use crate::trust_policy::OIDC_PROVIDER_PARAMETER;

/// Stack output holding the deployed role's ARN
pub const ROLE_ARN_OUTPUT: &str = "RoleArn";
const NAMED_IAM_CAPABILITY: &str = "CAPABILITY_NAMED_IAM";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksResponse {
    #[serde(default)]
    stacks: Vec<StackDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackDescription {
    #[serde(default)]
    outputs: Vec<StackOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackOutput {
    output_key: String,
    output_value: String,
}

pub(crate) fn ensure_template_exists(path: &Path) -> BootstrapResult<()> {
    if path.exists() {
        return Ok(());
    }
    Err(BootstrapError::missing_input(
        path,
        format!(
            "The CloudFormation template '{}' was not found.\n\
Render it first with `gha-oidc-bootstrap render-template --output {}`.",
            path.display(),
            path.display()
        ),
    ))
}

/// Validate the rendered template with `aws cloudformation validate-template`.
pub async fn validate_template(
    config: &StackConfig,
    runner: &dyn CommandRunner,
) -> BootstrapResult<CommandOutput> {
    ensure_template_exists(&config.template_path)?;
    let args = vec![
        "cloudformation".to_string(),
        "validate-template".to_string(),
        "--template-body".to_string(),
        format!("file://{}", config.template_path.display()),
        "--region".to_string(),
        config.region.clone(),
    ];
    runner
        .run(&config.aws_cli, &args)
        .await?
        .into_result(&config.aws_cli)
}

/// Deploy the rendered template, binding `OIDCProviderArn` to `oidc_provider_arn`.
///
/// A non-zero exit from the AWS CLI is returned as
/// [`BootstrapError::ExternalCommand`] with the captured output.
pub async fn deploy_stack(
    config: &StackConfig,
    oidc_provider_arn: &str,
    runner: &dyn CommandRunner,
) -> BootstrapResult<CommandOutput> {
    ensure_template_exists(&config.template_path)?;
    let args = vec![
        "cloudformation".to_string(),
        "deploy".to_string(),
        "--stack-name".to_string(),
        config.stack_name.clone(),
        "--template-file".to_string(),
        config.template_path.display().to_string(),
        "--region".to_string(),
        config.region.clone(),
        "--parameter-overrides".to_string(),
        format!("{OIDC_PROVIDER_PARAMETER}={oidc_provider_arn}"),
        "--capabilities".to_string(),
        NAMED_IAM_CAPABILITY.to_string(),
    ];
    info!(
        "Deploying stack {} in {} from {}",
        config.stack_name,
        config.region,
        config.template_path.display()
    );
    runner
        .run(&config.aws_cli, &args)
        .await?
        .into_result(&config.aws_cli)
}

/// Read the declared outputs of the configured stack.
pub async fn describe_stack_outputs(
    config: &StackConfig,
    runner: &dyn CommandRunner,
) -> BootstrapResult<BTreeMap<String, String>> {
    let args = vec![
        "cloudformation".to_string(),
        "describe-stacks".to_string(),
        "--stack-name".to_string(),
        config.stack_name.clone(),
        "--region".to_string(),
        config.region.clone(),
        "--output".to_string(),
        "json".to_string(),
    ];
    let output = runner
        .run(&config.aws_cli, &args)
        .await?
        .into_result(&config.aws_cli)?;
    parse_stack_outputs(&output.stdout)
}

fn parse_stack_outputs(json: &str) -> BootstrapResult<BTreeMap<String, String>> {
    let response: DescribeStacksResponse = serde_json::from_str(json).map_err(|e| {
        AwsError::StackError(format!("Failed to parse describe-stacks output: {e}"))
    })?;
    let outputs: BTreeMap<String, String> = response
        .stacks
        .into_iter()
        .next()
        .map(|stack| {
            stack
                .outputs
                .into_iter()
                .map(|o| (o.output_key, o.output_value))
                .collect()
        })
        .unwrap_or_default();
    debug!("Stack outputs: {:?}", outputs.keys().collect::<Vec<_>>());
    Ok(outputs)
}

/// Role name from a role ARN: the segment after the last `/`.
pub fn role_name_from_arn(role_arn: &str) -> &str {
    role_arn.rsplit('/').next().unwrap_or(role_arn)
}
