//! GHA OIDC Bootstrap CLI
//!
//! This is the main entry point for the gha-oidc-bootstrap command-line tool.
//!
//! # Exit Codes
//!
//! The CLI uses the `ExitCode` enum which maps to the following exit codes:
//!
//! - `ExitCode::Success` (0): Operation completed successfully
//! - `ExitCode::Error` (1): Operation failed, or at least one repository variable
//!   could not be written
//! - `ExitCode::MissingConfig` (3): An expected input file is missing; a hint on how
//!   to create it is printed to stderr
//! - `ExitCode::External(n)`: The AWS CLI exited with status `n`
//!
//! Usage errors are reported by clap with its own exit code (2).
//!
//! See `types::ExitCode` for the enum definition.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gha_oidc_bootstrap_core::github::{
    propagate_variable, GitHubClient, PropagationReport, VariableOutcome,
};
use gha_oidc_bootstrap_core::template::{
    manual_instructions, render_iam_template, synthesize_role_arn,
};
use gha_oidc_bootstrap_core::trust_policy::select_subject_source;
use gha_oidc_bootstrap_core::{
    defaults, generate_trust_policy, read_repo_list, BootstrapError, BootstrapService,
    DeployRequest, FederatedPrincipal, GitHubConfig, PublishConfig, RenderConfig, RoleArnDelivery,
    StackConfig,
};
use log::{debug, info};

mod types;

use types::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "gha-oidc-bootstrap",
    author,
    version,
    about = "Bootstrap an AWS IAM role that GitHub Actions can assume through OIDC",
    long_about = "Generates the OIDC trust policy for a list of allowed repositories, renders \
the CloudFormation template declaring the role, validates and deploys it with the AWS CLI, and \
publishes the role ARN to GitHub Actions repository variables.\n\n\
Examples:\n  \
gha-oidc-bootstrap generate-trust-policy --repos-file allowed_repos.txt\n  \
gha-oidc-bootstrap render-template --policies-dir policies\n  \
gha-oidc-bootstrap validate-template\n  \
gha-oidc-bootstrap deploy --github-org octo-org --region us-east-1\n  \
gha-oidc-bootstrap set-variable --github-org octo-org --var-value arn:aws:iam::123456789012:role/Example"
)]
struct Cli {
    /// Enable debug logging output
    #[arg(long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the IAM trust policy for the allowed repositories
    #[command(
        long_about = "Writes an IAM trust policy that lets GitHub Actions workflows of the \
allowed repositories assume the role. A --github-org/--github-repo pair takes precedence over \
--repos-file, which takes precedence over allowed_repos.txt in the working directory."
    )]
    GenerateTrustPolicy {
        /// File listing allowed repositories, one org/repo per line
        #[arg(long = "repos-file")]
        repos_file: Option<PathBuf>,

        /// GitHub organization of a single allowed repository
        #[arg(long = "github-org")]
        github_org: Option<String>,

        /// Name of a single allowed repository
        #[arg(long = "github-repo")]
        github_repo: Option<String>,

        /// AWS account ID; references the OIDCProviderArn stack parameter when omitted
        #[arg(long = "account-id")]
        account_id: Option<String>,

        /// Output JSON file
        #[arg(long = "output", default_value = defaults::TRUST_POLICY_PATH)]
        output: PathBuf,
    },

    /// Render the CloudFormation template for the IAM role
    #[command(
        long_about = "Renders the IAM role template with the trust policy and every *.json \
policy document in the policies directory inlined. Without a GitHub token but with both \
--owner and --repo, nothing is rendered; the role ARN and manual setup instructions are \
printed instead."
    )]
    RenderTemplate {
        /// Jinja template; the built-in role template is used when omitted
        #[arg(long = "template")]
        template: Option<PathBuf>,

        /// Trust policy JSON produced by generate-trust-policy
        #[arg(long = "trust-policy", default_value = defaults::TRUST_POLICY_PATH)]
        trust_policy: PathBuf,

        /// Directory of IAM policy JSON documents to inline
        #[arg(long = "policies-dir", default_value = defaults::POLICIES_DIR)]
        policies_dir: PathBuf,

        /// Extra policy document attached as CustomPolicy
        #[arg(long = "policy-file")]
        policy_file: Option<PathBuf>,

        /// Rendered template output path
        #[arg(long = "output", default_value = defaults::TEMPLATE_PATH)]
        output: PathBuf,

        /// GitHub repository owner
        #[arg(long = "owner")]
        owner: Option<String>,

        /// GitHub repository name
        #[arg(long = "repo")]
        repo: Option<String>,

        /// GitHub token
        #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// AWS account ID used for the synthesized role ARN
        #[arg(long = "account-id")]
        account_id: Option<String>,

        /// Explicit IAM role name
        #[arg(long = "role-name")]
        role_name: Option<String>,

        /// AWS region shown in the workflow snippet
        #[arg(long = "region", default_value = defaults::REGION)]
        region: String,
    },

    /// Validate the rendered template with the AWS CLI
    ValidateTemplate {
        /// Rendered template to validate
        #[arg(long = "template-file", default_value = defaults::TEMPLATE_PATH)]
        template_file: PathBuf,

        /// AWS region
        #[arg(long = "region", default_value = defaults::REGION)]
        region: String,
    },

    /// Deploy the IAM role stack and publish the role ARN
    #[command(
        long_about = "Finds or creates the GitHub OIDC identity provider, deploys the rendered \
template with the AWS CLI, and reads the RoleArn stack output. With a GitHub token the ARN is \
written to a repository variable in every allowed repository; without one, manual setup \
instructions are printed."
    )]
    Deploy {
        /// GitHub organization
        #[arg(long = "github-org")]
        github_org: Option<String>,

        /// AWS region
        #[arg(long = "region", default_value = defaults::REGION)]
        region: String,

        /// GitHub fine-grained token
        #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// Existing OIDC provider ARN; looked up or created in IAM when omitted
        #[arg(long = "oidc-provider-arn")]
        oidc_provider_arn: Option<String>,

        /// CloudFormation stack name
        #[arg(long = "stack-name", default_value = defaults::STACK_NAME)]
        stack_name: String,

        /// Rendered template to deploy
        #[arg(long = "template-file", default_value = defaults::TEMPLATE_PATH)]
        template_file: PathBuf,

        /// File listing repositories that receive the variable
        #[arg(long = "repos-file", default_value = defaults::REPOS_FILE)]
        repos_file: PathBuf,

        /// Repository variable holding the role ARN
        #[arg(long = "var-name", default_value = defaults::VARIABLE_NAME)]
        var_name: String,
    },

    /// Set a GitHub Actions variable in every allowed repository
    SetVariable {
        /// GitHub organization for entries without an org
        #[arg(long = "github-org")]
        github_org: String,

        /// GitHub personal access token
        #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: String,

        /// Variable name to set
        #[arg(long = "var-name", default_value = defaults::VARIABLE_NAME)]
        var_name: String,

        /// Variable value to set
        #[arg(long = "var-value")]
        var_value: String,

        /// File listing repositories, one per line
        #[arg(long = "repos-file", default_value = defaults::REPOS_FILE)]
        repos_file: PathBuf,
    },
}

/// Level forced onto the logger, if any. `--debug` wins over `RUST_LOG`, which wins
/// over the default of warnings only.
fn log_level_override(debug: bool, rust_log_set: bool) -> Option<log::LevelFilter> {
    if debug {
        Some(log::LevelFilter::Trace)
    } else if rust_log_set {
        None
    } else {
        Some(log::LevelFilter::Warn)
    }
}

/// Initialize logging based on configuration
fn init_logging(debug: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = log_level_override(debug, std::env::var_os("RUST_LOG").is_some()) {
        builder.filter_level(level);
    }

    builder
        .format_target(false)
        .format_timestamp_secs()
        .try_init()
        .context("Failed to initialize logger")?;

    Ok(())
}

/// Handle the generate-trust-policy subcommand
fn handle_generate_trust_policy(
    repos_file: Option<PathBuf>,
    github_org: Option<String>,
    github_repo: Option<String>,
    account_id: Option<String>,
    output: PathBuf,
) -> Result<ExitCode> {
    info!("Running generate-trust-policy command");

    let source = select_subject_source(
        github_org.as_deref(),
        github_repo.as_deref(),
        repos_file.as_deref(),
    );
    debug!("Subject source: {source:?}");

    let policy = generate_trust_policy(
        &source,
        FederatedPrincipal::for_account(account_id.as_deref()),
        &output,
    )?;

    println!(
        "Generated trust policy for {} repos in {}",
        policy.subjects().len(),
        output.display()
    );
    Ok(ExitCode::Success)
}

/// Handle the render-template subcommand
fn handle_render_template(
    config: &RenderConfig,
    github_token: Option<&str>,
    account_id: Option<&str>,
    region: &str,
) -> Result<ExitCode> {
    info!("Running render-template command");

    if github_token.is_none() {
        if let (Some(owner), Some(repo)) = (config.owner.as_deref(), config.repo.as_deref()) {
            debug!("No GitHub token; printing manual setup instructions");
            let role_arn =
                synthesize_role_arn(account_id, owner, repo, config.role_name.as_deref());
            println!("IAM Role ARN: {role_arn}");
            print!(
                "{}",
                manual_instructions(
                    &role_arn,
                    Some(owner),
                    Some(repo),
                    defaults::VARIABLE_NAME,
                    region
                )
            );
            return Ok(ExitCode::Success);
        }
    }

    let outcome = render_iam_template(config)?;
    println!(
        "Rendered IAM role template with {} inline policies to {}",
        outcome.policy_names.len(),
        outcome.output.display()
    );
    Ok(ExitCode::Success)
}

/// Handle the validate-template subcommand
async fn handle_validate_template(stack: StackConfig) -> Result<ExitCode> {
    info!("Running validate-template command");

    let service = BootstrapService::new(stack).await;
    let output = service.validate().await?;
    print!("{}", output.stdout);
    Ok(ExitCode::Success)
}

/// Print one line per repository and return whether all of them succeeded.
fn print_propagation_report(report: &PropagationReport) -> bool {
    for result in &report.results {
        let name = &report.variable;
        let full_name = result.full_name();
        match &result.outcome {
            VariableOutcome::Updated => {
                println!("✅ Updated variable '{name}' for {full_name}.");
            }
            VariableOutcome::Created => {
                println!("✅ Created variable '{name}' for {full_name}.");
            }
            VariableOutcome::Failed {
                operation,
                status,
                message,
            } => {
                let status = status.map_or_else(|| "-".to_string(), |s| s.to_string());
                eprintln!(
                    "❌ Failed to {operation} variable '{name}' for {full_name}: {status} {message}"
                );
            }
        }
    }
    report.all_succeeded()
}

/// Handle the set-variable subcommand
async fn handle_set_variable(
    github_org: &str,
    github_token: &str,
    var_name: &str,
    var_value: &str,
    repos_file: &Path,
) -> Result<ExitCode> {
    info!("Running set-variable command");

    let repos = read_repo_list(repos_file)?;
    let client = GitHubClient::new(&GitHubConfig::new(github_token))?;
    let report = propagate_variable(&client, &repos, github_org, var_name, var_value).await;

    if print_propagation_report(&report) {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::Error)
    }
}

/// Handle the deploy subcommand
async fn handle_deploy(
    stack: StackConfig,
    oidc_provider_arn: Option<String>,
    publish: PublishConfig,
) -> Result<ExitCode> {
    info!("Running deploy command");

    let service = BootstrapService::new(stack).await;
    println!(
        "GitHub Org: {}",
        publish.github_org.as_deref().unwrap_or("-")
    );
    println!("Region: {}", service.stack().region);
    println!(
        "GitHub Token Provided: {}",
        if publish.github.is_some() { "yes" } else { "no" }
    );

    let result = service
        .deploy(&DeployRequest {
            oidc_provider_arn,
            publish,
        })
        .await?;

    println!("OIDC Provider ARN: {}", result.oidc_provider_arn);
    print!("{}", result.output.stdout);
    eprint!("{}", result.output.stderr);

    let Some(role) = result.role else {
        println!("IAM Role ARN not found in stack outputs.");
        return Ok(ExitCode::Success);
    };
    println!("Created/updated IAM Role name: {}", role.name());

    match &role.delivery {
        // The stack is deployed; variable failures are reported but do not fail the run.
        RoleArnDelivery::Propagated(report) => {
            print_propagation_report(report);
        }
        RoleArnDelivery::Manual(instructions) => print!("{instructions}"),
    }

    Ok(ExitCode::Success)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug) {
        eprintln!("gha-oidc-bootstrap: Failed to initialize logging: {e}");
        process::exit(ExitCode::Error.into());
    }

    let result = match cli.command {
        Commands::GenerateTrustPolicy {
            repos_file,
            github_org,
            github_repo,
            account_id,
            output,
        } => handle_generate_trust_policy(repos_file, github_org, github_repo, account_id, output),

        Commands::RenderTemplate {
            template,
            trust_policy,
            policies_dir,
            policy_file,
            output,
            owner,
            repo,
            github_token,
            account_id,
            role_name,
            region,
        } => {
            let config = RenderConfig {
                template,
                trust_policy_path: trust_policy,
                policies_dir,
                custom_policy: policy_file,
                output,
                owner,
                repo,
                role_name,
            };
            handle_render_template(
                &config,
                github_token.as_deref(),
                account_id.as_deref(),
                &region,
            )
        }

        Commands::ValidateTemplate {
            template_file,
            region,
        } => {
            handle_validate_template(StackConfig {
                template_path: template_file,
                region,
                ..StackConfig::default()
            })
            .await
        }

        Commands::Deploy {
            github_org,
            region,
            github_token,
            oidc_provider_arn,
            stack_name,
            template_file,
            repos_file,
            var_name,
        } => {
            let stack = StackConfig {
                stack_name,
                template_path: template_file,
                region,
                ..StackConfig::default()
            };
            let publish = PublishConfig {
                github_org,
                github: github_token.map(GitHubConfig::new),
                repos_file,
                var_name,
            };
            handle_deploy(stack, oidc_provider_arn, publish).await
        }

        Commands::SetVariable {
            github_org,
            github_token,
            var_name,
            var_value,
            repos_file,
        } => {
            handle_set_variable(
                &github_org,
                &github_token,
                &var_name,
                &var_value,
                &repos_file,
            )
            .await
        }
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => report_error(e),
    };

    process::exit(code.into());
}

/// Print an error and pick the exit code for it.
fn report_error(e: anyhow::Error) -> ExitCode {
    let code = match e.downcast_ref::<BootstrapError>() {
        Some(BootstrapError::MissingInput { hint, .. }) => {
            eprintln!("{hint}");
            ExitCode::MissingConfig
        }
        Some(BootstrapError::ExternalCommand {
            code,
            stdout,
            stderr,
            ..
        }) => {
            print!("{stdout}");
            eprint!("{stderr}");
            ExitCode::External(*code)
        }
        _ => ExitCode::Error,
    };
    print_cli_command_error(e);
    code
}

fn print_cli_command_error(e: anyhow::Error) {
    eprintln!("Error: {e}");
    let mut source = e.source();
    while let Some(err) = source {
        eprintln!("  Caused by: {err}");
        source = err.source();
    }
}
