//! GitHub OIDC trust policy generation.
//!
//! Builds the `AssumeRolePolicyDocument` that lets GitHub Actions workflows of the
//! allowed repositories assume the role through `sts:AssumeRoleWithWebIdentity`.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::{BootstrapError, BootstrapResult};
use crate::repos::{read_repo_list, RepoRef};

/// Host of the GitHub Actions token issuer
pub const GITHUB_OIDC_HOST: &str = "token.actions.githubusercontent.com";
/// Condition key matched against the workflow's `sub` claim
pub const SUBJECT_CONDITION_KEY: &str = "token.actions.githubusercontent.com:sub";
/// Stack parameter carrying the OIDC provider ARN
pub const OIDC_PROVIDER_PARAMETER: &str = "OIDCProviderArn";

const POLICY_VERSION: &str = "2012-10-17";
const ASSUME_ROLE_ACTION: &str = "sts:AssumeRoleWithWebIdentity";

/// Where the list of allowed subjects comes from, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSource {
    /// A single `org/repo` given on the command line
    SinglePair { org: String, repo: String },
    /// An explicitly named allow-list file
    ListFile(PathBuf),
    /// The conventional allow-list in the working directory
    DefaultFile(PathBuf),
}

/// Pick the subject source: an org/repo pair wins over a list file, which wins over
/// the default file. A lone org or repo without its partner is ignored.
pub fn select_subject_source(
    org: Option<&str>,
    repo: Option<&str>,
    repos_file: Option<&Path>,
) -> SubjectSource {
    match (org, repo, repos_file) {
        (Some(org), Some(repo), _) => SubjectSource::SinglePair {
            org: org.to_string(),
            repo: repo.to_string(),
        },
        (_, _, Some(path)) => SubjectSource::ListFile(path.to_path_buf()),
        _ => SubjectSource::DefaultFile(PathBuf::from(defaults::REPOS_FILE)),
    }
}

/// Subject claim pattern allowing every branch of a repository.
pub fn subject_for(repo: &RepoRef) -> String {
    format!("repo:{repo}:ref:refs/heads/*")
}

/// Resolve a source into subject strings, one per repository in input order.
pub fn subjects_for(source: &SubjectSource) -> BootstrapResult<Vec<String>> {
    match source {
        SubjectSource::SinglePair { org, repo } => Ok(vec![subject_for(&RepoRef {
            org: Some(org.clone()),
            repo: repo.clone(),
        })]),
        SubjectSource::ListFile(path) | SubjectSource::DefaultFile(path) => {
            let repos = read_repo_list(path)?;
            Ok(repos.iter().map(subject_for).collect())
        }
    }
}

/// Value of `Principal.Federated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FederatedPrincipal {
    /// Literal OIDC provider ARN
    Arn(String),
    /// CloudFormation reference to a template parameter
    Reference {
        #[serde(rename = "Ref")]
        reference: String,
    },
}

impl FederatedPrincipal {
    /// Literal provider ARN when the account is known, otherwise a reference to the
    /// `OIDCProviderArn` stack parameter.
    pub fn for_account(account_id: Option<&str>) -> Self {
        match account_id {
            Some(account) => Self::Arn(format!(
                "arn:aws:iam::{account}:oidc-provider/{GITHUB_OIDC_HOST}"
            )),
            None => Self::Reference {
                reference: OIDC_PROVIDER_PARAMETER.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    pub version: String,
    pub statement: Vec<TrustStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustStatement {
    pub effect: String,
    pub principal: Principal,
    pub action: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub federated: FederatedPrincipal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    pub string_like: SubjectCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectCondition {
    #[serde(rename = "token.actions.githubusercontent.com:sub")]
    pub subjects: Vec<String>,
}

impl TrustPolicy {
    /// Single-statement trust policy restricted to `subjects`.
    pub fn for_subjects(subjects: Vec<String>, federated: FederatedPrincipal) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![TrustStatement {
                effect: "Allow".to_string(),
                principal: Principal { federated },
                action: ASSUME_ROLE_ACTION.to_string(),
                condition: Condition {
                    string_like: SubjectCondition { subjects },
                },
            }],
        }
    }

    /// Subjects of the first statement
    pub fn subjects(&self) -> &[String] {
        self.statement
            .first()
            .map(|s| s.condition.string_like.subjects.as_slice())
            .unwrap_or_default()
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_json(&self) -> BootstrapResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BootstrapError::configuration(format!("Failed to serialize trust policy: {e}")))
    }
}

/// Write the trust policy to `output`. Parent directories are not created.
pub fn write_trust_policy(policy: &TrustPolicy, output: &Path) -> BootstrapResult<()> {
    let json = policy.to_json()?;
    std::fs::write(output, json)
        .map_err(|e| BootstrapError::file_system("write trust policy", output, e))?;
    debug!("Wrote trust policy to {}", output.display());
    Ok(())
}

/// Build the trust policy for `source` and write it to `output`.
pub fn generate_trust_policy(
    source: &SubjectSource,
    federated: FederatedPrincipal,
    output: &Path,
) -> BootstrapResult<TrustPolicy> {
    let subjects = subjects_for(source)?;
    info!("Generating trust policy for {} subjects", subjects.len());
    let policy = TrustPolicy::for_subjects(subjects, federated);
    write_trust_policy(&policy, output)?;
    Ok(policy)
}
