//! Batch propagation of one variable to every repository in an allow-list.

use log::info;

use super::client::{GitHubClient, VariableOutcome};
use crate::repos::RepoRef;

/// Outcome for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub org: String,
    pub repo: String,
    pub outcome: VariableOutcome,
}

impl RepoOutcome {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

/// Per-repository results, in allow-list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub variable: String,
    pub results: Vec<RepoOutcome>,
}

impl PropagationReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }
}

/// Write `name = value` to every repository. Bare entries resolve against
/// `default_org`. A failure on one repository does not stop the others.
pub async fn propagate_variable(
    client: &GitHubClient,
    repos: &[RepoRef],
    default_org: &str,
    name: &str,
    value: &str,
) -> PropagationReport {
    let mut results = Vec::with_capacity(repos.len());
    for entry in repos {
        let (org, repo) = entry.resolve(default_org);
        let outcome = client.set_repo_variable(org, repo, name, value).await;
        results.push(RepoOutcome {
            org: org.to_string(),
            repo: repo.to_string(),
            outcome,
        });
    }

    let report = PropagationReport {
        variable: name.to_string(),
        results,
    };
    info!(
        "Propagated {} to {} repositories ({} failed)",
        name,
        report.results.len(),
        report.failures().count()
    );
    report
}
