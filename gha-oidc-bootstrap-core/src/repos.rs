//! Allowed-repository list parsing.

use std::fmt;
use std::path::Path;

use log::debug;

use crate::error::{BootstrapError, BootstrapResult};

/// A GitHub repository entry from an allow-list, usually `org/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    /// Organization, if the entry carried one
    pub org: Option<String>,
    pub repo: String,
}

impl RepoRef {
    /// Split an entry on its first `/`. Entries without a slash keep only the repo part.
    pub fn parse(entry: &str) -> Self {
        match entry.split_once('/') {
            Some((org, repo)) => Self {
                org: Some(org.to_string()),
                repo: repo.to_string(),
            },
            None => Self {
                org: None,
                repo: entry.to_string(),
            },
        }
    }

    /// Resolve to `(org, repo)`, falling back to `default_org` for bare entries.
    pub fn resolve<'a>(&'a self, default_org: &'a str) -> (&'a str, &'a str) {
        (self.org.as_deref().unwrap_or(default_org), &self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.org {
            Some(org) => write!(f, "{}/{}", org, self.repo),
            None => write!(f, "{}", self.repo),
        }
    }
}

/// Parse allow-list text. Blank lines and `#` comments are skipped; order is kept.
pub fn parse_repo_list(text: &str) -> Vec<RepoRef> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(RepoRef::parse)
        .collect()
}

/// First qualified entry belonging to `org`.
pub fn first_repo_in_org<'a>(repos: &'a [RepoRef], org: &str) -> Option<&'a str> {
    repos
        .iter()
        .find(|r| r.org.as_deref() == Some(org))
        .map(|r| r.repo.as_str())
}

/// Read an allow-list file.
///
/// A missing file is reported as [`BootstrapError::MissingInput`] with guidance on
/// how to create it.
pub fn read_repo_list(path: &Path) -> BootstrapResult<Vec<RepoRef>> {
    if !path.exists() {
        return Err(BootstrapError::missing_input(path, missing_list_hint(path)));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| BootstrapError::file_system("read repository list", path, e))?;
    let repos = parse_repo_list(&text);
    debug!("Read {} repositories from {}", repos.len(), path.display());
    Ok(repos)
}

fn missing_list_hint(path: &Path) -> String {
    let shown = path.display();
    format!(
        "The repository list file '{shown}' was not found.\n\
Please create this file in your project root and list each allowed repository \
(in 'org/repo' format) on a separate line.\n\
You can use '{shown}.example' as a template.\n\
\n\
Example entries:\n  \
octo-org/deploy-scripts\n  \
octo-org/web-frontend"
    )
}
