//! GitHub REST client for Actions repository variables.
//!
//! Variables are written with update-or-create semantics: a PATCH on the named
//! variable, and a POST to the collection only when the PATCH reports 404.

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::GitHubConfig;
use crate::error::{BootstrapError, BootstrapResult};

const USER_AGENT: &str = concat!("gha-oidc-bootstrap/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Serialize)]
struct UpdateVariableRequest<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateVariableRequest<'a> {
    name: &'a str,
    value: &'a str,
}

/// Result of writing one repository variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableOutcome {
    /// The variable existed and was updated
    Updated,
    /// The variable did not exist and was created
    Created,
    /// The write failed; `status` is `None` when no HTTP response was received
    Failed {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },
}

impl VariableOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Client for the GitHub Actions variables API
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    /// Build a client that authenticates every request with `config.token`.
    pub fn new(config: &GitHubConfig) -> BootstrapResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| BootstrapError::github(format!("Invalid GitHub token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| BootstrapError::github(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn variables_url(&self, org: &str, repo: &str) -> String {
        format!("{}/repos/{org}/{repo}/actions/variables", self.api_url)
    }

    /// Set `name` to `value` on `org/repo`, creating the variable if needed.
    pub async fn set_repo_variable(
        &self,
        org: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> VariableOutcome {
        let collection = self.variables_url(org, repo);

        let update = self
            .client
            .patch(format!("{collection}/{name}"))
            .json(&UpdateVariableRequest { value })
            .send()
            .await;
        let response = match update {
            Ok(response) => response,
            Err(e) => return failed("update", None, e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            debug!("Updated variable {name} for {org}/{repo}");
            return VariableOutcome::Updated;
        }
        if status != StatusCode::NOT_FOUND {
            return failed("update", Some(status), body_text(response).await);
        }

        debug!("Variable {name} not found on {org}/{repo}, creating it");
        let create = self
            .client
            .post(&collection)
            .json(&CreateVariableRequest { name, value })
            .send()
            .await;
        match create {
            Ok(response) if response.status().is_success() => VariableOutcome::Created,
            Ok(response) => {
                let status = response.status();
                failed("create", Some(status), body_text(response).await)
            }
            Err(e) => failed("create", None, e.to_string()),
        }
    }
}

async fn body_text(response: reqwest::Response) -> String {
    describe_body(response.text().await)
}

fn describe_body(body: reqwest::Result<String>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => format!("failed to read response body: {e}"),
    }
}

fn failed(operation: &'static str, status: Option<StatusCode>, message: String) -> VariableOutcome {
    warn!(
        "Variable {operation} failed with status {}: {message}",
        status.map_or_else(|| "none".to_string(), |s| s.as_u16().to_string())
    );
    VariableOutcome::Failed {
        operation,
        status: status.map(|s| s.as_u16()),
        message,
    }
}
