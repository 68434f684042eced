//! GitHub Actions repository variables over the GitHub REST API.

pub mod client;
pub mod propagation;

pub use client::{GitHubClient, VariableOutcome};
pub use propagation::{propagate_variable, PropagationReport, RepoOutcome};
