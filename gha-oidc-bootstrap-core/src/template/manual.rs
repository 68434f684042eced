//! Manual setup mode: role ARN synthesis and GitHub configuration instructions for
//! users who do not hand the tool a GitHub token.

use crate::config::defaults;

const RULE: &str = "-------------------------------------------------------------";

/// Conventional role name for a repository: `GHA_OIDC_ROLE_<OWNER>_<REPO>_ROLE`.
pub fn default_role_name(owner: &str, repo: &str) -> String {
    format!(
        "GHA_OIDC_ROLE_{}_{}_ROLE",
        owner.to_uppercase(),
        repo.to_uppercase()
    )
}

/// Deterministic role ARN. The account defaults to a placeholder and the role name to
/// [`default_role_name`].
pub fn synthesize_role_arn(
    account_id: Option<&str>,
    owner: &str,
    repo: &str,
    role_name: Option<&str>,
) -> String {
    let account = account_id.unwrap_or(defaults::PLACEHOLDER_ACCOUNT_ID);
    let role = role_name.map_or_else(|| default_role_name(owner, repo), str::to_string);
    format!("arn:aws:iam::{account}:role/{role}")
}

/// Settings page where repository variables are managed.
pub fn variables_settings_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{repo}/settings/variables/actions")
}

/// Step-by-step instructions for wiring `role_arn` into a workflow by hand.
///
/// The direct settings link is only included when both `owner` and `repo` are known.
pub fn manual_instructions(
    role_arn: &str,
    owner: Option<&str>,
    repo: Option<&str>,
    variable_name: &str,
    region: &str,
) -> String {
    let direct_link = match (owner, repo) {
        (Some(owner), Some(repo)) => format!(
            "4. Or use this direct link: {}\n\n",
            variables_settings_url(owner, repo)
        ),
        _ => String::new(),
    };

    format!(
        "\nTo use this role in your GitHub Actions workflow:\n\n\
Option 1: Use a GitHub Actions variable (recommended for teams)\n\
{RULE}\n\
1. Go to your repository on GitHub.\n\
2. Navigate to Settings → Secrets and variables → Actions → Variables.\n\
3. Add a new variable:\n\
\x20  Name: {variable_name}\n\
\x20  Value: {role_arn}\n\n\
{direct_link}\
5. In your workflow YAML, reference the variable:\n\n\
\x20  - uses: aws-actions/configure-aws-credentials@v4\n\
\x20    with:\n\
\x20      role-to-assume: ${{{{ vars.{variable_name} }}}}\n\
\x20      aws-region: {region}\n\n\
Option 2: Reference the IAM Role ARN directly (simple for solo use)\n\
{RULE}\n\
In your workflow YAML, you can also hardcode the ARN directly:\n\
\x20  - uses: aws-actions/configure-aws-credentials@v4\n\
\x20    with:\n\
\x20      role-to-assume: {role_arn}\n\
\x20      aws-region: {region}\n"
    )
}
