//! Find-or-create for the GitHub Actions OIDC identity provider.

use async_trait::async_trait;
use log::info;

use super::AwsResult;
use crate::trust_policy::GITHUB_OIDC_HOST;

/// Issuer URL of GitHub Actions ID tokens
pub const GITHUB_OIDC_URL: &str = "https://token.actions.githubusercontent.com";
/// Audience GitHub Actions requests for AWS
pub const STS_CLIENT_ID: &str = "sts.amazonaws.com";
/// Publicly documented certificate thumbprint of the GitHub issuer
pub const GITHUB_OIDC_THUMBPRINT: &str = "6938fd4d98bab03faadb97b34396831e3780aea1";

/// The IAM operations needed to manage OIDC providers.
#[async_trait]
pub trait OidcProviderApi: Send + Sync {
    /// ARNs of every OIDC provider in the account
    async fn list_provider_arns(&self) -> AwsResult<Vec<String>>;

    /// Create a provider and return its ARN
    async fn create_provider(
        &self,
        url: &str,
        client_ids: Vec<String>,
        thumbprints: Vec<String>,
    ) -> AwsResult<String>;
}

/// True for ARNs of the GitHub Actions provider.
pub fn is_github_provider(arn: &str) -> bool {
    arn.ends_with(&format!("oidc-provider/{GITHUB_OIDC_HOST}"))
}

/// Return the ARN of the GitHub Actions provider, creating it when the account has none.
pub async fn get_or_create_oidc_provider(api: &dyn OidcProviderApi) -> AwsResult<String> {
    let existing = api.list_provider_arns().await?;
    if let Some(arn) = existing.into_iter().find(|arn| is_github_provider(arn)) {
        info!("Found existing GitHub OIDC provider {arn}");
        return Ok(arn);
    }

    let arn = api
        .create_provider(
            GITHUB_OIDC_URL,
            vec![STS_CLIENT_ID.to_string()],
            vec![GITHUB_OIDC_THUMBPRINT.to_string()],
        )
        .await?;
    info!("Created GitHub OIDC provider {arn}");
    Ok(arn)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// In-memory provider list that records create calls.
    pub(crate) struct FakeOidcApi {
        pub(crate) existing: Vec<String>,
        pub(crate) created: Mutex<Vec<(String, Vec<String>, Vec<String>)>>,
    }

    impl FakeOidcApi {
        pub(crate) fn with_existing(existing: Vec<&str>) -> Self {
            Self {
                existing: existing.into_iter().map(str::to_string).collect(),
                created: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn create_count(&self) -> usize {
            self.created.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OidcProviderApi for FakeOidcApi {
        async fn list_provider_arns(&self) -> AwsResult<Vec<String>> {
            Ok(self.existing.clone())
        }

        async fn create_provider(
            &self,
            url: &str,
            client_ids: Vec<String>,
            thumbprints: Vec<String>,
        ) -> AwsResult<String> {
            self.created
                .lock()
                .unwrap()
                .push((url.to_string(), client_ids, thumbprints));
            Ok("arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
                .to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeOidcApi;
    use super::*;

    #[tokio::test]
    async fn test_existing_provider_is_returned_without_create() {
        let api = FakeOidcApi::with_existing(vec![
            "arn:aws:iam::111122223333:oidc-provider/accounts.google.com",
            "arn:aws:iam::111122223333:oidc-provider/token.actions.githubusercontent.com",
        ]);

        let arn = get_or_create_oidc_provider(&api).await.unwrap();
        assert_eq!(
            arn,
            "arn:aws:iam::111122223333:oidc-provider/token.actions.githubusercontent.com"
        );
        assert_eq!(api.create_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_provider_is_created_once() {
        let api = FakeOidcApi::with_existing(vec![]);

        let arn = get_or_create_oidc_provider(&api).await.unwrap();
        assert_eq!(
            arn,
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
        );

        let created = api.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let (url, client_ids, thumbprints) = &created[0];
        assert_eq!(url, "https://token.actions.githubusercontent.com");
        assert_eq!(client_ids, &vec!["sts.amazonaws.com".to_string()]);
        assert_eq!(
            thumbprints,
            &vec!["6938fd4d98bab03faadb97b34396831e3780aea1".to_string()]
        );
    }

    #[test]
    fn test_is_github_provider() {
        assert!(is_github_provider(
            "arn:aws:iam::1:oidc-provider/token.actions.githubusercontent.com"
        ));
        assert!(!is_github_provider(
            "arn:aws:iam::1:oidc-provider/gitlab.com"
        ));
    }
}
