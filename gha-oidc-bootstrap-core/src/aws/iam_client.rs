//! AWS IAM client wrapper for OIDC provider operations

use async_trait::async_trait;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::Client as IamClient;

use super::oidc_provider::OidcProviderApi;
use super::{AwsError, AwsResult};

pub struct AwsIamClient {
    client: IamClient,
}

impl AwsIamClient {
    pub fn new(client: IamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OidcProviderApi for AwsIamClient {
    async fn list_provider_arns(&self) -> AwsResult<Vec<String>> {
        let response = self
            .client
            .list_open_id_connect_providers()
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!(
                    "Failed to list OIDC providers: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(response
            .open_id_connect_provider_list()
            .iter()
            .filter_map(|entry| entry.arn().map(str::to_string))
            .collect())
    }

    async fn create_provider(
        &self,
        url: &str,
        client_ids: Vec<String>,
        thumbprints: Vec<String>,
    ) -> AwsResult<String> {
        let response = self
            .client
            .create_open_id_connect_provider()
            .url(url)
            .set_client_id_list(Some(client_ids))
            .set_thumbprint_list(Some(thumbprints))
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!(
                    "Failed to create OIDC provider '{url}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        response
            .open_id_connect_provider_arn()
            .map(str::to_string)
            .ok_or_else(|| {
                AwsError::IamError("CreateOpenIDConnectProvider returned no ARN".to_string())
            })
    }
}
