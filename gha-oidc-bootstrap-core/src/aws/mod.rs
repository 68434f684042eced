//! AWS integration: AWS CLI invocation, CloudFormation stack operations, and the
//! GitHub OIDC identity provider in IAM.

pub mod cli;
pub mod iam_client;
pub mod oidc_provider;
pub mod stack;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("IAM client error: {0}")]
    IamError(String),
    #[error("CloudFormation error: {0}")]
    StackError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;
