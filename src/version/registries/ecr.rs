//! AWS ECR credential exchange

#[cfg(test)]
use mockall::automock;

use aws_config::BehaviorVersion;
use aws_sdk_ecr::config::Region;
use aws_sdk_ecr::error::DisplayErrorContext;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::version::error::RegistryError;
use crate::version::registries::auth::BasicCredentials;

/// Region used when neither the registry nor `AWS_REGION` names one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Trait for exchanging cloud credentials for registry credentials
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait EcrAuthorizer: Send + Sync {
    /// Obtain basic credentials for the ECR registries of a region
    async fn authorize(&self, region: &str) -> Result<BasicCredentials, RegistryError>;
}

/// Authorizer backed by the AWS SDK default credential chain
#[derive(Debug, Default)]
pub struct AwsEcrAuthorizer;

impl AwsEcrAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EcrAuthorizer for AwsEcrAuthorizer {
    async fn authorize(&self, region: &str) -> Result<BasicCredentials, RegistryError> {
        debug!("Fetching ECR authorization token in region {}", region);

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = aws_sdk_ecr::Client::new(&sdk_config);

        let output = client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| {
                RegistryError::Auth(format!(
                    "ECR authorization in region {} failed: {}",
                    region,
                    DisplayErrorContext(&e)
                ))
            })?;

        let token = output
            .authorization_data()
            .iter()
            .find_map(|data| data.authorization_token())
            .ok_or_else(|| {
                RegistryError::Auth(format!("ECR returned no authorization data in {}", region))
            })?;

        decode_authorization_token(token)
    }
}

/// Decode an ECR authorization token (`base64("AWS:<password>")`)
pub fn decode_authorization_token(token: &str) -> Result<BasicCredentials, RegistryError> {
    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|e| RegistryError::Auth(format!("invalid ECR token: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| RegistryError::Auth(format!("invalid ECR token: {}", e)))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| RegistryError::Auth("invalid ECR token: missing separator".to_string()))?;
    Ok(BasicCredentials::new(username, password))
}

/// Pick the region for an ECR registry: configured, then `AWS_REGION`, then the default
pub fn resolve_region(configured: Option<&str>, env_region: Option<String>) -> String {
    configured
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .or_else(|| env_region.filter(|r| !r.is_empty()))
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn decode_authorization_token_splits_user_and_password() {
        let token = STANDARD.encode("AWS:eyJwYXlsb2FkIjoi");

        let credentials = decode_authorization_token(&token).unwrap();

        assert_eq!(credentials, BasicCredentials::new("AWS", "eyJwYXlsb2FkIjoi"));
    }

    #[rstest]
    #[case("not base64!")]
    #[case("QVdT")] // "AWS" without separator
    fn decode_authorization_token_rejects_malformed_tokens(#[case] token: &str) {
        assert!(matches!(
            decode_authorization_token(token),
            Err(RegistryError::Auth(_))
        ));
    }

    #[rstest]
    #[case(Some("eu-west-1"), Some("us-west-2"), "eu-west-1")]
    #[case(None, Some("us-west-2"), "us-west-2")]
    #[case(Some(""), None, DEFAULT_AWS_REGION)]
    #[case(None, None, DEFAULT_AWS_REGION)]
    fn resolve_region_prefers_configured_then_env(
        #[case] configured: Option<&str>,
        #[case] env_region: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            resolve_region(configured, env_region.map(|s| s.to_string())),
            expected
        );
    }
}
