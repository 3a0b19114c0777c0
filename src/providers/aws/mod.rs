//! AWS Adapters
//!
//! SDK-backed implementations of the service traits. Credentials come from
//! the standard provider chain (environment, profile, instance role).
//! Route 53, Route 53 Domains, ACM and CloudFront are pinned to us-east-1;
//! S3 uses the deployment region.

mod cdn;
mod certificates;
mod dns;
mod registrar;
mod storage;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::sync::Arc;
use tracing::info;

use crate::error::ProviderError;
use crate::providers::CloudServices;

pub use cdn::CloudFrontCdn;
pub use certificates::AcmCertificates;
pub use dns::Route53Dns;
pub use registrar::Route53Registrar;
pub use storage::S3Storage;

/// Region for the global services
pub const GLOBAL_REGION: &str = "us-east-1";

/// Error codes meaning the request itself was rejected
const INVALID_REQUEST_CODES: &[&str] = &[
    "InvalidChangeBatch",
    "InvalidInput",
    "InvalidRequest",
    "InvalidArgument",
];

/// Convert an SDK error into a provider error, keeping the full cause chain
pub(crate) fn sdk_error<E, R>(service: &'static str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some(code) if INVALID_REQUEST_CODES.contains(&code) => {
            ProviderError::InvalidRequest { service, message }
        }
        _ => ProviderError::Api { service, message },
    }
}

/// Build errors only happen when a required request field is missing
pub(crate) fn build_error(service: &'static str, err: impl std::fmt::Display) -> ProviderError {
    ProviderError::api(service, format!("invalid request: {}", err))
}

/// Shared SDK configuration for one run
pub struct AwsCloud {
    sdk_config: SdkConfig,
}

impl AwsCloud {
    /// Load credentials and settings from the environment
    pub async fn connect(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        info!(region, "AWS configuration loaded");
        Self { sdk_config }
    }

    pub fn services(&self) -> CloudServices {
        CloudServices {
            registrar: Arc::new(Route53Registrar::new(&self.sdk_config)),
            certificates: Arc::new(AcmCertificates::new(&self.sdk_config)),
            storage: Arc::new(S3Storage::new(&self.sdk_config)),
            cdn: Arc::new(CloudFrontCdn::new(&self.sdk_config)),
            dns: Arc::new(Route53Dns::new(&self.sdk_config)),
        }
    }
}
