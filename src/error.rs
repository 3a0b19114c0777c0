//! Deployment Errors
//!
//! Every way a run can stop, split into fatal outcomes and outcomes that a
//! later re-run converges on.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the remote-service adapters
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource does not exist
    #[error("{service}: {resource} not found")]
    NotFound {
        service: &'static str,
        resource: String,
    },

    /// The service rejected the request as invalid
    #[error("{service} rejected the request as invalid: {message}")]
    InvalidRequest {
        service: &'static str,
        message: String,
    },

    /// Any other failed remote call
    #[error("{service} call failed: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// The service answered without a field the call depends on
    #[error("{service} returned an incomplete response: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },
}

impl ProviderError {
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            message: message.into(),
        }
    }

    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            detail: detail.into(),
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that stop a deploy run
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Registration of {domain} was declined. No infrastructure can be bound to a domain this account does not control.")]
    RegistrationDeclined { domain: String },

    #[error("{domain} is not registered in this account and is not available to register.\n\nOptions:\n  - Transfer the domain to Route 53 from your current registrar\n  - Re-run with --skip-domain and manage registration yourself")]
    DomainUnavailable { domain: String },

    #[error("Registration of {domain} is still in progress. Re-run once the registrar reports it complete.")]
    RegistrationInProgress { domain: String },

    #[error("Registrant contact details are required to register {domain}. Add a `contact` section to scarr.yml.")]
    MissingContact { domain: String },

    #[error("Certificate {arn} failed DNS validation. Delete it in ACM and re-run to request a new one.")]
    CertificateValidationFailed { arn: String },

    #[error("Certificate {arn} still has no DNS validation record after {attempts} checks")]
    MissingValidationRecord { arn: String, attempts: u32 },

    #[error("No hosted zone named {zone_name} exists. Create it in Route 53 (this changes billing) and re-run.")]
    HostedZoneNotFound { zone_name: String },

    #[error("No CloudFront distribution serves origin {origin}. Run deploy without --skip-setup first.")]
    DistributionNotFound { origin: String },

    #[error("Timed out after {waited:?} waiting for {operation}. It is safe to re-run later; finished steps are picked up where they left off.")]
    Timeout { operation: String, waited: Duration },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DeployError {
    /// Whether a later invocation can converge without operator changes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RegistrationInProgress { .. }
        )
    }

    /// Process exit code: 1 for fatal outcomes, 2 for recoverable ones
    pub fn exit_code(&self) -> u8 {
        if self.is_recoverable() {
            2
        } else {
            1
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
