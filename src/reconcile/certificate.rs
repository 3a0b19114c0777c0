//! TLS Certificate
//!
//! Finds or requests the DNS-validated certificate for the domain (plus its
//! wildcard), publishes the validation record and waits for issuance.
//! CloudFront only accepts certificates from us-east-1, so the
//! certificate authority is always bound to that region.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dns::DnsResolver;
use crate::error::{DeployError, DeployResult, ProviderError};
use crate::poller::{poll_until, PollOutcome, PollPolicy, PollResult};
use crate::providers::{
    CertificateAuthority, CertificateState, RecordSpec, RecordTarget, ValidationRecord,
    ValidationStatus,
};
use crate::reporter::Reporter;

pub const CERTIFICATE_REGION: &str = "us-east-1";

const VALIDATION_COMMENT: &str = "ACM Validation Records";
const VALIDATION_RECORD_TTL: i64 = 300;

pub struct CertificateReconciler {
    certificates: Arc<dyn CertificateAuthority>,
    dns: Arc<DnsResolver>,
    reporter: Reporter,
    descriptor_policy: PollPolicy,
    validation_policy: PollPolicy,
}

impl CertificateReconciler {
    pub fn new(
        certificates: Arc<dyn CertificateAuthority>,
        dns: Arc<DnsResolver>,
        reporter: Reporter,
        descriptor_policy: PollPolicy,
        validation_policy: PollPolicy,
    ) -> Self {
        Self {
            certificates,
            dns,
            reporter,
            descriptor_policy,
            validation_policy,
        }
    }

    /// ARN of an issued certificate for `domain`
    pub async fn ensure_certificate(&self, domain: &str) -> DeployResult<String> {
        self.reporter.step(format!("Checking certificate for {}", domain));

        let arn = match self.find_certificate(domain).await? {
            Some(arn) => {
                debug!(%arn, "Found existing certificate");
                arn
            }
            None => {
                let alt_names = vec![format!("*.{}", domain)];
                let arn = self
                    .certificates
                    .request_certificate(domain, &alt_names)
                    .await?;
                info!(%arn, domain, "Requested certificate");
                arn
            }
        };

        let state = self.wait_for_descriptor(&arn).await?;

        let state = match state.validation_status {
            ValidationStatus::PendingValidation => {
                if let Some(record) = &state.validation_record {
                    self.ensure_validation_record(record).await?;
                }
                self.wait_for_validation(domain, &arn).await?;
                self.certificates.describe_certificate(&arn).await?
            }
            _ => state,
        };

        match state.validation_status {
            ValidationStatus::Failed => Err(DeployError::CertificateValidationFailed { arn }),
            _ => {
                self.reporter.done(format!("Certificate for {} is issued", domain));
                Ok(arn)
            }
        }
    }

    /// Best certificate for `domain`: issued, then pending, then unknown.
    /// A failed one is only returned when nothing else matches.
    async fn find_certificate(&self, domain: &str) -> DeployResult<Option<String>> {
        let found = self
            .certificates
            .list_certificates()
            .await?
            .into_iter()
            .filter(|c| c.domain.eq_ignore_ascii_case(domain))
            .min_by_key(|c| match c.status {
                Some(ValidationStatus::Issued) => 0,
                Some(ValidationStatus::PendingValidation) | Some(ValidationStatus::Pending) => 1,
                None => 2,
                Some(ValidationStatus::Failed) => 3,
            })
            .map(|c| c.arn);
        Ok(found)
    }

    /// The CA fills in status and validation record shortly after a request
    async fn wait_for_descriptor(&self, arn: &str) -> DeployResult<CertificateState> {
        let certificates = &self.certificates;

        let result = poll_until(&self.descriptor_policy, || async move {
            let state = certificates.describe_certificate(arn).await?;
            let outcome = if state.descriptor_ready() {
                PollOutcome::Ready(state)
            } else {
                PollOutcome::Pending
            };
            Ok::<_, ProviderError>(outcome)
        })
        .await?;

        match result {
            PollResult::Ready(state) => Ok(state),
            PollResult::Failed(_) | PollResult::TimedOut { .. } => {
                Err(DeployError::MissingValidationRecord {
                    arn: arn.to_string(),
                    attempts: self.descriptor_policy.max_attempts,
                })
            }
        }
    }

    /// Create the validation record unless the zone already has it
    async fn ensure_validation_record(&self, record: &ValidationRecord) -> DeployResult<()> {
        if self.dns.record_exists(&record.name, &record.record_type).await? {
            debug!(name = %record.name, "Validation record already present");
            return Ok(());
        }

        let spec = RecordSpec {
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            target: RecordTarget::Values {
                values: vec![record.value.clone()],
                ttl: VALIDATION_RECORD_TTL,
            },
        };

        match self.dns.create_record(VALIDATION_COMMENT, spec).await {
            Ok(()) => Ok(()),
            // Usually a concurrent or earlier creation of the same record
            Err(DeployError::Provider(e)) if e.is_invalid_request() => {
                warn!(name = %record.name, error = %e, "Ignoring rejected validation record");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_validation(&self, domain: &str, arn: &str) -> DeployResult<()> {
        self.reporter.step(format!(
            "Waiting for certificate validation of {} (this can take a while)",
            domain
        ));
        let certificates = &self.certificates;

        let result = poll_until(&self.validation_policy, || async move {
            let state = certificates.describe_certificate(arn).await?;
            let outcome = match state.validation_status {
                ValidationStatus::Pending | ValidationStatus::PendingValidation => PollOutcome::Pending,
                _ => PollOutcome::Ready(()),
            };
            Ok::<_, ProviderError>(outcome)
        })
        .await?;

        match result {
            PollResult::Ready(()) => Ok(()),
            PollResult::Failed(_) => Err(DeployError::CertificateValidationFailed {
                arn: arn.to_string(),
            }),
            PollResult::TimedOut { waited, .. } => Err(DeployError::Timeout {
                operation: format!("certificate validation of {}", domain),
                waited,
            }),
        }
    }
}
