use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_acm::types::{CertificateDetail, CertificateStatus, ValidationMethod};
use aws_sdk_acm::Client;

use super::{sdk_error, GLOBAL_REGION};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{
    CertificateAuthority, CertificateState, CertificateSummary, ValidationRecord, ValidationStatus,
};

const SERVICE: &str = "acm";

/// ACM certificates, always in us-east-1 so CloudFront can use them
pub struct AcmCertificates {
    client: Client,
}

impl AcmCertificates {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_acm::config::Builder::from(sdk_config)
            .region(Region::new(GLOBAL_REGION))
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

/// INACTIVE, EXPIRED, REVOKED, FAILED and VALIDATION_TIMED_OUT all leave
/// CloudFront without a usable certificate
fn validation_status(status: &CertificateStatus) -> ValidationStatus {
    match status.as_str() {
        "ISSUED" => ValidationStatus::Issued,
        "PENDING_VALIDATION" => ValidationStatus::PendingValidation,
        _ => ValidationStatus::Failed,
    }
}

fn certificate_state(arn: &str, detail: &CertificateDetail) -> CertificateState {
    let validation = detail.domain_validation_options().first();
    let validation_record = validation.and_then(|v| v.resource_record()).map(|r| ValidationRecord {
        name: r.name().to_string(),
        record_type: r.r#type().as_str().to_string(),
        value: r.value().to_string(),
    });

    let validation_status = match (validation, detail.status()) {
        (None, _) | (_, None) => ValidationStatus::Pending,
        (_, Some(status)) => validation_status(status),
    };

    CertificateState {
        arn: arn.to_string(),
        validation_status,
        validation_record,
    }
}

#[async_trait]
impl CertificateAuthority for AcmCertificates {
    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>> {
        let mut certificates = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_certificates()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;

            certificates.extend(page.certificate_summary_list().iter().filter_map(|c| {
                Some(CertificateSummary {
                    domain: c.domain_name()?.to_string(),
                    arn: c.certificate_arn()?.to_string(),
                    status: c.status().map(validation_status),
                })
            }));

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => return Ok(certificates),
            }
        }
    }

    async fn request_certificate(&self, domain: &str, alt_names: &[String]) -> ProviderResult<String> {
        let result = self
            .client
            .request_certificate()
            .domain_name(domain)
            .set_subject_alternative_names(Some(alt_names.to_vec()))
            .validation_method(ValidationMethod::Dns)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        result
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::malformed(SERVICE, "RequestCertificate returned no ARN"))
    }

    async fn describe_certificate(&self, arn: &str) -> ProviderResult<CertificateState> {
        let result = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let detail = result.certificate().ok_or_else(|| ProviderError::NotFound {
            service: SERVICE,
            resource: arn.to_string(),
        })?;

        Ok(certificate_state(arn, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unusable_statuses_map_to_failed() {
        assert_eq!(validation_status(&CertificateStatus::Issued), ValidationStatus::Issued);
        assert_eq!(
            validation_status(&CertificateStatus::PendingValidation),
            ValidationStatus::PendingValidation
        );
        for status in [
            CertificateStatus::Expired,
            CertificateStatus::Inactive,
            CertificateStatus::Revoked,
            CertificateStatus::ValidationTimedOut,
        ] {
            assert_eq!(validation_status(&status), ValidationStatus::Failed);
        }
    }
}
