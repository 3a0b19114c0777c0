//! CDN Distribution
//!
//! Finds the distribution fronting the bucket's website endpoint, or creates
//! one bound to the certificate and the apex alias, and waits until it is
//! deployed. Also drives cache invalidation after a content sync.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult, ProviderError};
use crate::poller::{poll_until, PollOutcome, PollPolicy, PollResult};
use crate::providers::{
    CacheBehavior, Cdn, CustomOrigin, DeploymentStatus, DistributionConfig, DistributionSummary,
    HttpMethod, InvalidationHandle, InvalidationStatus, SslSupportMethod, ViewerCertificate,
    ViewerProtocol,
};
use crate::reporter::Reporter;

pub const ORIGIN_ID_PREFIX: &str = "S3-";
const DISTRIBUTION_COMMENT: &str = "Created by scarr";
const MINIMUM_TLS_VERSION: &str = "TLSv1.2_2021";
const PRICE_CLASS: &str = "PriceClass_All";

/// Distribution for a website-endpoint origin with a single apex alias
pub fn distribution_config(
    certificate_arn: &str,
    origin_endpoint: &str,
    bucket: &str,
    domain: &str,
    caller_reference: String,
) -> DistributionConfig {
    let origin_id = format!("{}{}", ORIGIN_ID_PREFIX, bucket);

    DistributionConfig {
        caller_reference,
        comment: DISTRIBUTION_COMMENT.to_string(),
        aliases: vec![domain.to_string()],
        origin: CustomOrigin {
            id: origin_id.clone(),
            domain_name: origin_endpoint.to_string(),
            http_port: 80,
            https_port: 443,
            // Website endpoints only speak plain HTTP
            protocol_policy: "http-only".to_string(),
        },
        default_behavior: CacheBehavior {
            target_origin_id: origin_id,
            allowed_methods: vec![HttpMethod::Get, HttpMethod::Head],
            cached_methods: vec![HttpMethod::Get, HttpMethod::Head],
            compress: true,
            forward_cookies: false,
            forward_query_string: false,
            viewer_protocol: ViewerProtocol::RedirectToHttps,
            min_ttl: 0,
        },
        certificate: ViewerCertificate {
            acm_certificate_arn: certificate_arn.to_string(),
            ssl_support_method: SslSupportMethod::SniOnly,
            minimum_protocol_version: MINIMUM_TLS_VERSION.to_string(),
        },
        price_class: PRICE_CLASS.to_string(),
    }
}

fn caller_reference(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_millis())
}

pub struct CdnReconciler {
    cdn: Arc<dyn Cdn>,
    reporter: Reporter,
    deployment_policy: PollPolicy,
    invalidation_policy: PollPolicy,
}

impl CdnReconciler {
    pub fn new(
        cdn: Arc<dyn Cdn>,
        reporter: Reporter,
        deployment_policy: PollPolicy,
        invalidation_policy: PollPolicy,
    ) -> Self {
        Self {
            cdn,
            reporter,
            deployment_policy,
            invalidation_policy,
        }
    }

    /// Distribution whose origins include `origin_endpoint`
    pub async fn find_distribution(&self, origin_endpoint: &str) -> DeployResult<Option<DistributionSummary>> {
        let found = self
            .cdn
            .list_distributions()
            .await?
            .into_iter()
            .find(|d| {
                d.origin_domains
                    .iter()
                    .any(|o| o.eq_ignore_ascii_case(origin_endpoint))
            });
        Ok(found)
    }

    /// Ensure a deployed distribution in front of `origin_endpoint`;
    /// returns the CDN domain name
    pub async fn ensure_distribution(
        &self,
        certificate_arn: &str,
        origin_endpoint: &str,
        bucket: &str,
        domain: &str,
    ) -> DeployResult<String> {
        self.reporter
            .step(format!("Checking CDN distribution for {}", origin_endpoint));

        if let Some(existing) = self.find_distribution(origin_endpoint).await? {
            debug!(id = %existing.id, status = ?existing.status, "Found existing distribution");
            if existing.status == DeploymentStatus::InProgress {
                self.wait_until_deployed(&existing.id).await?;
            }
            self.reporter
                .done(format!("Distribution {} serves {}", existing.id, existing.domain_name));
            return Ok(existing.domain_name);
        }

        let config = distribution_config(
            certificate_arn,
            origin_endpoint,
            bucket,
            domain,
            caller_reference(domain),
        );
        let handle = self.cdn.create_distribution(&config).await?;
        info!(id = %handle.id, domain_name = %handle.domain_name, "Created distribution");

        self.reporter.step(format!(
            "Waiting for distribution {} to deploy (usually 20-40 minutes)",
            handle.id
        ));
        self.wait_until_deployed(&handle.id).await?;

        self.reporter
            .done(format!("Distribution {} serves {}", handle.id, handle.domain_name));
        Ok(handle.domain_name)
    }

    async fn wait_until_deployed(&self, id: &str) -> DeployResult<()> {
        let cdn = &self.cdn;

        let result = poll_until(&self.deployment_policy, || async move {
            let outcome = match cdn.distribution_status(id).await? {
                DeploymentStatus::Deployed => PollOutcome::Ready(()),
                DeploymentStatus::InProgress => PollOutcome::Pending,
            };
            Ok::<_, ProviderError>(outcome)
        })
        .await?;

        match result {
            PollResult::Ready(()) => Ok(()),
            PollResult::Failed(reason) => Err(ProviderError::api("cloudfront", reason).into()),
            PollResult::TimedOut { waited, .. } => Err(DeployError::Timeout {
                operation: format!("deployment of distribution {}", id),
                waited,
            }),
        }
    }

    /// Invalidate `paths` and wait for completion. Nothing is sent for an
    /// empty path list.
    pub async fn invalidate(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> DeployResult<Option<InvalidationHandle>> {
        if paths.is_empty() {
            debug!(distribution_id, "Nothing to invalidate");
            return Ok(None);
        }

        self.reporter.step(format!("Invalidating cache ({} paths)", paths.len()));
        let handle = self.cdn.create_invalidation(distribution_id, paths).await?;
        info!(distribution_id, invalidation_id = %handle.id, "Created invalidation");

        let cdn = &self.cdn;
        let pending = &handle;
        let result = poll_until(&self.invalidation_policy, || async move {
            let outcome = match cdn.invalidation_status(pending).await? {
                InvalidationStatus::Completed => PollOutcome::Ready(()),
                InvalidationStatus::InProgress => PollOutcome::Pending,
            };
            Ok::<_, ProviderError>(outcome)
        })
        .await?;

        match result {
            PollResult::Ready(()) => {
                self.reporter.done("Cache invalidated");
                Ok(Some(handle))
            }
            PollResult::Failed(reason) => Err(ProviderError::api("cloudfront", reason).into()),
            PollResult::TimedOut { waited, .. } => Err(DeployError::Timeout {
                operation: format!("invalidation {}", handle.id),
                waited,
            }),
        }
    }
}
