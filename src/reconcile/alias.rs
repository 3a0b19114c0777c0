//! Apex Alias
//!
//! Points the apex of the domain at the CDN with an alias A record.

use std::sync::Arc;
use tracing::{debug, info};

use crate::dns::{fqdn, DnsResolver};
use crate::error::DeployResult;
use crate::providers::{RecordSpec, RecordTarget};
use crate::reporter::Reporter;

/// Hosted zone id every CloudFront alias target lives in
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

const ALIAS_COMMENT: &str = "CloudFront alias";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    Created,
    AlreadyPresent,
}

pub struct AliasReconciler {
    dns: Arc<DnsResolver>,
    reporter: Reporter,
}

impl AliasReconciler {
    pub fn new(dns: Arc<DnsResolver>, reporter: Reporter) -> Self {
        Self { dns, reporter }
    }

    /// Ensure an A record for the apex of `domain`. An existing one is left
    /// as it is, whatever it points at.
    pub async fn ensure_apex_alias(&self, domain: &str, cdn_domain: &str) -> DeployResult<AliasOutcome> {
        let apex = fqdn(domain);
        self.reporter.step(format!("Checking DNS alias for {}", domain));

        if self.dns.record_exists(&apex, "A").await? {
            debug!(name = %apex, "Apex A record already present");
            self.reporter.done(format!("{} already has an A record", domain));
            return Ok(AliasOutcome::AlreadyPresent);
        }

        let record = RecordSpec {
            name: apex,
            record_type: "A".to_string(),
            target: RecordTarget::Alias {
                hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.to_string(),
                dns_name: cdn_domain.to_string(),
                evaluate_target_health: false,
            },
        };
        self.dns.create_record(ALIAS_COMMENT, record).await?;

        info!(domain, cdn_domain, "Created apex alias");
        self.reporter.done(format!("{} now points at {}", domain, cdn_domain));
        Ok(AliasOutcome::Created)
    }
}
