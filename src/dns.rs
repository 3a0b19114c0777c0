//! DNS Record Resolver
//!
//! Finds the hosted zone for the deployment domain (once per run) and
//! answers "does this record already exist?" for certificate validation
//! records and the apex alias.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};
use crate::providers::{ChangeBatch, DnsService, RecordSpec};

/// A resolved hosted zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZoneHandle {
    pub zone_id: String,
    pub zone_name: String,
}

/// Absolute form of a DNS name: lowercase with exactly one trailing dot
pub fn fqdn(name: &str) -> String {
    format!("{}.", name.trim().trim_end_matches('.').to_ascii_lowercase())
}

/// Resolves and caches the hosted zone of one domain
pub struct DnsResolver {
    dns: Arc<dyn DnsService>,
    domain: String,
    zone: OnceCell<HostedZoneHandle>,
}

impl DnsResolver {
    pub fn new(dns: Arc<dyn DnsService>, domain: &str) -> Self {
        Self {
            dns,
            domain: domain.to_string(),
            zone: OnceCell::new(),
        }
    }

    /// Hosted zone whose name is exactly the domain. Never creates one.
    pub async fn hosted_zone(&self) -> DeployResult<&HostedZoneHandle> {
        self.zone.get_or_try_init(|| self.lookup_zone()).await
    }

    async fn lookup_zone(&self) -> DeployResult<HostedZoneHandle> {
        let wanted = fqdn(&self.domain);
        let zones = self.dns.list_hosted_zones().await?;

        let zone = zones
            .into_iter()
            .find(|z| fqdn(&z.name) == wanted)
            .ok_or(DeployError::HostedZoneNotFound { zone_name: wanted })?;

        info!(zone_id = %zone.id, zone = %zone.name, "Resolved hosted zone");
        Ok(HostedZoneHandle {
            zone_id: zone.id,
            zone_name: zone.name,
        })
    }

    /// Whether a record with this name and type exists in the zone
    pub async fn record_exists(&self, name: &str, record_type: &str) -> DeployResult<bool> {
        let zone = self.hosted_zone().await?;
        let wanted = fqdn(name);

        let exists = self
            .dns
            .list_record_sets(&zone.zone_id)
            .await?
            .iter()
            .any(|r| fqdn(&r.name) == wanted && r.record_type.eq_ignore_ascii_case(record_type));

        debug!(name = %wanted, record_type, exists, "Checked record");
        Ok(exists)
    }

    /// Create one record in a single-change batch
    pub async fn create_record(&self, comment: &str, record: RecordSpec) -> DeployResult<()> {
        let zone = self.hosted_zone().await?;
        let batch = ChangeBatch {
            comment: comment.to_string(),
            create: record,
        };

        self.dns.change_record_sets(&zone.zone_id, &batch).await?;
        info!(name = %batch.create.name, record_type = %batch.create.record_type, "Created DNS record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::RecordTarget;
    use crate::testing::FakeCloud;

    #[test]
    fn test_fqdn_normalization() {
        assert_eq!(fqdn("Example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        assert_eq!(fqdn(" _abc.example.com.. "), "_abc.example.com.");
    }

    #[tokio::test]
    async fn test_resolves_exact_zone_once() {
        let cloud = FakeCloud::new();
        cloud.add_zone("Z1", "sub.example.com.");
        cloud.add_zone("Z2", "example.com.");

        let resolver = DnsResolver::new(cloud.dns(), "example.com");
        let zone = resolver.hosted_zone().await.unwrap();
        assert_eq!(zone.zone_id, "Z2");

        resolver.hosted_zone().await.unwrap();
        assert_eq!(cloud.count_calls("dns.list_hosted_zones"), 1);
    }

    #[tokio::test]
    async fn test_missing_zone_is_fatal() {
        let cloud = FakeCloud::new();
        cloud.add_zone("Z1", "other.com.");

        let resolver = DnsResolver::new(cloud.dns(), "example.com");
        let err = resolver.hosted_zone().await.unwrap_err();

        assert!(matches!(err, DeployError::HostedZoneNotFound { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_record_exists_ignores_trailing_dot_and_case() {
        let cloud = FakeCloud::new();
        cloud.add_zone("Z1", "example.com.");
        cloud.add_record("Z1", "_ABC.example.com.", "CNAME");

        let resolver = DnsResolver::new(cloud.dns(), "example.com");
        assert!(resolver.record_exists("_abc.example.com", "cname").await.unwrap());
        assert!(!resolver.record_exists("_abc.example.com", "TXT").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_record_sends_single_change() {
        let cloud = FakeCloud::new();
        cloud.add_zone("Z1", "example.com.");

        let resolver = DnsResolver::new(cloud.dns(), "example.com");
        resolver
            .create_record(
                "test",
                RecordSpec {
                    name: "www.example.com.".to_string(),
                    record_type: "CNAME".to_string(),
                    target: RecordTarget::Values {
                        values: vec!["example.com".to_string()],
                        ttl: 300,
                    },
                },
            )
            .await
            .unwrap();

        let created = cloud.created_records();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "Z1");
        assert!(resolver.record_exists("www.example.com", "CNAME").await.unwrap());
    }
}
