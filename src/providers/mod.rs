//! Remote Service Adapters
//!
//! Trait-based abstractions over the five services a deploy touches:
//! registrar, certificate authority, object storage, CDN and DNS.
//! The reconcilers only ever talk to these traits; `aws` holds the
//! AWS SDK implementations.

pub mod aws;
mod types;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ContactDetails;
use crate::error::ProviderResult;

pub use types::{
    Acl, Availability, CacheBehavior, CertificateState, CertificateSummary, ChangeBatch,
    CustomOrigin, DeploymentStatus, DistributionConfig, DistributionHandle,
    DistributionSummary, HostedZone, HttpMethod, InvalidationHandle, InvalidationStatus,
    ObjectUpload, OperationStatus, RecordSet, RecordSpec, RecordTarget, RedirectProtocol,
    Registration, RegistrationHandle, SslSupportMethod, ValidationRecord, ValidationStatus,
    ViewerCertificate, ViewerProtocol, WebsiteConfig,
};

/// Domain registrar
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Registration of `domain` in this account, if any
    async fn find_registration(&self, domain: &str) -> ProviderResult<Option<Registration>>;

    /// Whether a registration of `domain` was submitted but has not finished
    async fn registration_in_progress(&self, domain: &str) -> ProviderResult<bool>;

    async fn check_availability(&self, domain: &str) -> ProviderResult<Availability>;

    /// Submit a registration; returns without waiting for it to complete
    async fn register(
        &self,
        domain: &str,
        contact: &ContactDetails,
    ) -> ProviderResult<RegistrationHandle>;

    async fn operation_status(&self, handle: &RegistrationHandle) -> ProviderResult<OperationStatus>;
}

/// Certificate authority (certificates that back a CDN)
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>>;

    /// Request a DNS-validated certificate; returns its ARN
    async fn request_certificate(&self, domain: &str, alt_names: &[String]) -> ProviderResult<String>;

    async fn describe_certificate(&self, arn: &str) -> ProviderResult<CertificateState>;
}

/// Object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lightweight existence probe
    async fn head_bucket(&self, name: &str) -> ProviderResult<bool>;

    async fn create_bucket(&self, name: &str, region: &str) -> ProviderResult<()>;

    /// Whether anonymous readers get through: public ACLs are not blocked and
    /// the bucket grants read to everyone
    async fn is_world_readable(&self, name: &str) -> ProviderResult<bool>;

    /// Lift the public-ACL block and apply `acl`; safe to repeat
    async fn make_world_readable(&self, name: &str, acl: Acl) -> ProviderResult<()>;

    async fn get_website_config(&self, name: &str) -> ProviderResult<Option<WebsiteConfig>>;

    async fn put_website_config(&self, name: &str, config: &WebsiteConfig) -> ProviderResult<()>;

    async fn put_object(&self, upload: ObjectUpload) -> ProviderResult<()>;
}

/// Content delivery network
#[async_trait]
pub trait Cdn: Send + Sync {
    async fn list_distributions(&self) -> ProviderResult<Vec<DistributionSummary>>;

    /// Submit a distribution; it starts out InProgress
    async fn create_distribution(&self, config: &DistributionConfig) -> ProviderResult<DistributionHandle>;

    async fn distribution_status(&self, id: &str) -> ProviderResult<DeploymentStatus>;

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
    ) -> ProviderResult<InvalidationHandle>;

    async fn invalidation_status(&self, handle: &InvalidationHandle) -> ProviderResult<InvalidationStatus>;
}

/// Authoritative DNS
#[async_trait]
pub trait DnsService: Send + Sync {
    async fn list_hosted_zones(&self) -> ProviderResult<Vec<HostedZone>>;

    async fn list_record_sets(&self, zone_id: &str) -> ProviderResult<Vec<RecordSet>>;

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> ProviderResult<()>;
}

/// The five services a deploy run works against
#[derive(Clone)]
pub struct CloudServices {
    pub registrar: Arc<dyn Registrar>,
    pub certificates: Arc<dyn CertificateAuthority>,
    pub storage: Arc<dyn ObjectStore>,
    pub cdn: Arc<dyn Cdn>,
    pub dns: Arc<dyn DnsService>,
}
