//! In-memory cloud for tests
//!
//! Implements all five service traits over shared state and journals every
//! call, so tests can assert on ordering and on duplicate creations.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ContactDetails;
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{
    Acl, Availability, CertificateAuthority, CertificateState, CertificateSummary, Cdn,
    ChangeBatch, CloudServices, DeploymentStatus, DistributionConfig, DistributionHandle,
    DistributionSummary, DnsService, HostedZone, InvalidationHandle, InvalidationStatus,
    ObjectStore, ObjectUpload, OperationStatus, RecordSet, RecordSpec, Registrar, Registration,
    RegistrationHandle, ValidationRecord, ValidationStatus, WebsiteConfig,
};

pub const TEST_ACCOUNT_ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate";

#[derive(Default)]
struct CloudState {
    calls: Vec<String>,

    registrations: HashSet<String>,
    registrations_in_progress: HashSet<String>,
    availability: HashMap<String, VecDeque<Availability>>,
    registered: Vec<String>,

    certificates: Vec<CertificateSummary>,
    certificate_states: HashMap<String, VecDeque<CertificateState>>,
    requested_states: VecDeque<Vec<CertificateState>>,

    buckets: HashSet<String>,
    websites: HashMap<String, WebsiteConfig>,
    world_readable: HashSet<String>,
    deny_public_access: bool,
    created_buckets: Vec<(String, String)>,
    objects: Vec<(String, String, String)>,

    distributions: Vec<DistributionSummary>,
    deployment_statuses: HashMap<String, VecDeque<DeploymentStatus>>,
    created_distributions: Vec<DistributionConfig>,
    invalidations: Vec<(String, Vec<String>)>,
    invalidation_statuses: VecDeque<InvalidationStatus>,

    zones: Vec<HostedZone>,
    records: HashMap<String, Vec<RecordSet>>,
    created_records: Vec<(String, RecordSpec)>,
    reject_changes_as_invalid: bool,
}

/// Pops scripted values; the last one repeats forever
fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap()
    }

    fn record_call(&self, call: &str) {
        self.lock().calls.push(call.to_string());
    }

    pub fn services(&self) -> CloudServices {
        CloudServices {
            registrar: Arc::new(self.clone()),
            certificates: Arc::new(self.clone()),
            storage: Arc::new(self.clone()),
            cdn: Arc::new(self.clone()),
            dns: Arc::new(self.clone()),
        }
    }

    pub fn dns(&self) -> Arc<dyn DnsService> {
        Arc::new(self.clone())
    }

    // --------------------------------------------------------
    // Scripting
    // --------------------------------------------------------

    pub fn own_domain(&self, domain: &str) {
        self.lock().registrations.insert(domain.to_string());
    }

    pub fn registration_pending(&self, domain: &str) {
        self.lock().registrations_in_progress.insert(domain.to_string());
    }

    pub fn script_availability(&self, domain: &str, answers: &[Availability]) {
        self.lock()
            .availability
            .insert(domain.to_string(), answers.iter().copied().collect());
    }

    /// An existing certificate with scripted describe results
    pub fn add_certificate(&self, domain: &str, arn: &str, states: &[ValidationStatus]) {
        let mut state = self.lock();
        state.certificates.push(CertificateSummary {
            domain: domain.to_string(),
            arn: arn.to_string(),
            status: None,
        });
        state
            .certificate_states
            .insert(arn.to_string(), states.iter().map(|s| cert_state(domain, arn, *s)).collect());
    }

    /// Describe results for the next certificate requested
    pub fn script_requested_certificate(&self, domain: &str, states: &[ValidationStatus]) {
        let arn = format!("{}/{}", TEST_ACCOUNT_ARN, self.lock().requested_states.len() + 1);
        let scripted = states.iter().map(|s| cert_state(domain, &arn, *s)).collect();
        self.lock().requested_states.push_back(scripted);
    }

    /// Script raw describe results (e.g. a missing validation record)
    pub fn script_certificate_states(&self, arn: &str, states: Vec<CertificateState>) {
        self.lock()
            .certificate_states
            .insert(arn.to_string(), states.into_iter().collect());
    }

    /// Make `make_world_readable` fail until switched back off
    pub fn deny_public_access(&self, deny: bool) {
        self.lock().deny_public_access = deny;
    }

    /// An existing bucket that still blocks public reads
    pub fn add_bucket(&self, name: &str, website: Option<WebsiteConfig>) {
        let mut state = self.lock();
        state.buckets.insert(name.to_string());
        if let Some(website) = website {
            state.websites.insert(name.to_string(), website);
        }
    }

    pub fn add_distribution(&self, id: &str, domain_name: &str, origin: &str, status: DeploymentStatus) {
        let mut state = self.lock();
        state.distributions.push(DistributionSummary {
            id: id.to_string(),
            domain_name: domain_name.to_string(),
            origin_domains: vec![origin.to_string()],
            status,
        });
        state
            .deployment_statuses
            .insert(id.to_string(), VecDeque::from([status, DeploymentStatus::Deployed]));
    }

    /// Deployment statuses reported for the distribution `id`
    pub fn script_deployment(&self, id: &str, statuses: &[DeploymentStatus]) {
        self.lock()
            .deployment_statuses
            .insert(id.to_string(), statuses.iter().copied().collect());
    }

    pub fn script_invalidation(&self, statuses: &[InvalidationStatus]) {
        self.lock().invalidation_statuses = statuses.iter().copied().collect();
    }

    pub fn add_zone(&self, id: &str, name: &str) {
        self.lock().zones.push(HostedZone {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_record(&self, zone_id: &str, name: &str, record_type: &str) {
        self.lock()
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(RecordSet {
                name: name.to_string(),
                record_type: record_type.to_string(),
            });
    }

    pub fn reject_changes_as_invalid(&self) {
        self.lock().reject_changes_as_invalid = true;
    }

    // --------------------------------------------------------
    // Inspection
    // --------------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Index of the first journaled `call`
    pub fn first_call(&self, call: &str) -> Option<usize> {
        self.lock().calls.iter().position(|c| c == call)
    }

    pub fn registered(&self) -> Vec<String> {
        self.lock().registered.clone()
    }

    pub fn requested_certificates(&self) -> usize {
        self.count_calls("acm.request_certificate")
    }

    pub fn created_buckets(&self) -> Vec<(String, String)> {
        self.lock().created_buckets.clone()
    }

    pub fn is_public(&self, bucket: &str) -> bool {
        self.lock().world_readable.contains(bucket)
    }

    pub fn website(&self, bucket: &str) -> Option<WebsiteConfig> {
        self.lock().websites.get(bucket).cloned()
    }

    /// (bucket, key, content type) of every upload
    pub fn uploaded(&self) -> Vec<(String, String, String)> {
        self.lock().objects.clone()
    }

    pub fn created_distributions(&self) -> Vec<DistributionConfig> {
        self.lock().created_distributions.clone()
    }

    pub fn invalidations(&self) -> Vec<(String, Vec<String>)> {
        self.lock().invalidations.clone()
    }

    pub fn created_records(&self) -> Vec<(String, RecordSpec)> {
        self.lock().created_records.clone()
    }
}

fn cert_state(domain: &str, arn: &str, status: ValidationStatus) -> CertificateState {
    let validation_record = match status {
        ValidationStatus::Pending => None,
        _ => Some(ValidationRecord {
            name: format!("_3639ac514e785e898d2646601fa951d5.{}.", domain),
            record_type: "CNAME".to_string(),
            value: "_98d2646601fa951d53639ac514e785e8.acm-validations.aws.".to_string(),
        }),
    };

    CertificateState {
        arn: arn.to_string(),
        validation_status: status,
        validation_record,
    }
}

#[async_trait]
impl Registrar for FakeCloud {
    async fn find_registration(&self, domain: &str) -> ProviderResult<Option<Registration>> {
        self.record_call("domains.find_registration");
        Ok(self.lock().registrations.contains(domain).then(|| Registration {
            domain: domain.to_string(),
            statuses: vec![],
        }))
    }

    async fn registration_in_progress(&self, domain: &str) -> ProviderResult<bool> {
        self.record_call("domains.registration_in_progress");
        Ok(self.lock().registrations_in_progress.contains(domain))
    }

    async fn check_availability(&self, domain: &str) -> ProviderResult<Availability> {
        self.record_call("domains.check_availability");
        let mut state = self.lock();
        Ok(state
            .availability
            .get_mut(domain)
            .and_then(next_scripted)
            .unwrap_or(Availability::Unavailable))
    }

    async fn register(&self, domain: &str, _contact: &ContactDetails) -> ProviderResult<RegistrationHandle> {
        self.record_call("domains.register");
        let mut state = self.lock();
        state.registered.push(domain.to_string());
        state.registrations_in_progress.insert(domain.to_string());
        Ok(RegistrationHandle {
            operation_id: format!("op-{}", state.registered.len()),
        })
    }

    async fn operation_status(&self, _handle: &RegistrationHandle) -> ProviderResult<OperationStatus> {
        self.record_call("domains.operation_status");
        Ok(OperationStatus::InProgress)
    }
}

#[async_trait]
impl CertificateAuthority for FakeCloud {
    async fn list_certificates(&self) -> ProviderResult<Vec<CertificateSummary>> {
        self.record_call("acm.list_certificates");
        let state = self.lock();
        Ok(state
            .certificates
            .iter()
            .map(|c| CertificateSummary {
                status: state
                    .certificate_states
                    .get(&c.arn)
                    .and_then(|q| q.front())
                    .map(|s| s.validation_status),
                ..c.clone()
            })
            .collect())
    }

    async fn request_certificate(&self, domain: &str, _alt_names: &[String]) -> ProviderResult<String> {
        self.record_call("acm.request_certificate");
        let mut state = self.lock();
        let scripted = state.requested_states.pop_front().unwrap_or_default();
        let arn = scripted
            .first()
            .map(|s| s.arn.clone())
            .unwrap_or_else(|| format!("{}/{}", TEST_ACCOUNT_ARN, state.certificates.len() + 1));

        state.certificates.push(CertificateSummary {
            domain: domain.to_string(),
            arn: arn.clone(),
            status: None,
        });
        state.certificate_states.insert(arn.clone(), scripted.into_iter().collect());
        Ok(arn)
    }

    async fn describe_certificate(&self, arn: &str) -> ProviderResult<CertificateState> {
        self.record_call("acm.describe_certificate");
        let mut state = self.lock();
        state
            .certificate_states
            .get_mut(arn)
            .and_then(next_scripted)
            .ok_or_else(|| ProviderError::NotFound {
                service: "acm",
                resource: arn.to_string(),
            })
    }
}

#[async_trait]
impl ObjectStore for FakeCloud {
    async fn head_bucket(&self, name: &str) -> ProviderResult<bool> {
        self.record_call("s3.head_bucket");
        Ok(self.lock().buckets.contains(name))
    }

    async fn create_bucket(&self, name: &str, region: &str) -> ProviderResult<()> {
        self.record_call("s3.create_bucket");
        let mut state = self.lock();
        state.buckets.insert(name.to_string());
        state.created_buckets.push((name.to_string(), region.to_string()));
        Ok(())
    }

    async fn is_world_readable(&self, name: &str) -> ProviderResult<bool> {
        self.record_call("s3.is_world_readable");
        Ok(self.lock().world_readable.contains(name))
    }

    async fn make_world_readable(&self, name: &str, _acl: Acl) -> ProviderResult<()> {
        self.record_call("s3.make_world_readable");
        let mut state = self.lock();
        if state.deny_public_access {
            return Err(ProviderError::api("s3", "AccessDenied"));
        }
        state.world_readable.insert(name.to_string());
        Ok(())
    }

    async fn get_website_config(&self, name: &str) -> ProviderResult<Option<WebsiteConfig>> {
        self.record_call("s3.get_website_config");
        Ok(self.lock().websites.get(name).cloned())
    }

    async fn put_website_config(&self, name: &str, config: &WebsiteConfig) -> ProviderResult<()> {
        self.record_call("s3.put_website_config");
        self.lock().websites.insert(name.to_string(), config.clone());
        Ok(())
    }

    async fn put_object(&self, upload: ObjectUpload) -> ProviderResult<()> {
        self.record_call("s3.put_object");
        let mut state = self.lock();
        // Public-read grants fail on a bucket that still blocks them
        if state.buckets.contains(&upload.bucket) && !state.world_readable.contains(&upload.bucket) {
            return Err(ProviderError::api("s3", "AccessDenied"));
        }
        state
            .objects
            .push((upload.bucket, upload.key, upload.content_type));
        Ok(())
    }
}

#[async_trait]
impl Cdn for FakeCloud {
    async fn list_distributions(&self) -> ProviderResult<Vec<DistributionSummary>> {
        self.record_call("cloudfront.list_distributions");
        Ok(self.lock().distributions.clone())
    }

    async fn create_distribution(&self, config: &DistributionConfig) -> ProviderResult<DistributionHandle> {
        self.record_call("cloudfront.create_distribution");
        let mut state = self.lock();
        let n = state.distributions.len() + 1;
        let handle = DistributionHandle {
            id: format!("E{:04}", n),
            domain_name: format!("d{}.cloudfront.net", n),
        };

        state.distributions.push(DistributionSummary {
            id: handle.id.clone(),
            domain_name: handle.domain_name.clone(),
            origin_domains: vec![config.origin.domain_name.clone()],
            status: DeploymentStatus::InProgress,
        });
        state
            .deployment_statuses
            .entry(handle.id.clone())
            .or_insert_with(|| VecDeque::from([DeploymentStatus::InProgress, DeploymentStatus::Deployed]));
        state.created_distributions.push(config.clone());
        Ok(handle)
    }

    async fn distribution_status(&self, id: &str) -> ProviderResult<DeploymentStatus> {
        self.record_call("cloudfront.distribution_status");
        let mut state = self.lock();
        let status = state
            .deployment_statuses
            .get_mut(id)
            .and_then(next_scripted)
            .unwrap_or(DeploymentStatus::Deployed);

        if let Some(d) = state.distributions.iter_mut().find(|d| d.id == id) {
            d.status = status;
        }
        Ok(status)
    }

    async fn create_invalidation(&self, distribution_id: &str, paths: &[String]) -> ProviderResult<InvalidationHandle> {
        self.record_call("cloudfront.create_invalidation");
        let mut state = self.lock();
        state
            .invalidations
            .push((distribution_id.to_string(), paths.to_vec()));
        Ok(InvalidationHandle {
            distribution_id: distribution_id.to_string(),
            id: format!("I{}", state.invalidations.len()),
        })
    }

    async fn invalidation_status(&self, _handle: &InvalidationHandle) -> ProviderResult<InvalidationStatus> {
        self.record_call("cloudfront.invalidation_status");
        Ok(next_scripted(&mut self.lock().invalidation_statuses).unwrap_or(InvalidationStatus::Completed))
    }
}

#[async_trait]
impl DnsService for FakeCloud {
    async fn list_hosted_zones(&self) -> ProviderResult<Vec<HostedZone>> {
        self.record_call("dns.list_hosted_zones");
        Ok(self.lock().zones.clone())
    }

    async fn list_record_sets(&self, zone_id: &str) -> ProviderResult<Vec<RecordSet>> {
        self.record_call("dns.list_record_sets");
        Ok(self.lock().records.get(zone_id).cloned().unwrap_or_default())
    }

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> ProviderResult<()> {
        self.record_call("dns.change_record_sets");
        let mut state = self.lock();
        if state.reject_changes_as_invalid {
            return Err(ProviderError::InvalidRequest {
                service: "route53",
                message: "Tried to create resource record set but it already exists".to_string(),
            });
        }

        state.created_records.push((zone_id.to_string(), batch.create.clone()));
        state
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(RecordSet {
                name: batch.create.name.clone(),
                record_type: batch.create.record_type.clone(),
            });
        Ok(())
    }
}
