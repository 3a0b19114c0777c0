//! Remote Resource Types
//!
//! Provider-neutral views of the resources the reconcilers inspect and
//! create.

use serde::{Deserialize, Serialize};

// ============================================================
// Registrar
// ============================================================

/// A domain registered in this account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub domain: String,
    /// Registry status codes (e.g. "clientTransferProhibited")
    pub statuses: Vec<String>,
}

/// Answer of a check-availability call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,
    Unavailable,
    /// The registry has not answered yet
    Pending,
}

/// A submitted registration operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationHandle {
    pub operation_id: String,
}

/// Registrar operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Submitted,
    InProgress,
    Error,
    Successful,
    Failed,
}

impl OperationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Submitted | Self::InProgress)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Submitted => write!(f, "submitted"),
            OperationStatus::InProgress => write!(f, "in progress"),
            OperationStatus::Error => write!(f, "error"),
            OperationStatus::Successful => write!(f, "successful"),
            OperationStatus::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================
// Certificates
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub domain: String,
    pub arn: String,
    /// None when the listing carries no status
    pub status: Option<ValidationStatus>,
}

/// Validation state of a certificate's primary domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// The validation descriptor has not been populated yet
    Pending,
    PendingValidation,
    Issued,
    Failed,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Pending => write!(f, "PENDING"),
            ValidationStatus::PendingValidation => write!(f, "PENDING_VALIDATION"),
            ValidationStatus::Issued => write!(f, "ISSUED"),
            ValidationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// DNS record the CA wants to see before issuing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateState {
    pub arn: String,
    pub validation_status: ValidationStatus,
    pub validation_record: Option<ValidationRecord>,
}

impl CertificateState {
    /// Status and record are filled in enough to act on
    pub fn descriptor_ready(&self) -> bool {
        match self.validation_status {
            ValidationStatus::Pending => false,
            ValidationStatus::PendingValidation => self.validation_record.is_some(),
            ValidationStatus::Issued | ValidationStatus::Failed => true,
        }
    }
}

// ============================================================
// Object storage
// ============================================================

/// Canned access grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    PublicRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectProtocol {
    Http,
    Https,
}

impl RedirectProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectProtocol::Http => "http",
            RedirectProtocol::Https => "https",
        }
    }
}

/// Bucket website configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebsiteConfig {
    /// Serve objects, with `suffix` as the directory index
    Index { suffix: String },
    /// Redirect every request to another host
    RedirectAll {
        host_name: String,
        protocol: Option<RedirectProtocol>,
    },
}

/// One object to write
#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub acl: Acl,
}

// ============================================================
// CDN
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    InProgress,
    Deployed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub id: String,
    pub domain_name: String,
    pub origin_domains: Vec<String>,
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionHandle {
    pub id: String,
    pub domain_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewerProtocol {
    AllowAll,
    RedirectToHttps,
    HttpsOnly,
}

impl ViewerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerProtocol::AllowAll => "allow-all",
            ViewerProtocol::RedirectToHttps => "redirect-to-https",
            ViewerProtocol::HttpsOnly => "https-only",
        }
    }
}

/// Custom (HTTP/HTTPS) origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOrigin {
    pub id: String,
    pub domain_name: String,
    pub http_port: i32,
    pub https_port: i32,
    /// e.g. "http-only"
    pub protocol_policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBehavior {
    pub target_origin_id: String,
    pub allowed_methods: Vec<HttpMethod>,
    pub cached_methods: Vec<HttpMethod>,
    pub compress: bool,
    pub forward_cookies: bool,
    pub forward_query_string: bool,
    pub viewer_protocol: ViewerProtocol,
    pub min_ttl: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SslSupportMethod {
    SniOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerCertificate {
    pub acm_certificate_arn: String,
    pub ssl_support_method: SslSupportMethod,
    pub minimum_protocol_version: String,
}

/// Everything needed to submit a new distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub caller_reference: String,
    pub comment: String,
    pub aliases: Vec<String>,
    pub origin: CustomOrigin,
    pub default_behavior: CacheBehavior,
    pub certificate: ViewerCertificate,
    pub price_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationHandle {
    pub distribution_id: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationStatus {
    InProgress,
    Completed,
}

// ============================================================
// DNS
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    /// Fully qualified, with trailing dot
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTarget {
    Values { values: Vec<String>, ttl: i64 },
    Alias {
        hosted_zone_id: String,
        dns_name: String,
        evaluate_target_health: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub target: RecordTarget,
}

/// A change batch holding a single record creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub comment: String,
    pub create: RecordSpec,
}
