//! Deploy Orchestrator
//!
//! Runs the reconcilers in dependency order, each to readiness before the
//! next starts: registrar, certificate, storage, CDN, DNS alias. Then syncs
//! content and invalidates the CDN cache for what was uploaded.
//!
//! Every step is idempotent, so an interrupted run is finished by running
//! it again.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::DeploymentSpec;
use crate::dns::DnsResolver;
use crate::error::{DeployError, DeployResult};
use crate::poller::PollSettings;
use crate::prompt::Prompt;
use crate::providers::CloudServices;
use crate::reconcile::{
    website_endpoint, AliasOutcome, AliasReconciler, CdnReconciler, CertificateReconciler,
    RegistrarReconciler, RegistrationOutcome, StorageReconciler,
};
use crate::reporter::Reporter;
use crate::sync::{invalidation_paths, ContentSync};

/// Flags of one deploy run
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Assume the infrastructure exists; only sync and invalidate
    pub skip_setup: bool,
    /// Register an available domain without asking
    pub auto_register: bool,
    /// Do not touch domain registration at all
    pub skip_domain: bool,
}

/// What a run ended up with
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployReport {
    pub registration: Option<String>,
    pub certificate_arn: Option<String>,
    pub website_endpoint: String,
    pub cdn_domain: String,
    pub alias: Option<String>,
    pub uploaded_paths: Vec<String>,
    pub invalidation_id: Option<String>,
}

pub struct Deployer {
    services: CloudServices,
    prompt: Arc<dyn Prompt>,
    reporter: Reporter,
    poll: PollSettings,
}

impl Deployer {
    pub fn new(services: CloudServices, prompt: Arc<dyn Prompt>, reporter: Reporter) -> Self {
        Self {
            services,
            prompt,
            reporter,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    fn cdn(&self) -> CdnReconciler {
        CdnReconciler::new(
            self.services.cdn.clone(),
            self.reporter,
            self.poll.distribution_deployment,
            self.poll.invalidation,
        )
    }

    pub async fn deploy(&self, spec: &DeploymentSpec, options: DeployOptions) -> DeployResult<DeployReport> {
        info!(
            domain = %spec.domain,
            project = %spec.project_name,
            region = %spec.region,
            skip_setup = options.skip_setup,
            "🚀 Starting deploy"
        );

        let mut report = if options.skip_setup {
            self.locate(spec).await?
        } else {
            self.setup(spec, options).await?
        };
        let cdn = self.cdn();

        let sync = ContentSync::new(self.services.storage.clone(), self.reporter)
            .sync(&spec.bucket, &spec.content_root, &spec.excludes)
            .await?;

        let paths = invalidation_paths(&sync);
        report.uploaded_paths = sync.uploaded_paths;

        if !paths.is_empty() {
            let distribution = cdn
                .find_distribution(&report.website_endpoint)
                .await?
                .ok_or_else(|| DeployError::DistributionNotFound {
                    origin: report.website_endpoint.clone(),
                })?;
            report.invalidation_id = cdn
                .invalidate(&distribution.id, &paths)
                .await?
                .map(|h| h.id);
        }

        self.reporter
            .done(format!("Deployed https://{}", spec.domain));
        Ok(report)
    }

    /// Reconcile every resource in dependency order
    async fn setup(&self, spec: &DeploymentSpec, options: DeployOptions) -> DeployResult<DeployReport> {
        let mut report = DeployReport::default();

        if options.skip_domain {
            self.reporter.step("Skipping domain registration");
        } else {
            let outcome = RegistrarReconciler::new(
                self.services.registrar.clone(),
                self.prompt.clone(),
                self.reporter,
                self.poll.domain_availability,
            )
            .ensure_domain_registered(spec, options.auto_register)
            .await?;

            if let Some(err) = outcome.into_error(&spec.domain) {
                return Err(err);
            }
            report.registration = Some(registration_label(outcome).to_string());
        }

        let dns = Arc::new(DnsResolver::new(self.services.dns.clone(), &spec.domain));

        let certificate_arn = CertificateReconciler::new(
            self.services.certificates.clone(),
            dns.clone(),
            self.reporter,
            self.poll.validation_descriptor,
            self.poll.certificate_validation,
        )
        .ensure_certificate(&spec.domain)
        .await?;

        let endpoint = StorageReconciler::new(self.services.storage.clone(), self.reporter)
            .ensure_bucket(&spec.bucket, &spec.region, spec.redirect_target.as_deref())
            .await?;

        let cdn_domain = self
            .cdn()
            .ensure_distribution(&certificate_arn, &endpoint, &spec.bucket, &spec.domain)
            .await?;

        let alias = AliasReconciler::new(dns, self.reporter)
            .ensure_apex_alias(&spec.domain, &cdn_domain)
            .await?;

        report.certificate_arn = Some(certificate_arn);
        report.website_endpoint = endpoint;
        report.cdn_domain = cdn_domain;
        report.alias = Some(
            match alias {
                AliasOutcome::Created => "created",
                AliasOutcome::AlreadyPresent => "already present",
            }
            .to_string(),
        );
        Ok(report)
    }

    /// Find the existing distribution without reconciling anything
    async fn locate(&self, spec: &DeploymentSpec) -> DeployResult<DeployReport> {
        self.reporter.step("Skipping setup; using existing infrastructure");
        let endpoint = website_endpoint(&spec.bucket, &spec.region);

        let distribution = self
            .cdn()
            .find_distribution(&endpoint)
            .await?
            .ok_or_else(|| DeployError::DistributionNotFound {
                origin: endpoint.clone(),
            })?;

        Ok(DeployReport {
            website_endpoint: endpoint,
            cdn_domain: distribution.domain_name,
            ..DeployReport::default()
        })
    }
}

fn registration_label(outcome: RegistrationOutcome) -> &'static str {
    match outcome {
        RegistrationOutcome::AlreadyOwned => "already owned",
        RegistrationOutcome::Registered => "registered",
        RegistrationOutcome::Declined => "declined",
        RegistrationOutcome::Unavailable => "unavailable",
        RegistrationOutcome::InProgress => "in progress",
    }
}
