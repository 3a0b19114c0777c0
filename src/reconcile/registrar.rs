//! Domain Registration
//!
//! Makes sure the deployment domain is held by this account, registering it
//! (after confirmation) when it is still available.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DeploymentSpec;
use crate::error::{DeployError, DeployResult, ProviderError};
use crate::poller::{poll_until, PollOutcome, PollPolicy, PollResult};
use crate::prompt::Prompt;
use crate::providers::{Availability, Registrar};
use crate::reporter::Reporter;

/// Where the domain stands after reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    AlreadyOwned,
    /// A registration was submitted during this run
    Registered,
    /// The operator said no to registering
    Declined,
    Unavailable,
    /// A registration from an earlier run has not completed
    InProgress,
}

impl RegistrationOutcome {
    /// The error that stops the run. Only a domain already owned lets the
    /// certificate step start; a registration submitted in this run has no
    /// hosted zone yet.
    pub fn into_error(self, domain: &str) -> Option<DeployError> {
        let domain = domain.to_string();
        match self {
            Self::AlreadyOwned => None,
            Self::Declined => Some(DeployError::RegistrationDeclined { domain }),
            Self::Unavailable => Some(DeployError::DomainUnavailable { domain }),
            Self::Registered | Self::InProgress => {
                Some(DeployError::RegistrationInProgress { domain })
            }
        }
    }
}

pub struct RegistrarReconciler {
    registrar: Arc<dyn Registrar>,
    prompt: Arc<dyn Prompt>,
    reporter: Reporter,
    availability_policy: PollPolicy,
}

impl RegistrarReconciler {
    pub fn new(
        registrar: Arc<dyn Registrar>,
        prompt: Arc<dyn Prompt>,
        reporter: Reporter,
        availability_policy: PollPolicy,
    ) -> Self {
        Self {
            registrar,
            prompt,
            reporter,
            availability_policy,
        }
    }

    pub async fn ensure_domain_registered(
        &self,
        spec: &DeploymentSpec,
        auto_register: bool,
    ) -> DeployResult<RegistrationOutcome> {
        let domain = spec.domain.as_str();
        self.reporter.step(format!("Checking registration of {}", domain));

        if let Some(registration) = self.registrar.find_registration(domain).await? {
            debug!(domain, statuses = ?registration.statuses, "Domain registered");
            self.reporter.done(format!("{} is registered in this account", domain));
            return Ok(RegistrationOutcome::AlreadyOwned);
        }

        if self.registrar.registration_in_progress(domain).await? {
            self.reporter
                .warn(format!("Registration of {} is still in progress", domain));
            return Ok(RegistrationOutcome::InProgress);
        }

        if !self.is_available(domain).await? {
            self.reporter
                .warn(format!("{} is not available for registration", domain));
            return Ok(RegistrationOutcome::Unavailable);
        }

        let contact = spec
            .registrant_contact
            .as_ref()
            .ok_or_else(|| DeployError::MissingContact {
                domain: domain.to_string(),
            })?;

        if !auto_register {
            let question = format!(
                "{} is available. Register it now? This charges your AWS account.",
                domain
            );
            if !self.prompt.confirm(&question)? {
                self.reporter.warn(format!("Registration of {} declined", domain));
                return Ok(RegistrationOutcome::Declined);
            }
        }

        info!(domain, "Registering domain");
        let handle = self.registrar.register(domain, contact).await?;

        // Registration takes minutes to days; report the state once
        match self.registrar.operation_status(&handle).await {
            Ok(status) => info!(operation_id = %handle.operation_id, %status, "Registration submitted"),
            Err(e) => self.reporter.warn(format!(
                "Registration {} submitted but its status could not be read: {}",
                handle.operation_id, e
            )),
        }

        self.reporter.done(format!(
            "Registration of {} submitted. Re-run deploy once it completes.",
            domain
        ));
        Ok(RegistrationOutcome::Registered)
    }

    /// Availability, retrying while the registry answers Pending
    async fn is_available(&self, domain: &str) -> DeployResult<bool> {
        let registrar = &self.registrar;

        let result = poll_until(&self.availability_policy, || async move {
            let outcome = match registrar.check_availability(domain).await? {
                Availability::Available => PollOutcome::Ready(true),
                Availability::Unavailable => PollOutcome::Ready(false),
                Availability::Pending => PollOutcome::Pending,
            };
            Ok::<_, ProviderError>(outcome)
        })
        .await?;

        Ok(match result {
            PollResult::Ready(available) => available,
            PollResult::Failed(_) => false,
            PollResult::TimedOut { attempts, .. } => {
                debug!(domain, attempts, "Availability still pending, treating as unavailable");
                false
            }
        })
    }
}
