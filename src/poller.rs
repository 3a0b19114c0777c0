//! Async Operation Poller
//!
//! One bounded retry primitive for every asynchronous remote operation:
//! domain availability lookups, certificate validation, distribution
//! deployment and invalidation completion.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

/// What a single check observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Pending,
    Failed(String),
}

/// Final result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    Ready(T),
    Failed(String),
    /// Attempts ran out while the operation was still pending
    TimedOut { attempts: u32, waited: Duration },
}

/// Cadence and budget of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping between checks
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Every poll cadence used by a deploy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Availability lookups right after a check-availability call
    pub domain_availability: PollPolicy,
    /// ACM fills in the validation descriptor shortly after a request
    pub validation_descriptor: PollPolicy,
    /// DNS validation of a certificate (~3 hours)
    pub certificate_validation: PollPolicy,
    /// Distribution propagation to edge locations
    pub distribution_deployment: PollPolicy,
    /// Cache invalidation completion
    pub invalidation: PollPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            domain_availability: PollPolicy::new(Duration::from_secs(1), 4),
            validation_descriptor: PollPolicy::new(Duration::from_secs(5), 5),
            certificate_validation: PollPolicy::new(Duration::from_secs(60), 180),
            distribution_deployment: PollPolicy::new(Duration::from_secs(30), 80),
            invalidation: PollPolicy::new(Duration::from_secs(20), 45),
        }
    }
}

impl PollSettings {
    /// Same attempt budgets with no sleeping
    pub fn immediate() -> Self {
        let defaults = Self::default();
        let instant = |p: PollPolicy| PollPolicy::new(Duration::ZERO, p.max_attempts);
        Self {
            domain_availability: instant(defaults.domain_availability),
            validation_descriptor: instant(defaults.validation_descriptor),
            certificate_validation: instant(defaults.certificate_validation),
            distribution_deployment: instant(defaults.distribution_deployment),
            invalidation: instant(defaults.invalidation),
        }
    }
}

/// Run `check` until it is ready, fails, or the policy's attempts run out.
///
/// Errors from `check` are remote-call failures and end the loop at once.
/// There is no sleep after the final attempt.
pub async fn poll_until<T, E, F, Fut>(policy: &PollPolicy, mut check: F) -> Result<PollResult<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    let started = Instant::now();

    for attempt in 1..=policy.max_attempts {
        match check().await? {
            PollOutcome::Ready(value) => return Ok(PollResult::Ready(value)),
            PollOutcome::Failed(reason) => return Ok(PollResult::Failed(reason)),
            PollOutcome::Pending => {
                debug!(attempt, max_attempts = policy.max_attempts, "Still pending");
                if attempt < policy.max_attempts && !policy.interval.is_zero() {
                    sleep(policy.interval).await;
                }
            }
        }
    }

    Ok(PollResult::TimedOut {
        attempts: policy.max_attempts,
        waited: started.elapsed(),
    })
}
