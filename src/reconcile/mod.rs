//! Resource Reconcilers
//!
//! One idempotent ensure-procedure per remote resource. Each inspects
//! current state first, creates only what is missing, and waits until the
//! resource is usable before returning.

pub mod alias;
pub mod cdn;
pub mod certificate;
pub mod registrar;
pub mod storage;

pub use alias::{AliasOutcome, AliasReconciler};
pub use cdn::CdnReconciler;
pub use certificate::CertificateReconciler;
pub use registrar::{RegistrarReconciler, RegistrationOutcome};
pub use storage::{website_endpoint, StorageReconciler};
