use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_route53domains::error::ProvideErrorMetadata;
use aws_sdk_route53domains::types::{ContactDetail, ContactType, CountryCode, OperationType};
use aws_sdk_route53domains::Client;
use tracing::debug;

use super::{sdk_error, GLOBAL_REGION};
use crate::config::ContactDetails;
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{Availability, OperationStatus, Registrar, Registration, RegistrationHandle};

const SERVICE: &str = "route53domains";

/// Route 53 Domains registrar
pub struct Route53Registrar {
    client: Client,
}

impl Route53Registrar {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_route53domains::config::Builder::from(sdk_config)
            .region(Region::new(GLOBAL_REGION))
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

fn contact_detail(contact: &ContactDetails) -> ContactDetail {
    ContactDetail::builder()
        .first_name(&contact.first_name)
        .last_name(&contact.last_name)
        .contact_type(ContactType::from(contact.contact_type.as_str()))
        .set_organization_name(contact.organization.clone())
        .address_line1(&contact.address1)
        .set_address_line2(contact.address2.clone())
        .city(&contact.city)
        .set_state(contact.state.clone())
        .country_code(CountryCode::from(contact.country_code.as_str()))
        .zip_code(&contact.zip_code)
        .phone_number(&contact.phone_number)
        .email(&contact.email)
        .build()
}

fn operation_status(status: &str) -> OperationStatus {
    match status {
        "SUBMITTED" => OperationStatus::Submitted,
        "IN_PROGRESS" => OperationStatus::InProgress,
        "SUCCESSFUL" => OperationStatus::Successful,
        "FAILED" => OperationStatus::Failed,
        _ => OperationStatus::Error,
    }
}

#[async_trait]
impl Registrar for Route53Registrar {
    async fn find_registration(&self, domain: &str) -> ProviderResult<Option<Registration>> {
        match self.client.get_domain_detail().domain_name(domain).send().await {
            Ok(detail) => Ok(Some(Registration {
                domain: detail.domain_name().unwrap_or(domain).to_string(),
                statuses: detail.status_list().to_vec(),
            })),
            Err(err) => {
                // "Domain example.com not found in 123456789012 account"
                let not_found = err.as_service_error().is_some_and(|e| {
                    e.code() == Some("InvalidInput")
                        && e.message().is_some_and(|m| m.contains("not found"))
                });
                if not_found {
                    Ok(None)
                } else {
                    Err(sdk_error(SERVICE, err))
                }
            }
        }
    }

    async fn registration_in_progress(&self, domain: &str) -> ProviderResult<bool> {
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_operations()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;

            let pending = page.operations().iter().any(|op| {
                op.domain_name().is_some_and(|d| d.eq_ignore_ascii_case(domain))
                    && matches!(op.r#type(), Some(OperationType::RegisterDomain))
                    && op
                        .status()
                        .is_some_and(|s| operation_status(s.as_str()).is_pending())
            });
            if pending {
                return Ok(true);
            }

            match page.next_page_marker() {
                Some(next) => marker = Some(next.to_string()),
                None => return Ok(false),
            }
        }
    }

    async fn check_availability(&self, domain: &str) -> ProviderResult<Availability> {
        let result = self
            .client
            .check_domain_availability()
            .domain_name(domain)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let availability = result.availability().map(|a| a.as_str());
        debug!(domain, ?availability, "Domain availability");

        Ok(match availability {
            Some("AVAILABLE") => Availability::Available,
            // The registry did not answer in time
            Some("PENDING") | Some("DONT_KNOW") => Availability::Pending,
            _ => Availability::Unavailable,
        })
    }

    async fn register(&self, domain: &str, contact: &ContactDetails) -> ProviderResult<RegistrationHandle> {
        let detail = contact_detail(contact);

        let result = self
            .client
            .register_domain()
            .domain_name(domain)
            .duration_in_years(1)
            .auto_renew(false)
            .admin_contact(detail.clone())
            .registrant_contact(detail.clone())
            .tech_contact(detail)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let operation_id = result
            .operation_id()
            .ok_or_else(|| ProviderError::malformed(SERVICE, "RegisterDomain returned no operation id"))?;

        Ok(RegistrationHandle {
            operation_id: operation_id.to_string(),
        })
    }

    async fn operation_status(&self, handle: &RegistrationHandle) -> ProviderResult<OperationStatus> {
        let detail = self
            .client
            .get_operation_detail()
            .operation_id(&handle.operation_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        Ok(detail
            .status()
            .map(|s| operation_status(s.as_str()))
            .unwrap_or(OperationStatus::Submitted))
    }
}
