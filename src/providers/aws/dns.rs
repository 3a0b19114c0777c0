use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch as R53ChangeBatch, ResourceRecord,
    ResourceRecordSet, RrType,
};
use aws_sdk_route53::error::BuildError;
use aws_sdk_route53::Client;

use super::{build_error, sdk_error, GLOBAL_REGION};
use crate::error::ProviderResult;
use crate::providers::{ChangeBatch, DnsService, HostedZone, RecordSet, RecordSpec, RecordTarget};

const SERVICE: &str = "route53";

/// Route 53 hosted zones
pub struct Route53Dns {
    client: Client,
}

impl Route53Dns {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_route53::config::Builder::from(sdk_config)
            .region(Region::new(GLOBAL_REGION))
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

fn record_set(spec: &RecordSpec) -> ProviderResult<ResourceRecordSet> {
    let err = |e: BuildError| build_error(SERVICE, e);
    let builder = ResourceRecordSet::builder()
        .name(&spec.name)
        .r#type(RrType::from(spec.record_type.as_str()));

    let builder = match &spec.target {
        RecordTarget::Values { values, ttl } => {
            let records = values
                .iter()
                .map(|v| ResourceRecord::builder().value(v).build().map_err(err))
                .collect::<ProviderResult<Vec<_>>>()?;
            builder.ttl(*ttl).set_resource_records(Some(records))
        }
        RecordTarget::Alias {
            hosted_zone_id,
            dns_name,
            evaluate_target_health,
        } => builder.alias_target(
            AliasTarget::builder()
                .hosted_zone_id(hosted_zone_id)
                .dns_name(dns_name)
                .evaluate_target_health(*evaluate_target_health)
                .build()
                .map_err(err)?,
        ),
    };

    builder.build().map_err(err)
}

#[async_trait]
impl DnsService for Route53Dns {
    async fn list_hosted_zones(&self) -> ProviderResult<Vec<HostedZone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;

            zones.extend(page.hosted_zones().iter().map(|z| HostedZone {
                id: z.id().trim_start_matches("/hostedzone/").to_string(),
                name: z.name().to_string(),
            }));

            match page.next_marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(zones),
            }
        }
    }

    async fn list_record_sets(&self, zone_id: &str) -> ProviderResult<Vec<RecordSet>> {
        let mut records = Vec::new();
        let mut start: Option<(String, RrType)> = None;

        loop {
            let mut request = self.client.list_resource_record_sets().hosted_zone_id(zone_id);
            if let Some((name, record_type)) = start.take() {
                request = request.start_record_name(name).start_record_type(record_type);
            }
            let page = request.send().await.map_err(|e| sdk_error(SERVICE, e))?;

            records.extend(page.resource_record_sets().iter().map(|r| RecordSet {
                name: r.name().to_string(),
                record_type: r.r#type().as_str().to_string(),
            }));

            if !page.is_truncated() {
                return Ok(records);
            }
            match (page.next_record_name(), page.next_record_type()) {
                (Some(name), Some(record_type)) => {
                    start = Some((name.to_string(), record_type.clone()))
                }
                _ => return Ok(records),
            }
        }
    }

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> ProviderResult<()> {
        let err = |e: BuildError| build_error(SERVICE, e);
        let change = Change::builder()
            .action(ChangeAction::Create)
            .resource_record_set(record_set(&batch.create)?)
            .build()
            .map_err(err)?;

        let change_batch = R53ChangeBatch::builder()
            .comment(&batch.comment)
            .changes(change)
            .build()
            .map_err(err)?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(change_batch)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(())
    }
}
