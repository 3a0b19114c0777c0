use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CachedMethods, CookiePreference, CustomOriginConfig,
    DefaultCacheBehavior, DistributionConfig as CfDistributionConfig, ForwardedValues,
    GeoRestriction, GeoRestrictionType, InvalidationBatch, ItemSelection, Method,
    MinimumProtocolVersion, Origin, OriginProtocolPolicy, Origins, Paths, PriceClass,
    Restrictions, SslSupportMethod as CfSslSupportMethod, ViewerCertificate as CfViewerCertificate,
    ViewerProtocolPolicy,
};
use aws_sdk_cloudfront::error::BuildError;
use aws_sdk_cloudfront::Client;
use chrono::Utc;

use super::{build_error, sdk_error, GLOBAL_REGION};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::{
    Cdn, DeploymentStatus, DistributionConfig, DistributionHandle, DistributionSummary,
    HttpMethod, InvalidationHandle, InvalidationStatus, SslSupportMethod,
};

const SERVICE: &str = "cloudfront";

/// CloudFront (a global service, addressed through us-east-1)
pub struct CloudFrontCdn {
    client: Client,
}

impl CloudFrontCdn {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_cloudfront::config::Builder::from(sdk_config)
            .region(Region::new(GLOBAL_REGION))
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

fn deployment_status(status: &str) -> DeploymentStatus {
    if status == "Deployed" {
        DeploymentStatus::Deployed
    } else {
        DeploymentStatus::InProgress
    }
}

fn methods(methods: &[HttpMethod]) -> Vec<Method> {
    methods.iter().map(|m| Method::from(m.as_str())).collect()
}

fn to_sdk_config(config: &DistributionConfig) -> ProviderResult<CfDistributionConfig> {
    let err = |e: BuildError| build_error(SERVICE, e);
    let behavior = &config.default_behavior;

    let origin = Origin::builder()
        .id(&config.origin.id)
        .domain_name(&config.origin.domain_name)
        .custom_origin_config(
            CustomOriginConfig::builder()
                .http_port(config.origin.http_port)
                .https_port(config.origin.https_port)
                .origin_protocol_policy(OriginProtocolPolicy::from(config.origin.protocol_policy.as_str()))
                .build()
                .map_err(err)?,
        )
        .build()
        .map_err(err)?;

    let cached_methods = CachedMethods::builder()
        .quantity(behavior.cached_methods.len() as i32)
        .set_items(Some(methods(&behavior.cached_methods)))
        .build()
        .map_err(err)?;

    let allowed_methods = AllowedMethods::builder()
        .quantity(behavior.allowed_methods.len() as i32)
        .set_items(Some(methods(&behavior.allowed_methods)))
        .cached_methods(cached_methods)
        .build()
        .map_err(err)?;

    let cookies = CookiePreference::builder()
        .forward(if behavior.forward_cookies {
            ItemSelection::All
        } else {
            ItemSelection::None
        })
        .build()
        .map_err(err)?;

    let default_cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&behavior.target_origin_id)
        .viewer_protocol_policy(ViewerProtocolPolicy::from(behavior.viewer_protocol.as_str()))
        .allowed_methods(allowed_methods)
        .compress(behavior.compress)
        .forwarded_values(
            ForwardedValues::builder()
                .query_string(behavior.forward_query_string)
                .cookies(cookies)
                .build()
                .map_err(err)?,
        )
        .min_ttl(behavior.min_ttl)
        .build()
        .map_err(err)?;

    let ssl_support_method = match config.certificate.ssl_support_method {
        SslSupportMethod::SniOnly => CfSslSupportMethod::SniOnly,
    };
    let viewer_certificate = CfViewerCertificate::builder()
        .acm_certificate_arn(&config.certificate.acm_certificate_arn)
        .ssl_support_method(ssl_support_method)
        .minimum_protocol_version(MinimumProtocolVersion::from(
            config.certificate.minimum_protocol_version.as_str(),
        ))
        .build();

    let restrictions = Restrictions::builder()
        .geo_restriction(
            GeoRestriction::builder()
                .restriction_type(GeoRestrictionType::None)
                .quantity(0)
                .build()
                .map_err(err)?,
        )
        .build();

    CfDistributionConfig::builder()
        .caller_reference(&config.caller_reference)
        .comment(&config.comment)
        .enabled(true)
        .aliases(
            Aliases::builder()
                .quantity(config.aliases.len() as i32)
                .set_items(Some(config.aliases.clone()))
                .build()
                .map_err(err)?,
        )
        .origins(
            Origins::builder()
                .quantity(1)
                .items(origin)
                .build()
                .map_err(err)?,
        )
        .default_cache_behavior(default_cache_behavior)
        .viewer_certificate(viewer_certificate)
        .price_class(PriceClass::from(config.price_class.as_str()))
        .restrictions(restrictions)
        .build()
        .map_err(err)
}

#[async_trait]
impl Cdn for CloudFrontCdn {
    async fn list_distributions(&self) -> ProviderResult<Vec<DistributionSummary>> {
        let mut distributions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_distributions()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, e))?;

            let Some(list) = page.distribution_list() else {
                return Ok(distributions);
            };

            distributions.extend(list.items().iter().map(|d| DistributionSummary {
                id: d.id().to_string(),
                domain_name: d.domain_name().to_string(),
                origin_domains: d
                    .origins()
                    .map(|o| o.items().iter().map(|i| i.domain_name().to_string()).collect())
                    .unwrap_or_default(),
                status: deployment_status(d.status()),
            }));

            match list.next_marker() {
                Some(next) if list.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(distributions),
            }
        }
    }

    async fn create_distribution(&self, config: &DistributionConfig) -> ProviderResult<DistributionHandle> {
        let result = self
            .client
            .create_distribution()
            .distribution_config(to_sdk_config(config)?)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let distribution = result
            .distribution()
            .ok_or_else(|| ProviderError::malformed(SERVICE, "CreateDistribution returned no distribution"))?;

        Ok(DistributionHandle {
            id: distribution.id().to_string(),
            domain_name: distribution.domain_name().to_string(),
        })
    }

    async fn distribution_status(&self, id: &str) -> ProviderResult<DeploymentStatus> {
        let result = self
            .client
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        result
            .distribution()
            .map(|d| deployment_status(d.status()))
            .ok_or_else(|| ProviderError::NotFound {
                service: SERVICE,
                resource: id.to_string(),
            })
    }

    async fn create_invalidation(&self, distribution_id: &str, paths: &[String]) -> ProviderResult<InvalidationHandle> {
        let err = |e: BuildError| build_error(SERVICE, e);
        let batch = InvalidationBatch::builder()
            .caller_reference(format!("scarr-{}", Utc::now().timestamp_millis()))
            .paths(
                Paths::builder()
                    .quantity(paths.len() as i32)
                    .set_items(Some(paths.to_vec()))
                    .build()
                    .map_err(err)?,
            )
            .build()
            .map_err(err)?;

        let result = self
            .client
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let invalidation = result
            .invalidation()
            .ok_or_else(|| ProviderError::malformed(SERVICE, "CreateInvalidation returned no invalidation"))?;

        Ok(InvalidationHandle {
            distribution_id: distribution_id.to_string(),
            id: invalidation.id().to_string(),
        })
    }

    async fn invalidation_status(&self, handle: &InvalidationHandle) -> ProviderResult<InvalidationStatus> {
        let result = self
            .client
            .get_invalidation()
            .distribution_id(&handle.distribution_id)
            .id(&handle.id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let status = result
            .invalidation()
            .map(|i| i.status())
            .ok_or_else(|| ProviderError::NotFound {
                service: SERVICE,
                resource: handle.id.clone(),
            })?;

        Ok(if status == "Completed" {
            InvalidationStatus::Completed
        } else {
            InvalidationStatus::InProgress
        })
    }
}
