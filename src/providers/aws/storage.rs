use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, Grant, IndexDocument,
    ObjectOwnership, OwnershipControls, OwnershipControlsRule, Permission, Protocol,
    RedirectAllRequestsTo, WebsiteConfiguration,
};
use aws_sdk_s3::error::BuildError;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{build_error, sdk_error, GLOBAL_REGION};
use crate::error::ProviderResult;
use crate::providers::{Acl, ObjectStore, ObjectUpload, RedirectProtocol, WebsiteConfig};

const SERVICE: &str = "s3";

/// Group URI of anonymous readers
const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Grantee for anonymous read access
const ALL_USERS_GRANT: &str = "uri=http://acs.amazonaws.com/groups/global/AllUsers";

/// S3 in the deployment region
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn redirect_protocol(protocol: &Protocol) -> Option<RedirectProtocol> {
    match protocol.as_str() {
        "http" => Some(RedirectProtocol::Http),
        "https" => Some(RedirectProtocol::Https),
        _ => None,
    }
}

fn grants_public_read(grant: &Grant) -> bool {
    let everyone = grant
        .grantee()
        .and_then(|g| g.uri())
        .is_some_and(|uri| uri == ALL_USERS_URI);
    let readable = matches!(
        grant.permission(),
        Some(Permission::Read) | Some(Permission::FullControl)
    );
    everyone && readable
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn head_bucket(&self, name: &str) -> ProviderResult<bool> {
        match self.client.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(sdk_error(SERVICE, err)),
        }
    }

    async fn create_bucket(&self, name: &str, region: &str) -> ProviderResult<()> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(name)
            .object_ownership(ObjectOwnership::ObjectWriter);

        // us-east-1 rejects an explicit location constraint
        if region != GLOBAL_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        request.send().await.map_err(|e| sdk_error(SERVICE, e))?;
        Ok(())
    }

    async fn is_world_readable(&self, name: &str) -> ProviderResult<bool> {
        let blocked = match self.client.get_public_access_block().bucket(name).send().await {
            Ok(output) => output
                .public_access_block_configuration()
                .is_some_and(|c| c.block_public_acls().unwrap_or(false) || c.ignore_public_acls().unwrap_or(false)),
            Err(err)
                if err
                    .as_service_error()
                    .and_then(|e| e.code())
                    .is_some_and(|c| c == "NoSuchPublicAccessBlockConfiguration") =>
            {
                false
            }
            Err(err) => return Err(sdk_error(SERVICE, err)),
        };
        if blocked {
            debug!(bucket = name, "Public ACLs are blocked");
            return Ok(false);
        }

        let acl = self
            .client
            .get_bucket_acl()
            .bucket(name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(acl.grants().iter().any(grants_public_read))
    }

    async fn make_world_readable(&self, name: &str, acl: Acl) -> ProviderResult<()> {
        let err = |e: BuildError| build_error(SERVICE, e);

        // ACLs are ignored while the bucket owner enforces ownership
        let ownership = OwnershipControls::builder()
            .rules(
                OwnershipControlsRule::builder()
                    .object_ownership(ObjectOwnership::ObjectWriter)
                    .build()
                    .map_err(err)?,
            )
            .build()
            .map_err(err)?;
        self.client
            .put_bucket_ownership_controls()
            .bucket(name)
            .ownership_controls(ownership)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        self.client
            .delete_public_access_block()
            .bucket(name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        let canned = match acl {
            Acl::PublicRead => BucketCannedAcl::PublicRead,
        };
        self.client
            .put_bucket_acl()
            .bucket(name)
            .acl(canned)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;

        Ok(())
    }

    async fn get_website_config(&self, name: &str) -> ProviderResult<Option<WebsiteConfig>> {
        let website = match self.client.get_bucket_website().bucket(name).send().await {
            Ok(website) => website,
            Err(err)
                if err
                    .as_service_error()
                    .and_then(|e| e.code())
                    .is_some_and(|c| c == "NoSuchWebsiteConfiguration") =>
            {
                return Ok(None);
            }
            Err(err) => return Err(sdk_error(SERVICE, err)),
        };

        if let Some(redirect) = website.redirect_all_requests_to() {
            return Ok(Some(WebsiteConfig::RedirectAll {
                host_name: redirect.host_name().to_string(),
                protocol: redirect.protocol().and_then(redirect_protocol),
            }));
        }

        Ok(website.index_document().map(|index| WebsiteConfig::Index {
            suffix: index.suffix().to_string(),
        }))
    }

    async fn put_website_config(&self, name: &str, config: &WebsiteConfig) -> ProviderResult<()> {
        let website = match config {
            WebsiteConfig::Index { suffix } => WebsiteConfiguration::builder()
                .index_document(
                    IndexDocument::builder()
                        .suffix(suffix)
                        .build()
                        .map_err(|e| build_error(SERVICE, e))?,
                )
                .build(),
            WebsiteConfig::RedirectAll {
                host_name,
                protocol,
            } => WebsiteConfiguration::builder()
                .redirect_all_requests_to(
                    RedirectAllRequestsTo::builder()
                        .host_name(host_name)
                        .set_protocol(protocol.map(|p| Protocol::from(p.as_str())))
                        .build()
                        .map_err(|e| build_error(SERVICE, e))?,
                )
                .build(),
        };

        self.client
            .put_bucket_website()
            .bucket(name)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, e))?;
        Ok(())
    }

    async fn put_object(&self, upload: ObjectUpload) -> ProviderResult<()> {
        let request = self
            .client
            .put_object()
            .bucket(&upload.bucket)
            .key(&upload.key)
            .content_type(&upload.content_type)
            .body(ByteStream::from(upload.body));

        let request = match upload.acl {
            Acl::PublicRead => request.grant_read(ALL_USERS_GRANT),
        };

        request.send().await.map_err(|e| sdk_error(SERVICE, e))?;
        debug!(bucket = %upload.bucket, key = %upload.key, "Uploaded object");
        Ok(())
    }
}
