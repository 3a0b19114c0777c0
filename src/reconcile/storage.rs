//! Website Bucket
//!
//! Makes sure the content bucket exists, is publicly readable and is
//! configured as a website (or as a redirect to another host).

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DeployResult;
use crate::providers::{Acl, ObjectStore, RedirectProtocol, WebsiteConfig};
use crate::reporter::Reporter;

pub const INDEX_DOCUMENT: &str = "index.html";

/// Regions that still use the dash form of the website endpoint
const DASH_ENDPOINT_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "eu-west-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// Website endpoint hostname of a bucket
pub fn website_endpoint(bucket: &str, region: &str) -> String {
    if DASH_ENDPOINT_REGIONS.contains(&region) {
        format!("{}.s3-website-{}.amazonaws.com", bucket, region)
    } else {
        format!("{}.s3-website.{}.amazonaws.com", bucket, region)
    }
}

/// Website configuration for a deployment: redirect-all when a target is
/// set, otherwise an index document
pub fn desired_website(redirect_target: Option<&str>) -> WebsiteConfig {
    let Some(target) = redirect_target else {
        return WebsiteConfig::Index {
            suffix: INDEX_DOCUMENT.to_string(),
        };
    };

    let (protocol, rest) = if let Some(rest) = target.strip_prefix("https://") {
        (Some(RedirectProtocol::Https), rest)
    } else if let Some(rest) = target.strip_prefix("http://") {
        (Some(RedirectProtocol::Http), rest)
    } else {
        (None, target)
    };

    let host_name = rest.split('/').next().unwrap_or(rest).to_string();
    WebsiteConfig::RedirectAll {
        host_name,
        protocol,
    }
}

pub struct StorageReconciler {
    storage: Arc<dyn ObjectStore>,
    reporter: Reporter,
}

impl StorageReconciler {
    pub fn new(storage: Arc<dyn ObjectStore>, reporter: Reporter) -> Self {
        Self { storage, reporter }
    }

    /// Ensure the bucket and its website configuration; returns the
    /// website endpoint
    pub async fn ensure_bucket(
        &self,
        name: &str,
        region: &str,
        redirect_target: Option<&str>,
    ) -> DeployResult<String> {
        self.reporter.step(format!("Checking bucket {}", name));

        if self.storage.head_bucket(name).await? {
            debug!(bucket = name, "Bucket exists");
        } else {
            self.storage.create_bucket(name, region).await?;
            info!(bucket = name, region, "Created bucket");
        }

        // Checked on every run so an interrupted create still converges
        if self.storage.is_world_readable(name).await? {
            debug!(bucket = name, "Bucket is publicly readable");
        } else {
            self.storage.make_world_readable(name, Acl::PublicRead).await?;
            info!(bucket = name, "Granted public read");
        }

        let desired = desired_website(redirect_target);
        match self.storage.get_website_config(name).await? {
            None => {
                self.storage.put_website_config(name, &desired).await?;
                info!(bucket = name, config = ?desired, "Configured bucket website");
            }
            Some(existing) if existing == desired => {
                debug!(bucket = name, "Website configuration up to date");
            }
            Some(existing) => {
                self.reporter.warn(format!(
                    "Bucket {} already has a different website configuration ({:?}); leaving it unchanged",
                    name, existing
                ));
            }
        }

        let endpoint = website_endpoint(name, region);
        self.reporter.done(format!("Bucket {} serves {}", name, endpoint));
        Ok(endpoint)
    }
}
