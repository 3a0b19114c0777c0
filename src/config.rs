//! Deployment Configuration
//!
//! Loads `scarr.yml` once per run and validates everything up front:
//! domain, region, exclude regexes and registrant contact details.
//! The resulting `DeploymentSpec` is never mutated afterwards.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "scarr.yml";
pub const DEFAULT_REGION: &str = "us-west-1";

/// Always excluded from sync, ahead of configured patterns
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".DS_Store"];

/// Registrant contact type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactType {
    #[default]
    Person,
    Company,
    Association,
    PublicBody,
    Reseller,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Person => "PERSON",
            ContactType::Company => "COMPANY",
            ContactType::Association => "ASSOCIATION",
            ContactType::PublicBody => "PUBLIC_BODY",
            ContactType::Reseller => "RESELLER",
        }
    }
}

/// Contact details the registrar requires for a new registration.
///
/// Passed through to the registrar unchanged; validated once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub contact_type: ContactType,
    #[serde(default)]
    pub organization: Option<String>,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    /// ISO 3166 two-letter code, e.g. "US"
    pub country_code: String,
    pub zip_code: String,
    /// Registrar format: "+1.5555551234"
    pub phone_number: String,
    pub email: String,
}

impl ContactDetails {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("zip_code", &self.zip_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                bail!("contact.{} must not be empty", field);
            }
        }

        if self.country_code.len() != 2 || !self.country_code.chars().all(|c| c.is_ascii_uppercase()) {
            bail!(
                "contact.country_code must be a two-letter uppercase code, got '{}'",
                self.country_code
            );
        }

        let phone = Regex::new(r"^\+\d{1,3}\.\d{4,}$").context("Invalid phone pattern")?;
        if !phone.is_match(&self.phone_number) {
            bail!(
                "contact.phone_number must look like +1.5555551234, got '{}'",
                self.phone_number
            );
        }

        match self.email.split_once('@') {
            Some((user, host)) if !user.is_empty() && host.contains('.') => Ok(()),
            _ => bail!("contact.email is not an email address: '{}'", self.email),
        }
    }
}

/// Compiled exclude regexes (unanchored, matched against relative paths)
/// plus individual files excluded by location
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    patterns: Vec<Regex>,
    files: Vec<PathBuf>,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .with_context(|| format!("Invalid exclude regex: {}", p.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            files: Vec::new(),
        })
    }

    /// Default excludes followed by `configured`
    pub fn with_defaults<S: AsRef<str>>(configured: &[S]) -> Result<Self> {
        let all: Vec<&str> = DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(configured.iter().map(|p| p.as_ref()))
            .collect();
        Self::new(&all)
    }

    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(relative_path))
    }

    /// Also exclude this exact file, wherever the content root puts it
    pub fn with_file(mut self, path: &Path) -> Self {
        self.files.push(canonical(path));
        self
    }

    pub fn is_excluded_file(&self, path: &Path) -> bool {
        !self.files.is_empty() && self.files.contains(&canonical(path))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// `scarr.yml` as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub domain: String,
    pub name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactDetails>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Validated target state of one deployment
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub domain: String,
    pub project_name: String,
    pub region: String,
    pub redirect_target: Option<String>,
    pub registrant_contact: Option<ContactDetails>,
    pub bucket: String,
    pub content_root: PathBuf,
    pub excludes: ExcludeSet,
}

impl DeploymentSpec {
    /// Read and validate a config file. The file itself is never synced.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Error reading {}", path.display()))?;

        let file: ConfigFile = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Error parsing {}", path.display()))?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut spec = Self::from_config(file, base)?;
        spec.excludes = spec.excludes.with_file(path);
        Ok(spec)
    }

    /// Validate a parsed config; relative content roots resolve against `base`
    pub fn from_config(file: ConfigFile, base: &Path) -> Result<Self> {
        let domain = file.domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            bail!("domain must not be empty");
        }
        if domain.contains("://") || domain.contains('/') {
            bail!("domain must be a bare domain name (e.g. example.com), got '{}'", file.domain);
        }
        if !domain.contains('.') {
            bail!("domain must include a top-level domain, got '{}'", file.domain);
        }

        if file.name.trim().is_empty() {
            bail!("name must not be empty");
        }
        if file.region.trim().is_empty() {
            bail!("region must not be empty");
        }

        if let Some(contact) = &file.contact {
            contact.validate().context("Invalid registrant contact")?;
        }

        let redirect_target = file
            .redirect
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let content_root = match file.content_root {
            Some(root) if root.is_absolute() => root,
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };

        Ok(Self {
            bucket: file.bucket.unwrap_or_else(|| domain.clone()),
            domain,
            project_name: file.name,
            region: file.region,
            redirect_target,
            registrant_contact: file.contact,
            content_root,
            excludes: ExcludeSet::with_defaults(&file.exclude)?,
        })
    }
}
