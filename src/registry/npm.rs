use std::collections::HashMap;

use serde::Deserialize;

use super::{RegistryClient, RepositoryRef};
use crate::error::{CreateError, Result};
use crate::log::Log;

pub const DEFAULT_REGISTRY_URL: &str = "https://nexus.softwaregroup.com/repository/npm-all/";

/// An npm-compatible registry reached over HTTP.
pub struct NpmRegistry {
    base_url: String,
    log: Log,
}

#[derive(Deserialize)]
struct PackageDocument {
    description: Option<String>,
    repository: Option<Repository>,
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, VersionManifest>,
}

#[derive(Deserialize)]
struct VersionManifest {
    description: Option<String>,
    repository: Option<Repository>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repository {
    Url(String),
    Detailed { url: String },
}

impl Repository {
    fn url(&self) -> &str {
        match self {
            Self::Url(url) | Self::Detailed { url } => url,
        }
    }
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>, log: Log) -> Self {
        Self {
            base_url: base_url.into(),
            log,
        }
    }

    pub fn package_url(&self, package: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            package.replace('/', "%2F")
        )
    }
}

impl RegistryClient for NpmRegistry {
    fn lookup(&self, package: &str) -> Result<RepositoryRef> {
        let url = self.package_url(package);
        self.log.debug(format!("fetching {url}"));

        let response = ureq::get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("ut-create/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| {
                let message = match &e {
                    ureq::Error::StatusCode(404) => "package not found".to_string(),
                    ureq::Error::StatusCode(code) => format!("registry responded with HTTP {code}"),
                    other => format!("HTTP request failed: {other}"),
                };
                CreateError::Registry {
                    package: package.to_string(),
                    message,
                }
            })?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| CreateError::Registry {
                package: package.to_string(),
                message: format!("failed to read response body: {e}"),
            })?;

        parse_package_document(package, &body)
    }
}

/// Extract the repository of the latest published version, falling back to
/// the document-level fields.
pub fn parse_package_document(package: &str, json: &str) -> Result<RepositoryRef> {
    let doc: PackageDocument = serde_json::from_str(json).map_err(|e| CreateError::Registry {
        package: package.to_string(),
        message: format!("invalid registry response: {e}"),
    })?;

    let latest = doc
        .dist_tags
        .get("latest")
        .and_then(|version| doc.versions.get(version));

    let repository = latest
        .and_then(|v| v.repository.as_ref())
        .or(doc.repository.as_ref())
        .ok_or_else(|| CreateError::MissingRepository {
            package: package.to_string(),
        })?;

    let description = latest
        .and_then(|v| v.description.clone())
        .or(doc.description)
        .unwrap_or_default();

    Ok(RepositoryRef {
        clone_url: clone_url(repository.url()),
        description,
    })
}

/// npm records git URLs as `git+https://...`; git itself wants the bare scheme.
fn clone_url(raw: &str) -> String {
    raw.strip_prefix("git+").unwrap_or(raw).to_string()
}
