mod npm;

use crate::error::Result;

pub use npm::{parse_package_document, NpmRegistry, DEFAULT_REGISTRY_URL};

/// Where a template's source lives, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Clone URL; contains the template name so it can be rewritten for the project.
    pub clone_url: String,
    pub description: String,
}

/// Looks up template packages by name.
pub trait RegistryClient {
    fn lookup(&self, package: &str) -> Result<RepositoryRef>;
}
