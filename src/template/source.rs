use std::path::{Component, Path, PathBuf};

use crate::error::{CreateError, Result};

pub const DEFAULT_KEYWORD: &str = "app";
pub const DEFAULT_PROJECT_DIR: &str = ".";

/// Directory-name prefixes a project root must carry.
const PROJECT_PREFIXES: &[(&str, &str)] = &[("impl-", "impl"), ("ut-", "ut")];

/// Template family selected by the first segment of the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Microservice,
    Port,
    Implementation,
    Module,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Self::Microservice => "Microservice ",
            Self::Port => "Port ",
            Self::Implementation => "Implementation ",
            Self::Module => "Module ",
        }
    }
}

/// Where the project tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Fetched from the registry and cloned into `root`.
    Registry,
    /// `root` is an existing project; nothing is fetched or cloned.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    pub canonical_name: String,
    pub title: String,
    pub root: PathBuf,
    pub source: TemplateSource,
}

impl TemplateSpec {
    pub fn is_local(&self) -> bool {
        self.source == TemplateSource::Local
    }

    /// The final path component of the project root.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A drive letter, `.`, `/` or `\` at the start marks a filesystem path.
pub fn is_local_path(keyword: &str) -> bool {
    let mut chars = keyword.chars();
    match chars.next() {
        Some('.') | Some('/') | Some('\\') => true,
        Some(c) if c.is_ascii_alphabetic() => chars.next() == Some(':'),
        _ => false,
    }
}

/// Resolve the CLI keyword and project directory into a [`TemplateSpec`].
///
/// Pure: relative paths are joined onto `cwd` and cleaned lexically, nothing
/// on disk is inspected.
pub fn resolve_source(
    keyword: Option<&str>,
    project_dir: Option<&str>,
    cwd: &Path,
) -> Result<TemplateSpec> {
    let keyword = keyword
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_KEYWORD);

    if is_local_path(keyword) {
        let root = normalize(&cwd.join(keyword));
        let name = dir_name(&root)?;
        let title = format!("{}{}", Category::Module.label(), strip_project_prefix(&name));
        return Ok(TemplateSpec {
            canonical_name: name,
            title,
            root,
            source: TemplateSource::Local,
        });
    }

    let root = normalize(&cwd.join(project_dir.unwrap_or(DEFAULT_PROJECT_DIR)));
    let name = dir_name(&root)?;
    let (prefix, bare_name) = split_project_prefix(&name)
        .ok_or_else(|| CreateError::InvalidProjectDir { name: name.clone() })?;

    let (category, canonical_name) = canonical_template(keyword, prefix);

    Ok(TemplateSpec {
        canonical_name,
        title: format!("{}{}", category.label(), bare_name),
        root,
        source: TemplateSource::Registry,
    })
}

/// Map a keyword like `ms-gateway` onto its registry package name.
pub fn canonical_template(keyword: &str, dir_prefix: &str) -> (Category, String) {
    let mut parts: Vec<&str> = keyword.split('-').collect();
    let category = match parts[0] {
        "ms" | "service" | "microservice" => {
            parts[0] = "ut-microservice";
            Category::Microservice
        }
        "port" => {
            parts[0] = "ut-port-template";
            Category::Port
        }
        "app" => {
            parts[0] = "impl-application";
            Category::Implementation
        }
        _ => {
            parts.insert(0, dir_prefix);
            Category::Module
        }
    };
    (category, parts.join("-"))
}

fn split_project_prefix(name: &str) -> Option<(&'static str, &str)> {
    PROJECT_PREFIXES
        .iter()
        .find_map(|&(prefix, short)| name.strip_prefix(prefix).map(|rest| (short, rest)))
}

fn strip_project_prefix(name: &str) -> &str {
    split_project_prefix(name).map_or(name, |(_, rest)| rest)
}

fn dir_name(root: &Path) -> Result<String> {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CreateError::UnnamedProjectDir {
            path: root.to_path_buf(),
        })
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cwd() -> PathBuf {
        PathBuf::from("/work")
    }

    #[test]
    fn service_keyword_resolves_microservice() {
        let spec = resolve_source(Some("service"), Some("ut-billing"), &cwd()).unwrap();
        assert_eq!(spec.canonical_name, "ut-microservice");
        assert_eq!(spec.title, "Microservice billing");
        assert_eq!(spec.root, PathBuf::from("/work/ut-billing"));
        assert_eq!(spec.source, TemplateSource::Registry);
    }

    #[rstest]
    #[case("ms", "ut-microservice")]
    #[case("microservice", "ut-microservice")]
    #[case("ms-gateway", "ut-microservice-gateway")]
    #[case("port", "ut-port-template")]
    #[case("port-tcp", "ut-port-template-tcp")]
    #[case("app", "impl-application")]
    #[case("app-mobile", "impl-application-mobile")]
    #[case("standard", "impl-standard")]
    #[case("standard-lib", "impl-standard-lib")]
    fn keyword_table(#[case] keyword: &str, #[case] expected: &str) {
        let spec = resolve_source(Some(keyword), Some("impl-demo"), &cwd()).unwrap();
        assert_eq!(spec.canonical_name, expected);
    }

    #[test]
    fn unknown_keyword_takes_prefix_from_directory() {
        let spec = resolve_source(Some("dispatch"), Some("ut-dispatch"), &cwd()).unwrap();
        assert_eq!(spec.canonical_name, "ut-dispatch");
        assert_eq!(spec.title, "Module dispatch");
    }

    #[rstest]
    #[case("port", "ut-tcp", "Port tcp")]
    #[case("app", "impl-wallet", "Implementation wallet")]
    #[case("other", "impl-x", "Module x")]
    fn titles_combine_label_and_bare_name(
        #[case] keyword: &str,
        #[case] dir: &str,
        #[case] title: &str,
    ) {
        let spec = resolve_source(Some(keyword), Some(dir), &cwd()).unwrap();
        assert_eq!(spec.title, title);
    }

    #[test]
    fn defaults_to_app_in_current_directory() {
        let spec = resolve_source(None, None, Path::new("/src/impl-wallet")).unwrap();
        assert_eq!(spec.canonical_name, "impl-application");
        assert_eq!(spec.title, "Implementation wallet");
        assert_eq!(spec.root, PathBuf::from("/src/impl-wallet"));
    }

    #[test]
    fn relative_directory_is_normalized() {
        let spec = resolve_source(Some("ms"), Some("./nested/../ut-orders"), &cwd()).unwrap();
        assert_eq!(spec.root, PathBuf::from("/work/ut-orders"));
    }

    #[test]
    fn local_path_keyword_skips_remote_resolution() {
        let spec = resolve_source(Some("./local-proj"), None, &cwd()).unwrap();
        assert!(spec.is_local());
        assert_eq!(spec.root, PathBuf::from("/work/local-proj"));
        assert_eq!(spec.canonical_name, "local-proj");
    }

    #[test]
    fn unprefixed_directory_is_a_usage_error() {
        let err = resolve_source(Some("service"), Some("billing"), &cwd()).unwrap_err();
        match err {
            CreateError::InvalidProjectDir { name } => assert_eq!(name, "billing"),
            other => panic!("expected InvalidProjectDir, got: {other:?}"),
        }
    }

    #[test]
    fn filesystem_root_has_no_name() {
        let err = resolve_source(Some("app"), Some("/"), &cwd()).unwrap_err();
        assert!(matches!(err, CreateError::UnnamedProjectDir { .. }));
    }

    #[rstest]
    #[case("./x", true)]
    #[case("../x", true)]
    #[case("/abs/x", true)]
    #[case("\\\\share\\x", true)]
    #[case("C:\\work\\x", true)]
    #[case("d:/x", true)]
    #[case("service", false)]
    #[case("ms-gateway", false)]
    #[case("", false)]
    fn detects_local_paths(#[case] keyword: &str, #[case] expected: bool) {
        assert_eq!(is_local_path(keyword), expected);
    }
}
