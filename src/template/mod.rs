pub mod clone;
pub mod source;

pub use clone::{remote_url, GitCli, VersionControl};
pub use source::{resolve_source, Category, TemplateSource, TemplateSpec};
