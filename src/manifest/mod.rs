mod declarative;
mod script;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::answers::AnswerSet;
use crate::error::{CreateError, Result};
use crate::transform::RuleSet;

pub use declarative::DeclarativeProducer;
pub use script::{create_engine, ScriptProducer};

pub const MANIFEST_FILE: &str = ".ut-create";

/// Turns a final answer set into the rules that customise the template.
pub trait RuleProducer: Send + Sync {
    fn rename(&self, answers: &AnswerSet) -> Result<RuleSet>;
}

/// The `params` a template exports for its configuration form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestParams {
    /// JSON-Schema-like description of the expected answers.
    pub schema: Value,
    /// Literal defaults declared by the template.
    pub form_data: AnswerSet,
}

impl ManifestParams {
    fn from_value(path: &Path, value: Value) -> Result<Self> {
        let invalid = |message: &str| CreateError::ManifestInvalid {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        let Value::Object(mut params) = value else {
            return Err(invalid("'params' must be a map"));
        };

        let schema = params.remove("schema").unwrap_or(Value::Null);
        if !schema.is_object() {
            return Err(invalid("'params.schema' must be a map"));
        }

        let form_data = match params.remove("formData") {
            None | Some(Value::Null) => AnswerSet::new(),
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(_) => return Err(invalid("'params.formData' must be a map")),
        };

        Ok(Self { schema, form_data })
    }
}

/// A loaded `.ut-create` manifest.
pub struct ParameterManifest {
    pub path: PathBuf,
    pub params: ManifestParams,
    producer: Box<dyn RuleProducer>,
}

impl ParameterManifest {
    pub fn new(path: PathBuf, params: ManifestParams, producer: Box<dyn RuleProducer>) -> Self {
        Self {
            path,
            params,
            producer,
        }
    }

    pub fn rename(&self, answers: &AnswerSet) -> Result<RuleSet> {
        self.producer.rename(answers)
    }
}

/// Load the manifest at the root of a materialized template.
///
/// A file that parses as TOML with a `params` or `rename` key is declarative;
/// anything else is treated as a Rhai script.
pub fn load_manifest(root: &Path) -> Result<ParameterManifest> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(CreateError::ManifestNotFound { path });
    }

    let source = std::fs::read_to_string(&path).map_err(|e| CreateError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;

    let (params, producer): (ManifestParams, Box<dyn RuleProducer>) =
        match declarative::parse(&source) {
            Some(table) => {
                let (params, producer) = DeclarativeProducer::load(&path, table)?;
                (params, Box::new(producer))
            }
            None => {
                let (params, producer) = ScriptProducer::load(&path, &source)?;
                (params, Box::new(producer))
            }
        };

    Ok(ParameterManifest::new(path, params, producer))
}
