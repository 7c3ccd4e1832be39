use std::path::Path;

use serde_json::{json, Value};
use tera::{Context, Tera};

use super::{ManifestParams, RuleProducer};
use crate::answers::AnswerSet;
use crate::error::{CreateError, Result};
use crate::transform::{parse_rules, RuleSet};

/// Returns the table when `source` is a declarative (TOML) manifest.
pub(super) fn parse(source: &str) -> Option<toml::Table> {
    let table: toml::Table = toml::from_str(source).ok()?;
    (table.contains_key("params") || table.contains_key("rename")).then_some(table)
}

/// A `.ut-create` written in TOML: `[params]` plus `[[rename]]` tables whose
/// strings are Tera templates rendered against the answers.
pub struct DeclarativeProducer {
    rules: Vec<Value>,
}

impl DeclarativeProducer {
    pub fn load(path: &Path, mut table: toml::Table) -> Result<(ManifestParams, Self)> {
        let to_json = |value: toml::Value| {
            serde_json::to_value(value).map_err(|e| CreateError::ManifestInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        };

        let params = match table.remove("params") {
            Some(value) => to_json(value)?,
            None => json!({ "schema": {} }),
        };

        let rules = match table.remove("rename") {
            None => Vec::new(),
            Some(toml::Value::Array(items)) => {
                items.into_iter().map(to_json).collect::<Result<_>>()?
            }
            Some(_) => {
                return Err(CreateError::ManifestInvalid {
                    path: path.to_path_buf(),
                    message: "'rename' must be an array of tables ([[rename]])".into(),
                })
            }
        };

        Ok((ManifestParams::from_value(path, params)?, Self { rules }))
    }
}

impl RuleProducer for DeclarativeProducer {
    fn rename(&self, answers: &AnswerSet) -> Result<RuleSet> {
        let mut context = Context::new();
        for (key, value) in answers {
            context.insert(key, value);
        }

        let rendered = self
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| render_value(rule, &context, index, "rule"))
            .collect::<Result<Vec<_>>>()?;

        parse_rules(&Value::Array(rendered))
    }
}

fn render_value(value: &Value, context: &Context, index: usize, field: &str) -> Result<Value> {
    match value {
        Value::String(s) if s.contains("{{") || s.contains("{%") => Tera::one_off(s, context, false)
            .map(Value::String)
            .map_err(|e| CreateError::RuleTemplate {
                index,
                field: field.to_string(),
                source: e,
            }),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, context, index, field))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), render_value(item, context, index, key)?)))
            .collect::<Result<serde_json::Map<_, _>>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[params.schema]
type = "object"

[params.schema.properties.name]
type = "string"
title = "Implementation name"

[params.formData]
name = "demo"

[[rename]]
files = "package.json"
replace = ["impl-application", "impl-{{ name }}"]

[[rename]]
files = "src/**/*.js"
replace = [["/Application(\\w*)/g", "{{ name | title }}$1"], ["TODO", "done"]]
"#;

    fn load(source: &str) -> Result<(ManifestParams, DeclarativeProducer)> {
        let table = parse(source).expect("declarative manifest");
        DeclarativeProducer::load(Path::new(".ut-create"), table)
    }

    fn answers(name: &str) -> AnswerSet {
        AnswerSet::from([("name".to_string(), json!(name))])
    }

    #[test]
    fn detects_declarative_manifests() {
        assert!(parse(MANIFEST).is_some());
        assert!(parse("fn rename(answers) { [] }").is_none());
        assert!(parse("title = \"not a manifest\"").is_none());
    }

    #[test]
    fn loads_params() {
        let (params, _) = load(MANIFEST).unwrap();
        assert_eq!(params.form_data["name"], json!("demo"));
        assert_eq!(params.schema["type"], json!("object"));
    }

    #[test]
    fn renders_rules_against_answers() {
        let (_, producer) = load(MANIFEST).unwrap();
        let rules = producer.rename(&answers("wallet")).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].apply("\"impl-application\""), "\"impl-wallet\"");
        assert_eq!(
            rules[1].apply("new ApplicationServer(); // TODO"),
            "new WalletServer(); // done"
        );
    }

    #[test]
    fn undefined_answer_is_a_template_error() {
        let (_, producer) = load(MANIFEST).unwrap();
        let err = producer.rename(&AnswerSet::new()).unwrap_err();
        match err {
            CreateError::RuleTemplate { index, field, .. } => {
                assert_eq!(index, 0);
                assert_eq!(field, "replace");
            }
            other => panic!("expected RuleTemplate, got: {other:?}"),
        }
    }

    #[test]
    fn params_are_optional() {
        let (params, producer) = load("[[rename]]\nfiles = \"a\"\nreplace = [\"x\", \"y\"]\n").unwrap();
        assert!(params.form_data.is_empty());
        assert_eq!(producer.rename(&AnswerSet::new()).unwrap().len(), 1);
    }

    #[test]
    fn rename_must_be_array_of_tables() {
        let err = load("[params.schema]\n[rename]\nfiles = \"a\"\n").err().unwrap();
        assert!(matches!(err, CreateError::ManifestInvalid { .. }));
    }
}
