use std::path::Path;

use rhai::{Dynamic, Engine, Map, Scope, AST};
use serde_json::Value;

use super::{ManifestParams, RuleProducer};
use crate::answers::AnswerSet;
use crate::error::{CreateError, Result};
use crate::transform::{parse_rules, RuleSet};

/// Create a sandboxed Rhai engine with the manifest helper functions.
pub fn create_engine() -> Engine {
    let mut engine = Engine::new();

    // Limit recursion and operations for safety
    engine.set_max_call_levels(32);
    engine.set_max_operations(100_000);
    engine.set_max_string_size(10 * 1024 * 1024); // 10MB

    engine.register_fn("regex", |body: &str| pattern_map("regex", body, ""));
    engine.register_fn("regex", |body: &str, flags: &str| {
        pattern_map("regex", body, flags)
    });
    engine.register_fn("literal", |text: &str| pattern_map("literal", text, ""));

    engine
}

fn pattern_map(kind: &str, text: &str, flags: &str) -> Map {
    let mut map = Map::new();
    map.insert(kind.into(), Dynamic::from(text.to_string()));
    if !flags.is_empty() {
        map.insert("flags".into(), Dynamic::from(flags.to_string()));
    }
    map
}

/// A `.ut-create` written in Rhai: a top-level `params` map and a
/// `fn rename(answers)` returning the rules.
pub struct ScriptProducer {
    engine: Engine,
    ast: AST,
}

impl ScriptProducer {
    pub fn load(path: &Path, source: &str) -> Result<(ManifestParams, Self)> {
        let engine = create_engine();
        let ast = engine
            .compile(source)
            .map_err(|e| script_error("<compile>", e))?;

        let has_rename = ast
            .iter_functions()
            .any(|f| f.name == "rename" && f.params.len() == 1);
        if !has_rename {
            return Err(CreateError::ManifestInvalid {
                path: path.to_path_buf(),
                message: "script does not define fn rename(answers)".into(),
            });
        }

        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| script_error("<top level>", e))?;

        let params = scope
            .get_value::<Dynamic>("params")
            .ok_or_else(|| CreateError::ManifestInvalid {
                path: path.to_path_buf(),
                message: "script does not define a top-level 'params' map".into(),
            })?;
        let params: Value =
            rhai::serde::from_dynamic(&params).map_err(|e| CreateError::ManifestInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok((
            ManifestParams::from_value(path, params)?,
            Self { engine, ast },
        ))
    }
}

impl RuleProducer for ScriptProducer {
    fn rename(&self, answers: &AnswerSet) -> Result<RuleSet> {
        let arg = rhai::serde::to_dynamic(answers).map_err(|e| script_error("rename", e))?;

        let mut scope = Scope::new();
        let result: Dynamic = self
            .engine
            .call_fn(&mut scope, &self.ast, "rename", (arg,))
            .map_err(|e| script_error("rename", e))?;

        let value: Value = rhai::serde::from_dynamic(&result).map_err(|e| script_error("rename", e))?;
        parse_rules(&value)
    }
}

fn script_error(function: &str, error: impl std::fmt::Display) -> CreateError {
    CreateError::ManifestScript {
        function: function.to_string(),
        message: error.to_string(),
    }
}
