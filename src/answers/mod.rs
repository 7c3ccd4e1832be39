use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::log::Log;
use crate::template::VersionControl;

/// Field name to scalar value, as collected for a template.
pub type AnswerSet = BTreeMap<String, Value>;

/// A default computed at run time for whichever alias the schema declares.
pub struct ComputedDefault {
    pub aliases: &'static [&'static str],
    pub compute: fn(&dyn VersionControl) -> Result<Option<Value>>,
}

pub const COMPUTED_DEFAULTS: &[ComputedDefault] = &[ComputedDefault {
    aliases: &["userName", "username"],
    compute: user_name,
}];

fn user_name(vcs: &dyn VersionControl) -> Result<Option<Value>> {
    Ok(vcs.user_email()?.and_then(|email| {
        let local = email.split('@').next().unwrap_or_default();
        (!local.is_empty()).then(|| Value::String(local.to_string()))
    }))
}

/// Parse the options left over after the template and project directory.
///
/// Accepts `--key value`, `--key=value`, `--flag`, `--no-flag` and `-k value`.
/// Numeric and boolean strings are coerced; a repeated key collects an array.
/// Bare words that do not follow an option are returned separately.
pub fn parse_cli_options(args: &[String]) -> (AnswerSet, Vec<String>) {
    let mut answers = AnswerSet::new();
    let mut positional = Vec::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            positional.extend(iter.by_ref().cloned());
            break;
        }

        let key = match arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) {
            Some(key) if !key.is_empty() => key,
            _ => {
                positional.push(arg.clone());
                continue;
            }
        };

        if let Some((key, value)) = key.split_once('=') {
            insert_option(&mut answers, key, coerce(value));
            continue;
        }

        if let Some(negated) = key.strip_prefix("no-") {
            insert_option(&mut answers, negated, Value::Bool(false));
            continue;
        }

        match iter.peek() {
            Some(next) if !is_option(next) => {
                let value = coerce(next);
                iter.next();
                insert_option(&mut answers, key, value);
            }
            _ => insert_option(&mut answers, key, Value::Bool(true)),
        }
    }

    (answers, positional)
}

/// The command line split into template keyword, project directory and
/// answer options.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Invocation {
    pub template: Option<String>,
    pub project_dir: Option<String>,
    pub options: AnswerSet,
    /// Bare words beyond the first two.
    pub ignored: Vec<String>,
}

/// Split raw arguments: the first two bare words are the template and the
/// project directory, everything else is an option.
pub fn parse_invocation(args: &[String]) -> Invocation {
    let (options, positional) = parse_cli_options(args);
    let mut words = positional.into_iter();
    Invocation {
        template: words.next(),
        project_dir: words.next(),
        options,
        ignored: words.collect(),
    }
}

fn is_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-') && arg.parse::<f64>().is_err()
}

fn insert_option(answers: &mut AnswerSet, key: &str, value: Value) {
    match answers.remove(key) {
        None => {
            answers.insert(key.to_string(), value);
        }
        Some(Value::Array(mut items)) => {
            items.push(value);
            answers.insert(key.to_string(), Value::Array(items));
        }
        Some(previous) => {
            answers.insert(key.to_string(), Value::Array(vec![previous, value]));
        }
    }
}

fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}

/// Merge the pre-form answer layers, lowest precedence first: CLI options,
/// then the manifest's literal defaults. Computed defaults only fill fields
/// that are still missing, so they rank below both.
pub fn seed_answers(
    schema: &Value,
    cli: &AnswerSet,
    manifest_defaults: &AnswerSet,
    vcs: &dyn VersionControl,
    log: &Log,
) -> AnswerSet {
    let mut seed = cli.clone();
    seed.extend(manifest_defaults.iter().map(|(k, v)| (k.clone(), v.clone())));

    for default in COMPUTED_DEFAULTS {
        let Some(key) = default
            .aliases
            .iter()
            .find(|alias| schema_has_property(schema, alias))
        else {
            continue;
        };
        if seed.contains_key(*key) {
            continue;
        }
        match (default.compute)(vcs) {
            Ok(Some(value)) => {
                log.debug(format!("computed default for {key}"));
                seed.insert(key.to_string(), value);
            }
            Ok(None) => log.warn(format!("no value available for computed default '{key}'")),
            Err(e) => log.warn(format!("could not compute default '{key}': {e}")),
        }
    }

    seed
}

fn schema_has_property(schema: &Value, name: &str) -> bool {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| props.contains_key(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;

    use rstest::rstest;
    use serde_json::json;

    struct FakeVcs {
        email: Option<&'static str>,
        calls: Cell<usize>,
    }

    impl FakeVcs {
        fn new(email: Option<&'static str>) -> Self {
            Self {
                email,
                calls: Cell::new(0),
            }
        }
    }

    impl VersionControl for FakeVcs {
        fn clone_repo(&self, _url: &str, _dest: &Path) -> Result<()> {
            Ok(())
        }

        fn set_remote_url(&self, _repo: &Path, _url: &str) -> Result<()> {
            Ok(())
        }

        fn user_email(&self) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.email.map(String::from))
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["--name", "billing"], "name", json!("billing"))]
    #[case(&["--name=billing"], "name", json!("billing"))]
    #[case(&["--port", "8080"], "port", json!(8080))]
    #[case(&["--ratio=0.5"], "ratio", json!(0.5))]
    #[case(&["--docker"], "docker", json!(true))]
    #[case(&["--no-docker"], "docker", json!(false))]
    #[case(&["--docker", "false"], "docker", json!(false))]
    #[case(&["-v", "2"], "v", json!(2))]
    #[case(&["--offset", "-5"], "offset", json!(-5))]
    fn parses_option_forms(#[case] input: &[&str], #[case] key: &str, #[case] expected: Value) {
        let (answers, positional) = parse_cli_options(&args(input));
        assert_eq!(answers.get(key), Some(&expected));
        assert!(positional.is_empty());
    }

    #[test]
    fn flag_followed_by_option_is_boolean() {
        let (answers, _) = parse_cli_options(&args(&["--docker", "--name", "x"]));
        assert_eq!(answers["docker"], json!(true));
        assert_eq!(answers["name"], json!("x"));
    }

    #[test]
    fn repeated_option_collects_array() {
        let (answers, _) = parse_cli_options(&args(&["--tag", "a", "--tag", "b", "--tag=c"]));
        assert_eq!(answers["tag"], json!(["a", "b", "c"]));
    }

    #[test]
    fn bare_words_are_positional() {
        let (answers, positional) =
            parse_cli_options(&args(&["extra", "--name", "x", "--", "--raw"]));
        assert_eq!(answers.len(), 1);
        assert_eq!(positional, vec!["extra".to_string(), "--raw".to_string()]);
    }

    #[test]
    fn invocation_takes_first_two_words() {
        let inv = parse_invocation(&args(&[
            "--port", "80", "ms", "--docker", "ut-billing", "stray",
        ]));
        assert_eq!(inv.template.as_deref(), Some("ms"));
        assert_eq!(inv.project_dir.as_deref(), Some("ut-billing"));
        assert_eq!(inv.options["port"], json!(80));
        assert_eq!(inv.options["docker"], json!(true));
        assert_eq!(inv.ignored, vec!["stray".to_string()]);
    }

    #[test]
    fn empty_invocation_uses_defaults_later() {
        assert_eq!(parse_invocation(&[]), Invocation::default());
    }

    #[test]
    fn manifest_defaults_override_cli_options() {
        let schema = json!({ "properties": { "name": {}, "port": {} } });
        let cli = AnswerSet::from([
            ("name".to_string(), json!("from-cli")),
            ("port".to_string(), json!(1)),
        ]);
        let manifest = AnswerSet::from([("port".to_string(), json!(2))]);
        let vcs = FakeVcs::new(None);

        let seed = seed_answers(&schema, &cli, &manifest, &vcs, &Log::new());
        assert_eq!(seed["name"], json!("from-cli"));
        assert_eq!(seed["port"], json!(2));
        assert_eq!(vcs.calls.get(), 0);
    }

    #[test]
    fn computed_user_name_fills_declared_alias() {
        let schema = json!({ "properties": { "username": { "type": "string" } } });
        let vcs = FakeVcs::new(Some("jane.doe@example.com"));

        let seed = seed_answers(&schema, &AnswerSet::new(), &AnswerSet::new(), &vcs, &Log::new());
        assert_eq!(seed["username"], json!("jane.doe"));
        assert!(!seed.contains_key("userName"));
    }

    #[test]
    fn computed_default_never_overrides_supplied_value() {
        let schema = json!({ "properties": { "userName": {} } });
        let cli = AnswerSet::from([("userName".to_string(), json!("explicit"))]);
        let vcs = FakeVcs::new(Some("jane@example.com"));

        let seed = seed_answers(&schema, &cli, &AnswerSet::new(), &vcs, &Log::new());
        assert_eq!(seed["userName"], json!("explicit"));
        assert_eq!(vcs.calls.get(), 0);
    }

    #[test]
    fn computed_default_skipped_when_schema_lacks_field() {
        let schema = json!({ "properties": { "name": {} } });
        let vcs = FakeVcs::new(Some("jane@example.com"));

        let seed = seed_answers(&schema, &AnswerSet::new(), &AnswerSet::new(), &vcs, &Log::new());
        assert!(seed.is_empty());
        assert_eq!(vcs.calls.get(), 0);
    }

    #[test]
    fn missing_email_leaves_field_unset() {
        let schema = json!({ "properties": { "userName": {} } });
        let vcs = FakeVcs::new(None);

        let seed = seed_answers(&schema, &AnswerSet::new(), &AnswerSet::new(), &vcs, &Log::new());
        assert!(!seed.contains_key("userName"));
    }
}
