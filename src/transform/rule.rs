use globset::{GlobBuilder, GlobMatcher};
use serde_json::Value;

use super::pattern::{regex_replacement, Pattern};
use crate::error::{CreateError, Result};

/// One pattern and the text that replaces its matches.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub pattern: Pattern,
    pub replacement: String,
}

impl Substitution {
    pub fn new(pattern: Pattern, replacement: &str) -> Self {
        let replacement = if pattern.is_regex() {
            regex_replacement(replacement, pattern.group_count())
        } else {
            replacement.to_string()
        };
        Self {
            pattern,
            replacement,
        }
    }

    pub fn apply(&self, content: &str) -> String {
        self.pattern.replace(content, &self.replacement)
    }
}

/// A root-relative file selector with the substitutions applied to every match.
#[derive(Debug, Clone)]
pub struct Rule {
    pub files: String,
    pub substitutions: Vec<Substitution>,
}

impl Rule {
    /// Apply the substitutions in declaration order, each one seeing the
    /// output of the previous.
    pub fn apply(&self, content: &str) -> String {
        self.substitutions
            .iter()
            .fold(content.to_string(), |acc, sub| sub.apply(&acc))
    }

    /// Compile `files` into a matcher for `/`-separated root-relative paths.
    ///
    /// A leading separator is dropped, so `/package.json` and `package.json`
    /// select the same file. Selectors that climb out of the root are rejected.
    pub fn selector(&self, index: usize) -> Result<Selector> {
        let normalized = self.files.replace('\\', "/");
        let relative = normalized.trim_start_matches('/');

        if relative.is_empty() {
            return Err(CreateError::MalformedRule {
                index,
                reason: "empty file selector".into(),
            });
        }
        if relative.split('/').any(|segment| segment == "..") {
            return Err(CreateError::MalformedRule {
                index,
                reason: format!("selector '{}' escapes the project root", self.files),
            });
        }

        let compile = |pattern: &str| {
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map(|glob| glob.compile_matcher())
                .map_err(|e| CreateError::GlobPattern {
                    pattern: self.files.clone(),
                    source: e,
                })
        };

        let hidden = relative
            .split('/')
            .filter(|segment| segment.starts_with('.'))
            .map(&compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Selector {
            matcher: compile(relative)?,
            hidden,
        })
    }
}

/// A compiled file selector.
///
/// Wildcards never match a path segment that starts with a dot. Such a
/// segment is only selected when the selector names it with a segment that
/// itself starts with `.`, so `**/*` skips `.eslintrc` while `.eslintrc` and
/// `config/.*` select it.
#[derive(Debug, Clone)]
pub struct Selector {
    matcher: GlobMatcher,
    hidden: Vec<GlobMatcher>,
}

impl Selector {
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.matcher.is_match(relative_path)
            && relative_path
                .split('/')
                .filter(|segment| segment.starts_with('.'))
                .all(|segment| self.hidden.iter().any(|glob| glob.is_match(segment)))
    }
}

pub type RuleSet = Vec<Rule>;

/// Parse the value returned by a manifest's `rename` into rules.
///
/// Accepts a list of `{ files, replace }` maps or a single such map.
pub fn parse_rules(value: &Value) -> Result<RuleSet> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_rule(index, item))
            .collect(),
        Value::Object(_) => Ok(vec![parse_rule(0, value)?]),
        Value::Null => Ok(Vec::new()),
        other => Err(CreateError::MalformedRule {
            index: 0,
            reason: format!("rename must return a list of rules, got {other}"),
        }),
    }
}

fn parse_rule(index: usize, item: &Value) -> Result<Rule> {
    let malformed = |reason: &str| CreateError::MalformedRule {
        index,
        reason: reason.to_string(),
    };

    let files = item
        .get("files")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing 'files' selector string"))?;

    let replace = match item.get("replace") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(malformed("'replace' must be a list")),
        None => return Err(malformed("missing 'replace' list")),
    };

    let substitutions = normalize_pairs(index, replace)?
        .into_iter()
        .map(|(pattern, replacement)| {
            Ok(Substitution::new(
                Pattern::from_value(pattern, index)?,
                &replacement_text(index, replacement)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Rule {
        files: files.to_string(),
        substitutions,
    })
}

/// Reduce the flat `[p1, v1, p2, v2]` and paired `[[p1, v1], [p2, v2]]`
/// authoring styles (or a mix of them) to ordered pairs.
pub fn normalize_pairs(index: usize, items: &[Value]) -> Result<Vec<(&Value, &Value)>> {
    let mut pairs = Vec::with_capacity(items.len() / 2 + 1);
    let mut pending: Option<&Value> = None;

    for item in items {
        match (item, pending.take()) {
            (Value::Array(pair), None) => match pair.as_slice() {
                [pattern, replacement] => pairs.push((pattern, replacement)),
                _ => {
                    return Err(CreateError::MalformedRule {
                        index,
                        reason: format!(
                            "substitution pair must have 2 elements, got {}",
                            pair.len()
                        ),
                    })
                }
            },
            (Value::Array(_), Some(_)) => {
                return Err(CreateError::MalformedRule {
                    index,
                    reason: "expected a replacement value, found a pair".into(),
                })
            }
            (pattern, None) => pending = Some(pattern),
            (replacement, Some(pattern)) => pairs.push((pattern, replacement)),
        }
    }

    if pending.is_some() {
        return Err(CreateError::MalformedRule {
            index,
            reason: "pattern without a replacement".into(),
        });
    }

    Ok(pairs)
}

fn replacement_text(index: usize, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CreateError::MalformedRule {
            index,
            reason: format!("replacement must be a scalar, got {other}"),
        }),
    }
}
