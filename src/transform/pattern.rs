use regex_lite::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{CreateError, Result};

/// Regex flags understood in `/body/flags` patterns. `u` and `y` are accepted and ignored.
const REGEX_FLAGS: &str = "gimsuy";

/// A compiled match pattern.
///
/// Literals replace every occurrence. Regexes replace the first match unless
/// compiled with the `g` flag.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex { regex: Regex, global: bool },
}

impl Pattern {
    pub fn literal(text: &str, rule: usize) -> Result<Self> {
        if text.is_empty() {
            return Err(CreateError::MalformedRule {
                index: rule,
                reason: "empty literal pattern".into(),
            });
        }
        Ok(Self::Literal(text.to_string()))
    }

    pub fn regex(body: &str, flags: &str, rule: usize) -> Result<Self> {
        if let Some(bad) = flags.chars().find(|c| !REGEX_FLAGS.contains(*c)) {
            return Err(CreateError::MalformedRule {
                index: rule,
                reason: format!("unsupported regex flag '{bad}' in /{body}/{flags}"),
            });
        }
        let regex = RegexBuilder::new(body)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| CreateError::InvalidRegex {
                pattern: body.to_string(),
                source: e,
            })?;
        Ok(Self::Regex {
            regex,
            global: flags.contains('g'),
        })
    }

    /// Build a pattern from its authored form: a plain string (literal), a
    /// `/body/flags` string, or a `{ regex, flags }` / `{ literal }` map.
    pub fn from_value(value: &Value, rule: usize) -> Result<Self> {
        match value {
            Value::String(s) => match split_regex_literal(s) {
                Some((body, flags)) => Self::regex(body, flags, rule),
                None => Self::literal(s, rule),
            },
            Value::Object(map) => {
                if let Some(body) = map.get("regex").and_then(Value::as_str) {
                    let flags = map.get("flags").and_then(Value::as_str).unwrap_or("");
                    Self::regex(body, flags, rule)
                } else if let Some(text) = map.get("literal").and_then(Value::as_str) {
                    Self::literal(text, rule)
                } else {
                    Err(CreateError::MalformedRule {
                        index: rule,
                        reason: "pattern map needs a 'regex' or 'literal' string".into(),
                    })
                }
            }
            other => Err(CreateError::MalformedRule {
                index: rule,
                reason: format!("pattern must be a string or map, got {other}"),
            }),
        }
    }

    /// Replace within `haystack`. `replacement` must already be prepared
    /// with [`regex_replacement`] for regex patterns.
    pub fn replace(&self, haystack: &str, replacement: &str) -> String {
        match self {
            Self::Literal(text) => haystack.replace(text.as_str(), replacement),
            Self::Regex { regex, global: true } => {
                regex.replace_all(haystack, replacement).into_owned()
            }
            Self::Regex { regex, global: false } => {
                regex.replace(haystack, replacement).into_owned()
            }
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }

    /// Number of explicit capture groups; zero for literals.
    pub fn group_count(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Regex { regex, .. } => regex.captures_len().saturating_sub(1),
        }
    }
}

/// `/body/flags` with only known flag letters after the last slash.
fn split_regex_literal(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (body, flags) = (&rest[..end], &rest[end + 1..]);
    if body.is_empty() || !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
        return None;
    }
    Some((body, flags))
}

/// Rewrite a replacement string into `regex-lite` expansion syntax.
///
/// `$n` and `$nn` refer to capture groups only when the group exists in a
/// regex with `groups` capture groups: a two-digit reference that is out of
/// range falls back to one digit followed by a literal digit, and `$0` stays
/// literal. `$&` and `$<name>` become `${0}` and `${name}`. `$$` and
/// `${name}` pass through. Any other `$` is kept literal.
pub fn regex_replacement(raw: &str, groups: usize) -> String {
    let mut out = String::with_capacity(raw.len());
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('$') => {
                out.push_str("$$");
                i += 2;
            }
            Some('&') => {
                out.push_str("${0}");
                i += 2;
            }
            Some(d) if d.is_ascii_digit() => {
                let group = |n: usize| (1..=groups).contains(&n).then_some(n);
                let first = d.to_digit(10).map_or(0, |n| n as usize);
                let two = chars
                    .get(i + 2)
                    .and_then(|c| c.to_digit(10))
                    .and_then(|second| group(first * 10 + second as usize));
                match (two, group(first)) {
                    (Some(n), _) => {
                        out.push_str(&format!("${{{n}}}"));
                        i += 3;
                    }
                    (None, Some(n)) => {
                        out.push_str(&format!("${{{n}}}"));
                        i += 2;
                    }
                    (None, None) => {
                        out.push_str("$$");
                        i += 1;
                    }
                }
            }
            Some('<') => match chars[i + 2..].iter().position(|&c| c == '>') {
                Some(len) => {
                    out.push_str("${");
                    out.extend(&chars[i + 2..i + 2 + len]);
                    out.push('}');
                    i += len + 3;
                }
                None => {
                    out.push_str("$$");
                    i += 1;
                }
            },
            Some('{') => {
                out.push('$');
                i += 1;
            }
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn pattern(value: Value) -> Pattern {
        Pattern::from_value(&value, 0).unwrap()
    }

    #[test]
    fn literal_replaces_every_occurrence() {
        let p = pattern(json!("impl-application"));
        assert!(!p.is_regex());
        assert_eq!(
            p.replace("impl-application and impl-application", "impl-wallet"),
            "impl-wallet and impl-wallet"
        );
    }

    #[test]
    fn literal_replacement_is_verbatim() {
        let p = pattern(json!("price"));
        assert_eq!(p.replace("price", "$1 $&"), "$1 $&");
    }

    #[test]
    fn regex_without_global_flag_replaces_first_match() {
        let p = pattern(json!("/a+/"));
        assert!(p.is_regex());
        assert_eq!(p.replace("aa-b-aaa", "x"), "x-b-aaa");
    }

    #[test]
    fn regex_with_global_flag_replaces_all_matches() {
        let p = pattern(json!("/a+/g"));
        assert_eq!(p.replace("aa-b-aaa", "x"), "x-b-x");
    }

    #[test]
    fn regex_case_insensitive_flag() {
        let p = pattern(json!("/billing/gi"));
        assert_eq!(p.replace("Billing BILLING", "orders"), "orders orders");
    }

    #[test]
    fn capture_groups_expand_in_replacement() {
        let p = pattern(json!("/impl-(\\w+)/g"));
        let rep = regex_replacement("ut-$1", p.group_count());
        assert_eq!(p.replace("impl-wallet impl-card", &rep), "ut-wallet ut-card");
    }

    #[test]
    fn map_form_compiles_regex() {
        let p = pattern(json!({ "regex": "(\\d+)\\.(\\d+)", "flags": "g" }));
        let rep = regex_replacement("$2.$1", p.group_count());
        assert_eq!(p.replace("1.2 3.4", &rep), "2.1 4.3");
    }

    #[test]
    fn map_form_literal() {
        let p = pattern(json!({ "literal": "/not/a/regex/" }));
        assert_eq!(p.replace("path /not/a/regex/", "x"), "path x");
    }

    #[test]
    fn slash_string_with_unknown_flags_is_literal() {
        let p = pattern(json!("/usr/local"));
        assert!(!p.is_regex());
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = Pattern::from_value(&json!("/(unclosed/"), 3).unwrap_err();
        assert!(matches!(err, CreateError::InvalidRegex { .. }));
    }

    #[test]
    fn empty_literal_is_rejected() {
        let err = Pattern::from_value(&json!(""), 1).unwrap_err();
        assert!(matches!(err, CreateError::MalformedRule { index: 1, .. }));
    }

    #[test]
    fn non_string_pattern_is_rejected() {
        let err = Pattern::from_value(&json!(42), 0).unwrap_err();
        assert!(matches!(err, CreateError::MalformedRule { .. }));
    }

    #[test]
    fn unsupported_map_flag_is_rejected() {
        let err = Pattern::from_value(&json!({ "regex": "a", "flags": "gx" }), 0).unwrap_err();
        assert!(matches!(err, CreateError::MalformedRule { .. }));
    }

    #[rstest]
    #[case("plain", 0, "plain")]
    #[case("$1", 1, "${1}")]
    #[case("$12x", 12, "${12}x")]
    #[case("$12x", 1, "${1}2x")]
    #[case("$01", 1, "${1}")]
    #[case("$3", 2, "$$3")]
    #[case("$0", 2, "$$0")]
    #[case("$00", 2, "$$00")]
    #[case("$&!", 0, "${0}!")]
    #[case("$<name>-x", 1, "${name}-x")]
    #[case("${name}", 1, "${name}")]
    #[case("$$", 0, "$$")]
    #[case("cost: $ 5", 0, "cost: $$ 5")]
    #[case("trailing $", 0, "trailing $$")]
    #[case("$<open", 0, "$$<open")]
    fn replacement_translation(#[case] raw: &str, #[case] groups: usize, #[case] expected: &str) {
        assert_eq!(regex_replacement(raw, groups), expected);
    }

    #[test]
    fn group_zero_and_missing_groups_stay_literal() {
        let p = pattern(json!("/(b)/"));
        assert_eq!(p.group_count(), 1);
        let rep = regex_replacement("$0-$12-$2", p.group_count());
        assert_eq!(p.replace("abc", &rep), "a$0-b2-$2c");
    }

    #[test]
    fn escaped_dollar_survives_expansion() {
        let p = pattern(json!("/price/"));
        let rep = regex_replacement("$$5", p.group_count());
        assert_eq!(p.replace("price", &rep), "$5");
    }
}
