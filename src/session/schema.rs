use serde_json::Value;

use crate::error::{CreateError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Choice(Vec<Value>),
    /// Entered as JSON text.
    Array,
    Object,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Choice(_) => "choice",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One input of the configuration form, derived from a schema property.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FormField {
    /// Convert raw user input into a typed value. Blank input yields `None`.
    pub fn parse(&self, raw: &str) -> std::result::Result<Option<Value>, String> {
        let raw = raw.trim();

        if raw.is_empty() && !matches!(self.kind, FieldKind::Boolean) {
            return if self.required {
                Err(format!("{} is required", self.title))
            } else {
                Ok(None)
            };
        }

        match &self.kind {
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "y" | "1" => Ok(Some(Value::Bool(true))),
                "false" | "off" | "no" | "n" | "0" | "" => Ok(Some(Value::Bool(false))),
                _ => Err(format!("{} must be yes or no", self.title)),
            },
            FieldKind::String => Ok(Some(Value::String(raw.to_string()))),
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(|n| Some(Value::from(n)))
                .map_err(|_| format!("{} must be a whole number", self.title)),
            FieldKind::Number => match raw.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Some(Value::from(f))),
                _ => Err(format!("{} must be a number", self.title)),
            },
            FieldKind::Array | FieldKind::Object => {
                let shape = if self.kind == FieldKind::Array { "list" } else { "object" };
                match serde_json::from_str::<Value>(raw) {
                    Ok(value @ Value::Array(_)) if self.kind == FieldKind::Array => Ok(Some(value)),
                    Ok(value @ Value::Object(_)) if self.kind == FieldKind::Object => {
                        Ok(Some(value))
                    }
                    Ok(_) => Err(format!("{} must be a JSON {shape}", self.title)),
                    Err(e) => Err(format!("{} is not valid JSON: {e}", self.title)),
                }
            }
            FieldKind::Choice(options) => options
                .iter()
                .find(|option| display(option) == raw)
                .map(|option| Some(option.clone()))
                .ok_or_else(|| {
                    let names: Vec<String> = options.iter().map(display).collect();
                    format!("{} must be one of: {}", self.title, names.join(", "))
                }),
        }
    }

    /// The value a form input should start with.
    pub fn initial<'a>(&'a self, seed: Option<&'a Value>) -> Option<&'a Value> {
        seed.or(self.default.as_ref())
    }
}

/// Render a scalar for a form input.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Derive form fields from `schema.properties`, ordered by `propertyOrder`
/// and then by name.
pub fn form_fields(schema: &Value) -> Result<Vec<FormField>> {
    let properties = match schema.get("properties") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(malformed("'properties' must be a map")),
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(properties.len());
    for (name, property) in properties {
        let Value::Object(property) = property else {
            return Err(malformed(&format!("property '{name}' must be a map")));
        };

        let kind = match (property.get("enum"), property.get("type").and_then(Value::as_str)) {
            (Some(Value::Array(options)), _) => FieldKind::Choice(options.clone()),
            (Some(_), _) => return Err(malformed(&format!("'enum' of '{name}' must be a list"))),
            (None, None | Some("string")) => FieldKind::String,
            (None, Some("integer")) => FieldKind::Integer,
            (None, Some("number")) => FieldKind::Number,
            (None, Some("boolean")) => FieldKind::Boolean,
            (None, Some("array")) => FieldKind::Array,
            (None, Some("object")) => FieldKind::Object,
            (None, Some(other)) => {
                return Err(malformed(&format!(
                    "property '{name}' has unsupported type '{other}'"
                )))
            }
        };

        let order = property
            .get("propertyOrder")
            .and_then(Value::as_i64)
            .unwrap_or(i64::MAX);

        fields.push((
            order,
            FormField {
                name: name.clone(),
                title: property
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(name)
                    .to_string(),
                description: property
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
                kind,
                required: required.contains(&name.as_str()),
                default: property.get("default").cloned(),
            },
        ));
    }

    fields.sort_by(|(a, fa), (b, fb)| a.cmp(b).then_with(|| fa.name.cmp(&fb.name)));
    Ok(fields.into_iter().map(|(_, field)| field).collect())
}

fn malformed(message: &str) -> CreateError {
    CreateError::Session {
        message: format!("malformed schema: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string", "title": "Name", "propertyOrder": 1 },
                "port": { "type": "integer", "default": 8080 },
                "ratio": { "type": "number" },
                "docker": { "type": "boolean", "description": "Add a Dockerfile" },
                "db": { "enum": ["postgres", "mssql", 3] },
                "tags": { "type": "array", "default": ["api"] },
                "env": { "type": "object" }
            }
        })
    }

    fn field(name: &str) -> FormField {
        form_fields(&schema())
            .unwrap()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap()
    }

    #[test]
    fn fields_follow_property_order_then_name() {
        let names: Vec<String> = form_fields(&schema())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["name", "db", "docker", "env", "port", "ratio", "tags"]);
    }

    #[test]
    fn field_metadata() {
        let name = field("name");
        assert!(name.required);
        assert_eq!(name.title, "Name");

        let docker = field("docker");
        assert_eq!(docker.kind, FieldKind::Boolean);
        assert_eq!(docker.title, "docker");
        assert_eq!(docker.description.as_deref(), Some("Add a Dockerfile"));

        assert_eq!(field("port").default, Some(json!(8080)));
    }

    #[rstest]
    #[case("port", "9000", Some(json!(9000)))]
    #[case("port", "", None)]
    #[case("ratio", "0.25", Some(json!(0.25)))]
    #[case("docker", "on", Some(json!(true)))]
    #[case("docker", "", Some(json!(false)))]
    #[case("db", "mssql", Some(json!("mssql")))]
    #[case("db", "3", Some(json!(3)))]
    #[case("name", "  billing ", Some(json!("billing")))]
    #[case("tags", r#"["api", "grpc"]"#, Some(json!(["api", "grpc"])))]
    #[case("tags", "", None)]
    #[case("env", r#"{"PORT": 8080}"#, Some(json!({ "PORT": 8080 })))]
    fn parses_input(#[case] name: &str, #[case] raw: &str, #[case] expected: Option<Value>) {
        assert_eq!(field(name).parse(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("port", "eighty")]
    #[case("ratio", "NaN")]
    #[case("docker", "maybe")]
    #[case("db", "oracle")]
    #[case("name", "")]
    #[case("tags", "api, grpc")]
    #[case("tags", r#"{"a": 1}"#)]
    #[case("env", "[]")]
    fn rejects_input(#[case] name: &str, #[case] raw: &str) {
        assert!(field(name).parse(raw).is_err());
    }

    #[test]
    fn schema_without_properties_has_no_fields() {
        assert!(form_fields(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn structured_types_are_kept() {
        let tags = field("tags");
        assert_eq!(tags.kind, FieldKind::Array);
        assert_eq!(tags.kind.name(), "array");
        assert_eq!(display(tags.initial(None).unwrap()), r#"["api"]"#);
        assert_eq!(field("env").kind, FieldKind::Object);
    }

    #[test]
    fn unknown_types_are_malformed() {
        let err = form_fields(&json!({ "properties": { "when": { "type": "date" } } })).unwrap_err();
        assert!(matches!(err, CreateError::Session { .. }));
    }

    #[test]
    fn non_map_properties_are_malformed() {
        assert!(form_fields(&json!({ "properties": [] })).is_err());
        assert!(form_fields(&json!({ "properties": { "x": 1 } })).is_err());
    }
}
