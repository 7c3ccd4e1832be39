use std::collections::BTreeMap;
use std::net::TcpListener;
use std::time::Duration;

use serde::Serialize;
use tera::{Context, Tera};

use super::http::{self, Response};
use super::schema::{display, form_fields, FieldKind, FormField};
use super::{session_id, Acknowledgment, EditRequest, FormSession, SessionHandle};
use crate::answers::AnswerSet;
use crate::error::{CreateError, Result};
use crate::log::Log;

const FORM_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }
label { display: block; margin-top: 1rem; font-weight: bold; }
input[type=text], input[type=number], select, textarea { width: 100%; padding: .4rem; }
small { display: block; color: #555; }
.errors { color: #b00020; }
button { margin-top: 1.5rem; padding: .5rem 1.5rem; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
{% if errors %}<ul class="errors">{% for error in errors %}<li>{{ error }}</li>{% endfor %}</ul>{% endif %}
<form method="post" action="{{ action }}">
{% for field in fields %}
<label for="{{ field.name }}">{{ field.title }}{% if field.required %} *{% endif %}</label>
{% if field.kind == "boolean" %}<input type="checkbox" id="{{ field.name }}" name="{{ field.name }}" value="true"{% if field.value == "true" %} checked{% endif %}>
{% elif field.kind == "array" or field.kind == "object" %}<textarea id="{{ field.name }}" name="{{ field.name }}" rows="4"{% if field.required %} required{% endif %}>{{ field.value }}</textarea>
{% elif field.kind == "choice" %}<select id="{{ field.name }}" name="{{ field.name }}">{% for option in field.options %}<option value="{{ option }}"{% if option == field.value %} selected{% endif %}>{{ option }}</option>{% endfor %}</select>
{% else %}<input type="{% if field.kind == "string" %}text{% else %}number{% endif %}" id="{{ field.name }}" name="{{ field.name }}" value="{{ field.value }}"{% if field.kind == "number" %} step="any"{% endif %}{% if field.required %} required{% endif %}>
{% endif %}{% if field.description %}<small>{{ field.description }}</small>{% endif %}
{% endfor %}
<button type="submit">Create project</button>
</form>
</body>
</html>
"#;

const ACK_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body style="font-family: sans-serif; max-width: 40rem; margin: 2rem auto;">
<h1>{{ title }}</h1>
<p>{{ message }}</p>
</body>
</html>
"#;

#[derive(Serialize)]
struct FieldView<'a> {
    name: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    kind: &'static str,
    required: bool,
    value: String,
    options: Vec<String>,
}

/// How long an accepted connection may stay silent before it is dropped.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves the configuration form from a localhost HTTP listener.
///
/// Connections are handled one at a time, each under a read timeout, so a
/// browser's idle speculative connection cannot hold up the real request.
pub struct BrowserSession {
    bind: String,
    listener: Option<TcpListener>,
    id: Option<String>,
    read_timeout: Duration,
    log: Log,
}

impl BrowserSession {
    pub fn new(bind: impl Into<String>, log: Log) -> Self {
        Self {
            bind: bind.into(),
            listener: None,
            id: None,
            read_timeout: READ_TIMEOUT,
            log,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl FormSession for BrowserSession {
    fn open(&mut self) -> Result<SessionHandle> {
        let listener = TcpListener::bind(&self.bind).map_err(|e| CreateError::Session {
            message: format!("cannot listen on {}: {e}", self.bind),
        })?;
        let addr = listener.local_addr().map_err(|e| CreateError::Session {
            message: format!("cannot read listener address: {e}"),
        })?;

        let id = session_id();
        let url = format!("http://{addr}/{id}");
        self.log.debug(format!("form session {id} listening on {addr}"));

        self.listener = Some(listener);
        self.id = Some(id.clone());
        Ok(SessionHandle { id, url: Some(url) })
    }

    fn edit(&mut self, request: EditRequest<'_>) -> Result<AnswerSet> {
        let listener = self.listener.as_ref().ok_or_else(|| CreateError::Session {
            message: "form session was not opened".into(),
        })?;
        if self.id.as_deref() != Some(request.id) {
            return Err(CreateError::Session {
                message: format!("unknown form session '{}'", request.id),
            });
        }

        let fields = form_fields(request.schema)?;
        let route = format!("/{}", request.id);
        let initial = initial_values(&fields, request.form_data);

        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    self.log.warn(format!("form connection failed: {e}"));
                    continue;
                }
            };
            if let Err(e) = stream.set_read_timeout(Some(self.read_timeout)) {
                self.log.warn(format!("cannot set form connection timeout: {e}"));
                continue;
            }

            let req = match http::read_request(&mut stream) {
                Ok(Some(req)) => req,
                Ok(None) => {
                    self.log.debug("form connection closed without a request");
                    continue;
                }
                Err(message) => {
                    http::write_response(&mut stream, &Response::text(400, &message));
                    continue;
                }
            };

            if req.path.split('?').next() != Some(route.as_str()) {
                http::write_response(&mut stream, &Response::text(404, "not found"));
                continue;
            }

            match req.method.as_str() {
                "GET" => {
                    let page = render_form(request.title, &fields, &initial, &[], &route)?;
                    http::write_response(&mut stream, &Response::html(200, page));
                }
                "POST" => {
                    let raw = decode_form(&req.body);
                    match collect_answers(&fields, request.form_data, &raw) {
                        Ok(answers) => {
                            let ack = (request.submit)(&answers);
                            http::write_response(&mut stream, &Response::html(200, render_ack(&ack)?));
                            self.log.info("configuration form submitted");
                            return Ok(answers);
                        }
                        Err(errors) => {
                            let page = render_form(request.title, &fields, &raw, &errors, &route)?;
                            http::write_response(&mut stream, &Response::html(400, page));
                        }
                    }
                }
                _ => http::write_response(&mut stream, &Response::text(405, "method not allowed")),
            }
        }

        Err(CreateError::Session {
            message: "form listener closed before submission".into(),
        })
    }
}

fn initial_values(fields: &[FormField], seed: &AnswerSet) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter_map(|field| {
            field
                .initial(seed.get(&field.name))
                .map(|value| (field.name.clone(), display(value)))
        })
        .collect()
}

fn decode_form(body: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// Overlay the submitted fields onto the seed answers. Unchecked boxes are
/// absent from a form post and read as `false`.
fn collect_answers(
    fields: &[FormField],
    seed: &AnswerSet,
    raw: &BTreeMap<String, String>,
) -> std::result::Result<AnswerSet, Vec<String>> {
    let mut answers = seed.clone();
    let mut errors = Vec::new();

    for field in fields {
        let input = raw.get(&field.name).map(String::as_str).unwrap_or_default();
        match field.parse(input) {
            Ok(Some(value)) => {
                answers.insert(field.name.clone(), value);
            }
            Ok(None) => {
                answers.remove(&field.name);
            }
            Err(message) => errors.push(message),
        }
    }

    if errors.is_empty() {
        Ok(answers)
    } else {
        Err(errors)
    }
}

fn render_form(
    title: &str,
    fields: &[FormField],
    values: &BTreeMap<String, String>,
    errors: &[String],
    action: &str,
) -> Result<String> {
    let views: Vec<FieldView> = fields
        .iter()
        .map(|field| FieldView {
            name: &field.name,
            title: &field.title,
            description: field.description.as_deref(),
            kind: field.kind.name(),
            required: field.required,
            value: values.get(&field.name).cloned().unwrap_or_default(),
            options: match &field.kind {
                FieldKind::Choice(options) => options.iter().map(display).collect(),
                _ => Vec::new(),
            },
        })
        .collect();

    let mut context = Context::new();
    context.insert("title", title);
    context.insert("fields", &views);
    context.insert("errors", errors);
    context.insert("action", action);
    render_page(FORM_PAGE, &context)
}

fn render_ack(ack: &Acknowledgment) -> Result<String> {
    let mut context = Context::new();
    context.insert("title", &ack.title);
    context.insert("message", &ack.message);
    render_page(ACK_PAGE, &context)
}

fn render_page(template: &str, context: &Context) -> Result<String> {
    Tera::one_off(template, context, true).map_err(|e| CreateError::Session {
        message: format!("cannot render form page: {e}"),
    })
}
