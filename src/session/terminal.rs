use inquire::validator::{ErrorMessage, Validation};
use inquire::{CustomUserError, InquireError};
use serde_json::Value;

use super::schema::{display, form_fields, FieldKind, FormField};
use super::{EditRequest, FormSession, SessionHandle};
use crate::answers::AnswerSet;
use crate::error::{CreateError, Result};
use crate::log::Log;

/// Walks the form fields as interactive terminal prompts.
pub struct TerminalSession {
    log: Log,
}

impl TerminalSession {
    pub fn new(log: Log) -> Self {
        Self { log }
    }
}

impl FormSession for TerminalSession {
    fn open(&mut self) -> Result<SessionHandle> {
        Ok(SessionHandle {
            id: "terminal".into(),
            url: None,
        })
    }

    fn edit(&mut self, request: EditRequest<'_>) -> Result<AnswerSet> {
        let fields = form_fields(request.schema)?;
        println!("{}", console::style(request.title).bold());

        let mut answers = request.form_data.clone();
        for field in &fields {
            let seed = field.initial(request.form_data.get(&field.name)).cloned();
            match prompt_field(field, seed.as_ref())? {
                Some(value) => {
                    answers.insert(field.name.clone(), value);
                }
                None => {
                    answers.remove(&field.name);
                }
            }
        }

        let ack = (request.submit)(&answers);
        self.log.debug("terminal form completed");
        println!(
            "\n{} {}",
            console::style(&ack.title).green().bold(),
            console::style(&ack.message).dim()
        );
        Ok(answers)
    }
}

fn prompt_field(field: &FormField, seed: Option<&Value>) -> Result<Option<Value>> {
    let help = field.description.as_deref().unwrap_or_default();

    match &field.kind {
        FieldKind::Boolean => {
            let default = seed.and_then(Value::as_bool).unwrap_or(false);
            let mut prompt = inquire::Confirm::new(&field.title).with_default(default);
            if !help.is_empty() {
                prompt = prompt.with_help_message(help);
            }
            prompt
                .prompt()
                .map(|answer| Some(Value::Bool(answer)))
                .map_err(prompt_error)
        }
        FieldKind::Choice(options) => {
            let labels: Vec<String> = options.iter().map(display).collect();
            let start = seed
                .and_then(|seed| options.iter().position(|option| option == seed))
                .unwrap_or(0);
            let mut prompt =
                inquire::Select::new(&field.title, labels.clone()).with_starting_cursor(start);
            if !help.is_empty() {
                prompt = prompt.with_help_message(help);
            }
            let picked = prompt.prompt().map_err(prompt_error)?;
            Ok(labels
                .iter()
                .position(|label| *label == picked)
                .map(|i| options[i].clone()))
        }
        FieldKind::String
        | FieldKind::Integer
        | FieldKind::Number
        | FieldKind::Array
        | FieldKind::Object => {
            let default = seed.map(display).unwrap_or_default();
            let validating = field.clone();
            let validator = move |input: &str| -> std::result::Result<Validation, CustomUserError> {
                Ok(match validating.parse(input) {
                    Ok(_) => Validation::Valid,
                    Err(message) => Validation::Invalid(ErrorMessage::Custom(message)),
                })
            };
            let mut prompt = inquire::Text::new(&field.title).with_validator(validator);
            if !default.is_empty() {
                prompt = prompt.with_default(&default);
            }
            if !help.is_empty() {
                prompt = prompt.with_help_message(help);
            }
            let answer = prompt.prompt().map_err(prompt_error)?;
            field
                .parse(&answer)
                .map_err(|message| CreateError::Session { message })
        }
    }
}

fn prompt_error(err: InquireError) -> CreateError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            CreateError::SessionCancelled
        }
        other => CreateError::Session {
            message: other.to_string(),
        },
    }
}
