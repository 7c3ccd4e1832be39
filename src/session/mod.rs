mod browser;
mod http;
mod schema;
mod terminal;

use std::process::Command;

use sha2::{Digest, Sha256};

use crate::answers::AnswerSet;
use crate::error::Result;
use crate::log::Log;

pub use browser::BrowserSession;
pub use schema::{form_fields, FieldKind, FormField};
pub use terminal::TerminalSession;

/// Identifies an open form session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    /// Where a human can fill in the form, when the session is browser based.
    pub url: Option<String>,
}

/// The screen shown after the form has been submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub title: String,
    pub message: String,
}

impl Acknowledgment {
    pub fn configuration_completed() -> Self {
        Self {
            title: "Configuration completed".into(),
            message: "You can close this page and return to the terminal.".into(),
        }
    }
}

/// Everything the second interaction needs: the form and its seed values.
pub struct EditRequest<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub schema: &'a serde_json::Value,
    pub form_data: &'a AnswerSet,
    pub submit: &'a dyn Fn(&AnswerSet) -> Acknowledgment,
}

/// A two-phase exchange that collects answers from a human.
pub trait FormSession {
    /// Open a session without a payload.
    fn open(&mut self) -> Result<SessionHandle>;

    /// Present the form and block until it is submitted.
    fn edit(&mut self, request: EditRequest<'_>) -> Result<AnswerSet>;
}

/// A short random-looking session id derived from the pid and clock.
pub fn session_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.finalize()[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn opener(url: &str) -> Command {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    }

    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Best effort: launch the default browser, printing the URL if that fails.
///
/// The opener is waited on in the background so a slow or blocking opener
/// cannot hold up the form server.
pub fn open_in_browser(url: &str, log: &Log) {
    let print_url = |url: &str| {
        println!("Open configuration form at: {url}");
    };

    match opener(url).spawn() {
        Ok(mut child) => {
            let url = url.to_string();
            let log = log.clone();
            std::thread::spawn(move || match child.wait() {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    log.warn(format!("browser opener exited with {status}"));
                    print_url(&url);
                }
                Err(e) => {
                    log.warn(format!("browser opener failed: {e}"));
                    print_url(&url);
                }
            });
        }
        Err(e) => {
            log.warn(format!("could not launch a browser: {e}"));
            print_url(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_hex() {
        let id = session_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn acknowledgment_is_fixed() {
        let ack = Acknowledgment::configuration_completed();
        assert_eq!(ack.title, "Configuration completed");
    }
}
