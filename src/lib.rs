pub mod answers;
pub mod config;
pub mod error;
pub mod log;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod template;
pub mod transform;

pub use error::{CreateError, ErrorKind, Result};
pub use pipeline::{create, Collaborators, CreateOptions, CreateOutcome, Stage};
