pub mod user;

use std::str::FromStr;

use crate::error::{CreateError, Result};
use crate::registry::DEFAULT_REGISTRY_URL;

pub use user::{load_user_config, FormConfig, UserConfig};

pub const DEFAULT_GIT: &str = "git";
pub const DEFAULT_BIND: &str = "127.0.0.1:0";

pub const ENV_REGISTRY: &str = "UT_CREATE_REGISTRY";
pub const ENV_GIT: &str = "UT_CREATE_GIT";
pub const ENV_FORM: &str = "UT_CREATE_FORM";

/// How the configuration form is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Browser,
    Terminal,
}

impl FromStr for FormMode {
    type Err = CreateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" | "web" => Ok(Self::Browser),
            "terminal" | "tty" => Ok(Self::Terminal),
            _ => Err(CreateError::UnknownFormMode { mode: s.to_string() }),
        }
    }
}

/// Settings given on the command line; these win over every other layer.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub registry: Option<String>,
    pub form: Option<String>,
    pub no_open: bool,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub registry: String,
    pub git: String,
    pub form: FormMode,
    pub bind: String,
    pub open_browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY_URL.to_string(),
            git: DEFAULT_GIT.to_string(),
            form: FormMode::Browser,
            bind: DEFAULT_BIND.to_string(),
            open_browser: true,
        }
    }
}

impl Settings {
    /// Layer built-in defaults, the user config file, the environment and
    /// the command line, in that order.
    pub fn resolve(
        file: Option<UserConfig>,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(file) = file {
            if let Some(registry) = file.registry {
                settings.registry = registry;
            }
            if let Some(git) = file.git {
                settings.git = git;
            }
            if let Some(mode) = file.form.mode {
                settings.form = mode.parse()?;
            }
            if let Some(bind) = file.form.bind {
                settings.bind = bind;
            }
            if let Some(open) = file.form.open {
                settings.open_browser = open;
            }
        }

        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        if let Some(registry) = env(ENV_REGISTRY) {
            settings.registry = registry;
        }
        if let Some(git) = env(ENV_GIT) {
            settings.git = git;
        }
        if let Some(mode) = env(ENV_FORM) {
            settings.form = mode.parse()?;
        }

        if let Some(registry) = &overrides.registry {
            settings.registry = registry.clone();
        }
        if let Some(mode) = &overrides.form {
            settings.form = mode.parse()?;
        }
        if overrides.no_open {
            settings.open_browser = false;
        }

        Ok(settings)
    }

    /// Resolve against the real user config file and process environment.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::resolve(load_user_config()?, |key| std::env::var(key).ok(), overrides)
    }
}
