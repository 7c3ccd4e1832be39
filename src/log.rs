use tracing::Span;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "ut_create=info";

/// Process-scoped logger handle.
///
/// Created once by the binary and handed to every pipeline component that
/// talks to the outside world. Cloning is cheap; all clones share the root span.
#[derive(Clone, Debug)]
pub struct Log {
    span: Span,
}

impl Log {
    pub fn new() -> Self {
        Self {
            span: tracing::info_span!(
                "ut-create",
                service = env!("CARGO_PKG_NAME"),
                version = env!("CARGO_PKG_VERSION"),
            ),
        }
    }

    /// A child logger tagged with a pipeline stage.
    pub fn stage(&self, stage: &str) -> Self {
        Self {
            span: tracing::info_span!(parent: &self.span, "stage", name = stage),
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        let _entered = self.span.enter();
        tracing::debug!("{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let _entered = self.span.enter();
        tracing::info!("{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let _entered = self.span.enter();
        tracing::warn!("{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        let _entered = self.span.enter();
        tracing::error!("{}", message.as_ref());
    }

    /// Surface the stderr of an external command as a single log line.
    pub fn tool_stderr(&self, command: &str, stderr: &str) {
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            return;
        }
        let _entered = self.span.enter();
        tracing::info!(command, "{trimmed}");
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the stderr `fmt` subscriber, honouring `RUST_LOG` when set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ut_create=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_without_subscriber_is_a_no_op() {
        let log = Log::new();
        log.info("hello");
        log.stage("clone").warn("careful");
        log.tool_stderr("git", "   ");
        log.tool_stderr("git", "Cloning into 'ut-billing'...");
    }
}
