use console::style;
use ut_create::answers::parse_invocation;
use ut_create::config::{FormMode, Overrides, Settings};
use ut_create::log::Log;
use ut_create::registry::NpmRegistry;
use ut_create::session::{BrowserSession, FormSession, TerminalSession};
use ut_create::template::GitCli;
use ut_create::{create, Collaborators, CreateError, CreateOptions, CreateOutcome, Result};

use crate::cli::Cli;

pub fn run(cli: Cli) -> Result<()> {
    let log = Log::new();
    let settings = Settings::load(&Overrides {
        registry: cli.registry,
        form: cli.form,
        no_open: cli.no_open,
    })?;

    let invocation = parse_invocation(&cli.args);
    for word in &invocation.ignored {
        log.warn(format!("ignoring unexpected argument '{word}'"));
    }

    let cwd = std::env::current_dir().map_err(|e| CreateError::Io {
        context: "getting current directory".into(),
        source: e,
    })?;

    let registry = NpmRegistry::new(settings.registry.clone(), log.clone());
    let git = GitCli::new(settings.git.clone(), log.clone());
    let mut session: Box<dyn FormSession> = match settings.form {
        FormMode::Browser => Box::new(BrowserSession::new(settings.bind.clone(), log.clone())),
        FormMode::Terminal => Box::new(TerminalSession::new(log.clone())),
    };

    let options = CreateOptions {
        template: invocation.template,
        project_dir: invocation.project_dir,
        answers: invocation.options,
        cwd,
        open_browser: settings.open_browser,
        dry_run: cli.dry_run,
    };

    let outcome = create(
        &options,
        Collaborators {
            registry: &registry,
            vcs: &git,
            session: session.as_mut(),
        },
        &log,
    )?;

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &CreateOutcome) {
    if outcome.dry_run {
        println!(
            "\n{} Dry run: files that would change in {}:",
            style("==>").cyan().bold(),
            style(outcome.spec.root.display()).cyan()
        );
        for file in &outcome.report.files_written {
            println!("  {} {}", style("update").green(), file);
        }
        println!(
            "\nSummary: {} matched, {} would change",
            outcome.report.files_matched,
            outcome.report.files_written.len()
        );
        println!(
            "\n{} Dry run: nothing was kept on disk.",
            style("\u{2139}").blue().bold()
        );
        return;
    }

    println!(
        "\n{} {} created at {}",
        style("\u{2713}").green().bold(),
        outcome.spec.title,
        style(outcome.spec.root.display()).cyan()
    );
    if let Some(repository) = &outcome.repository {
        if !repository.description.is_empty() {
            println!("  {}", style(&repository.description).dim());
        }
    }
    println!(
        "  {} files matched, {} files updated",
        outcome.report.files_matched,
        outcome.report.files_written.len()
    );
}
