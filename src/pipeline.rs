use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::answers::{seed_answers, AnswerSet};
use crate::error::Result;
use crate::log::Log;
use crate::manifest::{load_manifest, ParameterManifest};
use crate::registry::{RegistryClient, RepositoryRef};
use crate::session::{open_in_browser, Acknowledgment, EditRequest, FormSession};
use crate::template::{remote_url, resolve_source, TemplateSpec, VersionControl};
use crate::transform::{execute_transform, plan_transform, TransformReport};

/// The states a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Locate,
    Clone,
    Configure,
    Transform,
    RemoteFix,
    Done,
    Failed,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Locate => "locate",
            Self::Clone => "clone",
            Self::Configure => "configure",
            Self::Transform => "transform",
            Self::RemoteFix => "remote-fix",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct CreateOptions {
    /// Template keyword or local project path; `app` when absent.
    pub template: Option<String>,
    /// Target directory, relative to `cwd`; `.` when absent.
    pub project_dir: Option<String>,
    /// Answers given as command-line options.
    pub answers: AnswerSet,
    pub cwd: PathBuf,
    pub open_browser: bool,
    /// Compute the changes, report them, and leave nothing behind.
    pub dry_run: bool,
}

/// The external systems a run talks to.
pub struct Collaborators<'a> {
    pub registry: &'a dyn RegistryClient,
    pub vcs: &'a dyn VersionControl,
    pub session: &'a mut dyn FormSession,
}

#[derive(Debug)]
pub struct CreateOutcome {
    pub spec: TemplateSpec,
    /// Present when the template came from the registry.
    pub repository: Option<RepositoryRef>,
    pub answers: AnswerSet,
    /// In a dry run, `files_written` lists the files that would change.
    pub report: TransformReport,
    pub stages: Vec<Stage>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollbackScope {
    /// The root did not exist: remove it entirely.
    Directory,
    /// The root was an empty directory: empty it again.
    Contents,
}

/// Undoes the materialization of a project root after a failed run.
///
/// Only armed when the root is absent or empty before cloning, so existing
/// user content is never removed.
struct Rollback {
    root: PathBuf,
    scope: Option<RollbackScope>,
}

impl Rollback {
    fn arm(root: &Path) -> Self {
        let scope = if !root.exists() {
            Some(RollbackScope::Directory)
        } else if is_empty_dir(root) {
            Some(RollbackScope::Contents)
        } else {
            None
        };
        Self {
            root: root.to_path_buf(),
            scope,
        }
    }

    fn restore(&self, log: &Log) {
        let Some(scope) = self.scope else {
            return;
        };
        if !self.root.exists() {
            return;
        }

        let result = match scope {
            RollbackScope::Directory => fs::remove_dir_all(&self.root),
            RollbackScope::Contents => clear_dir(&self.root),
        };
        match result {
            Ok(()) => log.warn(format!("rolled back {}", self.root.display())),
            Err(e) => log.error(format!("rollback of {} failed: {e}", self.root.display())),
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn clear_dir(path: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

struct Run<'a> {
    log: &'a Log,
    stages: Vec<Stage>,
    rollback: Option<Rollback>,
}

impl Run<'_> {
    fn enter(&mut self, stage: Stage) -> Log {
        self.stages.push(stage);
        let log = self.log.stage(stage.name());
        log.debug(format!("entering {stage}"));
        log
    }

    fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Resolve)
    }
}

/// Materialize and customise a project.
///
/// Any error moves the run to [`Stage::Failed`]: it is logged, the cloned
/// root is rolled back when this run created it, and the error is returned.
pub fn create(
    options: &CreateOptions,
    collaborators: Collaborators<'_>,
    log: &Log,
) -> Result<CreateOutcome> {
    let mut run = Run {
        log,
        stages: Vec::new(),
        rollback: None,
    };

    match run_stages(&mut run, options, collaborators) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            let failed_in = run.current();
            run.enter(Stage::Failed);
            log.error(format!("{failed_in} failed: {err}"));
            if let Some(rollback) = &run.rollback {
                rollback.restore(log);
            }
            Err(err)
        }
    }
}

fn run_stages(
    run: &mut Run<'_>,
    options: &CreateOptions,
    collaborators: Collaborators<'_>,
) -> Result<CreateOutcome> {
    let Collaborators {
        registry,
        vcs,
        session,
    } = collaborators;

    let log = run.enter(Stage::Resolve);
    let spec = resolve_source(
        options.template.as_deref(),
        options.project_dir.as_deref(),
        &options.cwd,
    )?;
    log.info(format!(
        "{} -> {} at {}",
        spec.title,
        spec.canonical_name,
        spec.root.display()
    ));

    let repository = if spec.is_local() {
        log.info("using local project, skipping registry and clone");
        None
    } else {
        let log = run.enter(Stage::Locate);
        let repository = registry.lookup(&spec.canonical_name)?;
        log.info(format!("found {}", repository.clone_url));

        let log = run.enter(Stage::Clone);
        run.rollback = Some(Rollback::arm(&spec.root));
        vcs.clone_repo(&repository.clone_url, &spec.root)?;
        log.info(format!("cloned into {}", spec.root.display()));
        Some(repository)
    };

    let log = run.enter(Stage::Configure);
    let manifest = load_manifest(&spec.root)?;
    let answers = configure(&manifest, &spec, options, vcs, session, &log)?;

    let log = run.enter(Stage::Transform);
    let rules = manifest.rename(&answers)?;
    log.debug(format!("{} rename rule(s)", rules.len()));
    let plan = plan_transform(&rules, &spec.root, &log)?;

    if options.dry_run {
        let report = TransformReport {
            files_matched: plan.files.len(),
            files_written: plan.changed().map(|f| f.relative_path.clone()).collect(),
        };
        for file in &report.files_written {
            log.info(format!("would update {file}"));
        }
        if let Some(rollback) = run.rollback.take() {
            rollback.restore(&log);
        }
        run.enter(Stage::Done);
        return Ok(CreateOutcome {
            spec,
            repository,
            answers,
            report,
            stages: run.stages.clone(),
            dry_run: true,
        });
    }

    let report = execute_transform(&plan, &log)?;

    if let Some(repository) = &repository {
        let log = run.enter(Stage::RemoteFix);
        let url = remote_url(
            &repository.clone_url,
            &spec.canonical_name,
            &spec.project_name(),
        );
        vcs.set_remote_url(&spec.root, &url)?;
        log.info(format!("origin set to {url}"));
    }

    run.enter(Stage::Done);
    run.rollback = None;
    Ok(CreateOutcome {
        spec,
        repository,
        answers,
        report,
        stages: run.stages.clone(),
        dry_run: false,
    })
}

fn configure(
    manifest: &ParameterManifest,
    spec: &TemplateSpec,
    options: &CreateOptions,
    vcs: &dyn VersionControl,
    session: &mut dyn FormSession,
    log: &Log,
) -> Result<AnswerSet> {
    let seed = seed_answers(
        &manifest.params.schema,
        &options.answers,
        &manifest.params.form_data,
        vcs,
        log,
    );

    let handle = session.open()?;
    if let Some(url) = &handle.url {
        if options.open_browser {
            open_in_browser(url, log);
        } else {
            println!("Open configuration form at: {url}");
        }
    }

    let submit = |_: &AnswerSet| Acknowledgment::configuration_completed();
    session.edit(EditRequest {
        id: &handle.id,
        title: &spec.title,
        schema: &manifest.params.schema,
        form_data: &seed,
        submit: &submit,
    })
}
