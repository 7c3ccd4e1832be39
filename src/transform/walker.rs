use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::file::{read_text, write_atomic};
use super::rule::{Rule, Selector};
use crate::error::{CreateError, Result};
use crate::log::Log;

/// A file selected by at least one rule, with its content before and after.
pub struct PlannedFile {
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub relative_path: String,
    /// Indices of the rules that selected this file, in application order.
    pub rules: Vec<usize>,
    pub original: String,
    pub content: String,
}

impl PlannedFile {
    pub fn is_changed(&self) -> bool {
        self.original != self.content
    }
}

/// The outcome of applying a rule set in memory, before anything is written.
pub struct TransformPlan {
    pub files: Vec<PlannedFile>,
    pub skipped_binary: Vec<String>,
}

impl TransformPlan {
    pub fn changed(&self) -> impl Iterator<Item = &PlannedFile> {
        self.files.iter().filter(|f| f.is_changed())
    }
}

#[derive(Debug, Default)]
pub struct TransformReport {
    pub files_matched: usize,
    pub files_written: Vec<String>,
}

/// Select files under `root` and compute their rewritten content.
///
/// The tree is walked once without following symlinks, and `.git` is never
/// entered. A file selected by several rules gets them all, in rule order.
pub fn plan_transform(rules: &[Rule], root: &Path, log: &Log) -> Result<TransformPlan> {
    let selectors = rules
        .iter()
        .enumerate()
        .map(|(index, rule)| rule.selector(index))
        .collect::<Result<Vec<Selector>>>()?;

    let mut files = Vec::new();
    let mut skipped_binary = Vec::new();

    if rules.is_empty() {
        return Ok(TransformPlan {
            files,
            skipped_binary,
        });
    }

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_git_dir(e))
    {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_path = to_slash(rel);

        let matched: Vec<usize> = selectors
            .iter()
            .enumerate()
            .filter(|(_, selector)| selector.is_match(&relative_path))
            .map(|(index, _)| index)
            .collect();

        if matched.is_empty() {
            continue;
        }

        let Some(original) = read_text(entry.path())? else {
            log.warn(format!("skipping binary file {relative_path}"));
            skipped_binary.push(relative_path);
            continue;
        };
        let content = matched
            .iter()
            .fold(original.clone(), |acc, &index| rules[index].apply(&acc));

        log.debug(format!(
            "{relative_path}: {} rule(s), {}",
            matched.len(),
            if content != original { "changed" } else { "unchanged" }
        ));

        files.push(PlannedFile {
            path: entry.path().to_path_buf(),
            relative_path,
            rules: matched,
            original,
            content,
        });
    }

    Ok(TransformPlan {
        files,
        skipped_binary,
    })
}

/// Write every changed file of the plan; unchanged files are left untouched.
pub fn execute_transform(plan: &TransformPlan, log: &Log) -> Result<TransformReport> {
    let mut files_written = Vec::new();

    for file in plan.changed() {
        write_atomic(&file.path, &file.content)?;
        log.info(format!("updated {}", file.relative_path));
        files_written.push(file.relative_path.clone());
    }

    Ok(TransformReport {
        files_matched: plan.files.len(),
        files_written,
    })
}

/// Plan and execute in one step.
pub fn apply_rules(rules: &[Rule], root: &Path, log: &Log) -> Result<TransformReport> {
    let plan = plan_transform(rules, root, log)?;
    execute_transform(&plan, log)
}

fn walk_error(root: &Path, err: walkdir::Error) -> CreateError {
    CreateError::Io {
        context: format!("walking {}", err.path().unwrap_or(root).display()),
        source: err.into(),
    }
}

fn is_git_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
