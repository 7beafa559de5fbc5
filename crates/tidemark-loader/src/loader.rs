use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tidemark_config::FileFormat;
use tidemark_core::{Step, Version};
use tracing::{debug, warn};

use crate::registry::MigrationRegistry;
use crate::step_file::StepFile;

/// Parts of a step file name such as `20070115120000_AddUsersTable.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFileName {
    pub prefix: String,
    pub identifier: String,
    pub format: FileFormat,
}

/// Split a file name into sortable prefix, identifier and format.
///
/// Returns `None` for anything that is not a step file: the prefix must be a
/// non-empty run of ASCII digits, followed by `_` and a non-empty identifier.
pub fn parse_step_file_name(path: &Path) -> Option<StepFileName> {
    let format = FileFormat::from_extension(path.extension()?.to_str()?)?;
    let stem = path.file_stem()?.to_str()?;
    let (prefix, identifier) = stem.split_once('_')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) || identifier.is_empty() {
        return None;
    }
    Some(StepFileName {
        prefix: prefix.to_string(),
        identifier: identifier.to_string(),
        format,
    })
}

/// A discovered file that did not resolve to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSkipped {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for LoadSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.path.display(), self.reason)
    }
}

struct Candidate {
    prefix: String,
    name: String,
    connection: String,
    path: PathBuf,
    step: StepFile,
}

/// Discovers step files and registers them with sequential per-connection
/// versions.
///
/// Each loader keeps its own cache of registered source paths, so loading the
/// same roots twice registers nothing new.
#[derive(Debug, Default)]
pub struct StepLoader {
    registered: HashSet<PathBuf>,
    skipped: Vec<LoadSkipped>,
}

impl StepLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every root recursively and register the step files found.
    ///
    /// Returns the number of newly registered steps. Files that fail to parse
    /// or declare no hook are recorded in [`StepLoader::skipped`].
    pub fn load_from_directories<P: AsRef<Path>>(
        &mut self,
        roots: &[P],
        registry: &mut MigrationRegistry,
    ) -> Result<usize> {
        let mut files = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if !root.exists() {
                debug!(root = %root.display(), "step root does not exist");
                continue;
            }
            collect_files(root, &mut files)?;
        }

        let mut candidates = Vec::new();
        for path in files {
            let Some(file_name) = parse_step_file_name(&path) else {
                continue;
            };
            if self.registered.contains(&path) {
                continue;
            }
            if let Some(candidate) = self.resolve(path, file_name) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| (&a.prefix, &a.name).cmp(&(&b.prefix, &b.name)));

        let count = candidates.len();
        for candidate in candidates {
            self.register_step(
                registry,
                candidate.name,
                Some(candidate.path),
                &candidate.connection,
                Arc::new(candidate.step),
            );
        }
        Ok(count)
    }

    /// Register one step directly, e.g. a step produced by a schema diff.
    ///
    /// The step gets the connection's next version.
    pub fn register_step(
        &mut self,
        registry: &mut MigrationRegistry,
        name: impl Into<String>,
        path: Option<PathBuf>,
        connection: &str,
        step: Arc<dyn Step>,
    ) -> Version {
        let name = name.into();
        if let Some(path) = &path {
            self.registered.insert(path.clone());
        }
        debug!(
            connection,
            version = registry.next_version(connection),
            name = %name,
            "registering step"
        );
        registry.insert(connection, name, path, step)
    }

    /// Parse and register a single step file under `connection`.
    pub fn register_file(
        &mut self,
        registry: &mut MigrationRegistry,
        path: &Path,
        connection: &str,
    ) -> Result<Version> {
        let file_name = parse_step_file_name(path)
            .with_context(|| format!("not a step file name: {}", path.display()))?;
        let step = StepFile::read(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("parse step file: {}", path.display()))?;
        if step.hooks().is_empty() {
            anyhow::bail!("step file declares no hooks: {}", path.display());
        }
        let name = step.name.clone().unwrap_or(file_name.identifier);
        Ok(self.register_step(
            registry,
            name,
            Some(path.to_path_buf()),
            connection,
            Arc::new(step),
        ))
    }

    /// Files skipped so far by this loader.
    pub fn skipped(&self) -> &[LoadSkipped] {
        &self.skipped
    }

    fn resolve(&mut self, path: PathBuf, file_name: StepFileName) -> Option<Candidate> {
        let connection = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string);
        let Some(connection) = connection else {
            self.skip(path, "cannot derive connection from parent directory".into());
            return None;
        };

        let step = match StepFile::read(&path) {
            Ok(step) => step,
            Err(reason) => {
                self.skip(path, reason);
                return None;
            }
        };
        if step.hooks().is_empty() {
            self.skip(path, "declares no hooks".into());
            return None;
        }

        Some(Candidate {
            prefix: file_name.prefix,
            name: step.name.clone().unwrap_or(file_name.identifier),
            connection,
            path,
            step,
        })
    }

    fn skip(&mut self, path: PathBuf, reason: String) {
        let skipped = LoadSkipped { path, reason };
        warn!("{skipped}");
        self.skipped.push(skipped);
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read step directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry.context("read directory entry")?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
