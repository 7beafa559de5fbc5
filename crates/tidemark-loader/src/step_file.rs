use std::path::Path;

use serde::{Deserialize, Serialize};
use tidemark_config::FileFormat;
use tidemark_core::{Change, ChangeSet, Direction, HookKind, HookSet, Step, StepError};

/// A step declared in a JSON or YAML file.
///
/// Every present hook key declares that hook, even with an empty change
/// list. Changes of the generic `migrate` hook are declared in up-form and
/// recorded as-is in both directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_up: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_up: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_down: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_down: Option<Vec<Change>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate: Option<Vec<Change>>,
}

impl StepFile {
    pub fn parse(content: &str, format: FileFormat) -> Result<Self, String> {
        match format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Yaml | FileFormat::Yml => {
                serde_yaml::from_str(content).map_err(|e| e.to_string())
            }
        }
    }

    pub fn render(&self, format: FileFormat) -> Result<String, String> {
        match format {
            FileFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            FileFormat::Yaml | FileFormat::Yml => {
                serde_yaml::to_string(self).map_err(|e| e.to_string())
            }
        }
    }

    /// Read and parse a step file, picking the format from its extension.
    pub fn read(path: &Path) -> Result<Self, String> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
            .ok_or_else(|| format!("unsupported step file extension: {}", path.display()))?;
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::parse(&content, format)
    }

    fn declared(&self, hook: HookKind) -> Option<&[Change]> {
        let changes = match hook {
            HookKind::PreUp => &self.pre_up,
            HookKind::Up => &self.up,
            HookKind::PostUp => &self.post_up,
            HookKind::PreDown => &self.pre_down,
            HookKind::Down => &self.down,
            HookKind::PostDown => &self.post_down,
            HookKind::Migrate => &self.migrate,
        };
        changes.as_deref()
    }
}

impl Step for StepFile {
    fn hooks(&self) -> HookSet {
        HookKind::ALL
            .into_iter()
            .filter(|hook| self.declared(*hook).is_some())
            .collect()
    }

    fn run(
        &self,
        hook: HookKind,
        _direction: Direction,
        changes: &mut ChangeSet,
    ) -> Result<(), StepError> {
        let declared = self.declared(hook).ok_or(StepError::MissingHook(hook))?;
        changes.extend(declared.iter().cloned());
        Ok(())
    }
}
