//! Writing generated monitors and migration reports to disk.
//!
//! Lightweight monitors become `<lightweight_dir>/<name>.yml`, browser monitors become
//! `<journey_dir>/<name>.journey.ts` holding the script verbatim. Every artifact is written in a
//! single call; there is no temp-file/rename dance.
//!
//! The same layout is read back by `synthmig check`, which re-runs the strict validator over
//! artifacts already on disk.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::errors::{Error, Result};
use crate::models::{GeneratedConfig, MigrationReport, ValidationResult};
use crate::validator::{StrictValidator, validate_script};

/// Writes the artifacts of one migration run.
///
/// File names are claimed per writer: a monitor whose name sanitises to a stem already written in
/// this run gets its guid appended, so no artifact overwrites another.
pub struct ArtifactWriter {
    config: OutputConfig,
    claimed: HashSet<String>,
}

impl ArtifactWriter {
    /// Create the writer and its output directories.
    pub fn new(config: OutputConfig) -> Result<Self> {
        for dir in [config.lightweight_path(), config.journey_path()] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(format!("create directory {}", dir.display()), e))?;
        }
        Ok(Self {
            config,
            claimed: HashSet::new(),
        })
    }

    /// Persist one generated monitor, returning its path relative to `base_dir`.
    pub fn write_monitor(&mut self, generated: &GeneratedConfig) -> Result<String> {
        let stem = file_stem(&generated.name, &generated.original_monitor_id);

        let (dir_name, dir, extension, contents) = match generated.script() {
            Some(script) => (
                self.config.journey_dir.clone(),
                self.config.journey_path(),
                ".journey.ts",
                script.to_string(),
            ),
            None => (
                self.config.lightweight_dir.clone(),
                self.config.lightweight_path(),
                ".yml",
                serde_yaml::to_string(&generated.to_document()?)?,
            ),
        };

        let file_name = self.claim(&dir_name, &stem, &safe_name(&generated.original_monitor_id), extension);
        let path = dir.join(&file_name);
        std::fs::write(&path, contents).map_err(|e| Error::io(format!("write {}", path.display()), e))?;
        debug!(path = %path.display(), "Wrote monitor");

        Ok(format!("{dir_name}/{file_name}"))
    }

    /// First free file name in `dir_name`: the stem, then the stem with the guid, then numbered.
    fn claim(&mut self, dir_name: &str, stem: &str, guid: &str, extension: &str) -> String {
        let mut file_name = format!("{stem}{extension}");
        let mut attempt = 1;
        while !self.claimed.insert(format!("{dir_name}/{file_name}")) {
            file_name = match attempt {
                1 => format!("{stem}-{guid}{extension}"),
                n => format!("{stem}-{guid}-{n}{extension}"),
            };
            attempt += 1;
        }
        if attempt > 1 {
            warn!(stem, file = %file_name, "Artifact name already used in this run, disambiguated");
        }
        file_name
    }

    /// Persist the run report as pretty JSON, named after its generation time.
    pub fn write_report(&self, report: &MigrationReport) -> Result<PathBuf> {
        let path = self.config.base_dir.join(report_file_name(report.generated_at));
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json).map_err(|e| Error::io(format!("write {}", path.display()), e))?;
        info!(path = %path.display(), "Migration report saved");
        Ok(path)
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }
}

pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("migration_results_{}.json", generated_at.format("%Y%m%d_%H%M%S"))
}

/// Filesystem-safe lowercase name: keeps alphanumerics, spaces, `-` and `_`, then turns spaces
/// into underscores.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
        .to_lowercase()
}

fn file_stem(name: &str, guid: &str) -> String {
    let stem = safe_name(name);
    if stem.is_empty() { safe_name(guid) } else { stem }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Lightweight,
    Journey,
}

impl ArtifactKind {
    /// Classify a path by file name; `None` for files that are not monitor artifacts.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".journey.ts") {
            Some(ArtifactKind::Journey)
        } else if name.ends_with(".yml") || name.ends_with(".yaml") {
            Some(ArtifactKind::Lightweight)
        } else {
            None
        }
    }
}

/// Expand files and directories (recursively) into the monitor artifacts they contain.
///
/// Explicitly named files are kept even when their extension is unknown, so they can be reported.
pub fn collect_artifacts(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut artifacts = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_dir(path, &mut artifacts)?;
        } else {
            artifacts.push(path.clone());
        }
    }
    Ok(artifacts)
}

fn collect_dir(dir: &Path, artifacts: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| Error::io(format!("read directory {}", dir.display()), e))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(format!("read directory {}", dir.display()), e))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_dir(&path, artifacts)?;
        } else if ArtifactKind::of(&path).is_some() {
            artifacts.push(path);
        }
    }
    Ok(())
}

/// Re-validate one artifact from disk. YAML monitors are checked against their own `type`.
pub fn check_artifact(validator: &StrictValidator, path: &Path) -> Result<ValidationResult> {
    let kind = ArtifactKind::of(path).ok_or_else(|| Error::InvalidConfig {
        message: format!("{} is not a .yml monitor or a .journey.ts script", path.display()),
    })?;
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(format!("read {}", path.display()), e))?;

    Ok(match kind {
        ArtifactKind::Journey => validate_script(&contents),
        ArtifactKind::Lightweight => {
            let document: serde_json::Value = serde_yaml::from_str(&contents)?;
            validator.validate_document(&document)
        }
    })
}
