//! Pipeline configuration: every file location and source-selection policy
//! the cleansers and the reconciler need, resolved once at the start of a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::Source;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "efl_unify.toml";

/// What a cleanser does with a club name missing from the identity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Leave the club null and log a warning; the required-field check
    /// fails the source afterwards.
    #[default]
    Warn,
    /// Remove rows whose clubs could not be resolved.
    Drop,
    /// Abort as soon as resolution finishes with any miss.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_data_root: PathBuf,
    pub cleansed_data_root: PathBuf,
    pub reference_data_path: PathBuf,
    pub identity_map_path: PathBuf,
    pub corrections_path: Option<PathBuf>,
    pub unified_output_path: PathBuf,
    pub discrepancy_report_path: PathBuf,
    pub summary_path: PathBuf,
    pub log_dir: PathBuf,
    /// Sources to reconcile, highest merge priority first after the primary.
    pub sources: Vec<Source>,
    pub primary_source: Source,
    /// Sources compared by the discrepancy check; `None` means all of `sources`.
    pub discrepancy_sources: Option<Vec<Source>>,
    pub unmapped_clubs: UnmappedPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let corrections = PathBuf::from("CleansedData").join("Corrections and normalization");
        let unified = PathBuf::from("CleansedData").join("Unified");
        Self {
            raw_data_root: PathBuf::from("RawData").join("Matches"),
            cleansed_data_root: PathBuf::from("CleansedData").join("Interim"),
            reference_data_path: corrections.join("league_size_matches.csv"),
            identity_map_path: corrections.join("club_name_normalization.csv"),
            corrections_path: None,
            unified_output_path: unified.join("match_data.csv"),
            discrepancy_report_path: unified.join("discrepancies.csv"),
            summary_path: unified.join("summary.json"),
            log_dir: PathBuf::from("logs"),
            sources: Source::ALL.to_vec(),
            primary_source: Source::EnglishFootballLeagueTables,
            discrepancy_sources: None,
            unmapped_clubs: UnmappedPolicy::Warn,
        }
    }
}

impl PipelineConfig {
    /// Resolution order: explicit path, then `./efl_unify.toml`, then defaults.
    /// Relative paths inside the file are taken relative to the file itself.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (mut config, base) = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::NotFound(format!("config file {}", p.display())));
                }
                (Self::from_file(p)?, p.parent().map(Path::to_path_buf))
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    (Self::from_file(&local)?, None)
                } else {
                    info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    (Self::default(), None)
                }
            }
        };
        if let Some(base) = base.filter(|b| !b.as_os_str().is_empty()) {
            config.resolve_relative_to(&base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.raw_data_root);
        fix(&mut self.cleansed_data_root);
        fix(&mut self.reference_data_path);
        fix(&mut self.identity_map_path);
        fix(&mut self.unified_output_path);
        fix(&mut self.discrepancy_report_path);
        fix(&mut self.summary_path);
        fix(&mut self.log_dir);
        if let Some(p) = self.corrections_path.as_mut() {
            fix(p);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::Config("'sources' must name at least one source".into()));
        }
        if !self.sources.contains(&self.primary_source) {
            return Err(Error::Config(format!(
                "primary source '{}' is not listed in 'sources'",
                self.primary_source
            )));
        }
        let mut seen = Vec::new();
        for s in &self.sources {
            if seen.contains(s) {
                return Err(Error::Config(format!("source '{}' listed twice", s)));
            }
            seen.push(*s);
        }
        if let Some(ds) = &self.discrepancy_sources {
            if let Some(bad) = ds.iter().find(|s| !self.sources.contains(s)) {
                return Err(Error::Config(format!(
                    "discrepancy source '{}' is not listed in 'sources'",
                    bad
                )));
            }
        }
        Ok(())
    }

    /// Sources in merge priority: primary first, then configured order.
    pub fn merge_priority(&self) -> Vec<Source> {
        let mut order = vec![self.primary_source];
        order.extend(self.sources.iter().copied().filter(|s| *s != self.primary_source));
        order
    }

    pub fn discrepancy_sources(&self) -> Vec<Source> {
        self.discrepancy_sources
            .clone()
            .unwrap_or_else(|| self.sources.clone())
    }

    pub fn raw_dir(&self, source: Source) -> PathBuf {
        self.raw_data_root.join(crate::cleanse::profiles::profile(source).raw_dir)
    }

    pub fn cleansed_path(&self, source: Source) -> PathBuf {
        self.cleansed_data_root.join(source.file_name())
    }
}
