#![allow(dead_code)]

use std::fs;
use std::path::Path;

use efl_unify::config::PipelineConfig;
use efl_unify::types::Source;

pub const IDENTITY_MAP: &str = "club_name,club_name_normalized
Man Utd,Manchester United
Manchester Utd,Manchester United
Manchester United,Manchester United
Arsenal,Arsenal
Arsenal FC,Arsenal
Chelsea,Chelsea
";

pub const FBREF_HEADER: &str =
    "date,start_time,home_team,away_team,home_goals,away_goals,attendance,venue";

pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Config rooted in `dir` with only `sources` enabled; the first is primary.
pub fn config(dir: &Path, sources: &[Source]) -> PipelineConfig {
    let config = PipelineConfig {
        raw_data_root: dir.join("raw"),
        cleansed_data_root: dir.join("interim"),
        reference_data_path: dir.join("league_size_matches.csv"),
        identity_map_path: dir.join("club_name_normalization.csv"),
        corrections_path: None,
        unified_output_path: dir.join("unified").join("match_data.csv"),
        discrepancy_report_path: dir.join("unified").join("discrepancies.csv"),
        summary_path: dir.join("unified").join("summary.json"),
        log_dir: dir.join("logs"),
        sources: sources.to_vec(),
        primary_source: sources[0],
        ..Default::default()
    };
    write(&config.identity_map_path, IDENTITY_MAP);
    config
}
