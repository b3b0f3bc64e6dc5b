use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::types::{MatchRecord, Source};
use crate::util::format_int;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Read one cleansed per-source table. A malformed row is an error carrying
/// its position; the table has already been through its cleanser's checks.
pub fn load_standardized(path: &Path, source: Source) -> Result<Vec<MatchRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("{} table {}", source, path.display())));
    }
    let mut rdr = ReaderBuilder::new().from_path(path)?;
    let mut rows: Vec<MatchRecord> = Vec::new();
    let mut foreign = 0usize;
    for result in rdr.deserialize::<MatchRecord>() {
        let mut row = result?;
        if row.source != source {
            foreign += 1;
            row.source = source;
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::EmptyData(format!("{} table {}", source, path.display())));
    }
    if foreign > 0 {
        warn!(
            "{} rows in {} were tagged with another source; retagged as {}",
            foreign,
            path.display(),
            source
        );
    }
    info!(
        "Loaded {} rows of {} from {}",
        format_int(rows.len()),
        source,
        path.display()
    );
    Ok(rows)
}

pub fn load_sources(config: &PipelineConfig) -> Result<BTreeMap<Source, Vec<MatchRecord>>> {
    let mut tables = BTreeMap::new();
    for source in &config.sources {
        let rows = load_standardized(&config.cleansed_path(*source), *source)?;
        tables.insert(*source, rows);
    }
    Ok(tables)
}
