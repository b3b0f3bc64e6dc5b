//! Ground-truth season sizes: how many clubs and matches each season/tier
//! really had. Every reconciled dataset is measured against this table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::ReferenceSeasonEntry;
use crate::util::is_valid_season;

#[derive(Debug, Clone)]
pub struct SeasonReference {
    entries: BTreeMap<(String, u8), ReferenceSeasonEntry>,
}

impl SeasonReference {
    /// Load the reference CSV (`season,league_tier,clubs,matches`).
    /// A missing or empty file is fatal.
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Loading season reference from {}", path.display());
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "reference data file {}",
                path.display()
            )));
        }
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let headers = rdr.headers()?.clone();
        for column in ["season", "league_tier", "clubs", "matches"] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::MissingColumn {
                    column: column.to_string(),
                    file: path.display().to_string(),
                });
            }
        }
        let rows = rdr
            .deserialize::<ReferenceSeasonEntry>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let reference = Self::from_entries(rows)
            .map_err(|e| match e {
                Error::EmptyData(_) => Error::EmptyData(format!("reference data file {}", path.display())),
                other => other,
            })?;
        info!(
            "Season reference loaded: {} season/tier rows",
            reference.entries.len()
        );
        Ok(reference)
    }

    pub fn from_entries(rows: Vec<ReferenceSeasonEntry>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyData("reference data has no rows".into()));
        }
        let mut entries = BTreeMap::new();
        for row in rows {
            if !is_valid_season(&row.season) {
                return Err(Error::Validation(format!(
                    "Malformed season '{}' in reference data",
                    row.season
                )));
            }
            let key = (row.season.clone(), row.league_tier);
            if entries.insert(key, row.clone()).is_some() {
                return Err(Error::Validation(format!(
                    "Duplicate reference row for season {}, league tier {}",
                    row.season, row.league_tier
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Sorted seasons, optionally restricted to one tier.
    pub fn get_seasons(&self, league_tier: Option<u8>) -> Vec<String> {
        let seasons: BTreeSet<&String> = self
            .entries
            .keys()
            .filter(|(_, tier)| league_tier.map_or(true, |t| t == *tier))
            .map(|(season, _)| season)
            .collect();
        seasons.into_iter().cloned().collect()
    }

    pub fn get_league_tiers(&self) -> Result<Vec<u8>> {
        let tiers: BTreeSet<u8> = self.entries.keys().map(|(_, t)| *t).collect();
        if tiers.is_empty() {
            return Err(Error::EmptyData("no league tiers in reference data".into()));
        }
        Ok(tiers.into_iter().collect())
    }

    pub fn get_club_count(&self, season: &str, league_tier: u8) -> Result<usize> {
        self.entry(season, league_tier).map(|e| e.clubs)
    }

    pub fn get_match_count(&self, season: &str, league_tier: u8) -> Result<usize> {
        self.entry(season, league_tier).map(|e| e.matches)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReferenceSeasonEntry> {
        self.entries.values()
    }

    fn entry(&self, season: &str, league_tier: u8) -> Result<&ReferenceSeasonEntry> {
        self.entries
            .get(&(season.to_string(), league_tier))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "No reference data for season {}, league tier {}",
                    season, league_tier
                ))
            })
    }
}
