// Hand-maintained override table for fixtures a source gets wrong.
//
// Rows are keyed by (season, home_club, away_club) using canonical club
// names and are applied after identity resolution. A row with no source
// applies to every source; source-specific rows are applied afterwards.
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{MatchDay, MatchKey, MatchRecord, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Drop,
    Upsert,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Correction {
    pub source: Option<Source>,
    pub season: String,
    pub home_club: String,
    pub away_club: String,
    pub action: Action,
    pub league_tier: Option<u8>,
    pub match_date: Option<NaiveDate>,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub attendance: Option<u32>,
}

impl Correction {
    pub fn key(&self) -> MatchKey {
        MatchKey {
            season: self.season.clone(),
            home_club: self.home_club.clone(),
            away_club: self.away_club.clone(),
        }
    }

    fn patch(&self, rec: &mut MatchRecord) {
        if let Some(t) = self.league_tier {
            rec.league_tier = t;
        }
        if let Some(d) = self.match_date {
            rec.match_date = Some(d);
            rec.match_day_of_week = Some(MatchDay::from_date(d));
        }
        if self.home_goals.is_some() {
            rec.home_goals = self.home_goals;
        }
        if self.away_goals.is_some() {
            rec.away_goals = self.away_goals;
        }
        if self.attendance.is_some() {
            rec.attendance = self.attendance;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    pub dropped: usize,
    pub updated: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    corrections: Vec<Correction>,
}

impl CorrectionTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("corrections file {}", path.display())));
        }
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let rows = rdr
            .deserialize::<Correction>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let table = Self::new(rows)?;
        info!("Loaded {} corrections from {}", table.len(), path.display());
        Ok(table)
    }

    /// Rejects two rows for the same source and fixture so the outcome never
    /// depends on row order.
    pub fn new(corrections: Vec<Correction>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for c in &corrections {
            if !seen.insert((c.source, c.key())) {
                return Err(Error::Validation(format!(
                    "Duplicate correction for {} (source: {})",
                    c.key(),
                    c.source.map(|s| s.to_string()).unwrap_or_else(|| "all".into())
                )));
            }
            if c.action == Action::Upsert && c.home_club == c.away_club {
                return Err(Error::Validation(format!("Correction is a self-match: {}", c.key())));
            }
        }
        Ok(Self { corrections })
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Apply every correction relevant to `source`. Applying the same table
    /// twice gives the same rows as applying it once.
    pub fn apply(&self, source: Source, records: Vec<MatchRecord>) -> Result<(Vec<MatchRecord>, CorrectionStats)> {
        let general = self.corrections.iter().filter(|c| c.source.is_none());
        let specific = self.corrections.iter().filter(|c| c.source == Some(source));

        let mut rows: Vec<Option<MatchRecord>> = records.into_iter().map(Some).collect();
        let mut index: HashMap<MatchKey, usize> = HashMap::new();
        for (i, r) in rows.iter().enumerate() {
            if let Some(key) = r.as_ref().and_then(MatchRecord::key) {
                index.insert(key, i);
            }
        }

        let mut stats = CorrectionStats::default();
        for c in general.chain(specific) {
            let key = c.key();
            match (c.action, index.get(&key).copied()) {
                (Action::Drop, Some(i)) => {
                    debug!("Correction drops {} from {}", key, source);
                    rows[i] = None;
                    index.remove(&key);
                    stats.dropped += 1;
                }
                (Action::Drop, None) => {}
                (Action::Upsert, Some(i)) => {
                    if let Some(rec) = rows[i].as_mut() {
                        c.patch(rec);
                        stats.updated += 1;
                    }
                }
                (Action::Upsert, None) => {
                    // Source-wide rows only patch what a source already has.
                    if c.source.is_none() {
                        continue;
                    }
                    let league_tier = c.league_tier.ok_or_else(|| {
                        Error::Validation(format!(
                            "Correction inserting {} into {} needs a league_tier",
                            key, source
                        ))
                    })?;
                    let mut rec = MatchRecord {
                        season: c.season.clone(),
                        league_tier,
                        match_date: None,
                        match_day_of_week: None,
                        home_club: Some(c.home_club.clone()),
                        away_club: Some(c.away_club.clone()),
                        home_goals: None,
                        away_goals: None,
                        attendance: None,
                        match_time: None,
                        venue: None,
                        source,
                    };
                    c.patch(&mut rec);
                    index.insert(key, rows.len());
                    rows.push(Some(rec));
                    stats.inserted += 1;
                }
            }
        }
        Ok((rows.into_iter().flatten().collect(), stats))
    }
}
