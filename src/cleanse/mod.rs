//! Per-source cleansing: `read_raw -> cleanse -> check -> save`.
//!
//! One generic pipeline drives every source; what differs between sources
//! lives in [`profiles::SourceProfile`].

pub mod calendar;
pub mod league_names;
pub mod profiles;

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::ReaderBuilder;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::checks::{check_clubs, check_duplicate_keys, check_home_away_symmetry};
use crate::config::{PipelineConfig, UnmappedPolicy};
use crate::corrections::CorrectionTable;
use crate::error::{Error, Result};
use crate::identity::IdentityMap;
use crate::output::write_csv;
use crate::types::{CleanseReport, ClubColumn, MatchDay, MatchRecord, Source};
use crate::util::{
    format_int, is_valid_season, normalize_time, parse_attendance, parse_date_any,
    parse_u32_safe, season_from_token, Attendance,
};
use calendar::season_containing;
use league_names::tier_for;
use profiles::{profile, Col, Exclusion, FileMeta, SeasonRule, SourceProfile, TierRule};

/// One raw CSV line, reduced to the columns the profile maps.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub file: String,
    pub line: u64,
    pub meta: FileMeta,
    pub fields: Vec<(Col, String)>,
}

impl RawRow {
    /// Trimmed, non-empty value of a column.
    pub fn get(&self, col: Col) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| *c == col)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn dump(&self) -> String {
        format!("{}:{} {:?}", self.file, self.line, self.fields)
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: Source,
    pub rows: Vec<RawRow>,
    pub files_read: usize,
    pub files_skipped: usize,
}

pub struct Cleanser<'a> {
    profile: SourceProfile,
    identity: &'a IdentityMap,
    corrections: Option<&'a CorrectionTable>,
    policy: UnmappedPolicy,
}

impl<'a> Cleanser<'a> {
    pub fn new(
        source: Source,
        identity: &'a IdentityMap,
        corrections: Option<&'a CorrectionTable>,
        policy: UnmappedPolicy,
    ) -> Self {
        Self {
            profile: profile(source),
            identity,
            corrections,
            policy,
        }
    }

    pub fn source(&self) -> Source {
        self.profile.source
    }

    /// Concatenate every matching file in `dir`. A missing directory or no
    /// matching files is fatal; a single unreadable file is skipped.
    pub fn read_raw(&self, dir: &Path) -> Result<RawTable> {
        let source = self.source();
        info!("Reading raw {} data from {}", source, dir.display());
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "raw data directory for {}: {}",
                source,
                dir.display()
            )));
        }
        let pattern = Regex::new(self.profile.file_pattern)
            .map_err(|e| Error::Config(format!("bad file pattern for {}: {}", source, e)))?;
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map_or(false, |n| pattern.is_match(n))
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(Error::NotFound(format!(
                "no {} files matching '{}' in {}",
                source,
                self.profile.file_pattern,
                dir.display()
            )));
        }

        let mut table = RawTable {
            source,
            rows: Vec::new(),
            files_read: 0,
            files_skipped: 0,
        };
        for path in &files {
            match self.read_file(path) {
                Ok(rows) if rows.is_empty() => {
                    warn!("Skipping empty file {}", path.display());
                    table.files_skipped += 1;
                }
                Ok(rows) => {
                    debug!("Read {} rows from {}", rows.len(), path.display());
                    table.files_read += 1;
                    table.rows.extend(rows);
                }
                Err(e @ Error::MissingColumn { .. }) => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    table.files_skipped += 1;
                }
            }
        }
        if table.rows.is_empty() {
            return Err(Error::EmptyData(format!(
                "no rows read from {} {} files in {}",
                files.len(),
                source,
                dir.display()
            )));
        }
        info!(
            "Read {} rows from {} files ({} skipped)",
            format_int(table.rows.len()),
            table.files_read,
            table.files_skipped
        );
        Ok(table)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<RawRow>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let meta = self.profile.naming.parse(&name).ok_or_else(|| {
            Error::Validation(format!(
                "file name {} does not follow the {:?} convention",
                name, self.profile.naming
            ))
        })?;

        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = rdr.headers()?.clone();
        let mut positions = Vec::new();
        for (col, header) in self.profile.columns {
            match headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == *header)
            {
                Some(i) => positions.push((*col, i)),
                None if col.optional() => {}
                None => {
                    return Err(Error::MissingColumn {
                        column: header.to_string(),
                        file: path.display().to_string(),
                    })
                }
            }
        }

        let mut rows = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("{}: unreadable row {}: {}", name, i + 2, e);
                    continue;
                }
            };
            let line = record.position().map_or(i as u64 + 2, |p| p.line());
            let fields = positions
                .iter()
                .map(|(col, idx)| (*col, record.get(*idx).unwrap_or("").to_string()))
                .collect();
            rows.push(RawRow {
                file: name.clone(),
                line,
                meta: meta.clone(),
                fields,
            });
        }
        Ok(rows)
    }

    /// Turn raw rows into standardized records: repair fields, resolve club
    /// names, drop known-bad data, apply corrections and drop duplicates.
    pub fn cleanse(&self, raw: RawTable) -> Result<(Vec<MatchRecord>, CleanseReport)> {
        let source = self.source();
        info!("Cleansing {} rows of {} data", format_int(raw.rows.len()), source);
        let mut report = CleanseReport {
            source: source.to_string(),
            files_read: raw.files_read,
            files_skipped: raw.files_skipped,
            rows_read: raw.rows.len(),
            ..Default::default()
        };

        let mut records = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            if let Some(rec) = self.standardize(row, &mut report)? {
                records.push(rec);
            }
        }

        let mut unmapped: BTreeSet<String> = BTreeSet::new();
        unmapped.extend(self.identity.transform_club_names(&mut records, ClubColumn::Home));
        unmapped.extend(self.identity.transform_club_names(&mut records, ClubColumn::Away));
        if !unmapped.is_empty() {
            let names: Vec<String> = unmapped.into_iter().collect();
            match self.policy {
                UnmappedPolicy::Error => return Err(Error::UnmappedClubs(names)),
                UnmappedPolicy::Drop => {
                    let before = records.len();
                    records.retain(|r| r.home_club.is_some() && r.away_club.is_some());
                    report.rows_unmapped = before - records.len();
                    warn!(
                        "Dropped {} {} rows with unmapped clubs",
                        report.rows_unmapped, source
                    );
                }
                UnmappedPolicy::Warn => {
                    warn!(
                        "{} unmapped club names left as nulls in {}",
                        names.len(),
                        source
                    );
                }
            }
            report.unmapped_clubs = names;
        }

        let before = records.len();
        records.retain(|r| !self.profile.exclusions.iter().any(|x| excludes(x, r)));
        report.rows_excluded = before - records.len();
        if report.rows_excluded > 0 {
            info!("Removed {} rows of known-bad {} data", report.rows_excluded, source);
        }

        if let Some(table) = self.corrections {
            let (corrected, stats) = table.apply(source, records)?;
            records = corrected;
            report.rows_corrected = stats.dropped + stats.updated + stats.inserted;
        }

        let mut seen = HashSet::new();
        let before = records.len();
        records.retain(|r| seen.insert(r.clone()));
        report.rows_duplicate = before - records.len();

        records.sort_by(|a, b| {
            (&a.season, a.league_tier, a.match_date, &a.home_club)
                .cmp(&(&b.season, b.league_tier, b.match_date, &b.home_club))
        });
        report.rows_written = records.len();
        info!(
            "{} cleansed: {} rows in, {} rows out",
            source,
            format_int(report.rows_read),
            format_int(report.rows_written)
        );
        Ok((records, report))
    }

    fn standardize(&self, row: &RawRow, report: &mut CleanseReport) -> Result<Option<MatchRecord>> {
        let p = &self.profile;

        let did_not_play = [Col::HomeGoals, Col::AwayGoals]
            .iter()
            .filter_map(|c| row.get(*c))
            .any(|v| v.to_ascii_lowercase().contains("dnp"));
        if did_not_play {
            debug!("Dropping did-not-play row {}", row.dump());
            report.rows_dnp += 1;
            return Ok(None);
        }

        let (date_raw, time_raw) = match row.get(Col::DateTime) {
            Some(dt) => {
                let mut parts = dt.splitn(2, char::is_whitespace);
                (parts.next(), parts.next().map(str::trim))
            }
            None => (row.get(Col::Date), row.get(Col::Time)),
        };
        let match_date = parse_date_any(date_raw, p.date_formats);
        if let (Some(raw), None) = (date_raw, match_date) {
            warn!("Unparseable date '{}': {}", raw, row.dump());
        }
        if match_date.is_none() && p.drop_undated {
            report.rows_filtered += 1;
            return Ok(None);
        }

        let season = match p.season {
            SeasonRule::FileName => row.meta.season.clone(),
            SeasonRule::Column => row
                .get(Col::Season)
                .filter(|s| is_valid_season(s))
                .map(str::to_string),
            SeasonRule::StartYearColumn => row.get(Col::Season).and_then(season_from_token),
            SeasonRule::FromDate => match match_date {
                Some(date) => Some(season_containing(date).ok_or_else(|| {
                    Error::Validation(format!(
                        "Could not determine season for match date {} ({}:{})",
                        date, row.file, row.line
                    ))
                })?),
                None => None,
            },
        };
        let Some(season) = season else {
            error!("Cannot determine season: {}", row.dump());
            report.rows_unusable += 1;
            return Ok(None);
        };

        let league = row.get(Col::League);
        let skipped = p.skip_seasons.contains(&season.as_str())
            || league.map_or(false, |l| {
                p.skip_leagues.contains(&l)
                    || p.skip_league_seasons
                        .iter()
                        .any(|(name, s)| *name == l && *s == season)
            });
        if skipped {
            report.rows_filtered += 1;
            return Ok(None);
        }

        let tier = match p.tier {
            TierRule::FileName => row.meta.tier,
            TierRule::Column => {
                parse_u32_safe(row.get(Col::Tier)).and_then(|t| u8::try_from(t).ok())
            }
            TierRule::LeagueName(table) => {
                let name = league.unwrap_or_default();
                match tier_for(table, name, &season) {
                    Some(t) => Some(t),
                    None => {
                        return Err(Error::Validation(format!(
                            "Could not determine league tier for '{}' in {} ({}:{})",
                            name, season, row.file, row.line
                        )))
                    }
                }
            }
        };
        let Some(league_tier) = tier else {
            error!("Cannot determine league tier: {}", row.dump());
            report.rows_unusable += 1;
            return Ok(None);
        };
        if p.max_tier.map_or(false, |max| league_tier > max) {
            report.rows_filtered += 1;
            return Ok(None);
        }

        let derived_day = match_date.map(MatchDay::from_date);
        let match_day_of_week = match row.get(Col::DayOfWeek) {
            Some(name) => MatchDay::from_name(name).or_else(|| {
                warn!("Unrecognised day '{}' at {}:{}, using the date", name, row.file, row.line);
                derived_day
            }),
            None => derived_day,
        };

        let match_time = normalize_time(time_raw)
            .filter(|t| !(p.midnight_is_unknown && t == "00:00"));

        let attendance_raw = row.get(Col::Attendance);
        let attendance = match parse_attendance(attendance_raw) {
            Attendance::Value(v) => {
                if attendance_raw.map_or(false, |r| !r.chars().all(|c| c.is_ascii_digit())) {
                    report.attendance_repaired += 1;
                }
                Some(v)
            }
            Attendance::Missing => None,
            Attendance::Unparseable => {
                warn!(
                    "Attendance '{}' is not a head count, set to null: {}",
                    attendance_raw.unwrap_or_default(),
                    row.dump()
                );
                report.attendance_nulled += 1;
                None
            }
        };

        Ok(Some(MatchRecord {
            season,
            league_tier,
            match_date,
            match_day_of_week,
            home_club: row.get(Col::HomeClub).map(str::to_string),
            away_club: row.get(Col::AwayClub).map(str::to_string),
            home_goals: goals(row, Col::HomeGoals),
            away_goals: goals(row, Col::AwayGoals),
            attendance,
            match_time,
            venue: row.get(Col::Venue).map(str::to_string),
            source: p.source,
        }))
    }

    /// Required fields must be null-free and the club invariants must hold.
    /// Home/away asymmetry is reported but not fatal.
    pub fn check(&self, records: &[MatchRecord]) -> Result<bool> {
        let source = self.source();
        info!("Checking cleansed {} data", source);
        if records.is_empty() {
            return Err(Error::EmptyData(format!("{} produced no rows", source)));
        }
        let required: [(&str, fn(&MatchRecord) -> bool); 6] = [
            ("season", |r| r.season.is_empty()),
            ("match_date", |r| r.match_date.is_none()),
            ("home_club", |r| r.home_club.is_none()),
            ("away_club", |r| r.away_club.is_none()),
            ("home_goals", |r| r.home_goals.is_none()),
            ("away_goals", |r| r.away_goals.is_none()),
        ];
        for (column, is_null) in required {
            let nulls: Vec<&MatchRecord> = records.iter().filter(|&r| is_null(r)).collect();
            if !nulls.is_empty() {
                for r in nulls.iter().take(20) {
                    error!("Null {} in {} row {:?}", column, source, r);
                }
                let err = Error::MissingValues {
                    column: column.to_string(),
                    count: nulls.len(),
                };
                error!("{} check failed: {}", source, err);
                return Err(err);
            }
        }
        check_clubs(records, true)?;
        check_duplicate_keys(records, true)?;
        check_home_away_symmetry(records, false)
    }

    pub fn save(&self, records: &[MatchRecord], path: &Path) -> Result<()> {
        write_csv(path, records)?;
        info!(
            "Saved {} {} rows to {}",
            format_int(records.len()),
            self.source(),
            path.display()
        );
        Ok(())
    }
}

fn goals(row: &RawRow, col: Col) -> Option<u32> {
    let raw = row.get(col)?;
    let value = parse_u32_safe(Some(raw));
    if value.is_none() {
        warn!("Unparseable {:?} '{}': {}", col, raw, row.dump());
    }
    value
}

fn excludes(exclusion: &Exclusion, r: &MatchRecord) -> bool {
    match exclusion {
        Exclusion::ClubSeason { club, season } => {
            r.season == *season
                && (r.home_club.as_deref() == Some(*club) || r.away_club.as_deref() == Some(*club))
        }
        Exclusion::Fixture { date, home, away } => {
            r.match_date.is_some()
                && r.match_date == NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
                && r.home_club.as_deref() == Some(*home)
                && r.away_club.as_deref() == Some(*away)
        }
    }
}

/// Identity map and optional corrections, loaded once per run.
pub fn load_shared(config: &PipelineConfig) -> Result<(IdentityMap, Option<CorrectionTable>)> {
    let identity = IdentityMap::from_path(&config.identity_map_path)?;
    let corrections = config
        .corrections_path
        .as_deref()
        .map(CorrectionTable::from_path)
        .transpose()?;
    Ok((identity, corrections))
}

/// Full pipeline for one source.
pub fn run_source(
    config: &PipelineConfig,
    source: Source,
    identity: &IdentityMap,
    corrections: Option<&CorrectionTable>,
) -> Result<CleanseReport> {
    let cleanser = Cleanser::new(source, identity, corrections, config.unmapped_clubs);
    let raw = cleanser.read_raw(&config.raw_dir(source))?;
    let (records, report) = cleanser.cleanse(raw)?;
    cleanser.check(&records)?;
    cleanser.save(&records, &config.cleansed_path(source))?;
    Ok(report)
}

pub fn run_sources(config: &PipelineConfig, sources: &[Source]) -> Result<Vec<CleanseReport>> {
    let (identity, corrections) = load_shared(config)?;
    sources
        .iter()
        .map(|s| run_source(config, *s, &identity, corrections.as_ref()))
        .collect()
}
