// Cross-source reconciliation.
//
// Per-source tables are joined on (season, home_club, away_club). Date is not
// part of the key: sources disagree on dates and that disagreement is one of
// the things checked. Any field-level disagreement stops the run and is
// written out for a human to resolve. Otherwise the sources are merged by
// priority and the result is validated against the season reference before
// anything is written.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::checks::{
    check_clubs, check_duplicate_keys, check_home_away_symmetry, check_same_day_fixtures, fail,
};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::loader::load_sources;
use crate::output::{write_csv, write_csv_records, write_json};
use crate::reference::SeasonReference;
use crate::reports::run_summary;
use crate::types::{
    CheckResultRow, DiscrepancyRecord, Field, MatchKey, MatchRecord, RunSummary, Source,
    UnifiedMatch,
};
use crate::util::format_int;

pub type SourceTables = BTreeMap<Source, Vec<MatchRecord>>;
pub type KeyedTables = BTreeMap<MatchKey, BTreeMap<Source, MatchRecord>>;

/// Outer join of every table on the natural key. A key seen twice within
/// one source is fatal.
pub fn key_tables(tables: &SourceTables) -> Result<KeyedTables> {
    let mut keyed: KeyedTables = BTreeMap::new();
    for (source, rows) in tables {
        for row in rows {
            let key = row.key().ok_or_else(|| {
                Error::Validation(format!("{} row without both clubs: {:?}", source, row))
            })?;
            let slot = keyed.entry(key).or_default();
            if slot.contains_key(source) {
                return Err(Error::DuplicateKey {
                    source_name: source.to_string(),
                    season: row.season.clone(),
                    home_club: row.home_club.clone().unwrap_or_default(),
                    away_club: row.away_club.clone().unwrap_or_default(),
                });
            }
            slot.insert(*source, row.clone());
        }
    }
    info!(
        "Keyed {} distinct fixtures from {} sources",
        format_int(keyed.len()),
        tables.len()
    );
    Ok(keyed)
}

/// Every (key, field) where two or more of `sources` hold different
/// non-null values.
pub fn find_discrepancies(keyed: &KeyedTables, sources: &[Source]) -> Vec<DiscrepancyRecord> {
    let mut found = Vec::new();
    for (key, by_source) in keyed {
        for field in Field::CHECKED {
            let values: BTreeMap<Source, String> = sources
                .iter()
                .filter_map(|s| {
                    let value = field.value_of(by_source.get(s)?)?;
                    Some((*s, value))
                })
                .collect();
            let distinct: BTreeSet<&String> = values.values().collect();
            if distinct.len() > 1 {
                found.push(DiscrepancyRecord {
                    key: key.clone(),
                    field,
                    values_by_source: values,
                });
            }
        }
    }
    found
}

/// Report layout: the key, the field, then one column per compared source.
pub fn write_discrepancy_report(
    path: &Path,
    discrepancies: &[DiscrepancyRecord],
    sources: &[Source],
) -> Result<()> {
    let mut header: Vec<String> = ["season", "home_club", "away_club", "field"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(sources.iter().map(|s| s.to_string()));
    let records: Vec<Vec<String>> = discrepancies
        .iter()
        .map(|d| {
            let mut r = vec![
                d.key.season.clone(),
                d.key.home_club.clone(),
                d.key.away_club.clone(),
                d.field.to_string(),
            ];
            r.extend(
                sources
                    .iter()
                    .map(|s| d.values_by_source.get(s).cloned().unwrap_or_default()),
            );
            r
        })
        .collect();
    write_csv_records(path, &header, &records)
}

pub fn check_discrepancies(
    keyed: &KeyedTables,
    sources: &[Source],
    report_path: &Path,
    error_stop: bool,
) -> Result<bool> {
    let names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    info!("Checking discrepancies between: {}", names.join(", "));
    let found = find_discrepancies(keyed, sources);
    if found.is_empty() {
        if report_path.exists() {
            std::fs::remove_file(report_path)?;
            info!("Removed stale discrepancy report {}", report_path.display());
        }
        info!("No discrepancies found");
        return Ok(true);
    }
    write_discrepancy_report(report_path, &found, sources)?;
    let fields: BTreeSet<Field> = found.iter().map(|d| d.field).collect();
    for field in &fields {
        let n = found.iter().filter(|d| d.field == *field).count();
        warn!("{} discrepancies in {}", n, field);
    }
    fail(
        Error::Discrepancy {
            field: fields.iter().map(|f| f.name()).collect::<Vec<_>>().join(", "),
            rows: found.len(),
            report: report_path.to_path_buf(),
        },
        error_stop,
    )
}

/// Count of unchecked fields (attendance, match_time, venue) that the
/// highest-priority source left null and a lower one supplied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GapFills {
    pub attendance: usize,
    pub match_time: usize,
    pub venue: usize,
}

/// First non-null value in priority order, and whether it came from a
/// source other than the first.
fn first_value<T>(
    ordered: &[(Source, &MatchRecord)],
    get: impl Fn(&MatchRecord) -> Option<T>,
) -> (Option<T>, bool) {
    match ordered.iter().enumerate().find_map(|(i, (_, r))| get(r).map(|v| (i, v))) {
        Some((i, v)) => (Some(v), i > 0),
        None => (None, false),
    }
}

/// Collapse each key to one row. Fields take the first non-null value in
/// `priority` order; sources outside `priority` are ignored.
pub fn merge(keyed: &KeyedTables, priority: &[Source]) -> Vec<UnifiedMatch> {
    let (unified, fills) = merge_counted(keyed, priority);
    if fills != GapFills::default() {
        info!(
            "Filled from lower-priority sources: attendance {}, match_time {}, venue {}",
            format_int(fills.attendance),
            format_int(fills.match_time),
            format_int(fills.venue)
        );
    }
    info!("Merged into {} unified rows", format_int(unified.len()));
    unified
}

pub fn merge_counted(keyed: &KeyedTables, priority: &[Source]) -> (Vec<UnifiedMatch>, GapFills) {
    let mut fills = GapFills::default();
    let mut unified: Vec<UnifiedMatch> = keyed
        .iter()
        .filter_map(|(key, by_source)| {
            let ordered: Vec<(Source, &MatchRecord)> = priority
                .iter()
                .filter_map(|s| by_source.get(s).map(|r| (*s, r)))
                .collect();
            let (_, first) = ordered.first()?;
            let (attendance, filled) = first_value(&ordered, |r| r.attendance);
            fills.attendance += usize::from(filled);
            let (match_time, filled) = first_value(&ordered, |r| r.match_time.clone());
            fills.match_time += usize::from(filled);
            let (venue, filled) = first_value(&ordered, |r| r.venue.clone());
            fills.venue += usize::from(filled);
            Some(UnifiedMatch {
                season: key.season.clone(),
                league_tier: first.league_tier,
                match_date: ordered.iter().find_map(|(_, r)| r.match_date),
                match_day_of_week: ordered.iter().find_map(|(_, r)| r.match_day_of_week),
                home_club: key.home_club.clone(),
                away_club: key.away_club.clone(),
                home_goals: ordered.iter().find_map(|(_, r)| r.home_goals),
                away_goals: ordered.iter().find_map(|(_, r)| r.away_goals),
                attendance,
                match_time,
                venue,
                sources: ordered
                    .iter()
                    .map(|(s, _)| s.as_str())
                    .collect::<Vec<_>>()
                    .join(";"),
            })
        })
        .collect();
    unified.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    (unified, fills)
}

/// Undated rows go last.
fn sort_key(m: &UnifiedMatch) -> (bool, Option<NaiveDate>, &str, u8, &str, &str) {
    (
        m.match_date.is_none(),
        m.match_date,
        &m.season,
        m.league_tier,
        &m.home_club,
        &m.away_club,
    )
}

fn symmetric_difference<T: Ord + Clone>(
    expected: &BTreeSet<T>,
    actual: &BTreeSet<T>,
) -> Vec<T> {
    expected.symmetric_difference(actual).cloned().collect()
}

/// Tiers and seasons must match the reference exactly, then club and match
/// counts per season/tier, then the club invariants. With `error_stop`
/// unset every check still runs and the overall result is returned.
pub fn validate_against_reference(
    unified: &[UnifiedMatch],
    reference: &SeasonReference,
    error_stop: bool,
) -> Result<bool> {
    info!(
        "Validating {} rows against the season reference",
        format_int(unified.len())
    );
    let mut ok = true;

    let expected_tiers: BTreeSet<u8> = reference.get_league_tiers()?.into_iter().collect();
    let actual_tiers: BTreeSet<u8> = unified.iter().map(|m| m.league_tier).collect();
    let diff = symmetric_difference(&expected_tiers, &actual_tiers);
    if !diff.is_empty() {
        ok &= fail(
            Error::Validation(format!("League tier mismatch. Differences found: {:?}", diff)),
            error_stop,
        )?;
    }

    let expected_seasons: BTreeSet<String> = reference.get_seasons(None).into_iter().collect();
    let actual_seasons: BTreeSet<String> = unified.iter().map(|m| m.season.clone()).collect();
    let diff = symmetric_difference(&expected_seasons, &actual_seasons);
    if !diff.is_empty() {
        ok &= fail(
            Error::Validation(format!("Season mismatch. Differences found: {:?}", diff)),
            error_stop,
        )?;
    }

    for tier in &expected_tiers {
        let expected: BTreeSet<String> = reference.get_seasons(Some(*tier)).into_iter().collect();
        let actual: BTreeSet<String> = unified
            .iter()
            .filter(|m| m.league_tier == *tier)
            .map(|m| m.season.clone())
            .collect();
        let diff = symmetric_difference(&expected, &actual);
        if !diff.is_empty() {
            ok &= fail(
                Error::Validation(format!(
                    "Season mismatch for league tier {}. Differences found: {:?}",
                    tier, diff
                )),
                error_stop,
            )?;
        }
    }

    #[derive(Default)]
    struct Acc<'a> {
        clubs: BTreeSet<&'a str>,
        matches: usize,
    }
    let mut groups: BTreeMap<(&str, u8), Acc> = BTreeMap::new();
    for m in unified {
        let acc = groups.entry((m.season.as_str(), m.league_tier)).or_default();
        acc.clubs.insert(&m.home_club);
        acc.clubs.insert(&m.away_club);
        acc.matches += 1;
    }
    for ((season, tier), acc) in &groups {
        let expected_clubs = match reference.get_club_count(season, *tier) {
            Ok(n) => n,
            Err(e) => {
                ok &= fail(e, error_stop)?;
                continue;
            }
        };
        if acc.clubs.len() != expected_clubs {
            ok &= fail(
                Error::Validation(format!(
                    "Club count mismatch for season {}, league tier {}: expected {}, actual {}",
                    season,
                    tier,
                    expected_clubs,
                    acc.clubs.len()
                )),
                error_stop,
            )?;
        }
        let expected_matches = reference.get_match_count(season, *tier)?;
        if acc.matches != expected_matches {
            ok &= fail(
                Error::Validation(format!(
                    "Match count mismatch for season {}, league tier {}: expected {}, actual {}",
                    season, tier, expected_matches, acc.matches
                )),
                error_stop,
            )?;
        }
    }

    ok &= check_clubs(unified, error_stop)?;
    ok &= check_home_away_symmetry(unified, error_stop)?;
    ok &= check_same_day_fixtures(unified, error_stop)?;
    if ok {
        info!("Unified dataset matches the season reference");
    }
    Ok(ok)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Loaded,
    Keyed,
    DiscrepancyChecked,
    Validated,
    Saved,
    Failed,
}

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub unified: Vec<UnifiedMatch>,
    pub summary: RunSummary,
}

/// One reconciliation run. Either every stage passes and the outputs are
/// written, or the run ends in `Failed` with nothing written.
pub struct Reconciler<'a> {
    config: &'a PipelineConfig,
    reference: &'a SeasonReference,
    stage: RunStage,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a PipelineConfig, reference: &'a SeasonReference) -> Self {
        Self {
            config,
            reference,
            stage: RunStage::Init,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Load the cleansed tables named by the configuration and reconcile them.
    pub fn run(&mut self) -> Result<ReconcileOutcome> {
        self.ensure_fresh()?;
        let result = load_sources(self.config).and_then(|tables| self.reconcile_loaded(tables));
        self.finish(result)
    }

    /// Reconcile tables already in memory.
    pub fn run_tables(&mut self, tables: SourceTables) -> Result<ReconcileOutcome> {
        self.ensure_fresh()?;
        let result = self.reconcile_loaded(tables);
        self.finish(result)
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.stage != RunStage::Init {
            return Err(Error::Validation(format!(
                "reconciler already ran (stage {:?})",
                self.stage
            )));
        }
        Ok(())
    }

    fn finish(&mut self, result: Result<ReconcileOutcome>) -> Result<ReconcileOutcome> {
        if let Err(e) = &result {
            error!("Reconciliation failed after stage {:?}: {}", self.stage, e);
            self.stage = RunStage::Failed;
        }
        result
    }

    fn advance(&mut self, next: RunStage) {
        info!("Reconciliation stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn reconcile_loaded(&mut self, tables: SourceTables) -> Result<ReconcileOutcome> {
        for source in &self.config.sources {
            let rows = tables
                .get(source)
                .ok_or_else(|| Error::NotFound(format!("no table loaded for {}", source)))?;
            info!("Checking {} table", source);
            check_clubs(rows, true)?;
        }
        let tables: SourceTables = tables
            .into_iter()
            .filter(|(s, _)| self.config.sources.contains(s))
            .collect();
        self.advance(RunStage::Loaded);

        let keyed = key_tables(&tables)?;
        self.advance(RunStage::Keyed);

        check_discrepancies(
            &keyed,
            &self.config.discrepancy_sources(),
            &self.config.discrepancy_report_path,
            true,
        )?;
        self.advance(RunStage::DiscrepancyChecked);

        let unified = merge(&keyed, &self.config.merge_priority());
        validate_against_reference(&unified, self.reference, true)?;
        self.advance(RunStage::Validated);

        let summary = run_summary(&unified, self.config);
        write_csv(&self.config.unified_output_path, &unified)?;
        write_json(&self.config.summary_path, &summary)?;
        info!(
            "Saved {} unified rows to {}",
            format_int(unified.len()),
            self.config.unified_output_path.display()
        );
        self.advance(RunStage::Saved);
        Ok(ReconcileOutcome { unified, summary })
    }
}

/// Exploratory run: every check with `error_stop` off, one result row per
/// check. Cross-source checks only run when every configured source is
/// present. Nothing but the discrepancy report is written.
pub fn diagnose(
    config: &PipelineConfig,
    reference: &SeasonReference,
    tables: &SourceTables,
) -> Result<Vec<CheckResultRow>> {
    let mut rows = Vec::new();
    let mut record = |table: &str, check: &str, passed: bool| {
        rows.push(CheckResultRow {
            table: table.to_string(),
            check: check.to_string(),
            result: if passed { "pass" } else { "FAIL" }.to_string(),
        })
    };

    for (source, table) in tables {
        let name = source.as_str();
        record(name, "clubs", check_clubs(table, false)?);
        record(name, "duplicate keys", check_duplicate_keys(table, false)?);
        record(name, "home/away symmetry", check_home_away_symmetry(table, false)?);
        record(name, "same-day fixtures", check_same_day_fixtures(table, false)?);
    }

    if config.sources.iter().all(|s| tables.contains_key(s)) {
        match key_tables(tables) {
            Ok(keyed) => {
                let sources: Vec<Source> = config
                    .discrepancy_sources()
                    .into_iter()
                    .filter(|s| tables.contains_key(s))
                    .collect();
                let consistent =
                    check_discrepancies(&keyed, &sources, &config.discrepancy_report_path, false)?;
                record("unified", "discrepancies", consistent);
                let unified = merge(&keyed, &config.merge_priority());
                record(
                    "unified",
                    "season reference",
                    validate_against_reference(&unified, reference, false)?,
                );
            }
            Err(e) => {
                error!("{}", e);
                record("unified", "keying", false);
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchDay;

    fn rec(source: Source, home: &str, away: &str, hg: u32, day: u32) -> MatchRecord {
        let date = NaiveDate::from_ymd_opt(1995, 9, day);
        MatchRecord {
            season: "1995-1996".into(),
            league_tier: 1,
            match_date: date,
            match_day_of_week: date.map(MatchDay::from_date),
            home_club: Some(home.into()),
            away_club: Some(away.into()),
            home_goals: Some(hg),
            away_goals: Some(1),
            attendance: None,
            match_time: None,
            venue: None,
            source,
        }
    }

    #[test]
    fn disagreeing_goals_yield_one_discrepancy() {
        let mut tables = SourceTables::new();
        tables.insert(Source::Fbref, vec![rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2)]);
        tables.insert(Source::Todor, vec![rec(Source::Todor, "Arsenal", "Chelsea", 3, 2)]);
        tables.insert(
            Source::Engsoccerdata,
            vec![rec(Source::Engsoccerdata, "Chelsea", "Arsenal", 0, 9)],
        );
        let keyed = key_tables(&tables).unwrap();
        let found = find_discrepancies(
            &keyed,
            &[Source::Fbref, Source::Todor, Source::Engsoccerdata],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, Field::HomeGoals);
        let value = |s: Source| found[0].values_by_source.get(&s).cloned();
        assert_eq!(value(Source::Fbref).as_deref(), Some("2"));
        assert_eq!(value(Source::Todor).as_deref(), Some("3"));
    }

    #[test]
    fn nulls_are_not_disagreements() {
        let mut other = rec(Source::Todor, "Arsenal", "Chelsea", 2, 2);
        other.match_date = None;
        other.match_day_of_week = None;
        let mut tables = SourceTables::new();
        tables.insert(Source::Fbref, vec![rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2)]);
        tables.insert(Source::Todor, vec![other]);
        let keyed = key_tables(&tables).unwrap();
        assert!(find_discrepancies(&keyed, &[Source::Fbref, Source::Todor]).is_empty());
    }

    #[test]
    fn merge_prefers_priority_then_fills_gaps() {
        let mut primary = rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2);
        primary.attendance = None;
        let mut secondary = rec(Source::Attendance1, "Arsenal", "Chelsea", 2, 2);
        secondary.attendance = Some(38_000);
        secondary.match_time = Some("15:00".into());
        let mut tables = SourceTables::new();
        tables.insert(Source::Fbref, vec![primary]);
        tables.insert(Source::Attendance1, vec![secondary]);
        let keyed = key_tables(&tables).unwrap();
        let (unified, fills) = merge_counted(&keyed, &[Source::Fbref, Source::Attendance1]);
        assert_eq!(unified.len(), 1);
        assert_eq!(unified[0].attendance, Some(38_000));
        assert_eq!(unified[0].match_time.as_deref(), Some("15:00"));
        assert_eq!(unified[0].sources, "fbref;attendance1");
        assert_eq!(
            fills,
            GapFills {
                attendance: 1,
                match_time: 1,
                venue: 0
            }
        );
    }

    #[test]
    fn primary_values_are_not_counted_as_fills() {
        let mut primary = rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2);
        primary.attendance = Some(41_000);
        let mut secondary = rec(Source::Attendance1, "Arsenal", "Chelsea", 2, 2);
        secondary.attendance = Some(38_000);
        let mut tables = SourceTables::new();
        tables.insert(Source::Fbref, vec![primary]);
        tables.insert(Source::Attendance1, vec![secondary]);
        let keyed = key_tables(&tables).unwrap();
        let (unified, fills) = merge_counted(&keyed, &[Source::Fbref, Source::Attendance1]);
        assert_eq!(unified[0].attendance, Some(41_000));
        assert_eq!(fills, GapFills::default());
    }

    #[test]
    fn duplicate_key_within_source_is_fatal() {
        let mut tables = SourceTables::new();
        tables.insert(
            Source::Fbref,
            vec![
                rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2),
                rec(Source::Fbref, "Arsenal", "Chelsea", 1, 16),
            ],
        );
        assert!(matches!(key_tables(&tables), Err(Error::DuplicateKey { .. })));
    }

    #[test]
    fn merged_rows_sort_by_date_first() {
        let mut tables = SourceTables::new();
        tables.insert(
            Source::Fbref,
            vec![
                rec(Source::Fbref, "Arsenal", "Chelsea", 2, 20),
                rec(Source::Fbref, "Chelsea", "Arsenal", 0, 3),
            ],
        );
        let keyed = key_tables(&tables).unwrap();
        let unified = merge(&keyed, &[Source::Fbref]);
        assert_eq!(unified[0].home_club, "Chelsea");
    }

    #[test]
    fn undated_rows_sort_last() {
        let mut undated = rec(Source::Fbref, "Arsenal", "Chelsea", 2, 2);
        undated.match_date = None;
        undated.match_day_of_week = None;
        let mut tables = SourceTables::new();
        tables.insert(
            Source::Fbref,
            vec![undated, rec(Source::Fbref, "Chelsea", "Arsenal", 0, 20)],
        );
        let keyed = key_tables(&tables).unwrap();
        let unified = merge(&keyed, &[Source::Fbref]);
        assert_eq!(unified[0].home_club, "Chelsea");
        assert_eq!(unified[1].match_date, None);
    }
}
