use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Every upstream data source the pipeline knows how to cleanse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Fbref,
    FootballData,
    EnglishFootballLeagueTables,
    Enfa,
    Engsoccerdata,
    Todor,
    Attendance1,
    Attendance2,
    Attendance4,
    Worldfootball,
}

impl Source {
    pub const ALL: [Source; 10] = [
        Source::Fbref,
        Source::FootballData,
        Source::EnglishFootballLeagueTables,
        Source::Enfa,
        Source::Engsoccerdata,
        Source::Todor,
        Source::Attendance1,
        Source::Attendance2,
        Source::Attendance4,
        Source::Worldfootball,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Fbref => "fbref",
            Source::FootballData => "football_data",
            Source::EnglishFootballLeagueTables => "english_football_league_tables",
            Source::Enfa => "enfa",
            Source::Engsoccerdata => "engsoccerdata",
            Source::Todor => "todor",
            Source::Attendance1 => "attendance1",
            Source::Attendance2 => "attendance2",
            Source::Attendance4 => "attendance4",
            Source::Worldfootball => "worldfootball",
        }
    }

    /// File name of the standardized table written by this source's cleanser.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Source::ALL
            .iter()
            .copied()
            .find(|src| src.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Source::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown source '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl MatchDay {
    /// Accepts full English day names and their 3-letter abbreviations,
    /// ignoring case and surrounding whitespace.
    pub fn from_name(s: &str) -> Option<MatchDay> {
        let lower = s.trim().to_ascii_lowercase();
        let day = match lower.get(..3)? {
            "mon" => MatchDay::Monday,
            "tue" => MatchDay::Tuesday,
            "wed" => MatchDay::Wednesday,
            "thu" => MatchDay::Thursday,
            "fri" => MatchDay::Friday,
            "sat" => MatchDay::Saturday,
            "sun" => MatchDay::Sunday,
            _ => return None,
        };
        // "Satur" or "Mond" are not day names; only the abbreviation or the full name pass.
        if lower.len() == 3 || lower == day.name().to_ascii_lowercase() {
            Some(day)
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> MatchDay {
        MatchDay::from(date.weekday())
    }

    pub fn name(&self) -> &'static str {
        match self {
            MatchDay::Monday => "Monday",
            MatchDay::Tuesday => "Tuesday",
            MatchDay::Wednesday => "Wednesday",
            MatchDay::Thursday => "Thursday",
            MatchDay::Friday => "Friday",
            MatchDay::Saturday => "Saturday",
            MatchDay::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for MatchDay {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => MatchDay::Monday,
            Weekday::Tue => MatchDay::Tuesday,
            Weekday::Wed => MatchDay::Wednesday,
            Weekday::Thu => MatchDay::Thursday,
            Weekday::Fri => MatchDay::Friday,
            Weekday::Sat => MatchDay::Saturday,
            Weekday::Sun => MatchDay::Sunday,
        }
    }
}

impl fmt::Display for MatchDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One match as emitted by a single source's cleanser.
///
/// The club columns stay optional so an unresolved name survives as a null
/// until a consistency check decides whether that is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub season: String,
    pub league_tier: u8,
    pub match_date: Option<NaiveDate>,
    pub match_day_of_week: Option<MatchDay>,
    pub home_club: Option<String>,
    pub away_club: Option<String>,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub attendance: Option<u32>,
    pub match_time: Option<String>,
    pub venue: Option<String>,
    pub source: Source,
}

impl MatchRecord {
    pub fn key(&self) -> Option<MatchKey> {
        Some(MatchKey {
            season: self.season.clone(),
            home_club: self.home_club.clone()?,
            away_club: self.away_club.clone()?,
        })
    }
}

/// One row of the unified dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedMatch {
    pub season: String,
    pub league_tier: u8,
    pub match_date: Option<NaiveDate>,
    pub match_day_of_week: Option<MatchDay>,
    pub home_club: String,
    pub away_club: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub attendance: Option<u32>,
    pub match_time: Option<String>,
    pub venue: Option<String>,
    /// `;`-separated list of the sources that carried this match.
    pub sources: String,
}

/// Read access shared by per-source and unified rows so the consistency
/// checks run against either.
pub trait Fixture {
    fn season(&self) -> &str;
    fn league_tier(&self) -> u8;
    fn match_date(&self) -> Option<NaiveDate>;
    fn home_club(&self) -> Option<&str>;
    fn away_club(&self) -> Option<&str>;

    fn describe(&self) -> String {
        format!(
            "season={} tier={} date={} home={} away={}",
            self.season(),
            self.league_tier(),
            self.match_date().map(|d| d.to_string()).unwrap_or_default(),
            self.home_club().unwrap_or("<null>"),
            self.away_club().unwrap_or("<null>"),
        )
    }
}

impl Fixture for MatchRecord {
    fn season(&self) -> &str {
        &self.season
    }
    fn league_tier(&self) -> u8 {
        self.league_tier
    }
    fn match_date(&self) -> Option<NaiveDate> {
        self.match_date
    }
    fn home_club(&self) -> Option<&str> {
        self.home_club.as_deref()
    }
    fn away_club(&self) -> Option<&str> {
        self.away_club.as_deref()
    }

    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

impl Fixture for UnifiedMatch {
    fn season(&self) -> &str {
        &self.season
    }
    fn league_tier(&self) -> u8 {
        self.league_tier
    }
    fn match_date(&self) -> Option<NaiveDate> {
        self.match_date
    }
    fn home_club(&self) -> Option<&str> {
        Some(&self.home_club)
    }
    fn away_club(&self) -> Option<&str> {
        Some(&self.away_club)
    }

    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

/// Natural join key across sources. Match date is deliberately absent:
/// sources disagree on dates and that disagreement is checked, not joined on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchKey {
    pub season: String,
    pub home_club: String,
    pub away_club: String,
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} v {}", self.season, self.home_club, self.away_club)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubColumn {
    Home,
    Away,
}

impl ClubColumn {
    pub fn name(&self) -> &'static str {
        match self {
            ClubColumn::Home => "home_club",
            ClubColumn::Away => "away_club",
        }
    }
}

/// Fields compared across sources by the discrepancy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    LeagueTier,
    MatchDate,
    MatchDayOfWeek,
    HomeGoals,
    AwayGoals,
}

impl Field {
    pub const CHECKED: [Field; 5] = [
        Field::LeagueTier,
        Field::MatchDate,
        Field::MatchDayOfWeek,
        Field::HomeGoals,
        Field::AwayGoals,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::LeagueTier => "league_tier",
            Field::MatchDate => "match_date",
            Field::MatchDayOfWeek => "match_day_of_week",
            Field::HomeGoals => "home_goals",
            Field::AwayGoals => "away_goals",
        }
    }

    /// Rendered value of this field, `None` when the source left it null.
    pub fn value_of(&self, record: &MatchRecord) -> Option<String> {
        match self {
            Field::LeagueTier => Some(record.league_tier.to_string()),
            Field::MatchDate => record.match_date.map(|d| d.to_string()),
            Field::MatchDayOfWeek => record.match_day_of_week.map(|d| d.name().to_string()),
            Field::HomeGoals => record.home_goals.map(|g| g.to_string()),
            Field::AwayGoals => record.away_goals.map(|g| g.to_string()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscrepancyRecord {
    pub key: MatchKey,
    pub field: Field,
    pub values_by_source: BTreeMap<Source, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSeasonEntry {
    pub season: String,
    pub league_tier: u8,
    pub clubs: usize,
    pub matches: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SeasonSummaryRow {
    #[tabled(rename = "Season")]
    pub season: String,
    #[tabled(rename = "Tier")]
    pub league_tier: u8,
    #[tabled(rename = "Clubs")]
    pub clubs: usize,
    #[tabled(rename = "Matches")]
    pub matches: usize,
    #[tabled(rename = "Goals")]
    pub goals: String,
    #[tabled(rename = "GoalsPerMatch")]
    pub goals_per_match: String,
    #[tabled(rename = "TotalAttendance")]
    pub total_attendance: String,
    #[tabled(rename = "AvgAttendance")]
    pub avg_attendance: String,
}

/// What one cleansing run read, repaired and dropped.
#[derive(Debug, Serialize, Tabled, Clone, Default)]
pub struct CleanseReport {
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Files")]
    pub files_read: usize,
    #[tabled(rename = "Skipped")]
    pub files_skipped: usize,
    #[tabled(rename = "RowsIn")]
    pub rows_read: usize,
    #[tabled(rename = "RowsOut")]
    pub rows_written: usize,
    #[tabled(rename = "Filtered")]
    pub rows_filtered: usize,
    #[tabled(rename = "Unusable")]
    pub rows_unusable: usize,
    #[tabled(rename = "DidNotPlay")]
    pub rows_dnp: usize,
    #[tabled(rename = "Excluded")]
    pub rows_excluded: usize,
    #[tabled(rename = "Duplicates")]
    pub rows_duplicate: usize,
    #[tabled(rename = "UnmappedDropped")]
    pub rows_unmapped: usize,
    #[tabled(rename = "Corrected")]
    pub rows_corrected: usize,
    #[tabled(rename = "AttRepaired")]
    pub attendance_repaired: usize,
    #[tabled(rename = "AttNulled")]
    pub attendance_nulled: usize,
    #[tabled(skip)]
    pub unmapped_clubs: Vec<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CheckResultRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Check")]
    pub check: String,
    #[tabled(rename = "Result")]
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub sources: Vec<String>,
    pub primary_source: String,
    pub total_matches: usize,
    pub total_seasons: usize,
    pub league_tiers: Vec<u8>,
    pub matches_by_source: BTreeMap<String, usize>,
    pub single_source_matches: usize,
    pub total_goals: u64,
    pub matches_with_attendance: usize,
}
