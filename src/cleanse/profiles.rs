//! Per-source cleansing strategy.
//!
//! Every upstream site exports its own layout. A `SourceProfile` captures
//! everything that differs between them so one generic pipeline can cleanse
//! all of them.

use super::league_names::{LeagueSpan, ENFA_LEAGUES, EFLT_LEAGUES, MODERN_LEAGUES};
use crate::types::Source;
use crate::util::is_valid_season;

/// Logical columns a raw file can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Col {
    Season,
    Tier,
    League,
    Date,
    /// Date and kick-off time in one cell, separated by whitespace.
    DateTime,
    Time,
    DayOfWeek,
    HomeClub,
    AwayClub,
    HomeGoals,
    AwayGoals,
    Attendance,
    Venue,
}

impl Col {
    /// Optional columns are treated as null when a file lacks them.
    pub fn optional(&self) -> bool {
        matches!(self, Col::Time | Col::DayOfWeek | Col::Attendance | Col::Venue)
    }
}

/// What a raw file name says about its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `1_premier-league_2019-2020.csv`: first char tier, last 9 chars of stem season.
    TierPrefixSeasonSuffix,
    /// `1_2019-2020_fixtures.csv`: first char tier, chars 3 to 11 season.
    TierSeasonPrefix,
    /// `2019-2020.csv`
    SeasonStem,
    /// Nothing; season and tier come from columns.
    Columns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMeta {
    pub tier: Option<u8>,
    pub season: Option<String>,
}

impl FileNaming {
    /// `None` when the name does not follow the convention.
    pub fn parse(&self, file_name: &str) -> Option<FileMeta> {
        let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
        let tier = || stem.chars().next()?.to_digit(10).map(|d| d as u8);
        let checked = |s: &str| Some(s.to_string()).filter(|s| is_valid_season(s));
        match self {
            FileNaming::TierPrefixSeasonSuffix => {
                let season = stem.get(stem.len().checked_sub(9)?..)?;
                Some(FileMeta { tier: Some(tier()?), season: Some(checked(season)?) })
            }
            FileNaming::TierSeasonPrefix => {
                let season = stem.get(2..11)?;
                Some(FileMeta { tier: Some(tier()?), season: Some(checked(season)?) })
            }
            FileNaming::SeasonStem => Some(FileMeta { tier: None, season: Some(checked(stem)?) }),
            FileNaming::Columns => Some(FileMeta::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonRule {
    FileName,
    /// A full `YYYY-YYYY` column.
    Column,
    /// A start-year column such as `1990` or `1990-91`.
    StartYearColumn,
    /// Derived from the match date.
    FromDate,
}

#[derive(Clone, Copy)]
pub enum TierRule {
    FileName,
    Column,
    LeagueName(&'static [LeagueSpan]),
}

/// Known-bad data removed after club names are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Every match the club played that season.
    ClubSeason { club: &'static str, season: &'static str },
    Fixture {
        date: &'static str,
        home: &'static str,
        away: &'static str,
    },
}

#[derive(Clone)]
pub struct SourceProfile {
    pub source: Source,
    /// Directory under the raw data root.
    pub raw_dir: &'static str,
    /// Regex the file names must match.
    pub file_pattern: &'static str,
    pub naming: FileNaming,
    pub columns: &'static [(Col, &'static str)],
    pub date_formats: &'static [&'static str],
    pub season: SeasonRule,
    pub tier: TierRule,
    pub max_tier: Option<u8>,
    pub exclusions: &'static [Exclusion],
    pub skip_leagues: &'static [&'static str],
    pub skip_league_seasons: &'static [(&'static str, &'static str)],
    pub skip_seasons: &'static [&'static str],
    /// `00:00` is a placeholder for an unknown kick-off.
    pub midnight_is_unknown: bool,
    /// Rows without a date are dropped rather than flagged.
    pub drop_undated: bool,
}

impl SourceProfile {
    pub fn column(&self, col: Col) -> Option<&'static str> {
        self.columns.iter().find(|(c, _)| *c == col).map(|(_, name)| *name)
    }
}

const ISO_DATE: &[&str] = &["%Y-%m-%d"];

const DOVER_2020: Exclusion = Exclusion::ClubSeason { club: "Dover Athletic", season: "2020-2021" };

pub fn profile(source: Source) -> SourceProfile {
    let base = SourceProfile {
        source,
        raw_dir: "",
        file_pattern: r"(?i)\.csv$",
        naming: FileNaming::Columns,
        columns: &[],
        date_formats: ISO_DATE,
        season: SeasonRule::Column,
        tier: TierRule::Column,
        max_tier: None,
        exclusions: &[],
        skip_leagues: &[],
        skip_league_seasons: &[],
        skip_seasons: &[],
        midnight_is_unknown: false,
        drop_undated: false,
    };
    match source {
        Source::Fbref => SourceProfile {
            raw_dir: "FBRef",
            file_pattern: r"^\d_\d{4}-\d{4}.*\.csv$",
            naming: FileNaming::TierSeasonPrefix,
            columns: &[
                (Col::Date, "date"),
                (Col::Time, "start_time"),
                (Col::DayOfWeek, "dayofweek"),
                (Col::HomeClub, "home_team"),
                (Col::AwayClub, "away_team"),
                (Col::HomeGoals, "home_goals"),
                (Col::AwayGoals, "away_goals"),
                (Col::Attendance, "attendance"),
                (Col::Venue, "venue"),
            ],
            season: SeasonRule::FileName,
            tier: TierRule::FileName,
            ..base
        },
        Source::FootballData => SourceProfile {
            raw_dir: "Football-data",
            file_pattern: r"^[1-5]_.*\d{4}-\d{4}\.csv$",
            naming: FileNaming::TierPrefixSeasonSuffix,
            columns: &[
                (Col::Date, "Date"),
                (Col::Time, "Time"),
                (Col::HomeClub, "HomeTeam"),
                (Col::AwayClub, "AwayTeam"),
                (Col::HomeGoals, "FTHG"),
                (Col::AwayGoals, "FTAG"),
            ],
            date_formats: &["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d"],
            season: SeasonRule::FileName,
            tier: TierRule::FileName,
            ..base
        },
        Source::EnglishFootballLeagueTables => SourceProfile {
            raw_dir: "EnglishFootballLeagueTables",
            file_pattern: r"^englishfootballleaguetables_matches.*\.csv$",
            columns: &[
                (Col::Date, "date"),
                (Col::Season, "season"),
                (Col::League, "league_name"),
                (Col::HomeClub, "home_team"),
                (Col::AwayClub, "away_team"),
                (Col::HomeGoals, "home_score"),
                (Col::AwayGoals, "away_score"),
                (Col::Venue, "venue"),
                (Col::Attendance, "attendance"),
            ],
            season: SeasonRule::StartYearColumn,
            tier: TierRule::LeagueName(EFLT_LEAGUES),
            exclusions: &[
                Exclusion::ClubSeason { club: "Aldershot Town", season: "1991-1992" },
                Exclusion::ClubSeason { club: "Accrington Stanley", season: "1961-1962" },
            ],
            skip_leagues: &["Third Division South", "Third Division North"],
            skip_league_seasons: &[("Third Division", "1920-1921")],
            skip_seasons: &["1939-1940"],
            ..base
        },
        Source::Enfa => SourceProfile {
            raw_dir: "ENFA",
            columns: &[
                (Col::Date, "match_date"),
                (Col::DayOfWeek, "match_day"),
                (Col::League, "table_title"),
                (Col::HomeClub, "home_club"),
                (Col::AwayClub, "away_club"),
                (Col::HomeGoals, "home_goals"),
                (Col::AwayGoals, "away_goals"),
            ],
            season: SeasonRule::FromDate,
            tier: TierRule::LeagueName(ENFA_LEAGUES),
            exclusions: &[Exclusion::Fixture {
                date: "1894-02-03",
                home: "Grimsby Town",
                away: "Middlesbrough Ironopolis",
            }],
            ..base
        },
        Source::Engsoccerdata => SourceProfile {
            raw_dir: "engsoccerdata",
            columns: &[
                (Col::Date, "Date"),
                (Col::Season, "Season"),
                (Col::HomeClub, "home"),
                (Col::AwayClub, "visitor"),
                (Col::HomeGoals, "hgoal"),
                (Col::AwayGoals, "vgoal"),
                (Col::Tier, "tier"),
            ],
            season: SeasonRule::StartYearColumn,
            max_tier: Some(5),
            drop_undated: true,
            ..base
        },
        Source::Todor => SourceProfile {
            raw_dir: "todor",
            columns: &[
                (Col::Season, "season"),
                (Col::Tier, "league_tier"),
                (Col::Date, "date"),
                (Col::HomeClub, "home_club"),
                (Col::AwayClub, "away_club"),
                (Col::HomeGoals, "home_goals"),
                (Col::AwayGoals, "away_goals"),
            ],
            drop_undated: true,
            ..base
        },
        Source::Attendance1 => SourceProfile {
            raw_dir: "Attendance1",
            file_pattern: r"^attendance_.*\.csv$",
            columns: &[
                (Col::Season, "season"),
                (Col::Tier, "tier"),
                (Col::Date, "date"),
                (Col::Time, "time"),
                (Col::HomeClub, "home team"),
                (Col::AwayClub, "away team"),
                (Col::HomeGoals, "home_goals"),
                (Col::AwayGoals, "away_goals"),
                (Col::Attendance, "attendance"),
            ],
            date_formats: &["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y"],
            midnight_is_unknown: true,
            ..base
        },
        Source::Attendance2 => SourceProfile {
            raw_dir: "Attendance2",
            file_pattern: r"^\d{4}-\d{4}\.csv$",
            naming: FileNaming::SeasonStem,
            columns: &[
                (Col::DateTime, "Date/Time"),
                (Col::HomeClub, "Home Team"),
                (Col::AwayClub, "Away Team"),
                (Col::HomeGoals, "Home Score"),
                (Col::AwayGoals, "Away Score"),
                (Col::Attendance, "Attendance"),
                (Col::League, "Competition"),
            ],
            date_formats: &["%d/%m/%Y"],
            season: SeasonRule::FileName,
            tier: TierRule::LeagueName(MODERN_LEAGUES),
            exclusions: &[Exclusion::ClubSeason { club: "Bury FC", season: "2019-2020" }],
            ..base
        },
        Source::Attendance4 => SourceProfile {
            raw_dir: "Attendance4",
            columns: &[
                (Col::Season, "season"),
                (Col::Tier, "league_tier"),
                (Col::Date, "match_date"),
                (Col::Time, "match_time"),
                (Col::HomeClub, "home_team_name"),
                (Col::AwayClub, "away_team_name"),
                (Col::HomeGoals, "match_home_score"),
                (Col::AwayGoals, "match_away_score"),
                (Col::Attendance, "attendance"),
            ],
            date_formats: &["%A, %d. %B %Y", "%Y-%m-%d"],
            exclusions: &[DOVER_2020],
            ..base
        },
        Source::Worldfootball => SourceProfile {
            raw_dir: "WorldFootball_Attendance",
            columns: &[
                (Col::Season, "season"),
                (Col::Tier, "league_tier"),
                (Col::Date, "match_date"),
                (Col::DayOfWeek, "match_day"),
                (Col::HomeClub, "home_club"),
                (Col::AwayClub, "away_club"),
                (Col::HomeGoals, "home_goals"),
                (Col::AwayGoals, "away_goals"),
                (Col::Attendance, "attendance"),
            ],
            exclusions: &[DOVER_2020],
            ..base
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn filename_rules() {
        let meta = FileNaming::TierPrefixSeasonSuffix
            .parse("1_premier-league_2019-2020.csv")
            .unwrap();
        assert_eq!(meta.tier, Some(1));
        assert_eq!(meta.season.as_deref(), Some("2019-2020"));

        let meta = FileNaming::TierSeasonPrefix.parse("3_1995-1996_fixtures.csv").unwrap();
        assert_eq!((meta.tier, meta.season.as_deref()), (Some(3), Some("1995-1996")));

        assert_eq!(
            FileNaming::SeasonStem.parse("2001-2002.csv").unwrap().season.as_deref(),
            Some("2001-2002")
        );
        assert!(FileNaming::SeasonStem.parse("notes.csv").is_none());
        assert!(FileNaming::TierPrefixSeasonSuffix.parse("x_2019-2020.csv").is_none());
    }

    #[test]
    fn every_source_has_a_consistent_profile() {
        for source in Source::ALL {
            let p = profile(source);
            assert_eq!(p.source, source);
            assert!(!p.raw_dir.is_empty(), "{} has no raw dir", source);
            assert!(Regex::new(p.file_pattern).is_ok());
            for col in [Col::HomeClub, Col::AwayClub, Col::HomeGoals, Col::AwayGoals] {
                assert!(p.column(col).is_some(), "{} lacks {:?}", source, col);
            }
            assert!(p.column(Col::Date).is_some() || p.column(Col::DateTime).is_some());
            match p.season {
                SeasonRule::FileName => assert_ne!(p.naming, FileNaming::Columns),
                SeasonRule::Column | SeasonRule::StartYearColumn => {
                    assert!(p.column(Col::Season).is_some())
                }
                SeasonRule::FromDate => {}
            }
            match p.tier {
                TierRule::FileName => assert_ne!(p.naming, FileNaming::SeasonStem),
                TierRule::Column => assert!(p.column(Col::Tier).is_some()),
                TierRule::LeagueName(_) => assert!(p.column(Col::League).is_some()),
            }
        }
    }
}
