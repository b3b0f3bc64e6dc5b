mod common;

use efl_unify::cleanse::{load_shared, run_source, Cleanser};
use efl_unify::config::UnmappedPolicy;
use efl_unify::error::Error;
use efl_unify::identity::IdentityMap;
use efl_unify::loader::load_standardized;
use efl_unify::types::{CleanseReport, MatchRecord, Source};
use tempfile::TempDir;

use common::{config, write, FBREF_HEADER};

fn fbref_file(rows: &[&str]) -> String {
    let mut s = format!("{}\n", FBREF_HEADER);
    for r in rows {
        s.push_str(r);
        s.push('\n');
    }
    s
}

#[test]
fn attendance_tokens_are_repaired_or_nulled() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    write(
        &cfg.raw_dir(Source::Fbref).join("1_1995-1996_matches.csv"),
        &fbref_file(&[
            "1995-09-02,15:00,Arsenal,Chelsea,2,1,without spectators,Highbury",
            "1996-03-02,15:00,Chelsea,Arsenal,0,0,\"record 88,000\",Stamford Bridge",
        ]),
    );
    let (identity, corrections) = load_shared(&cfg).unwrap();
    let report = run_source(&cfg, Source::Fbref, &identity, corrections.as_ref()).unwrap();
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.attendance_nulled, 1);

    let rows = load_standardized(&cfg.cleansed_path(Source::Fbref), Source::Fbref).unwrap();
    let home_arsenal = rows
        .iter()
        .find(|r| r.home_club.as_deref() == Some("Arsenal"))
        .unwrap();
    assert_eq!(home_arsenal.attendance, Some(0));
    assert_eq!(home_arsenal.season, "1995-1996");
    assert_eq!(home_arsenal.league_tier, 1);
    assert_eq!(home_arsenal.match_time.as_deref(), Some("15:00"));
    let home_chelsea = rows
        .iter()
        .find(|r| r.home_club.as_deref() == Some("Chelsea"))
        .unwrap();
    assert_eq!(home_chelsea.attendance, None);
}

#[test]
fn unmapped_club_fails_required_field_check() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    write(
        &cfg.raw_dir(Source::Fbref).join("1_1995-1996_matches.csv"),
        &fbref_file(&[
            "1995-09-02,15:00,Newport Cnty,Chelsea,2,1,,",
            "1996-03-02,15:00,Chelsea,Arsenal,0,0,,",
        ]),
    );
    let (identity, _) = load_shared(&cfg).unwrap();
    let err = run_source(&cfg, Source::Fbref, &identity, None).unwrap_err();
    match err {
        Error::MissingValues { column, count } => {
            assert_eq!(column, "home_club");
            assert_eq!(count, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!cfg.cleansed_path(Source::Fbref).exists());
}

#[test]
fn unmapped_policy_error_and_drop() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    let raw_dir = cfg.raw_dir(Source::Fbref);
    write(
        &raw_dir.join("1_1995-1996_matches.csv"),
        &fbref_file(&[
            "1995-09-02,15:00,Newport Cnty,Chelsea,2,1,,",
            "1995-09-09,15:00,Chelsea,Arsenal,0,0,,",
            "1996-03-02,15:00,Arsenal,Chelsea,1,1,,",
        ]),
    );
    let identity = IdentityMap::from_path(&cfg.identity_map_path).unwrap();

    let strict = Cleanser::new(Source::Fbref, &identity, None, UnmappedPolicy::Error);
    let raw = strict.read_raw(&raw_dir).unwrap();
    match strict.cleanse(raw) {
        Err(Error::UnmappedClubs(names)) => assert_eq!(names, vec!["Newport Cnty".to_string()]),
        other => panic!("unexpected result: {:?}", other.map(|(r, _)| r.len())),
    }

    let lenient = Cleanser::new(Source::Fbref, &identity, None, UnmappedPolicy::Drop);
    let raw = lenient.read_raw(&raw_dir).unwrap();
    let (records, report) = lenient.cleanse(raw).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(report.rows_unmapped, 1);
    assert_eq!(report.unmapped_clubs, vec!["Newport Cnty".to_string()]);
    assert!(lenient.check(&records).unwrap());
}

#[test]
fn variant_spellings_resolve_and_dnp_rows_drop() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    let raw_dir = cfg.raw_dir(Source::Fbref);
    write(
        &raw_dir.join("1_1995-1996_matches.csv"),
        &fbref_file(&[
            "1995-09-02,15:00,Man Utd,Arsenal FC,2,1,\"41,203\",Old Trafford",
            "1995-12-26,15:00,Arsenal,Chelsea,dnp,dnp,,",
            "1996-03-02,15:00,Arsenal,Manchester Utd,0,0,38000,Highbury",
        ]),
    );
    let identity = IdentityMap::from_path(&cfg.identity_map_path).unwrap();
    let cleanser = Cleanser::new(Source::Fbref, &identity, None, UnmappedPolicy::Warn);
    let (records, report) = cleanser.cleanse(cleanser.read_raw(&raw_dir).unwrap()).unwrap();
    assert_eq!(report.rows_dnp, 1);
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.home_club.as_deref() != Some("Man Utd")));
    assert_eq!(records[0].home_club.as_deref(), Some("Manchester United"));
    assert_eq!(records[0].away_club.as_deref(), Some("Arsenal"));
    assert_eq!(records[0].attendance, Some(41_203));
    assert_eq!(records[1].away_club.as_deref(), Some("Manchester United"));
    assert!(cleanser.check(&records).unwrap());
}

#[test]
fn missing_raw_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    let (identity, _) = load_shared(&cfg).unwrap();
    let err = run_source(&cfg, Source::Fbref, &identity, None).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn missing_required_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[Source::Fbref]);
    write(
        &cfg.raw_dir(Source::Fbref).join("1_1995-1996_matches.csv"),
        "date,home_team,away_team,home_goals\n1995-09-02,Arsenal,Chelsea,2\n",
    );
    let (identity, _) = load_shared(&cfg).unwrap();
    match run_source(&cfg, Source::Fbref, &identity, None) {
        Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "away_goals"),
        other => panic!("unexpected result: {:?}", other.map(|r| r.rows_written)),
    }
}

/// Write `files` into the source's raw directory and cleanse them against an
/// identity map where every club in `clubs` maps to itself.
fn cleanse_files(
    source: Source,
    files: &[(&str, &str)],
    clubs: &[&str],
) -> efl_unify::error::Result<(Vec<MatchRecord>, CleanseReport)> {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), &[source]);
    let raw_dir = cfg.raw_dir(source);
    for (name, contents) in files {
        write(&raw_dir.join(name), contents);
    }
    let identity = IdentityMap::from_pairs(clubs.iter().map(|c| (*c, *c))).unwrap();
    let cleanser = Cleanser::new(source, &identity, None, UnmappedPolicy::Warn);
    let raw = cleanser.read_raw(&raw_dir).unwrap();
    cleanser.cleanse(raw)
}

fn on(records: &[MatchRecord], date: &str) -> MatchRecord {
    let date = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    records
        .iter()
        .find(|r| r.match_date == Some(date))
        .cloned()
        .unwrap_or_else(|| panic!("no row on {}", date))
}

const ENFA_HEADER: &str =
    "match_date,match_day,table_title,home_club,away_club,home_goals,away_goals";
const ENFA_CLUBS: &[&str] = &[
    "Arsenal",
    "Chelsea",
    "Grimsby Town",
    "Middlesbrough Ironopolis",
];

#[test]
fn enfa_restart_matches_keep_their_season() {
    let file = format!(
        "{}\n\
         2020-07-26,Sunday,FA Premier League,Arsenal,Chelsea,3,2\n\
         2020-03-07,Saturday,FA Premier League,Chelsea,Arsenal,2,1\n\
         1894-02-03,,League Division Two,Grimsby Town,Middlesbrough Ironopolis,1,0\n\
         1893-09-02,,League Division Two,Middlesbrough Ironopolis,Grimsby Town,2,0\n",
        ENFA_HEADER
    );
    let (records, report) =
        cleanse_files(Source::Enfa, &[("enfa_matches.csv", file.as_str())], ENFA_CLUBS).unwrap();
    assert_eq!(report.rows_excluded, 1);
    assert_eq!(records.len(), 3);

    let restart = on(&records, "2020-07-26");
    assert_eq!(restart.season, "2019-2020");
    assert_eq!(restart.league_tier, 1);
    let before_suspension = on(&records, "2020-03-07");
    assert_eq!(before_suspension.season, "2019-2020");

    let early = on(&records, "1893-09-02");
    assert_eq!(early.season, "1893-1894");
    assert_eq!(early.league_tier, 2);
    assert!(records
        .iter()
        .all(|r| r.home_club.as_deref() != Some("Grimsby Town")));
}

#[test]
fn enfa_unknown_league_is_fatal() {
    let file = format!(
        "{}\n2019-09-14,,Southern League,Arsenal,Chelsea,1,0\n",
        ENFA_HEADER
    );
    match cleanse_files(Source::Enfa, &[("enfa_matches.csv", file.as_str())], ENFA_CLUBS) {
        Err(Error::Validation(message)) => {
            assert!(message.contains("Southern League"), "{}", message);
            assert!(message.contains("2019-2020"), "{}", message);
        }
        other => panic!("unexpected result: {:?}", other.map(|(r, _)| r.len())),
    }
}

#[test]
fn enfa_date_between_seasons_is_fatal() {
    let file = format!(
        "{}\n2020-08-20,,FA Premier League,Arsenal,Chelsea,1,0\n",
        ENFA_HEADER
    );
    match cleanse_files(Source::Enfa, &[("enfa_matches.csv", file.as_str())], ENFA_CLUBS) {
        Err(Error::Validation(message)) => assert!(message.contains("2020-08-20"), "{}", message),
        other => panic!("unexpected result: {:?}", other.map(|(r, _)| r.len())),
    }
}

#[test]
fn eflt_skips_and_exclusions() {
    let file = "date,season,league_name,home_team,away_team,home_score,away_score,venue,attendance
1961-08-19,1961,Division 1,Arsenal,Chelsea,2,1,Highbury,\"41,000\"
1961-09-02,1961,Fourth Division,Accrington Stanley,Exeter City,0,2,Peel Park,
1991-08-17,1991,Fourth Division,Aldershot Town,Exeter City,1,1,,
1930-09-06,1930,Third Division South,Exeter City,Aldershot Town,3,0,,
1920-08-28,1920,Third Division,Exeter City,Chelsea,1,1,,
1939-08-26,1939,Division 1,Chelsea,Arsenal,1,1,,
";
    let clubs = [
        "Arsenal",
        "Chelsea",
        "Accrington Stanley",
        "Exeter City",
        "Aldershot Town",
    ];
    let (records, report) = cleanse_files(
        Source::EnglishFootballLeagueTables,
        &[("englishfootballleaguetables_matches_1.csv", file)],
        &clubs,
    )
    .unwrap();
    assert_eq!(report.rows_read, 6);
    assert_eq!(report.rows_filtered, 3);
    assert_eq!(report.rows_excluded, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].season, "1961-1962");
    assert_eq!(records[0].league_tier, 1);
    assert_eq!(records[0].attendance, Some(41_000));
    assert_eq!(records[0].venue.as_deref(), Some("Highbury"));
}

#[test]
fn attendance2_splits_date_time_and_drops_bury() {
    let file = "Date/Time,Home Team,Away Team,Home Score,Away Score,Attendance,Competition
10/08/2019 15:00,Arsenal,Chelsea,2,1,\"60,000\",Premier League
17/08/2019 12:30,Bury FC,Exeter City,0,0,,League One
24/08/2019 19:45,Chelsea,Arsenal,1,1,41203.0,Premier League
";
    let (records, report) = cleanse_files(
        Source::Attendance2,
        &[("2019-2020.csv", file)],
        &["Arsenal", "Chelsea", "Bury FC", "Exeter City"],
    )
    .unwrap();
    assert_eq!(report.rows_excluded, 1);
    assert_eq!(records.len(), 2);
    let opener = on(&records, "2019-08-10");
    assert_eq!(opener.season, "2019-2020");
    assert_eq!(opener.league_tier, 1);
    assert_eq!(opener.match_time.as_deref(), Some("15:00"));
    assert_eq!(opener.attendance, Some(60_000));
    let evening = on(&records, "2019-08-24");
    assert_eq!(evening.match_time.as_deref(), Some("19:45"));
    assert_eq!(evening.attendance, Some(41_203));
}

#[test]
fn engsoccerdata_filters_low_tiers_and_undated_rows() {
    let file = "Date,Season,home,visitor,hgoal,vgoal,tier
1995-08-19,1995,Arsenal,Chelsea,1,1,1
1995-08-19,1995,Exeter City,Grimsby Town,0,2,6
,1995,Chelsea,Arsenal,2,0,1
";
    let (records, report) = cleanse_files(
        Source::Engsoccerdata,
        &[("engsoccerdata.csv", file)],
        &["Arsenal", "Chelsea", "Exeter City", "Grimsby Town"],
    )
    .unwrap();
    assert_eq!(report.rows_filtered, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].season, "1995-1996");
    assert_eq!(records[0].league_tier, 1);
}

#[test]
fn attendance1_midnight_kickoff_is_unknown() {
    let file = "season,tier,date,time,home team,away team,home_goals,away_goals,attendance
1995-1996,1,1995-08-19,00:00,Arsenal,Chelsea,1,1,38000
1995-1996,1,02/03/1996,15:00,Chelsea,Arsenal,0,2,29000
";
    let (records, _) = cleanse_files(
        Source::Attendance1,
        &[("attendance_1995.csv", file)],
        &["Arsenal", "Chelsea"],
    )
    .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(on(&records, "1995-08-19").match_time, None);
    assert_eq!(on(&records, "1996-03-02").match_time.as_deref(), Some("15:00"));
}

#[test]
fn worldfootball_drops_dover_2020_2021() {
    let file = "season,league_tier,match_date,match_day,home_club,away_club,home_goals,away_goals,attendance
2020-2021,5,2020-10-03,Sat,Dover Athletic,Wrexham,0,1,0
2020-2021,5,2020-10-06,Tue,Wrexham,Barnet,2,2,0
2019-2020,5,2019-08-03,Sat,Dover Athletic,Barnet,1,0,1200
";
    let (records, report) = cleanse_files(
        Source::Worldfootball,
        &[("worldfootball_2020.csv", file)],
        &["Dover Athletic", "Wrexham", "Barnet"],
    )
    .unwrap();
    assert_eq!(report.rows_excluded, 1);
    assert_eq!(records.len(), 2);
    assert_eq!(on(&records, "2019-08-03").home_club.as_deref(), Some("Dover Athletic"));
}
