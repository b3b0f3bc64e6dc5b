use crate::config::PipelineConfig;
use crate::types::{RunSummary, SeasonSummaryRow, UnifiedMatch};
use crate::util::{format_int, format_number};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One row per (season, tier), in season order then tier.
pub fn season_summary(data: &[UnifiedMatch]) -> Vec<SeasonSummaryRow> {
    #[derive(Default)]
    struct Acc<'a> {
        clubs: HashSet<&'a str>,
        matches: usize,
        goals: u64,
        attendance: u64,
        attended: usize,
    }
    let mut map: HashMap<(&str, u8), Acc> = HashMap::new();
    for m in data {
        let e = map.entry((m.season.as_str(), m.league_tier)).or_default();
        e.clubs.insert(&m.home_club);
        e.clubs.insert(&m.away_club);
        e.matches += 1;
        e.goals += u64::from(m.home_goals.unwrap_or(0)) + u64::from(m.away_goals.unwrap_or(0));
        if let Some(a) = m.attendance {
            e.attendance += u64::from(a);
            e.attended += 1;
        }
    }
    let mut rows: Vec<SeasonSummaryRow> = map
        .into_iter()
        .map(|((season, tier), acc)| {
            let per_match = if acc.matches == 0 {
                0.0
            } else {
                acc.goals as f64 / acc.matches as f64
            };
            SeasonSummaryRow {
                season: season.to_string(),
                league_tier: tier,
                clubs: acc.clubs.len(),
                matches: acc.matches,
                goals: format_int(acc.goals),
                goals_per_match: format_number(per_match, 2),
                total_attendance: if acc.attended == 0 {
                    "-".to_string()
                } else {
                    format_int(acc.attendance)
                },
                avg_attendance: if acc.attended == 0 {
                    "-".to_string()
                } else {
                    format_number(acc.attendance as f64 / acc.attended as f64, 0)
                },
            }
        })
        .collect();
    rows.sort_by(|a, b| (&a.season, a.league_tier).cmp(&(&b.season, b.league_tier)));
    rows
}

pub fn run_summary(data: &[UnifiedMatch], config: &PipelineConfig) -> RunSummary {
    let mut matches_by_source: BTreeMap<String, usize> = config
        .sources
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut single_source = 0;
    for m in data {
        let mut n = 0;
        for s in m.sources.split(';').filter(|s| !s.is_empty()) {
            *matches_by_source.entry(s.to_string()).or_insert(0) += 1;
            n += 1;
        }
        if n == 1 {
            single_source += 1;
        }
    }
    let seasons: BTreeSet<&str> = data.iter().map(|m| m.season.as_str()).collect();
    let tiers: BTreeSet<u8> = data.iter().map(|m| m.league_tier).collect();
    RunSummary {
        sources: config.sources.iter().map(|s| s.to_string()).collect(),
        primary_source: config.primary_source.to_string(),
        total_matches: data.len(),
        total_seasons: seasons.len(),
        league_tiers: tiers.into_iter().collect(),
        matches_by_source,
        single_source_matches: single_source,
        total_goals: data
            .iter()
            .map(|m| u64::from(m.home_goals.unwrap_or(0)) + u64::from(m.away_goals.unwrap_or(0)))
            .sum(),
        matches_with_attendance: data.iter().filter(|m| m.attendance.is_some()).count(),
    }
}
