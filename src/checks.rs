// Consistency checks shared by the cleansers and the reconciler.
//
// Each check takes `error_stop`: when set a failure is returned as an error,
// otherwise it is logged and the check returns `Ok(false)`.
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::types::Fixture;

/// Shared tail of every check: log, then raise or downgrade.
pub(crate) fn fail(err: Error, error_stop: bool) -> Result<bool> {
    error!("{}", err);
    if error_stop {
        Err(err)
    } else {
        Ok(false)
    }
}

pub fn check_club_nulls<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    for (column, count) in [
        ("home_club", matches.iter().filter(|m| m.home_club().is_none()).count()),
        ("away_club", matches.iter().filter(|m| m.away_club().is_none()).count()),
    ] {
        if count > 0 {
            return fail(
                Error::MissingValues {
                    column: column.to_string(),
                    count,
                },
                error_stop,
            );
        }
    }
    Ok(true)
}

pub fn check_self_matches<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    let offenders: Vec<&F> = matches
        .iter()
        .filter(|m| matches!((m.home_club(), m.away_club()), (Some(h), Some(a)) if h == a))
        .collect();
    if offenders.is_empty() {
        return Ok(true);
    }
    for m in &offenders {
        error!("Self-match: {}", m.describe());
    }
    fail(
        Error::Validation(format!(
            "Found {} self-matches, first: {}",
            offenders.len(),
            offenders[0].describe()
        )),
        error_stop,
    )
}

/// A club plays in one tier per season, counting both home and away rows.
pub fn check_tier_stability<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    let mut tiers: BTreeMap<(&str, &str), BTreeSet<u8>> = BTreeMap::new();
    for m in matches {
        for club in [m.home_club(), m.away_club()].into_iter().flatten() {
            tiers
                .entry((club, m.season()))
                .or_default()
                .insert(m.league_tier());
        }
    }
    let unstable: Vec<String> = tiers
        .iter()
        .filter(|(_, t)| t.len() > 1)
        .map(|((club, season), t)| format!("{} in {} (tiers {:?})", club, season, t))
        .collect();
    if unstable.is_empty() {
        return Ok(true);
    }
    fail(
        Error::Validation(format!(
            "Found clubs that appear in multiple league tiers per season: {}",
            unstable.join("; ")
        )),
        error_stop,
    )
}

/// Nulls, then self-matches, then tier stability; stops at the first failure.
pub fn check_clubs<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    info!("Checking club consistency in {} rows", matches.len());
    if !check_club_nulls(matches, error_stop)? {
        return Ok(false);
    }
    if !check_self_matches(matches, error_stop)? {
        return Ok(false);
    }
    if !check_tier_stability(matches, error_stop)? {
        return Ok(false);
    }
    info!("Club consistency check passed");
    Ok(true)
}

/// Within each season/tier every club must appear both at home and away.
pub fn check_home_away_symmetry<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    #[derive(Default)]
    struct Acc<'a> {
        home: BTreeSet<&'a str>,
        away: BTreeSet<&'a str>,
    }

    let mut groups: BTreeMap<(&str, u8), Acc> = BTreeMap::new();
    for m in matches {
        let acc = groups.entry((m.season(), m.league_tier())).or_default();
        if let Some(h) = m.home_club() {
            acc.home.insert(h);
        }
        if let Some(a) = m.away_club() {
            acc.away.insert(a);
        }
    }

    let mut problems = Vec::new();
    for ((season, tier), acc) in &groups {
        for club in acc.home.symmetric_difference(&acc.away) {
            let role = if acc.home.contains(club) { "home" } else { "away" };
            problems.push(format!("{} tier {}: {} only plays {}", season, tier, club, role));
            for m in matches.iter().filter(|m| {
                m.season() == *season
                    && m.league_tier() == *tier
                    && (m.home_club() == Some(*club) || m.away_club() == Some(*club))
            }) {
                error!("One-legged fixture row: {}", m.describe());
            }
        }
    }
    if problems.is_empty() {
        info!("Home/away symmetry check passed");
        return Ok(true);
    }
    fail(
        Error::Validation(format!(
            "Found {} clubs that only appear as home or away teams: {}",
            problems.len(),
            problems.join("; ")
        )),
        error_stop,
    )
}

/// A club cannot play twice on the same date.
pub fn check_same_day_fixtures<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    let mut seen: BTreeMap<(&str, NaiveDate), usize> = BTreeMap::new();
    for m in matches {
        let Some(date) = m.match_date() else { continue };
        for club in [m.home_club(), m.away_club()].into_iter().flatten() {
            *seen.entry((club, date)).or_default() += 1;
        }
    }
    let doubles: Vec<String> = seen
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|((club, date), n)| format!("{} plays {} times on {}", club, n, date))
        .collect();
    if doubles.is_empty() {
        return Ok(true);
    }
    fail(
        Error::Validation(format!(
            "Found {} club/date pairs with more than one fixture: {}",
            doubles.len(),
            doubles.join("; ")
        )),
        error_stop,
    )
}

/// The same (season, home, away) fixture may only appear once in a table.
pub fn check_duplicate_keys<F: Fixture>(matches: &[F], error_stop: bool) -> Result<bool> {
    let mut counts: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();
    for m in matches {
        if let (Some(h), Some(a)) = (m.home_club(), m.away_club()) {
            *counts.entry((m.season(), h, a)).or_default() += 1;
        }
    }
    let dupes: Vec<String> = counts
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|((s, h, a), n)| format!("{} {} v {} ({} rows)", s, h, a, n))
        .collect();
    if dupes.is_empty() {
        return Ok(true);
    }
    fail(
        Error::Validation(format!(
            "Found {} duplicated fixtures: {}",
            dupes.len(),
            dupes.join("; ")
        )),
        error_stop,
    )
}
