// Club identity resolution.
//
// Every raw spelling of a club name seen in any source maps to exactly one
// canonical name through a hand-curated two-column CSV. Lookups are exact:
// a spelling absent from the map stays unresolved and is reported.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{ClubColumn, MatchRecord};
use crate::util::format_int;

#[derive(Debug, Deserialize)]
struct MapRow {
    club_name: Option<String>,
    club_name_normalized: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    by_spelling: HashMap<String, String>,
    canonical: BTreeSet<String>,
}

impl IdentityMap {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("identity map {}", path.display())));
        }
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let headers = rdr.headers()?.clone();
        for column in ["club_name", "club_name_normalized"] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::MissingColumn {
                    column: column.to_string(),
                    file: path.display().to_string(),
                });
            }
        }

        let mut pairs = Vec::new();
        for result in rdr.deserialize::<MapRow>() {
            let row = result?;
            match (row.club_name, row.club_name_normalized) {
                (Some(raw), Some(canonical)) if !raw.is_empty() && !canonical.is_empty() => {
                    pairs.push((raw, canonical))
                }
                (raw, canonical) => {
                    warn!("Skipping incomplete identity map row: {:?} -> {:?}", raw, canonical)
                }
            }
        }
        if pairs.is_empty() {
            return Err(Error::EmptyData(format!("identity map {}", path.display())));
        }
        let map = Self::from_pairs(pairs)?;
        info!(
            "Loaded identity map: {} spellings for {} clubs",
            format_int(map.by_spelling.len()),
            format_int(map.canonical.len())
        );
        Ok(map)
    }

    /// Build from `(raw spelling, canonical name)` pairs, rejecting a
    /// spelling mapped to two clubs and canonical names that are themselves
    /// spellings of another club.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut by_spelling: HashMap<String, String> = HashMap::new();
        let mut canonical = BTreeSet::new();
        for (raw, canon) in pairs {
            let raw = raw.into().trim().to_string();
            let canon = canon.into().trim().to_string();
            if let Some(existing) = by_spelling.get(&raw) {
                if *existing != canon {
                    return Err(Error::Validation(format!(
                        "Identity map is ambiguous: '{}' maps to both '{}' and '{}'",
                        raw, existing, canon
                    )));
                }
                continue;
            }
            canonical.insert(canon.clone());
            by_spelling.insert(raw, canon);
        }
        let mut chained: Vec<String> = canonical
            .iter()
            .filter_map(|c| match by_spelling.get(c) {
                Some(target) if target != c => Some(format!("'{}' -> '{}'", c, target)),
                _ => None,
            })
            .collect();
        if !chained.is_empty() {
            chained.sort();
            return Err(Error::Validation(format!(
                "Identity map has chained mappings (canonical names that are themselves remapped): {}",
                chained.join(", ")
            )));
        }
        Ok(Self { by_spelling, canonical })
    }

    /// Canonical name for a raw spelling. Canonical names resolve to themselves.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if let Some(canon) = self.by_spelling.get(name) {
            return Some(canon.as_str());
        }
        self.canonical.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_spelling.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_spelling.is_empty()
    }

    /// Rewrite one club column in place. Unresolved spellings become `None`;
    /// each distinct miss is logged once with its count. Returns the sorted
    /// list of unresolved spellings.
    pub fn transform_club_names(&self, records: &mut [MatchRecord], column: ClubColumn) -> Vec<String> {
        debug!("Transforming {} for {} rows", column.name(), records.len());
        let mut misses: BTreeMap<String, usize> = BTreeMap::new();
        for rec in records.iter_mut() {
            let slot = match column {
                ClubColumn::Home => &mut rec.home_club,
                ClubColumn::Away => &mut rec.away_club,
            };
            let Some(raw) = slot.take() else { continue };
            match self.resolve(&raw) {
                Some(canon) => *slot = Some(canon.to_string()),
                None => *misses.entry(raw.trim().to_string()).or_default() += 1,
            }
        }
        for (name, count) in &misses {
            warn!(
                "Unmapped club name in {}: '{}' ({} rows)",
                column.name(),
                name,
                count
            );
        }
        misses.into_keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn record(home: &str, away: &str) -> MatchRecord {
        MatchRecord {
            season: "1995-1996".into(),
            league_tier: 1,
            match_date: None,
            match_day_of_week: None,
            home_club: Some(home.into()),
            away_club: Some(away.into()),
            home_goals: Some(1),
            away_goals: Some(0),
            attendance: None,
            match_time: None,
            venue: None,
            source: Source::Fbref,
        }
    }

    fn map() -> IdentityMap {
        IdentityMap::from_pairs(vec![
            ("Man Utd", "Manchester United"),
            ("Manchester Utd", "Manchester United"),
            ("Newport County", "Newport County"),
            (" Arsenal ", "Arsenal"),
        ])
        .unwrap()
    }

    #[test]
    fn resolves_variants_to_one_name() {
        let m = map();
        assert_eq!(m.resolve("Man Utd"), Some("Manchester United"));
        assert_eq!(m.resolve("Manchester Utd "), Some("Manchester United"));
        assert_eq!(m.resolve("Manchester United"), Some("Manchester United"));
        assert_eq!(m.resolve("man utd"), None);
    }

    #[test]
    fn unmapped_names_become_null() {
        let m = map();
        let mut rows = vec![record("Newport Cnty", "Arsenal"), record("Newport Cnty", "Man Utd")];
        let misses = m.transform_club_names(&mut rows, ClubColumn::Home);
        assert_eq!(misses, vec!["Newport Cnty".to_string()]);
        assert!(rows.iter().all(|r| r.home_club.is_none()));
        m.transform_club_names(&mut rows, ClubColumn::Away);
        assert_eq!(rows[1].away_club.as_deref(), Some("Manchester United"));
    }

    #[test]
    fn transform_is_idempotent() {
        let m = map();
        let mut once = vec![record("Man Utd", "Arsenal"), record("Unknown FC", "Manchester Utd")];
        m.transform_club_names(&mut once, ClubColumn::Home);
        m.transform_club_names(&mut once, ClubColumn::Away);
        let mut twice = once.clone();
        m.transform_club_names(&mut twice, ClubColumn::Home);
        m.transform_club_names(&mut twice, ClubColumn::Away);
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_ambiguous_spelling() {
        let err = IdentityMap::from_pairs(vec![("City", "Manchester City"), ("City", "Bristol City")])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_chained_mapping() {
        let err = IdentityMap::from_pairs(vec![
            ("Small Heath", "Birmingham"),
            ("Birmingham", "Birmingham City"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("chained"));
    }
}
