// League names as each source spells them, with the seasons they were in use
// and the tier they stood for. Years are season start years, inclusive.

pub struct LeagueSpan {
    pub name: &'static str,
    pub first: i32,
    pub last: i32,
    pub tier: u8,
}

const fn span(name: &'static str, first: i32, last: i32, tier: u8) -> LeagueSpan {
    LeagueSpan { name, first, last, tier }
}

pub const EFLT_LEAGUES: &[LeagueSpan] = &[
    span("Football League", 1888, 1891, 1),
    span("Division 1", 1892, 1991, 1),
    span("First Division", 1898, 1898, 1),
    span("First Division", 1977, 1978, 1),
    span("Premier League", 1992, 2024, 1),
    span("Second Division", 1892, 1991, 2),
    span("Division 1", 1992, 1992, 2),
    span("First Division", 1992, 2003, 2),
    span("First Division", 2021, 2021, 2),
    span("Championship", 2004, 2024, 2),
    span("Third Division", 1958, 1991, 3),
    span("Division 3", 1965, 1965, 3),
    span("Second Division", 1992, 2003, 3),
    span("League One", 2004, 2024, 3),
    span("Fourth Division", 1958, 1991, 4),
    span("Division 4", 1965, 1965, 4),
    span("Division 4", 1979, 1979, 4),
    span("Third Division", 1992, 2003, 4),
    span("League Two", 2004, 2024, 4),
];

pub const ENFA_LEAGUES: &[LeagueSpan] = &[
    span("Football League", 1888, 1891, 1),
    span("League Division One", 1892, 1991, 1),
    span("FA Premier League", 1992, 2024, 1),
    span("League Division Two", 1892, 1991, 2),
    span("League Division One", 1992, 2003, 2),
    span("Football League Championship", 2004, 2024, 2),
    span("League Division Three", 1958, 1991, 3),
    span("League Division Two", 1992, 2003, 3),
    span("Football League 1", 2004, 2024, 3),
    span("League Division Four", 1958, 1991, 4),
    span("League Division Three", 1992, 2003, 4),
    span("Football League 2", 2004, 2024, 4),
];

/// Competition names used by modern attendance feeds.
pub const MODERN_LEAGUES: &[LeagueSpan] = &[
    span("Premier League", 1992, 2024, 1),
    span("Championship", 2004, 2024, 2),
    span("League One", 2004, 2024, 3),
    span("League Two", 2004, 2024, 4),
    span("Conference National", 2004, 2014, 5),
    span("National League", 2015, 2024, 5),
];

pub fn tier_for(table: &[LeagueSpan], name: &str, season: &str) -> Option<u8> {
    let start: i32 = season.get(..4)?.parse().ok()?;
    let name = name.trim();
    table
        .iter()
        .find(|s| s.name == name && (s.first..=s.last).contains(&start))
        .map(|s| s.tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renamed_divisions_shift_tier() {
        assert_eq!(tier_for(EFLT_LEAGUES, "Second Division", "1991-1992"), Some(2));
        assert_eq!(tier_for(EFLT_LEAGUES, "Second Division", "1992-1993"), Some(3));
        assert_eq!(tier_for(ENFA_LEAGUES, "League Division One", "1995-1996"), Some(2));
        assert_eq!(tier_for(EFLT_LEAGUES, "Third Division South", "1930-1931"), None);
        assert_eq!(tier_for(MODERN_LEAGUES, "League Two", "2003-2004"), None);
    }
}
