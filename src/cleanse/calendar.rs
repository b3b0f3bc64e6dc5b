// Season date windows for sources that only carry a match date.
//
// Most seasons are approximated as 1 August to 31 May. The wartime gaps have
// no window, and recent seasons use their real first and last match days
// (2019-2020 ran into August after the suspension).
use chrono::{Datelike, NaiveDate};

use crate::util::season_from_start_year;

struct SeasonWindow {
    /// Season start years, inclusive.
    first: i32,
    last: i32,
    /// (month, day) of the first match day, in the start year.
    start: (u32, u32),
    /// (month, day) of the last match day, in the following year.
    end: (u32, u32),
}

const fn window(first: i32, last: i32, start: (u32, u32), end: (u32, u32)) -> SeasonWindow {
    SeasonWindow { first, last, start, end }
}

const SEASON_WINDOWS: &[SeasonWindow] = &[
    window(1888, 1914, (8, 1), (5, 31)),
    window(1919, 1938, (8, 1), (5, 31)),
    window(1946, 1946, (8, 1), (6, 14)),
    window(1947, 2018, (8, 1), (5, 31)),
    window(2019, 2019, (8, 2), (8, 4)),
    window(2020, 2020, (9, 11), (5, 23)),
    window(2021, 2021, (8, 6), (5, 22)),
    window(2022, 2022, (7, 29), (5, 28)),
    window(2023, 2023, (8, 4), (5, 19)),
];

fn bounds(start_year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let w = SEASON_WINDOWS
        .iter()
        .find(|w| (w.first..=w.last).contains(&start_year))?;
    let start = NaiveDate::from_ymd_opt(start_year, w.start.0, w.start.1)?;
    let end = NaiveDate::from_ymd_opt(start_year + 1, w.end.0, w.end.1)?;
    Some((start, end))
}

/// The season whose window contains `date`, trying the season starting in
/// the date's year before the one ending in it. `None` when the date falls
/// outside every window.
pub fn season_containing(date: NaiveDate) -> Option<String> {
    [date.year(), date.year() - 1]
        .into_iter()
        .find(|y| bounds(*y).map_or(false, |(start, end)| (start..=end).contains(&date)))
        .map(season_from_start_year)
}
