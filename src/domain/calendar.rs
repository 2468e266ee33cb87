use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
// Keys written by older planner builds: `Date.toDateString()` and en-US
// `Date.toLocaleDateString()`.
const LEGACY_DATE_KEY_FORMATS: [&str; 2] = ["%a %b %d %Y", "%m/%d/%Y"];

/// Canonical `YYYY-MM-DD` key of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| format!("date must be YYYY-MM-DD: {value}"))
    }

    /// Accepts the canonical form and the legacy locale-dependent forms.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(key) = Self::parse(value) {
            return Some(key);
        }
        LEGACY_DATE_KEY_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
            .map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, String> {
    first_of_month(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| format!("month after {year}-{month:02} is out of range"))?;
    let last = next
        .pred_opt()
        .ok_or_else(|| format!("month {year}-{month:02} is out of range"))?;
    Ok(last.day())
}

/// Grid cells for a month: `None` for the leading partial week, then
/// `Some(1..=days)`. The tail is not padded.
pub fn month_cells(year: i32, month: u32, week_start: Weekday) -> Result<Vec<Option<u32>>, String> {
    let first = first_of_month(year, month)?;
    let days = days_in_month(year, month)?;
    let leading = (7 + first.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;

    let mut cells = Vec::with_capacity((leading + days) as usize);
    cells.extend((0..leading).map(|_| None));
    cells.extend((1..=days).map(Some));
    Ok(cells)
}

pub fn parse_year_month(value: &str) -> Result<(i32, u32), String> {
    let invalid = || format!("month must be YYYY-MM: {value}");
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    first_of_month(year, month)?;
    Ok((year, month))
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, String> {
    if !(1..=12).contains(&month) {
        return Err(format!("month must be within 1..=12, got {month}"));
    }
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| format!("year {year} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn january_2025_starts_on_wednesday() {
        let cells = month_cells(2025, 1, Weekday::Sun).expect("valid month");
        assert_eq!(&cells[..3], &[None, None, None]);
        assert_eq!(cells[3], Some(1));
        assert_eq!(cells.len(), 3 + 31);
        assert_eq!(cells.last(), Some(&Some(31)));
    }

    #[test]
    fn week_start_shifts_leading_placeholders() {
        let cells = month_cells(2025, 1, Weekday::Mon).expect("valid month");
        assert_eq!(cells.iter().take_while(|cell| cell.is_none()).count(), 2);

        let cells = month_cells(2025, 1, Weekday::Wed).expect("valid month");
        assert_eq!(cells[0], Some(1));
    }

    #[test]
    fn february_accounts_for_leap_years() {
        assert_eq!(days_in_month(2024, 2), Ok(29));
        assert_eq!(days_in_month(2025, 2), Ok(28));
        assert_eq!(days_in_month(1900, 2), Ok(28));
        assert_eq!(days_in_month(2000, 2), Ok(29));
        assert_eq!(days_in_month(2025, 12), Ok(31));
        assert_eq!(days_in_month(2025, 4), Ok(30));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_cells(2025, 0, Weekday::Sun).is_err());
        assert!(month_cells(2025, 13, Weekday::Sun).is_err());
    }

    #[test]
    fn date_key_is_iso_and_roundtrips() {
        let key = DateKey::from_ymd(2026, 2, 6).expect("valid date");
        assert_eq!(key.to_string(), "2026-02-06");
        assert_eq!(DateKey::parse("2026-02-06"), Ok(key));
        assert!(DateKey::parse("06/02/2026").is_err());
    }

    #[test]
    fn legacy_keys_normalize_to_iso() {
        let expected = DateKey::from_ymd(2026, 10, 14);
        assert_eq!(DateKey::parse_lenient("Wed Oct 14 2026"), expected);
        assert_eq!(DateKey::parse_lenient("10/14/2026"), expected);
        assert_eq!(DateKey::parse_lenient(" 2026-10-14 "), expected);
        assert_eq!(DateKey::parse_lenient("yesterday"), None);
    }

    #[test]
    fn year_month_parsing() {
        assert_eq!(parse_year_month("2025-01"), Ok((2025, 1)));
        assert!(parse_year_month("2025-13").is_err());
        assert!(parse_year_month("January").is_err());
    }

    #[test]
    fn weekday_names_parse() {
        assert_eq!(parse_weekday("Sunday"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("mon"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("someday"), None);
    }
}
