use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::ingestion::Cell;

static FISCAL_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\s*-\s*(\d{2})").unwrap());
static MARCH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)mar(?:ch)?\s*(\d{4})").unwrap());
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Ending year of a fiscal-year header: "2023-24" → 2024,
/// "As on 31st March 2024" → 2024, "2024" → 2024.
pub fn parse_year(text: &str) -> Option<i32> {
    if let Some(c) = FISCAL_YEAR.captures(text) {
        return c[1].parse::<i32>().ok().map(|y| y + 1);
    }
    if let Some(c) = MARCH_YEAR.captures(text) {
        return c[1].parse().ok();
    }
    BARE_YEAR.captures(text).and_then(|c| c[1].parse().ok())
}

/// Year header from a cell; integral numeric cells are taken as the year itself.
pub fn parse_year_cell(cell: &Cell) -> Option<i32> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && (1900.0..=2100.0).contains(n) => Some(*n as i32),
        Cell::Number(_) | Cell::Empty => None,
        Cell::Text(s) => parse_year(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiscal_ranges_map_to_ending_year() {
        assert_eq!(parse_year("2023-24"), Some(2024));
        assert_eq!(parse_year("FY 2014 - 15"), Some(2015));
    }

    #[test]
    fn march_dates_and_bare_years() {
        assert_eq!(parse_year("As on 31st March 2024"), Some(2024));
        assert_eq!(parse_year("Mar 2023"), Some(2023));
        assert_eq!(parse_year("Year 2022"), Some(2022));
        assert_eq!(parse_year("Particulars"), None);
        assert_eq!(parse_year("120"), None);
    }

    #[test]
    fn numeric_year_cells() {
        assert_eq!(parse_year_cell(&Cell::Number(2024.0)), Some(2024));
        assert_eq!(parse_year_cell(&Cell::Number(13.0)), None);
        assert_eq!(parse_year_cell(&Cell::Number(2024.5)), None);
    }
}
