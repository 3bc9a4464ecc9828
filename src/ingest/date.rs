use regex::Regex;
use std::sync::LazyLock;

/// Stored when no date pattern can be found in a path.
pub const SENTINEL_DATE: &str = "0000-00-00";

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[-_]\d{2}[-_]\d{2}").expect("date pattern compiles"));

/// Pull the first `YYYY-MM-DD` or `YYYY_MM_DD` run out of `path`,
/// normalised to hyphens. Falls back to [`SENTINEL_DATE`].
pub fn extract_date(path: &str) -> String {
    match DATE_PATTERN.find(path) {
        Some(m) => m.as_str().replace('_', "-"),
        None => SENTINEL_DATE.to_string(),
    }
}

pub fn is_sentinel(date: &str) -> bool {
    date == SENTINEL_DATE
}

#[cfg(test)]
mod tests {
    use super::{SENTINEL_DATE, extract_date, is_sentinel};

    #[test]
    fn hyphenated_date_is_returned_verbatim() {
        assert_eq!(extract_date("/data/rig_2023-08-01_run.zip"), "2023-08-01");
    }

    #[test]
    fn underscores_are_normalised() {
        assert_eq!(extract_date("results_2024_03_01.tar.gz"), "2024-03-01");
    }

    #[test]
    fn mixed_separators_still_match() {
        assert_eq!(extract_date("x2024-03_01y"), "2024-03-01");
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            extract_date("/archive/2022-01-02/batch_2023_04_05.7z"),
            "2022-01-02"
        );
    }

    #[test]
    fn missing_pattern_yields_sentinel() {
        assert_eq!(extract_date("station-results.zip"), SENTINEL_DATE);
        assert_eq!(extract_date("2024-3-01.zip"), SENTINEL_DATE);
        assert!(is_sentinel(&extract_date("")));
    }
}
