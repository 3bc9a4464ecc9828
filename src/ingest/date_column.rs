use crate::ingest::date::extract_date;
use crate::ingest::text::{split_lines_keep_ends, split_terminator, write_atomic};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Pad `line` to `column` fields and insert `date` at that position.
/// A line without a terminator gets `\n`.
pub fn insert_date(line: &str, date: &str, column: usize) -> String {
    let (body, terminator) = split_terminator(line);
    let mut fields: Vec<&str> = body.split(',').collect();
    if fields.len() < column {
        fields.resize(column, "");
    }
    fields.insert(column, date);
    let terminator = if terminator.is_empty() { "\n" } else { terminator };
    format!("{}{terminator}", fields.join(","))
}

/// Insert the date derived from the merged CSV's own path into every row.
/// Not idempotent: a second pass inserts another date column.
pub fn append_date_column(csv: &Path, column: usize) -> Result<String> {
    let date = extract_date(&csv.display().to_string());
    let raw = fs::read_to_string(csv).with_context(|| format!("failed to read {}", csv.display()))?;
    let updated: String = split_lines_keep_ends(&raw)
        .iter()
        .map(|line| insert_date(line, &date, column))
        .collect();
    write_atomic(csv, &updated)?;
    Ok(date)
}

pub fn line_has_date(line: &str, date: &str, column: usize) -> bool {
    let (body, _) = split_terminator(line);
    body.split(',').nth(column) == Some(date)
}

/// True when every row carries the path-derived date at `column`.
pub fn verify_date_column(csv: &Path, column: usize) -> Result<bool> {
    let expected = extract_date(&csv.display().to_string());
    let raw = fs::read_to_string(csv).with_context(|| format!("failed to read {}", csv.display()))?;
    Ok(split_lines_keep_ends(&raw)
        .iter()
        .all(|line| line_has_date(line, &expected, column)))
}

#[cfg(test)]
mod tests {
    use super::{append_date_column, insert_date, line_has_date, verify_date_column};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn short_rows_are_padded_before_the_date() {
        assert_eq!(insert_date("a,b\n", "2024-03-01", 8), "a,b,,,,,,,2024-03-01\n");
    }

    #[test]
    fn long_rows_get_the_date_spliced_in() {
        assert_eq!(
            insert_date("0,1,2,3,4,5,6,7,8,9\r\n", "2024-03-01", 8),
            "0,1,2,3,4,5,6,7,2024-03-01,8,9\r\n"
        );
    }

    #[test]
    fn missing_terminator_becomes_newline() {
        assert_eq!(insert_date("0,1,2,3,4,5,6,7", "d", 8), "0,1,2,3,4,5,6,7,d\n");
    }

    #[test]
    fn line_check_requires_the_column() {
        assert!(line_has_date("0,1,2,3,4,5,6,7,d\n", "d", 8));
        assert!(!line_has_date("0,1,2,3,4,5,6,d\n", "d", 8));
        assert!(!line_has_date("0,1,2,3,4,5,6,7,e\n", "d", 8));
    }

    #[test]
    fn append_then_verify_round_trips() {
        let tmp = tempdir().expect("tempdir");
        let csv = tmp.path().join("rig_2024-03-01.csv");
        fs::write(&csv, "a,b,c,d,e,f\n0,1,2,3,4,5,6,7,8,9\n").expect("seed");

        let date = append_date_column(&csv, 8).expect("append");
        assert_eq!(date, "2024-03-01");
        assert!(verify_date_column(&csv, 8).expect("verify"));
        let body = fs::read_to_string(&csv).expect("read");
        assert_eq!(
            body,
            "a,b,c,d,e,f,,,2024-03-01\n0,1,2,3,4,5,6,7,2024-03-01,8,9\n"
        );
    }

    #[test]
    fn appending_twice_inserts_a_second_date_column() {
        let tmp = tempdir().expect("tempdir");
        let csv = tmp.path().join("rig_2024-03-01.csv");
        fs::write(&csv, "0,1,2,3,4,5,6,7,x\n").expect("seed");

        append_date_column(&csv, 8).expect("first append");
        assert_eq!(
            fs::read_to_string(&csv).expect("read"),
            "0,1,2,3,4,5,6,7,2024-03-01,x\n"
        );
        append_date_column(&csv, 8).expect("second append");
        assert_eq!(
            fs::read_to_string(&csv).expect("read"),
            "0,1,2,3,4,5,6,7,2024-03-01,2024-03-01,x\n"
        );
        // the newer copy sits at the date column, so the file still verifies
        assert!(verify_date_column(&csv, 8).expect("verify"));
    }

    #[test]
    fn verification_fails_on_foreign_value_in_date_column() {
        let tmp = tempdir().expect("tempdir");
        let csv = tmp.path().join("rig_2024-03-01.csv");
        fs::write(&csv, "0,1,2,3,4,5,6,7,2024-03-01\n0,1,2,3,4,5,6,7,2023-01-01\n")
            .expect("seed");
        assert!(!verify_date_column(&csv, 8).expect("verify"));

        fs::write(&csv, "0,1,2,3,4,5,6,7\n").expect("reseed");
        assert!(!verify_date_column(&csv, 8).expect("verify short row"));
    }

    #[test]
    fn empty_file_verifies() {
        let tmp = tempdir().expect("tempdir");
        let csv = tmp.path().join("rig_2024-03-01.csv");
        fs::write(&csv, "").expect("seed");
        append_date_column(&csv, 8).expect("append");
        assert!(verify_date_column(&csv, 8).expect("verify"));
    }

    #[test]
    fn sentinel_date_is_written_when_name_has_no_date() {
        let tmp = tempdir().expect("tempdir");
        let csv = tmp.path().join("undated.csv");
        fs::write(&csv, "0,1,2,3,4,5,6,7\n").expect("seed");
        assert_eq!(append_date_column(&csv, 8).expect("append"), "0000-00-00");
        assert!(verify_date_column(&csv, 8).expect("verify"));
    }
}
