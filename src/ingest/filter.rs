use crate::ingest::config::FilterRules;
use crate::ingest::text::field_count;

const MOJIBAKE_MARKER: char = '\u{FFFD}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    TooFewFields,
    NonPrintable,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooFewFields => "insufficient-columns",
            Self::NonPrintable => "corrupted-or-non-printable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLine {
    /// 1-based position in the member.
    pub line_no: usize,
    pub reason: DropReason,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<String>,
    pub dropped: Vec<DroppedLine>,
    pub raw_count: usize,
}

impl FilterOutcome {
    pub fn kept_count(&self) -> usize {
        self.kept.len()
    }
}

fn has_forbidden_control(line: &str) -> bool {
    line.chars()
        .any(|ch| (ch as u32) < 0x20 && !matches!(ch, '\n' | '\r' | '\t'))
}

/// Classify one line. `None` means it is kept.
pub fn check_line(line: &str, rules: &FilterRules) -> Option<DropReason> {
    if field_count(line.trim()) < rules.min_field_count {
        return Some(DropReason::TooFewFields);
    }
    if line.contains(MOJIBAKE_MARKER) || has_forbidden_control(line) {
        return Some(DropReason::NonPrintable);
    }
    None
}

/// Keep lines with enough fields and no corruption. Kept lines are returned
/// untouched, terminators included.
pub fn filter_lines(lines: Vec<String>, rules: &FilterRules) -> FilterOutcome {
    let mut out = FilterOutcome {
        raw_count: lines.len(),
        ..FilterOutcome::default()
    };
    for (idx, line) in lines.into_iter().enumerate() {
        match check_line(&line, rules) {
            None => out.kept.push(line),
            Some(reason) => out.dropped.push(DroppedLine {
                line_no: idx + 1,
                reason,
                content: line.trim().to_string(),
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{DropReason, check_line, filter_lines};
    use crate::ingest::config::FilterRules;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_lines_are_dropped_regardless_of_content() {
        let rules = FilterRules::default();
        assert_eq!(check_line("a,b,c,d,e\n", &rules), Some(DropReason::TooFewFields));
        assert_eq!(check_line("\n", &rules), Some(DropReason::TooFewFields));
        assert_eq!(
            check_line("a,b,\u{1},d,e\n", &rules),
            Some(DropReason::TooFewFields)
        );
    }

    #[test]
    fn six_fields_pass() {
        assert_eq!(check_line("a,b,c,d,e,f\n", &FilterRules::default()), None);
    }

    #[test]
    fn control_bytes_drop_wide_lines() {
        let rules = FilterRules::default();
        assert_eq!(
            check_line("a,b,c,d,e,\u{7}f\n", &rules),
            Some(DropReason::NonPrintable)
        );
        assert_eq!(
            check_line("a,b,c,d,e,\u{0}\n", &rules),
            Some(DropReason::NonPrintable)
        );
    }

    #[test]
    fn tabs_and_carriage_returns_are_allowed() {
        assert_eq!(
            check_line("a\t,b,c,d,e,f\r\n", &FilterRules::default()),
            None
        );
    }

    #[test]
    fn replacement_character_drops_line() {
        assert_eq!(
            check_line("a,b,c,d,e,caf\u{FFFD}\n", &FilterRules::default()),
            Some(DropReason::NonPrintable)
        );
    }

    #[test]
    fn outcome_reports_counts_and_one_based_positions() {
        let out = filter_lines(
            lines(&["1,2,3,4,5,6\n", "short\n", "1,2,3,4,5,\u{1b}\n", "7,8,9,10,11,12"]),
            &FilterRules::default(),
        );
        assert_eq!(out.raw_count, 4);
        assert_eq!(out.kept_count(), 2);
        assert_eq!(out.kept, lines(&["1,2,3,4,5,6\n", "7,8,9,10,11,12"]));
        assert_eq!(out.dropped[0].line_no, 2);
        assert_eq!(out.dropped[0].content, "short");
        assert_eq!(out.dropped[1].line_no, 3);
        assert_eq!(out.dropped[1].reason, DropReason::NonPrintable);
    }
}
