use std::collections::BTreeSet;
use std::path::PathBuf;

/// Counters and exclusion state for one run. Created fresh at the start of
/// every run and threaded through each step.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub csv_members_found: usize,
    pub raw_lines: usize,
    pub filtered_lines: usize,
    pub processed_members: Vec<String>,
    pub missing_date_archives: Vec<PathBuf>,
    /// Member names that failed once. Keyed by bare name across every
    /// archive of the run, so a same-named member elsewhere is skipped too.
    pub error_members: BTreeSet<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blacklisted(&self, member: &str) -> bool {
        self.error_members.contains(member)
    }

    pub fn blacklist(&mut self, member: impl Into<String>) {
        self.error_members.insert(member.into());
    }

    pub fn record_member(&mut self, member: impl Into<String>, raw: usize, kept: usize) {
        self.raw_lines += raw;
        self.filtered_lines += kept;
        self.processed_members.push(member.into());
    }
}

#[cfg(test)]
mod tests {
    use super::RunContext;

    #[test]
    fn record_member_accumulates() {
        let mut ctx = RunContext::new();
        ctx.record_member("a", 5, 3);
        ctx.record_member("b", 2, 2);
        assert_eq!(ctx.raw_lines, 7);
        assert_eq!(ctx.filtered_lines, 5);
        assert_eq!(ctx.processed_members, vec!["a", "b"]);
    }

    #[test]
    fn blacklist_is_name_keyed() {
        let mut ctx = RunContext::new();
        ctx.blacklist("dir/station_results_0001.csv");
        assert!(ctx.is_blacklisted("dir/station_results_0001.csv"));
        assert!(!ctx.is_blacklisted("other/station_results_0001.csv"));
    }
}
