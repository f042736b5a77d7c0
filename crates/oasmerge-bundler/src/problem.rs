//! Problem records and their human-readable report.

use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Severity of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warn => f.write_str("warn"),
        }
    }
}

/// Where a problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File containing the offending node.
    pub file: PathBuf,
    /// JSON pointer fragment of the node within `file` (e.g. `#/paths/~1pets`).
    pub pointer: String,
}

/// A diagnostic found while bundling one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Name of the rule that reported it.
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Problem {
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        file: &Path,
        pointer: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            location: Location {
                file: file.to_path_buf(),
                pointer: pointer.into(),
            },
        }
    }
}

/// Problem counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
}

impl Totals {
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

/// Count problems per severity.
pub fn totals(problems: &[Problem]) -> Totals {
    problems
        .iter()
        .fold(Totals::default(), |mut acc, problem| {
            match problem.severity {
                Severity::Error => acc.errors += 1,
                Severity::Warn => acc.warnings += 1,
            }
            acc
        })
}

/// Render problems grouped by file, followed by a totals line.
///
/// Files appear in the order their first problem was reported.
pub fn format_problems(problems: &[Problem], totals: Totals, version: &str) -> String {
    let mut groups: Vec<(&Path, Vec<&Problem>)> = Vec::new();
    for problem in problems {
        let file = problem.location.file.as_path();
        match groups.iter_mut().find(|(f, _)| *f == file) {
            Some((_, group)) => group.push(problem),
            None => groups.push((file, vec![problem])),
        }
    }

    let mut out = String::new();
    for (file, group) in &groups {
        let pointer_width = group
            .iter()
            .map(|p| p.location.pointer.len())
            .max()
            .unwrap_or(0);
        let rule_width = group.iter().map(|p| p.rule.len()).max().unwrap_or(0);

        let _ = writeln!(out, "{}", file.display());
        for problem in group {
            let _ = writeln!(
                out,
                "  {:<pw$}  {:<5}  {:<rw$}  {}",
                problem.location.pointer,
                problem.severity.to_string(),
                problem.rule,
                problem.message,
                pw = pointer_width,
                rw = rule_width,
            );
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "oasmerge {}: {} and {} in {}",
        version,
        plural(totals.errors, "error"),
        plural(totals.warnings, "warning"),
        plural(groups.len(), "file"),
    );
    out
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(file: &str, severity: Severity, pointer: &str, message: &str) -> Problem {
        Problem::new("struct", severity, Path::new(file), pointer, message)
    }

    #[test]
    fn totals_counts_by_severity() {
        let problems = vec![
            problem("a.yaml", Severity::Error, "#", "one"),
            problem("a.yaml", Severity::Warn, "#", "two"),
            problem("b.yaml", Severity::Error, "#", "three"),
        ];
        let t = totals(&problems);
        assert_eq!(t.errors, 2);
        assert_eq!(t.warnings, 1);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn format_groups_by_file_in_first_seen_order() {
        let problems = vec![
            problem("b.yaml", Severity::Error, "#/info", "missing 'info.title'"),
            problem("a.yaml", Severity::Warn, "#", "first"),
            problem("b.yaml", Severity::Error, "#/paths", "'paths' must be a mapping"),
        ];
        let report = format_problems(&problems, totals(&problems), "1.2.3");

        let b = report.find("b.yaml").unwrap();
        let a = report.find("a.yaml").unwrap();
        assert!(b < a);
        assert_eq!(report.matches("b.yaml").count(), 1);
        assert!(report.contains("missing 'info.title'"));
        assert!(report.contains("'paths' must be a mapping"));
        assert!(report.ends_with("oasmerge 1.2.3: 2 errors and 1 warning in 2 files\n"));
    }

    #[test]
    fn format_singular_totals() {
        let problems = vec![problem("a.yaml", Severity::Error, "#", "boom")];
        let report = format_problems(&problems, totals(&problems), "0.1.0");
        assert!(report.ends_with("oasmerge 0.1.0: 1 error and 0 warnings in 1 file\n"));
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warn.to_string(), "warn");
    }
}
