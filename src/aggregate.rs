//! Diff filtering and summarization.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diff::{Diff, DiffKind, Severity};

/// A compiled set of ignore rules.
///
/// Config entries wrapped in `/.../` compile to regular expressions; every
/// other entry is a literal path matched exactly or as a `path.` prefix.
#[derive(Debug, Default)]
pub struct IgnoreSet {
    rules: Vec<IgnoreRule>,
}

#[derive(Debug)]
enum IgnoreRule {
    Literal(String),
    Pattern(Regex),
}

impl IgnoreSet {
    /// Compiles ignore rules from job config entries.
    ///
    /// An entry that looks like a regex but fails to compile falls back to
    /// literal matching, with a warning.
    pub fn new(patterns: &[String]) -> Self {
        let mut rules = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let rule = match raw.strip_prefix('/').and_then(|r| r.strip_suffix('/')) {
                Some(inner) if !inner.is_empty() => match Regex::new(inner) {
                    Ok(re) => IgnoreRule::Pattern(re),
                    Err(e) => {
                        log::warn!("Ignore pattern {raw} does not compile ({e}); matching it literally");
                        IgnoreRule::Literal(raw.clone())
                    }
                },
                _ => IgnoreRule::Literal(raw.clone()),
            };
            rules.push(rule);
        }
        IgnoreSet { rules }
    }

    /// Whether a dot-joined diff path is excluded by any rule.
    pub fn matches(&self, dotted_path: &str) -> bool {
        self.rules.iter().any(|rule| match rule {
            IgnoreRule::Literal(p) => {
                dotted_path == p
                    || (dotted_path.len() > p.len()
                        && dotted_path.starts_with(p)
                        && dotted_path.as_bytes()[p.len()] == b'.')
            }
            IgnoreRule::Pattern(re) => re.is_match(dotted_path),
        })
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Per-kind and per-severity diff totals for one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffCounts {
    /// Diffs present only on side B.
    pub added: u32,
    /// Diffs present only on side A.
    pub deleted: u32,
    /// Value-level changes.
    pub changed: u32,
    /// Type-level changes.
    pub type_changed: u32,
    /// Reserved for structural array-level diffs; the current engine never
    /// populates it, but downstream consumers expect the bucket.
    pub array: u32,
    /// Critical-severity diffs.
    pub critical: u32,
    /// High-severity diffs.
    pub high: u32,
    /// Medium-severity diffs.
    pub medium: u32,
    /// Low-severity diffs.
    pub low: u32,
    /// Sum of the per-kind buckets.
    pub total: u32,
    /// True when no diffs survived filtering.
    pub identical: bool,
}

impl DiffCounts {
    /// Tallies a filtered diff list.
    pub fn from_diffs(diffs: &[Diff]) -> Self {
        let mut counts = DiffCounts::default();
        for diff in diffs {
            match diff.kind {
                DiffKind::Added => counts.added += 1,
                DiffKind::Deleted => counts.deleted += 1,
                DiffKind::Changed => counts.changed += 1,
                DiffKind::TypeChanged => counts.type_changed += 1,
            }
            match diff.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts.total = counts.added + counts.deleted + counts.changed + counts.type_changed;
        counts.identical = counts.total == 0;
        counts
    }
}

/// Drops ignored diffs and summarizes what remains.
pub fn filter_and_summarize(diffs: Vec<Diff>, ignore: &IgnoreSet) -> (Vec<Diff>, DiffCounts) {
    let kept: Vec<Diff> = if ignore.is_empty() {
        diffs
    } else {
        diffs
            .into_iter()
            .filter(|d| !ignore.matches(&d.dotted_path()))
            .collect()
    };
    let counts = DiffCounts::from_diffs(&kept);
    (kept, counts)
}
