//! Recursive structural differencing.
//!
//! The differencer walks two JSON values and flattens everything that
//! disagrees into a list of typed, severity-tagged [`Diff`]s. Arrays are
//! compared by similarity matching by default so that reordered or lightly
//! edited lists do not produce false remove/add storms; order-sensitive
//! positional comparison is available behind a flag.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{
    HIGH_SEVERITY_MARKERS, MAX_STRUCTURE_DEPTH, MEDIUM_SEVERITY_MARKERS,
    SIMILARITY_MATCH_THRESHOLD, SIMILARITY_PARTIAL_THRESHOLD,
};
use crate::similarity::{score_at_depth, value_kind};

/// One step in a diff path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{k}"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Renders a path the way ignore rules and severity markers see it.
pub fn dotted_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&segment.to_string());
    }
    out
}

/// What kind of disagreement a diff records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffKind {
    /// Present only on side B.
    Added,
    /// Present only on side A.
    Deleted,
    /// Present on both sides with different values.
    Changed,
    /// Present on both sides with different JSON types.
    TypeChanged,
}

impl DiffKind {
    /// Stable lowercase name, used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Deleted => "deleted",
            DiffKind::Changed => "changed",
            DiffKind::TypeChanged => "type-changed",
        }
    }
}

/// Coarse business-impact tag derived from a diff's path and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Type shape broke; consumers will almost certainly misparse.
    Critical,
    /// Identity, state or payload fields disagree.
    High,
    /// Metadata and bookkeeping fields disagree.
    Medium,
    /// Everything else.
    Low,
}

impl Severity {
    /// Stable lowercase name, used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// One structural difference between the two sides of a comparison.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    /// Where in the structure the disagreement sits.
    pub path: Vec<PathSegment>,
    /// What kind of disagreement it is.
    pub kind: DiffKind,
    /// Business-impact tag, assigned at emission time.
    pub severity: Severity,
    /// Side-A value, when one exists at this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lhs: Option<Value>,
    /// Side-B value, when one exists at this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs: Option<Value>,
    /// Short human-readable summary.
    pub description: String,
}

impl Diff {
    /// The dot-joined path, as matched by ignore rules.
    pub fn dotted_path(&self) -> String {
        dotted_path(&self.path)
    }
}

/// Classifies a diff's severity from its dot-joined path and kind.
///
/// Substring scan in priority order, first match wins: type changes are
/// always critical, then the high markers, then the medium markers.
pub fn classify_severity(dotted_path: &str, kind: DiffKind) -> Severity {
    if kind == DiffKind::TypeChanged {
        return Severity::Critical;
    }
    if HIGH_SEVERITY_MARKERS.iter().any(|m| dotted_path.contains(m)) {
        return Severity::High;
    }
    if MEDIUM_SEVERITY_MARKERS.iter().any(|m| dotted_path.contains(m)) {
        return Severity::Medium;
    }
    Severity::Low
}

/// Recursive differencer over two JSON values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Differencer {
    order_sensitive: bool,
}

impl Differencer {
    /// A differencer using similarity-matched array comparison.
    pub fn new() -> Self {
        Differencer::default()
    }

    /// Switches array comparison to strict positional mode.
    pub fn order_sensitive(mut self, order_sensitive: bool) -> Self {
        self.order_sensitive = order_sensitive;
        self
    }

    /// Diffs `a` against `b`, returning every disagreement found.
    pub fn diff(&self, a: &Value, b: &Value) -> Vec<Diff> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.walk(a, b, &mut path, 0, &mut out);
        out
    }

    fn walk(&self, a: &Value, b: &Value, path: &mut Vec<PathSegment>, depth: usize, out: &mut Vec<Diff>) {
        if a == b {
            return;
        }
        if depth > MAX_STRUCTURE_DEPTH {
            // Fail closed instead of recursing without bound.
            emit(
                out,
                path,
                DiffKind::TypeChanged,
                Some(a.clone()),
                Some(b.clone()),
                format!("structure deeper than {MAX_STRUCTURE_DEPTH} levels"),
            );
            return;
        }
        let (kind_a, kind_b) = (value_kind(a), value_kind(b));
        if kind_a != kind_b {
            emit(
                out,
                path,
                DiffKind::TypeChanged,
                Some(a.clone()),
                Some(b.clone()),
                format!("type changed from {} to {}", kind_a.as_str(), kind_b.as_str()),
            );
            return;
        }
        match (a, b) {
            (Value::Array(xs), Value::Array(ys)) => {
                if self.order_sensitive {
                    self.walk_array_positional(xs, ys, path, depth, out);
                } else {
                    self.walk_array_matched(xs, ys, path, depth, out);
                }
            }
            (Value::Object(xm), Value::Object(ym)) => {
                for (key, x) in xm {
                    match ym.get(key) {
                        Some(y) => {
                            path.push(PathSegment::Key(key.clone()));
                            self.walk(x, y, path, depth + 1, out);
                            path.pop();
                        }
                        None => {
                            path.push(PathSegment::Key(key.clone()));
                            emit(
                                out,
                                path,
                                DiffKind::Deleted,
                                Some(x.clone()),
                                None,
                                format!("property '{key}' removed"),
                            );
                            path.pop();
                        }
                    }
                }
                for (key, y) in ym {
                    if !xm.contains_key(key) {
                        path.push(PathSegment::Key(key.clone()));
                        emit(
                            out,
                            path,
                            DiffKind::Added,
                            None,
                            Some(y.clone()),
                            format!("property '{key}' added"),
                        );
                        path.pop();
                    }
                }
            }
            _ => {
                // Unequal primitives of the same kind.
                emit(
                    out,
                    path,
                    DiffKind::Changed,
                    Some(a.clone()),
                    Some(b.clone()),
                    "value changed".to_string(),
                );
            }
        }
    }

    fn walk_array_positional(
        &self,
        xs: &[Value],
        ys: &[Value],
        path: &mut Vec<PathSegment>,
        depth: usize,
        out: &mut Vec<Diff>,
    ) {
        let len = xs.len().max(ys.len());
        for i in 0..len {
            path.push(PathSegment::Index(i));
            match (xs.get(i), ys.get(i)) {
                (Some(x), Some(y)) => self.walk(x, y, path, depth + 1, out),
                (Some(x), None) => emit(
                    out,
                    path,
                    DiffKind::Deleted,
                    Some(x.clone()),
                    None,
                    format!("item removed at index {i}"),
                ),
                (None, Some(y)) => emit(
                    out,
                    path,
                    DiffKind::Added,
                    None,
                    Some(y.clone()),
                    format!("item added at index {i}"),
                ),
                (None, None) => {}
            }
            path.pop();
        }
    }

    /// Three-phase similarity matching.
    ///
    /// Phase 1 greedily pairs each side-A element with its best-scoring
    /// unused side-B element (first seen wins ties; no global optimum is
    /// attempted). Strong matches recurse only when inexact, partial
    /// matches always recurse, weak ones are deferred. Phase 2 reports
    /// deferred side-A elements as removed, phase 3 reports unused side-B
    /// elements as added.
    fn walk_array_matched(
        &self,
        xs: &[Value],
        ys: &[Value],
        path: &mut Vec<PathSegment>,
        depth: usize,
        out: &mut Vec<Diff>,
    ) {
        let mut used = vec![false; ys.len()];
        let mut unmatched: Vec<usize> = Vec::new();

        for (i, x) in xs.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (j, y) in ys.iter().enumerate() {
                if used[j] {
                    continue;
                }
                let s = score_at_depth(x, y, depth);
                if best.map_or(true, |(_, best_score)| s > best_score) {
                    best = Some((j, s));
                }
            }
            match best {
                Some((j, s)) if s >= SIMILARITY_MATCH_THRESHOLD => {
                    used[j] = true;
                    // Near-duplicates still carry minor field changes.
                    if s < 1.0 {
                        path.push(PathSegment::Index(i));
                        self.walk(x, &ys[j], path, depth + 1, out);
                        path.pop();
                    }
                }
                Some((j, s)) if s >= SIMILARITY_PARTIAL_THRESHOLD => {
                    // Same logical item with more substantial edits.
                    used[j] = true;
                    path.push(PathSegment::Index(i));
                    self.walk(x, &ys[j], path, depth + 1, out);
                    path.pop();
                }
                _ => unmatched.push(i),
            }
        }

        for i in unmatched {
            path.push(PathSegment::Index(i));
            emit(
                out,
                path,
                DiffKind::Deleted,
                Some(xs[i].clone()),
                None,
                format!("item removed at index {i}"),
            );
            path.pop();
        }
        for (j, item_used) in used.iter().enumerate() {
            if !item_used {
                path.push(PathSegment::Index(j));
                emit(
                    out,
                    path,
                    DiffKind::Added,
                    None,
                    Some(ys[j].clone()),
                    format!("item added at index {j}"),
                );
                path.pop();
            }
        }
    }
}

fn emit(
    out: &mut Vec<Diff>,
    path: &[PathSegment],
    kind: DiffKind,
    lhs: Option<Value>,
    rhs: Option<Value>,
    description: String,
) {
    let severity = classify_severity(&dotted_path(path), kind);
    out.push(Diff {
        path: path.to_vec(),
        kind,
        severity,
        lhs,
        rhs,
        description,
    });
}
