// 🪪 Name Reconciler - Canonical member keys across data sources
// The chain report, the war scores and the saves sheet all format member
// names differently:
//   "JlambJLAMB[456]"  (chain report: name + uppercase tag + ID)
//   "Jlamb[456]"       (war export)
//   "jlamb"            (hand-typed saves sheet)
// canonicalize() turns all of them into the same join key.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Names longer than this with no detectable tag are cut in half
pub const DEFAULT_TRUNCATE_THRESHOLD: usize = 15;

// ============================================================================
// MEMBER RECORD
// ============================================================================

/// A raw display name with everything we could derive from it.
/// `canonical_name` is recomputed on every run, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub raw_display_name: String,
    pub numeric_id: Option<String>,
    pub canonical_name: String,
}

/// How a lookup found its row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Canonical names are byte-identical
    Exact,

    /// Canonical names differ only in letter case
    CaseInsensitive,
}

impl MatchKind {
    pub fn name(&self) -> &str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::CaseInsensitive => "case-insensitive",
        }
    }
}

// ============================================================================
// NAME RECONCILER
// ============================================================================

#[derive(Debug, Clone)]
pub struct NameReconciler {
    /// Length above which an untagged name is truncated to its first half.
    /// `None` disables the heuristic.
    pub truncate_threshold: Option<usize>,
}

impl NameReconciler {
    pub fn new() -> Self {
        NameReconciler {
            truncate_threshold: Some(DEFAULT_TRUNCATE_THRESHOLD),
        }
    }

    pub fn with_truncation(threshold: Option<usize>) -> Self {
        NameReconciler {
            truncate_threshold: threshold,
        }
    }

    /// Turn a raw display string into the join key used across sources.
    ///
    /// Steps:
    /// 1. Strip every `[digits]` ID group
    /// 2. Collapse `NameNAME` (second half is the uppercased first half)
    /// 3. Otherwise, halve names longer than the truncate threshold
    ///
    /// Steps 2 and 3 repeat until neither applies, so the result is a fixed
    /// point: `canonicalize(canonicalize(x)) == canonicalize(x)`. A tagged
    /// chain name and the plain war name of the same member end on the same key.
    ///
    /// Never fails. Input that strips down to nothing comes back trimmed.
    ///
    /// ```
    /// use faction_payout::NameReconciler;
    ///
    /// let reconciler = NameReconciler::new();
    /// assert_eq!(reconciler.canonicalize("JlambJLAMB[456]"), "Jlamb");
    /// assert_eq!(reconciler.canonicalize("Jlamb[456]"), "Jlamb");
    /// ```
    pub fn canonicalize(&self, raw: &str) -> String {
        let stripped = strip_member_ids(raw);
        let mut core = stripped.trim().to_string();

        if core.is_empty() {
            return raw.trim().to_string();
        }

        loop {
            if let Some(collapsed) = collapse_uppercase_tag(&core) {
                core = collapsed;
                continue;
            }

            match self.truncate_threshold {
                Some(threshold) if core.chars().count() > threshold => {
                    let len = core.chars().count();
                    let half: String = core.chars().take(len / 2).collect();
                    debug!(raw, truncated = %half, "name truncated to first half");
                    core = half.trim_end().to_string();
                }
                _ => return core,
            }
        }
    }

    /// Canonicalize and keep the raw name and ID alongside
    pub fn reconcile(&self, raw: &str) -> MemberRecord {
        MemberRecord {
            raw_display_name: raw.to_string(),
            numeric_id: extract_member_id(raw),
            canonical_name: self.canonicalize(raw),
        }
    }
}

impl Default for NameReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalize with the default reconciler
pub fn canonicalize(raw: &str) -> String {
    NameReconciler::new().canonicalize(raw)
}

/// First `[digits]` group in a display name, without the brackets
pub fn extract_member_id(raw: &str) -> Option<String> {
    find_id_group(raw, 0).map(|(start, end)| raw[start + 1..end - 1].to_string())
}

/// Compare two canonical names: exact first, then ignoring case
pub fn names_match(a: &str, b: &str) -> Option<MatchKind> {
    if a == b {
        Some(MatchKind::Exact)
    } else if a.to_lowercase() == b.to_lowercase() {
        Some(MatchKind::CaseInsensitive)
    } else {
        None
    }
}

/// Remove every `[digits]` group
fn strip_member_ids(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;

    while let Some((start, end)) = find_id_group(raw, pos) {
        out.push_str(&raw[pos..start]);
        pos = end;
    }
    out.push_str(&raw[pos..]);

    out
}

/// Locate the next `[digits]` group at or after `from`.
/// Returns byte offsets of `[` and one past `]`; both are ASCII so the
/// offsets are always char boundaries.
fn find_id_group(s: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == b']' {
                return Some((i, j + 1));
            }
        }
        i += 1;
    }

    None
}

/// "JlambJLAMB" -> "Jlamb". The source UI glues the display name to its own
/// uppercase tag; split at the midpoint and keep the first half when the
/// second is its uppercase copy.
fn collapse_uppercase_tag(name: &str) -> Option<String> {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < 2 {
        return None;
    }

    let mid = chars.len() / 2;
    let first: String = chars[..mid].iter().collect();
    let second: String = chars[mid..].iter().collect();
    let first = first.trim();

    if !first.is_empty() && first.to_uppercase() == second.trim() {
        Some(first.to_string())
    } else {
        None
    }
}

// ============================================================================
// MEMBER INDEX
// ============================================================================

/// Rows of one source keyed by canonical name, with a case-folded side table
/// for the case-insensitive fallback.
#[derive(Debug, Clone)]
pub struct MemberIndex<T> {
    entries: HashMap<String, T>,
    folded: HashMap<String, String>,
}

impl<T> MemberIndex<T> {
    pub fn new() -> Self {
        MemberIndex {
            entries: HashMap::new(),
            folded: HashMap::new(),
        }
    }

    /// Canonicalize every row name once and index the rows.
    /// When two rows collapse to the same key the later one wins.
    pub fn build<I, F>(reconciler: &NameReconciler, rows: I, name_of: F, source: &str) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> &str,
    {
        let mut index = MemberIndex::new();

        for row in rows {
            let raw = name_of(&row).to_string();
            let canonical = reconciler.canonicalize(&raw);
            if index.insert(canonical.clone(), row).is_some() {
                warn!(source, member = %raw, canonical = %canonical, "duplicate member key, keeping later row");
            }
        }

        debug!(source, entries = index.len(), "member index built");
        index
    }

    pub fn insert(&mut self, canonical: String, value: T) -> Option<T> {
        self.folded.insert(canonical.to_lowercase(), canonical.clone());
        self.entries.insert(canonical, value)
    }

    /// Exact key first, then the case-insensitive fallback
    pub fn lookup(&self, canonical: &str) -> Option<(&T, MatchKind)> {
        if let Some(value) = self.entries.get(canonical) {
            return Some((value, MatchKind::Exact));
        }

        self.folded
            .get(&canonical.to_lowercase())
            .and_then(|key| self.entries.get(key))
            .map(|value| (value, MatchKind::CaseInsensitive))
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.lookup(canonical).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for MemberIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_duplicated_tag_with_id() {
        assert_eq!(canonicalize("JlambJLAMB[456]"), "Jlamb");
    }

    #[test]
    fn test_canonicalize_plain_id() {
        assert_eq!(canonicalize("Jlamb[123]"), "Jlamb");
        assert_eq!(canonicalize("  GaloSengen [2718281] "), "GaloSengen");
    }

    #[test]
    fn test_canonicalize_tag_separated_by_space() {
        assert_eq!(canonicalize("Jlamb JLAMB[456]"), "Jlamb");
    }

    #[test]
    fn test_canonicalize_long_name_without_tag_is_halved() {
        // 20 chars, no uppercase copy
        assert_eq!(canonicalize("RipTheJackerSomebody"), "RipTheJack");
    }

    #[test]
    fn test_canonicalize_long_tagged_name_keeps_tag_rule() {
        assert_eq!(canonicalize("RipTheJackerRIPTHEJACKER[99]"), "RipTheJacker");
    }

    #[test]
    fn test_canonicalize_long_tagged_name_also_truncated() {
        // Collapses to 16 chars, then the length rule still applies
        assert_eq!(canonicalize("VeryLongNameHereVERYLONGNAMEHERE[77]"), "VeryLong");
        assert_eq!(canonicalize("VeryLongNameHere[77]"), "VeryLong");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let samples = [
            "JlambJLAMB[456]",
            "VeryLongNameHereVERYLONGNAMEHERE[77]",
            "VeryLongNameHere",
            "AnExtremelyLongMemberNameWithoutAnyTagAtAll",
            "Jlamb JLAMB",
            "[123]",
            "Broken[12",
            "ÉlanÉLAN[7]",
            "",
        ];

        let reconciler = NameReconciler::new();
        for raw in samples {
            let once = reconciler.canonicalize(raw);
            assert_eq!(reconciler.canonicalize(&once), once, "not a fixed point for {:?}", raw);
        }
    }

    #[test]
    fn test_canonicalize_truncation_disabled() {
        let reconciler = NameReconciler::with_truncation(None);
        assert_eq!(reconciler.canonicalize("RipTheJackerSomebody"), "RipTheJackerSomebody");
    }

    #[test]
    fn test_canonicalize_malformed_input_degrades() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize("[123]"), "[123]");
        assert_eq!(canonicalize("Name[abc]"), "Name[abc]");
        assert_eq!(canonicalize("Broken[12"), "Broken[12");
    }

    #[test]
    fn test_canonicalize_non_ascii() {
        assert_eq!(canonicalize("ÉlanÉLAN[7]"), "Élan");
    }

    #[test]
    fn test_extract_member_id() {
        assert_eq!(extract_member_id("Jlamb[123]"), Some("123".to_string()));
        assert_eq!(extract_member_id("JlambJLAMB [456] x"), Some("456".to_string()));
        assert_eq!(extract_member_id("Jlamb"), None);
        assert_eq!(extract_member_id("Jlamb[]"), None);
    }

    #[test]
    fn test_reconcile_record() {
        let record = NameReconciler::new().reconcile("JlambJLAMB[456]");
        assert_eq!(record.raw_display_name, "JlambJLAMB[456]");
        assert_eq!(record.numeric_id.as_deref(), Some("456"));
        assert_eq!(record.canonical_name, "Jlamb");
    }

    #[test]
    fn test_names_match() {
        assert_eq!(names_match("Jlamb", "Jlamb"), Some(MatchKind::Exact));
        assert_eq!(names_match("Jlamb", "jLAMB"), Some(MatchKind::CaseInsensitive));
        assert_eq!(names_match("Jlamb", "Jlamp"), None);
    }

    #[test]
    fn test_index_lookup_exact_and_case_insensitive() {
        let rows = vec![("Jlamb[1]", 10.0), ("Ghost[2]", 20.0)];
        let index = MemberIndex::build(&NameReconciler::new(), rows, |r| r.0, "test");

        assert_eq!(index.len(), 2);

        let (row, kind) = index.lookup("Jlamb").unwrap();
        assert_eq!(row.1, 10.0);
        assert_eq!(kind, MatchKind::Exact);

        let (row, kind) = index.lookup("GHOST").unwrap();
        assert_eq!(row.1, 20.0);
        assert_eq!(kind, MatchKind::CaseInsensitive);

        assert!(index.lookup("Nobody").is_none());
    }

    #[test]
    fn test_index_duplicate_key_keeps_later_row() {
        let rows = vec![("Jlamb[1]", 10.0), ("JlambJLAMB[1]", 30.0)];
        let index = MemberIndex::build(&NameReconciler::new(), rows, |r| r.0, "test");

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("Jlamb").unwrap().0 .1, 30.0);
    }
}
