// 🔗 War-Respect Merger - one row per chain participant
// Left join: chain report ⟕ war scores ⟕ saves, on canonical member name.
//
// Policy:
//   - no war score  → war_respect = chain respect (logged as a fallback)
//   - no saves row  → saves = 0, save_score = 0
//   - war/save rows nobody in the chain report matches are dropped

use crate::names::{extract_member_id, MatchKind, MemberIndex, NameReconciler};
use crate::parser::{ChainStat, SaveStat, WarStat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// MERGED MEMBER
// ============================================================================

/// Where a member's war respect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarSource {
    /// Found in the war scores
    Matched(MatchKind),

    /// Not found; chain respect used instead
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMember {
    /// Display name as it appears in the chain report
    pub member: String,
    pub canonical_name: String,
    pub member_id: Option<String>,

    /// Total respect from the chain report (war + outside hits)
    pub chain_respect: f64,

    /// Respect credited for the war, either matched or the fallback
    pub war_respect: f64,

    /// War hits from the chain report
    pub war_hits: u32,

    pub saves: u32,
    pub save_score: f64,

    pub war_source: WarSource,
    pub save_matched: bool,
}

impl MergedMember {
    pub fn used_fallback(&self) -> bool {
        self.war_source == WarSource::Fallback
    }
}

// ============================================================================
// MERGE REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub members: Vec<MergedMember>,
    pub exact_matches: usize,
    pub case_insensitive_matches: usize,

    /// Chain display names that fell back to chain respect
    pub fallbacks: Vec<String>,

    pub save_matches: usize,
}

impl MergeReport {
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    pub fn matched_count(&self) -> usize {
        self.exact_matches + self.case_insensitive_matches
    }

    pub fn summary(&self) -> String {
        format!(
            "Merged {} members: {} war matches ({} case-insensitive), {} fallbacks, {} with saves",
            self.members.len(),
            self.matched_count(),
            self.case_insensitive_matches,
            self.fallback_count(),
            self.save_matches
        )
    }
}

// ============================================================================
// MERGER
// ============================================================================

pub struct WarRespectMerger {
    reconciler: NameReconciler,
}

impl WarRespectMerger {
    pub fn new() -> Self {
        WarRespectMerger {
            reconciler: NameReconciler::new(),
        }
    }

    pub fn with_reconciler(reconciler: NameReconciler) -> Self {
        WarRespectMerger { reconciler }
    }

    pub fn reconciler(&self) -> &NameReconciler {
        &self.reconciler
    }

    /// Index war rows by canonical name (canonicalized once per row)
    pub fn war_index(&self, rows: Vec<WarStat>) -> MemberIndex<WarStat> {
        MemberIndex::build(&self.reconciler, rows, |row| row.member.as_str(), "war")
    }

    /// Index save rows by canonical name
    pub fn save_index(&self, rows: Vec<SaveStat>) -> MemberIndex<SaveStat> {
        MemberIndex::build(&self.reconciler, rows, |row| row.member.as_str(), "saves")
    }

    /// One MergedMember per chain row, in chain order
    pub fn merge(
        &self,
        chain_rows: &[ChainStat],
        war_index: &MemberIndex<WarStat>,
        save_index: &MemberIndex<SaveStat>,
    ) -> Vec<MergedMember> {
        self.merge_with_report(chain_rows, war_index, save_index).members
    }

    /// Merge and keep match statistics for auditing
    pub fn merge_with_report(
        &self,
        chain_rows: &[ChainStat],
        war_index: &MemberIndex<WarStat>,
        save_index: &MemberIndex<SaveStat>,
    ) -> MergeReport {
        let no_war_data = war_index.is_empty();
        if no_war_data {
            info!(stage = "merge", members = chain_rows.len(), "no war score data, using chain respect for every member");
        }

        let mut report = MergeReport {
            members: Vec::with_capacity(chain_rows.len()),
            exact_matches: 0,
            case_insensitive_matches: 0,
            fallbacks: Vec::new(),
            save_matches: 0,
        };

        for chain in chain_rows {
            let record = self.reconciler.reconcile(&chain.member);
            let canonical = record.canonical_name;

            let (war_respect, war_source, war_member) = match war_index.lookup(&canonical) {
                Some((war, kind)) => {
                    match kind {
                        MatchKind::Exact => report.exact_matches += 1,
                        MatchKind::CaseInsensitive => {
                            report.case_insensitive_matches += 1;
                            debug!(stage = "merge", member = %chain.member, war_member = %war.member, "case-insensitive war match");
                        }
                    }
                    (war.score, WarSource::Matched(kind), Some(war.member.as_str()))
                }
                None => {
                    if !no_war_data {
                        warn!(
                            stage = "merge",
                            member = %chain.member,
                            canonical = %canonical,
                            fallback_respect = chain.respect,
                            "no war score match, using chain respect"
                        );
                    }
                    report.fallbacks.push(chain.member.clone());
                    (chain.respect, WarSource::Fallback, None)
                }
            };

            let (saves, save_score, save_matched) = match save_index.lookup(&canonical) {
                Some((save, _)) => {
                    report.save_matches += 1;
                    (save.saves, save.save_score, true)
                }
                None => (0, 0.0, false),
            };

            let member_id = record
                .numeric_id
                .or_else(|| war_member.and_then(extract_member_id));

            report.members.push(MergedMember {
                member: chain.member.clone(),
                canonical_name: canonical,
                member_id,
                chain_respect: chain.respect,
                war_respect,
                war_hits: chain.war,
                saves,
                save_score,
                war_source,
                save_matched,
            });
        }

        info!(
            stage = "merge",
            members = report.members.len(),
            war_matches = report.matched_count(),
            fallbacks = report.fallback_count(),
            save_matches = report.save_matches,
            "merge complete"
        );

        report
    }
}

impl Default for WarRespectMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge with the default reconciler
pub fn merge(
    chain_rows: &[ChainStat],
    war_index: &MemberIndex<WarStat>,
    save_index: &MemberIndex<SaveStat>,
) -> Vec<MergedMember> {
    WarRespectMerger::new().merge(chain_rows, war_index, save_index)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_rows() -> Vec<ChainStat> {
        vec![
            ChainStat::new("JlambJLAMB[456]", 300.0, 40, 30),
            ChainStat::new("GhostGHOST[789]", 150.0, 25, 20),
            ChainStat::new("Newbie[1011]", 42.0, 5, 3),
        ]
    }

    #[test]
    fn test_merge_matches_war_and_saves() {
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("Jlamb[456]", 250.0), WarStat::new("Ghost[789]", 120.0)]);
        let saves = merger.save_index(vec![SaveStat::new("Jlamb", 2, 18.0)]);

        let report = merger.merge_with_report(&chain_rows(), &war, &saves);
        let members = &report.members;

        assert_eq!(members.len(), 3);
        assert_eq!(members[0].canonical_name, "Jlamb");
        assert_eq!(members[0].war_respect, 250.0);
        assert_eq!(members[0].war_hits, 30);
        assert_eq!(members[0].saves, 2);
        assert_eq!(members[0].save_score, 18.0);
        assert_eq!(members[0].member_id.as_deref(), Some("456"));
        assert!(members[0].save_matched);

        assert_eq!(members[1].war_respect, 120.0);
        assert_eq!(members[1].saves, 0);
        assert_eq!(members[1].save_score, 0.0);
        assert!(!members[1].save_matched);

        assert_eq!(report.exact_matches, 2);
        assert_eq!(report.save_matches, 1);
        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_merge_fallback_uses_chain_respect() {
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("Jlamb[456]", 250.0)]);
        let saves = MemberIndex::new();

        let report = merger.merge_with_report(&chain_rows(), &war, &saves);

        let newbie = &report.members[2];
        assert_eq!(newbie.war_respect, newbie.chain_respect);
        assert_eq!(newbie.war_respect, 42.0);
        assert!(newbie.used_fallback());
        assert_eq!(report.fallbacks, vec!["GhostGHOST[789]".to_string(), "Newbie[1011]".to_string()]);
    }

    #[test]
    fn test_merge_drops_war_rows_without_chain_row() {
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![
            WarStat::new("Jlamb[456]", 250.0),
            WarStat::new("Outsider[999]", 500.0),
        ]);
        let saves = merger.save_index(vec![SaveStat::new("Outsider", 9, 90.0)]);

        let members = merger.merge(&chain_rows(), &war, &saves);

        assert_eq!(members.len(), 3);
        assert!(members.iter().all(|m| m.canonical_name != "Outsider"));
        assert!(members.iter().all(|m| m.saves == 0));
    }

    #[test]
    fn test_merge_case_insensitive_match() {
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("JLAMB[456]", 250.0)]);
        let saves = merger.save_index(vec![SaveStat::new("jlamb", 1, 5.0)]);

        let report = merger.merge_with_report(&chain_rows()[..1], &war, &saves);
        let jlamb = &report.members[0];

        assert_eq!(jlamb.war_respect, 250.0);
        assert_eq!(jlamb.war_source, WarSource::Matched(MatchKind::CaseInsensitive));
        assert_eq!(jlamb.saves, 1);
        assert_eq!(report.case_insensitive_matches, 1);
    }

    #[test]
    fn test_merge_without_war_data_falls_back_everywhere() {
        let members = merge(&chain_rows(), &MemberIndex::new(), &MemberIndex::new());

        assert_eq!(members.len(), 3);
        for m in &members {
            assert!(m.used_fallback());
            assert_eq!(m.war_respect, m.chain_respect);
        }
    }

    #[test]
    fn test_merge_preserves_order_and_duplicates() {
        // Two chain rows for the same canonical name stay two rows
        let chain = vec![
            ChainStat::new("Jlamb[456]", 10.0, 1, 1),
            ChainStat::new("JlambJLAMB[456]", 20.0, 2, 2),
        ];
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("Jlamb", 7.0)]);

        let members = merger.merge(&chain, &war, &MemberIndex::new());

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member, "Jlamb[456]");
        assert_eq!(members[1].member, "JlambJLAMB[456]");
        assert!(members.iter().all(|m| m.war_respect == 7.0));
    }

    #[test]
    fn test_merge_long_tagged_chain_name_matches_plain_war_name() {
        let chain = vec![ChainStat::new("VeryLongNameHereVERYLONGNAMEHERE[77]", 50.0, 10, 8)];
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("VeryLongNameHere[77]", 999.0)]);

        let members = merger.merge(&chain, &war, &MemberIndex::new());

        assert_eq!(members[0].war_respect, 999.0);
        assert_eq!(members[0].war_source, WarSource::Matched(MatchKind::Exact));
        assert!(!members[0].used_fallback());
    }

    #[test]
    fn test_member_id_taken_from_war_row_when_chain_has_none() {
        let chain = vec![ChainStat::new("Jlamb", 10.0, 1, 1)];
        let merger = WarRespectMerger::new();
        let war = merger.war_index(vec![WarStat::new("Jlamb[456]", 7.0)]);

        let members = merger.merge(&chain, &war, &MemberIndex::new());
        assert_eq!(members[0].member_id.as_deref(), Some("456"));
    }
}
