// ⚔️ War Report - ranked war statistics from the game's report JSON
// Input is the `rankedwarreport` document exactly as the API returns it
// (downloaded beforehand, no network access here):
//
// {
//   "rankedwarreport": {
//     "war": { "start": 1735084800, "end": 1735171200 },
//     "factions": {
//       "40959": { "name": "EPIC Mafia", "score": 4210,
//                  "members": { "456": { "name": "Jlamb", "level": 74, "attacks": 30, "score": 250.5 } } },
//       "1234":  { ... }
//     }
//   }
// }

use crate::parser::{SourceParser, SourceRows, SourceType, WarStat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// RAW REPORT (serde model of the API document)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankedWarReport {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub war: WarWindow,

    #[serde(default)]
    pub factions: BTreeMap<String, WarFaction>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WarWindow {
    #[serde(default)]
    pub start: i64,

    #[serde(default)]
    pub end: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarFaction {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub members: BTreeMap<String, WarMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarMember {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub level: u32,

    #[serde(default)]
    pub attacks: u32,

    #[serde(default)]
    pub score: f64,
}

impl RankedWarReport {
    /// Accepts both `{"rankedwarreport": {...}}` and the bare report
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let json: serde_json::Value =
            serde_json::from_reader(reader).context("Failed to parse war report JSON")?;

        let body = match json.get("rankedwarreport") {
            Some(inner) => inner.clone(),
            None => json,
        };

        if body.get("factions").is_none() {
            anyhow::bail!("War report JSON has no 'factions' object");
        }

        serde_json::from_value(body).context("Unexpected war report structure")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read war report {}", path.display()))
    }
}

// ============================================================================
// COMPUTED STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWarStats {
    pub member_id: String,
    pub name: String,
    pub level: u32,
    pub attacks: u32,
    pub score: f64,
    pub avg_score_per_hit: f64,

    /// Score per minute of war (frequency × effectiveness)
    pub score_per_minute: f64,
    pub attacks_per_hour: f64,

    /// Score per level: who punches above their weight
    pub score_per_level: f64,

    /// Percent of the faction's attacks / score
    pub hit_share: f64,
    pub score_share: f64,

    /// Percent above (+) or below (-) the faction's average participant score
    pub vs_faction_avg: f64,
}

impl MemberWarStats {
    /// "Name[id]", the same shape the other exports use
    pub fn display_name(&self) -> String {
        format!("{}[{}]", self.name, self.member_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionStats {
    pub faction_id: String,
    pub name: String,
    pub total_attacks: u64,
    pub total_score: f64,
    pub hits_per_minute: f64,

    /// Mean score of members who attacked at least once
    pub avg_score: f64,
    pub score_std_dev: f64,

    pub total_members: usize,
    pub participating_members: usize,
    pub participation_rate: f64,

    /// std-dev / mean × 100; lower is more even
    pub consistency_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionSide {
    pub stats: FactionStats,

    /// Every member, highest score first
    pub members: Vec<MemberWarStats>,
}

impl FactionSide {
    /// Members with at least one attack
    pub fn participants(&self) -> impl Iterator<Item = &MemberWarStats> {
        self.members.iter().filter(|m| m.attacks > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarReport {
    pub war_id: Option<u64>,
    pub start: i64,
    pub end: i64,
    pub duration_hours: f64,
    pub ours: FactionSide,
    pub enemy: Option<FactionSide>,
}

impl WarReport {
    /// Split the report into our faction and the enemy (first other faction)
    pub fn from_report(report: &RankedWarReport, our_faction_id: &str) -> Result<Self> {
        let ours = report.factions.get(our_faction_id).ok_or_else(|| {
            anyhow::anyhow!(
                "Faction {} is not in this war (factions: {})",
                our_faction_id,
                report.factions.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?;

        let duration_hours = (report.war.end - report.war.start).max(0) as f64 / 3600.0;

        let enemy = report
            .factions
            .iter()
            .find(|(id, _)| id.as_str() != our_faction_id)
            .map(|(id, faction)| faction_side(id, faction, duration_hours));

        let war = WarReport {
            war_id: report.id,
            start: report.war.start,
            end: report.war.end,
            duration_hours,
            ours: faction_side(our_faction_id, ours, duration_hours),
            enemy,
        };

        info!(
            stage = "war",
            faction = %war.ours.stats.name,
            our_score = war.ours.stats.total_score,
            enemy_score = war.enemy.as_ref().map(|e| e.stats.total_score).unwrap_or(0.0),
            duration_hours,
            "war report processed"
        );

        Ok(war)
    }

    /// Our members as war-score rows for the merger
    pub fn war_stats(&self) -> Vec<WarStat> {
        self.ours
            .members
            .iter()
            .map(|m| WarStat {
                member: m.display_name(),
                score: m.score,
                attacks: Some(m.attacks),
                level: Some(m.level),
            })
            .collect()
    }

    pub fn start_tct(&self) -> String {
        format_tct(self.start)
    }

    pub fn end_tct(&self) -> String {
        format_tct(self.end)
    }

    pub fn duration_hms(&self) -> String {
        format_duration_hms(self.duration_hours)
    }

    pub fn summary(&self) -> String {
        let (enemy_name, enemy_score) = match &self.enemy {
            Some(e) => (e.stats.name.as_str(), e.stats.total_score),
            None => ("Enemy Faction", 0.0),
        };

        format!(
            "{} {:.0} vs {} {:.0} over {} ({} to {})",
            self.ours.stats.name,
            self.ours.stats.total_score,
            enemy_name,
            enemy_score,
            self.duration_hms(),
            self.start_tct(),
            self.end_tct()
        )
    }
}

fn faction_side(faction_id: &str, faction: &WarFaction, duration_hours: f64) -> FactionSide {
    let total_attacks: u64 = faction.members.values().map(|m| m.attacks as u64).sum();
    let total_score: f64 = faction.members.values().map(|m| m.score).sum();

    let participant_scores: Vec<f64> = faction
        .members
        .values()
        .filter(|m| m.attacks > 0)
        .map(|m| m.score)
        .collect();

    let avg_score = mean(&participant_scores);
    let score_std_dev = sample_std_dev(&participant_scores);
    let total_members = faction.members.len();
    let participating_members = participant_scores.len();

    let stats = FactionStats {
        faction_id: faction_id.to_string(),
        name: if faction.name.is_empty() {
            format!("ID_{}", faction_id)
        } else {
            faction.name.clone()
        },
        total_attacks,
        total_score,
        hits_per_minute: per_minute(total_attacks as f64, duration_hours),
        avg_score,
        score_std_dev,
        total_members,
        participating_members,
        participation_rate: ratio_percent(participating_members as f64, total_members as f64),
        consistency_rating: ratio_percent(score_std_dev, avg_score),
    };

    let mut members: Vec<MemberWarStats> = faction
        .members
        .iter()
        .map(|(id, m)| MemberWarStats {
            member_id: id.clone(),
            name: if m.name.is_empty() { format!("ID_{}", id) } else { m.name.clone() },
            level: m.level,
            attacks: m.attacks,
            score: m.score,
            avg_score_per_hit: if m.attacks > 0 {
                round2(m.score / m.attacks as f64)
            } else {
                0.0
            },
            score_per_minute: per_minute(m.score, duration_hours),
            attacks_per_hour: if duration_hours > 0.0 {
                m.attacks as f64 / duration_hours
            } else {
                0.0
            },
            score_per_level: if m.level > 0 { m.score / m.level as f64 } else { 0.0 },
            hit_share: ratio_percent(m.attacks as f64, total_attacks as f64),
            score_share: ratio_percent(m.score, total_score),
            vs_faction_avg: if avg_score > 0.0 {
                (m.score - avg_score) / avg_score * 100.0
            } else {
                0.0
            },
        })
        .collect();

    members.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(stage = "war", faction = %stats.name, members = total_members, participants = participating_members, "faction stats computed");

    FactionSide { stats, members }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation; 0 for fewer than two values
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn per_minute(value: f64, duration_hours: f64) -> f64 {
    if duration_hours > 0.0 {
        value / (duration_hours * 60.0)
    } else {
        0.0
    }
}

fn ratio_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TIME FORMATTING
// ============================================================================

/// Unix timestamp in game time (TCT is UTC)
pub fn format_tct(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "Unknown".to_string();
    }

    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S TCT").to_string(),
        None => "Unknown".to_string(),
    }
}

/// 25.5 -> "25:30:00"
pub fn format_duration_hms(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "00:00:00".to_string();
    }

    let total_seconds = (hours * 3600.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

// ============================================================================
// PARSER
// ============================================================================

/// Ranked-war JSON as a war-score source
pub struct WarReportParser {
    faction_id: Option<String>,
}

impl WarReportParser {
    pub fn new(faction_id: Option<String>) -> Self {
        WarReportParser { faction_id }
    }

    pub fn load(&self, file_path: &Path) -> Result<WarReport> {
        let faction_id = self.faction_id.as_deref().ok_or_else(|| {
            anyhow::anyhow!("A faction id is required to read {}", file_path.display())
        })?;

        let report = RankedWarReport::from_file(file_path)?;
        WarReport::from_report(&report, faction_id)
    }
}

impl SourceParser for WarReportParser {
    fn parse(&self, file_path: &Path) -> Result<SourceRows> {
        let war = self.load(file_path)?;
        Ok(SourceRows::War(war.war_stats()))
    }

    fn source_type(&self) -> SourceType {
        SourceType::WarReportJson
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_JSON: &str = r#"{
        "rankedwarreport": {
            "war": { "start": 1735084800, "end": 1735171200 },
            "factions": {
                "40959": {
                    "name": "EPIC Mafia",
                    "score": 400,
                    "members": {
                        "456": { "name": "Jlamb", "level": 50, "attacks": 30, "score": 300.0 },
                        "789": { "name": "Ghost", "level": 25, "attacks": 10, "score": 100.0 },
                        "111": { "name": "Idle", "level": 10, "attacks": 0, "score": 0.0 }
                    }
                },
                "1234": {
                    "name": "Rivals",
                    "score": 90,
                    "members": {
                        "5": { "name": "Foe", "level": 60, "attacks": 12, "score": 90.0 }
                    }
                }
            }
        }
    }"#;

    fn war() -> WarReport {
        let report = RankedWarReport::from_reader(REPORT_JSON.as_bytes()).unwrap();
        WarReport::from_report(&report, "40959").unwrap()
    }

    #[test]
    fn test_parse_report_and_split_factions() {
        let war = war();

        assert_eq!(war.duration_hours, 24.0);
        assert_eq!(war.ours.stats.name, "EPIC Mafia");
        assert_eq!(war.ours.stats.total_attacks, 40);
        assert_eq!(war.ours.stats.total_score, 400.0);

        let enemy = war.enemy.as_ref().unwrap();
        assert_eq!(enemy.stats.name, "Rivals");
        assert_eq!(enemy.stats.total_score, 90.0);
    }

    #[test]
    fn test_bare_report_is_accepted() {
        let bare = r#"{ "factions": { "1": { "name": "Solo", "members": {} } } }"#;
        let report = RankedWarReport::from_reader(bare.as_bytes()).unwrap();
        let war = WarReport::from_report(&report, "1").unwrap();

        assert!(war.enemy.is_none());
        assert_eq!(war.ours.stats.participation_rate, 0.0);
    }

    #[test]
    fn test_missing_factions_is_error() {
        assert!(RankedWarReport::from_reader(r#"{"error": {"code": 2}}"#.as_bytes()).is_err());
        assert!(RankedWarReport::from_reader("not json".as_bytes()).is_err());
    }

    #[test]
    fn test_unknown_faction_is_error() {
        let report = RankedWarReport::from_reader(REPORT_JSON.as_bytes()).unwrap();
        assert!(WarReport::from_report(&report, "999").is_err());
    }

    #[test]
    fn test_member_stats() {
        let war = war();
        let jlamb = &war.ours.members[0];

        assert_eq!(jlamb.name, "Jlamb");
        assert_eq!(jlamb.avg_score_per_hit, 10.0);
        assert_eq!(jlamb.score_per_level, 6.0);
        assert!((jlamb.attacks_per_hour - 1.25).abs() < 1e-9);
        assert!((jlamb.score_per_minute - 300.0 / 1440.0).abs() < 1e-9);
        assert_eq!(jlamb.hit_share, 75.0);
        assert_eq!(jlamb.score_share, 75.0);
        // Participant average is 200
        assert_eq!(jlamb.vs_faction_avg, 50.0);
    }

    #[test]
    fn test_faction_stats() {
        let stats = war().ours.stats;

        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.participating_members, 2);
        assert!((stats.participation_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.avg_score, 200.0);
        // sample std-dev of [300, 100]
        assert!((stats.score_std_dev - 141.4213562373095).abs() < 1e-9);
        assert!((stats.consistency_rating - 70.71067811865476).abs() < 1e-9);
    }

    #[test]
    fn test_participants_excludes_idle_members() {
        let war = war();
        let names: Vec<&str> = war.ours.participants().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Jlamb", "Ghost"]);
    }

    #[test]
    fn test_war_stats_rows() {
        let rows = war().war_stats();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].member, "Jlamb[456]");
        assert_eq!(rows[0].score, 300.0);
        assert_eq!(rows[0].attacks, Some(30));
        assert_eq!(rows[0].level, Some(50));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_tct(1735084800), "2024-12-25 00:00:00 TCT");
        assert_eq!(format_tct(0), "Unknown");
        assert_eq!(format_duration_hms(25.5), "25:30:00");
        assert_eq!(format_duration_hms(0.0), "00:00:00");
        assert!(war().summary().contains("EPIC Mafia 400 vs Rivals 90"));
    }

    #[test]
    fn test_parser_requires_faction_id() {
        let parser = WarReportParser::new(None);
        assert!(parser.parse(Path::new("war.json")).is_err());
    }
}
