// ⛓️ Chain Summary - faction-wide totals for the chain report page

use crate::parser::{ChainReport, ChainStat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total_members: usize,
    pub total_respect: f64,
    pub total_attacks: u64,

    /// Best single chain hit across members
    pub best_hit: f64,

    /// Average respect per member
    pub avg_respect: f64,

    pub war_attacks: u64,
    pub outside_attacks: u64,

    /// Percent of all attacks that were leaves / hospitalizations
    pub leave_rate: f64,
    pub hosp_rate: f64,
}

impl ChainSummary {
    pub fn from_rows(rows: &[ChainStat]) -> Self {
        let total_members = rows.len();
        let total_respect: f64 = rows.iter().map(|r| r.respect).sum();
        let total_attacks: u64 = rows.iter().map(|r| r.attacks as u64).sum();
        let total_leave: u64 = rows.iter().map(|r| r.leave as u64).sum();
        let total_hosp: u64 = rows.iter().map(|r| r.hosp as u64).sum();
        let war_attacks: u64 = rows.iter().map(|r| r.war as u64).sum();
        let outside_attacks: u64 = rows.iter().map(|r| r.outside() as u64).sum();
        let best_hit = rows.iter().map(|r| r.best).fold(0.0, f64::max);

        let avg_respect = if total_members > 0 {
            total_respect / total_members as f64
        } else {
            0.0
        };

        let rate = |count: u64| {
            if total_attacks > 0 {
                count as f64 / total_attacks as f64 * 100.0
            } else {
                0.0
            }
        };

        ChainSummary {
            total_members,
            total_respect,
            total_attacks,
            best_hit,
            avg_respect,
            war_attacks,
            outside_attacks,
            leave_rate: rate(total_leave),
            hosp_rate: rate(total_hosp),
        }
    }

    pub fn from_report(report: &ChainReport) -> Self {
        Self::from_rows(&report.rows)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} members, {:.2} respect over {} attacks ({} war, {} outside), leave {:.1}%, hosp {:.1}%",
            self.total_members,
            self.total_respect,
            self.total_attacks,
            self.war_attacks,
            self.outside_attacks,
            self.leave_rate,
            self.hosp_rate
        )
    }
}

/// Chain rows ordered by respect, highest first
pub fn rank_by_respect(rows: &[ChainStat]) -> Vec<&ChainStat> {
    let mut ranked: Vec<&ChainStat> = rows.iter().collect();
    ranked.sort_by(|a, b| b.respect.total_cmp(&a.respect));
    ranked
}
