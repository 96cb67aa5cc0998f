// 💰 Earnings Distributor - split the war payout between members
//
//   payout_pool = total_pool × (1 - tax_rate)
//   score_pool  = payout_pool × score_weight / (score_weight + hit_weight)
//   hit_pool    = payout_pool × hit_weight   / (score_weight + hit_weight)
//
//   mod_score   = Σ war_respect + Σ save_score
//   mod_hits    = Σ war_hits    + Σ saves
//
//   earnings_i  = (war_respect_i + save_score_i) × score_pool / mod_score
//               + (war_hits_i + saves_i)         × hit_pool   / mod_hits
//
// Saves count in both pools. Because each member's share of each pool is
// their part of that pool's denominator, Σ earnings_i == payout_pool.

use crate::merge::MergedMember;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Save response multiplier shown on the report (120% of the average hit)
pub const SAVE_RESP_MULTIPLIER: f64 = 1.2;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutParams {
    /// Total pool before tax (the war caches)
    pub total_pool: f64,

    /// Fraction kept by the faction (0.05 = 5%)
    pub tax_rate: f64,

    pub score_weight: f64,
    pub hit_weight: f64,
}

impl PayoutParams {
    pub fn new(total_pool: f64, tax_rate: f64, score_weight: f64, hit_weight: f64) -> Self {
        PayoutParams {
            total_pool,
            tax_rate,
            score_weight,
            hit_weight,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.score_weight + self.hit_weight
    }

    pub fn tax_amount(&self) -> f64 {
        self.total_pool * self.tax_rate
    }

    pub fn payout_pool(&self) -> f64 {
        self.total_pool - self.tax_amount()
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Pool-level figures for the report header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub total_pool: f64,
    pub tax_amount: f64,
    pub payout_pool: f64,
    pub total_weight: f64,
    pub score_pool: f64,
    pub hit_pool: f64,

    pub total_war_respect: f64,
    pub total_war_hits: u64,
    pub total_saves: u64,
    pub total_save_score: f64,

    pub mod_score: f64,
    pub mod_hits: u64,
    pub avg_score_per_hit: f64,
    pub save_resp: f64,

    pub pay_rate_per_score: f64,
    pub pay_rate_per_hit: f64,

    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsRow {
    pub member: String,
    pub canonical_name: String,
    pub member_id: Option<String>,

    pub war_respect: f64,
    pub war_hits: u32,
    pub saves: u32,
    pub save_score: f64,

    /// war_respect + save_score
    pub total_score: f64,

    /// Percent of mod_score
    pub score_share: f64,

    /// Percent of mod_hits (war hits + saves)
    pub hit_share: f64,

    pub score_earnings: f64,

    /// (war_hits + saves) × pay_rate_per_hit. Saves are credited at the hit
    /// rate because they are part of mod_hits; paying only war_hits would
    /// leave Σ saves × pay_rate_per_hit of the hit pool unpaid.
    pub hit_earnings: f64,
    pub earnings: f64,

    /// Percent of the payout pool
    pub total_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsReport {
    pub params: PayoutParams,
    pub summary: PoolSummary,
    pub rows: Vec<EarningsRow>,
}

impl EarningsReport {
    pub fn total_earnings(&self) -> f64 {
        self.rows.iter().map(|r| r.earnings).sum()
    }

    /// Rows ordered by earnings, highest first
    pub fn sorted_by_earnings(&self) -> Vec<&EarningsRow> {
        let mut rows: Vec<&EarningsRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.earnings.total_cmp(&a.earnings));
        rows
    }

    /// Payout not handed out (non-zero only when a denominator was zero)
    pub fn undistributed(&self) -> f64 {
        self.summary.payout_pool - self.total_earnings()
    }
}

// ============================================================================
// DISTRIBUTOR
// ============================================================================

pub struct EarningsDistributor {
    params: PayoutParams,
}

impl EarningsDistributor {
    pub fn new(params: PayoutParams) -> Self {
        EarningsDistributor { params }
    }

    pub fn params(&self) -> &PayoutParams {
        &self.params
    }

    /// Compute per-member payouts. Never fails: zero denominators give a
    /// zero rate instead of an error.
    pub fn distribute(&self, members: &[MergedMember]) -> EarningsReport {
        let params = self.params;
        let tax_amount = params.tax_amount();
        let payout_pool = params.payout_pool();
        let total_weight = params.total_weight();

        let (score_pool, hit_pool) = if total_weight > 0.0 {
            (
                payout_pool * params.score_weight / total_weight,
                payout_pool * params.hit_weight / total_weight,
            )
        } else {
            warn!(stage = "distribute", score_weight = params.score_weight, hit_weight = params.hit_weight, "total weight is zero, nothing distributed");
            (0.0, 0.0)
        };

        let total_war_respect: f64 = members.iter().map(|m| m.war_respect).sum();
        let total_save_score: f64 = members.iter().map(|m| m.save_score).sum();
        let total_war_hits: u64 = members.iter().map(|m| m.war_hits as u64).sum();
        let total_saves: u64 = members.iter().map(|m| m.saves as u64).sum();

        let mod_score = total_war_respect + total_save_score;
        let mod_hits = total_war_hits + total_saves;

        let pay_rate_per_score = if mod_score != 0.0 { score_pool / mod_score } else { 0.0 };
        let pay_rate_per_hit = if mod_hits > 0 { hit_pool / mod_hits as f64 } else { 0.0 };

        if mod_score == 0.0 {
            warn!(stage = "distribute", "no score across members, score rate is zero");
        }
        if mod_hits == 0 {
            warn!(stage = "distribute", "no hits across members, hit rate is zero");
        }

        let avg_score_per_hit = if mod_hits > 0 { mod_score / mod_hits as f64 } else { 0.0 };

        let rows: Vec<EarningsRow> = members
            .iter()
            .map(|m| {
                let total_score = m.war_respect + m.save_score;
                let credited_hits = m.war_hits as f64 + m.saves as f64;

                let score_earnings = total_score * pay_rate_per_score;
                let hit_earnings = credited_hits * pay_rate_per_hit;
                let earnings = score_earnings + hit_earnings;

                debug!(
                    stage = "distribute",
                    member = %m.canonical_name,
                    total_score,
                    credited_hits,
                    earnings,
                    "member earnings"
                );

                EarningsRow {
                    member: m.member.clone(),
                    canonical_name: m.canonical_name.clone(),
                    member_id: m.member_id.clone(),
                    war_respect: m.war_respect,
                    war_hits: m.war_hits,
                    saves: m.saves,
                    save_score: m.save_score,
                    total_score,
                    score_share: percent(total_score, mod_score),
                    hit_share: percent(credited_hits, mod_hits as f64),
                    score_earnings,
                    hit_earnings,
                    earnings,
                    total_share: percent(earnings, payout_pool),
                }
            })
            .collect();

        let summary = PoolSummary {
            total_pool: params.total_pool,
            tax_amount,
            payout_pool,
            total_weight,
            score_pool,
            hit_pool,
            total_war_respect,
            total_war_hits,
            total_saves,
            total_save_score,
            mod_score,
            mod_hits,
            avg_score_per_hit,
            save_resp: avg_score_per_hit * SAVE_RESP_MULTIPLIER,
            pay_rate_per_score,
            pay_rate_per_hit,
            member_count: rows.len(),
        };

        info!(
            stage = "distribute",
            members = summary.member_count,
            payout_pool,
            mod_score,
            mod_hits,
            pay_rate_per_score,
            pay_rate_per_hit,
            "earnings distributed"
        );

        EarningsReport {
            params,
            summary,
            rows,
        }
    }
}

/// Distribute with explicit parameters
pub fn distribute(
    members: &[MergedMember],
    total_pool: f64,
    tax_rate: f64,
    score_weight: f64,
    hit_weight: f64,
) -> EarningsReport {
    EarningsDistributor::new(PayoutParams::new(total_pool, tax_rate, score_weight, hit_weight))
        .distribute(members)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole != 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::WarSource;
    use crate::names::MatchKind;

    fn member(name: &str, war_respect: f64, war_hits: u32, saves: u32, save_score: f64) -> MergedMember {
        MergedMember {
            member: format!("{}[1]", name),
            canonical_name: name.to_string(),
            member_id: Some("1".to_string()),
            chain_respect: war_respect,
            war_respect,
            war_hits,
            saves,
            save_score,
            war_source: WarSource::Matched(MatchKind::Exact),
            save_matched: saves > 0,
        }
    }

    fn three_members() -> Vec<MergedMember> {
        vec![
            member("Jlamb", 300.0, 30, 2, 20.0),
            member("Ghost", 150.0, 20, 0, 0.0),
            member("Newbie", 50.0, 5, 1, 8.5),
        ]
    }

    #[test]
    fn test_earnings_sum_to_payout_pool() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);

        assert!((report.summary.payout_pool - 900.0).abs() < 1e-9);
        assert!((report.total_earnings() - 900.0).abs() < 1e-6);
        assert!(report.undistributed().abs() < 1e-6);

        println!("✅ Σ earnings = {:.6}", report.total_earnings());
    }

    #[test]
    fn test_pool_split_uses_computed_total_weight() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);
        let s = &report.summary;

        assert_eq!(s.total_weight, 90.0);
        assert!((s.tax_amount - 100.0).abs() < 1e-9);
        assert!((s.score_pool - 600.0).abs() < 1e-9);
        assert!((s.hit_pool - 300.0).abs() < 1e-9);

        let report = distribute(&three_members(), 1000.0, 0.0, 1.0, 1.0);
        assert_eq!(report.summary.total_weight, 2.0);
        assert!((report.summary.score_pool - 500.0).abs() < 1e-9);
        assert!((report.total_earnings() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_mod_values_pool_saves_into_both_denominators() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);
        let s = &report.summary;

        assert!((s.mod_score - 528.5).abs() < 1e-9); // 500 respect + 28.5 save score
        assert_eq!(s.mod_hits, 58); // 55 war hits + 3 saves
        assert_eq!(s.total_saves, 3);
        assert!((s.pay_rate_per_score - 600.0 / 528.5).abs() < 1e-12);
        assert!((s.pay_rate_per_hit - 300.0 / 58.0).abs() < 1e-12);
        assert!((s.save_resp - s.avg_score_per_hit * 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_member_earnings_formula() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);
        let s = &report.summary;
        let jlamb = &report.rows[0];

        assert_eq!(jlamb.total_score, 320.0);
        assert!((jlamb.score_earnings - 320.0 * s.pay_rate_per_score).abs() < 1e-9);
        assert!((jlamb.hit_earnings - 32.0 * s.pay_rate_per_hit).abs() < 1e-9);
        assert!((jlamb.earnings - (jlamb.score_earnings + jlamb.hit_earnings)).abs() < 1e-9);
        assert!((jlamb.hit_share - 32.0 / 58.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_saves_credited_at_hit_rate() {
        // 2 war hits + 1 save against 1 war hit: 3 of 4 credited hits
        let members = vec![member("Alpha", 10.0, 2, 1, 0.0), member("Bravo", 10.0, 1, 0, 0.0)];
        let report = distribute(&members, 1200.0, 0.0, 1.0, 2.0);

        assert!((report.summary.hit_pool - 800.0).abs() < 1e-9);
        assert!((report.rows[0].hit_earnings - 600.0).abs() < 1e-9);
        assert!((report.rows[1].hit_earnings - 200.0).abs() < 1e-9);
        assert!((report.total_earnings() - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);

        let score: f64 = report.rows.iter().map(|r| r.score_share).sum();
        let hits: f64 = report.rows.iter().map(|r| r.hit_share).sum();
        let total: f64 = report.rows.iter().map(|r| r.total_share).sum();

        assert!((score - 100.0).abs() < 1e-9);
        assert!((hits - 100.0).abs() < 1e-9);
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_hits_gives_zero_hit_rate() {
        let members = vec![member("Jlamb", 300.0, 0, 0, 0.0), member("Ghost", 100.0, 0, 0, 0.0)];
        let report = distribute(&members, 1000.0, 0.1, 60.0, 30.0);

        assert_eq!(report.summary.pay_rate_per_hit, 0.0);
        assert_eq!(report.summary.avg_score_per_hit, 0.0);
        assert!(report.rows.iter().all(|r| r.hit_earnings == 0.0 && r.hit_share == 0.0));
        // Only the score pool is handed out
        assert!((report.total_earnings() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_score_and_no_members() {
        let members = vec![member("Jlamb", 0.0, 10, 0, 0.0)];
        let report = distribute(&members, 1000.0, 0.0, 60.0, 30.0);
        assert_eq!(report.summary.pay_rate_per_score, 0.0);
        assert!(report.rows[0].earnings > 0.0);

        let empty = distribute(&[], 1000.0, 0.1, 60.0, 30.0);
        assert!(empty.rows.is_empty());
        assert_eq!(empty.summary.mod_hits, 0);
        assert_eq!(empty.total_earnings(), 0.0);
    }

    #[test]
    fn test_zero_total_weight_distributes_nothing() {
        let report = distribute(&three_members(), 1000.0, 0.1, 0.0, 0.0);

        assert_eq!(report.summary.score_pool, 0.0);
        assert_eq!(report.summary.hit_pool, 0.0);
        assert_eq!(report.total_earnings(), 0.0);
    }

    #[test]
    fn test_sorted_by_earnings() {
        let report = distribute(&three_members(), 1000.0, 0.1, 60.0, 30.0);
        let sorted = report.sorted_by_earnings();

        assert_eq!(sorted[0].canonical_name, "Jlamb");
        assert_eq!(sorted[2].canonical_name, "Newbie");
        assert!(sorted.windows(2).all(|w| w[0].earnings >= w[1].earnings));
    }
}
