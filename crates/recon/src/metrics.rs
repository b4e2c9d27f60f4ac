use std::collections::BTreeMap;

use crate::model::{month_key, MatchLevel, MatchRecord, MonthMetrics, PassMetrics};

/// Compute per-pass statistics from match records.
///
/// Only financial levels contribute to `total_matched_cents`; a date-only
/// pairing is counted as a fallback but never as money accounted for.
pub fn compute_metrics(records: &[MatchRecord], invalid_records: usize) -> PassMetrics {
    let mut matched = 0;
    let mut batched = 0;
    let mut fallback_only = 0;
    let mut unmatched = 0;
    let mut total_claimed_cents = 0i64;
    let mut total_matched_cents = 0i64;
    let mut by_month: BTreeMap<String, MonthMetrics> = BTreeMap::new();

    for r in records {
        let claimed = r.candidate_cents.unwrap_or(0);
        let credited = if r.is_financial() {
            r.matched_cents.unwrap_or(0)
        } else {
            0
        };

        match r.level {
            MatchLevel::ExactKey | MatchLevel::DateAmountExact | MatchLevel::DateAmountTolerance => {
                matched += 1
            }
            MatchLevel::Batch => batched += 1,
            MatchLevel::DateOnly => fallback_only += 1,
            MatchLevel::Unmatched => unmatched += 1,
        }
        total_claimed_cents += claimed;
        total_matched_cents += credited;

        let month = by_month.entry(month_key(r.candidate_date)).or_default();
        month.candidates += 1;
        if r.is_financial() {
            month.matched += 1;
        }
        month.claimed_cents += claimed;
        month.matched_cents += credited;
        month.gap_cents = month.claimed_cents - month.matched_cents;
    }

    let gap_cents = total_claimed_cents - total_matched_cents;
    PassMetrics {
        candidates: records.len(),
        matched,
        batched,
        fallback_only,
        unmatched,
        invalid_records,
        total_claimed_cents,
        total_matched_cents,
        gap_cents,
        gap_pct: gap_pct(gap_cents, total_claimed_cents),
        by_month,
    }
}

/// `None` when nothing was claimed; the ratio is undefined there.
pub fn gap_pct(gap_cents: i64, claimed_cents: i64) -> Option<f64> {
    if claimed_cents == 0 {
        None
    } else {
        Some(gap_cents as f64 / claimed_cents as f64 * 100.0)
    }
}
