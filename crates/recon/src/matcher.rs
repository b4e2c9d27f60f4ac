use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;

use crate::model::{
    BankTransaction, ClaimAggregate, ClaimSide, MatchLevel, MatchRecord, PassKind, PayoutClaim,
    ReceiptEntry, StrategyKind, Trip,
};
use crate::pool::Pool;

// ---------------------------------------------------------------------------
// Matchable
// ---------------------------------------------------------------------------

/// What the matcher needs to see of a record, on either side of a pass.
pub trait Matchable {
    fn record_id(&self) -> &str;
    /// Foreign key on candidates, own key on targets.
    fn key(&self) -> Option<&str>;
    fn date(&self) -> NaiveDate;
    /// Amount compared for matching, in cents.
    fn amount_cents(&self) -> Option<i64>;
    /// Normalized secondary field (e.g. pickup address).
    fn secondary(&self) -> Option<&str> {
        None
    }
    /// Which side of a claim the amount stands for, when it is one.
    fn claim_side(&self) -> Option<ClaimSide> {
        None
    }
}

impl Matchable for Trip {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn key(&self) -> Option<&str> {
        Some(&self.id)
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount_cents(&self) -> Option<i64> {
        None
    }
}

impl Matchable for ClaimAggregate {
    fn record_id(&self) -> &str {
        &self.key
    }
    fn key(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount_cents(&self) -> Option<i64> {
        Some(self.net_claimed_cents())
    }
}

impl Matchable for PayoutClaim {
    fn record_id(&self) -> &str {
        &self.key
    }
    fn key(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount_cents(&self) -> Option<i64> {
        Some(self.amount_cents)
    }
    fn claim_side(&self) -> Option<ClaimSide> {
        Some(self.side)
    }
}

impl Matchable for BankTransaction {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn key(&self) -> Option<&str> {
        None
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    /// Magnitude: deposits and debits are both compared as positive amounts.
    fn amount_cents(&self) -> Option<i64> {
        Some(self.amount_cents.abs())
    }
    fn secondary(&self) -> Option<&str> {
        self.pickup_address.as_deref()
    }
}

impl Matchable for ReceiptEntry {
    fn record_id(&self) -> &str {
        &self.id
    }
    fn key(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn amount_cents(&self) -> Option<i64> {
        Some(self.amount_cents())
    }
    fn secondary(&self) -> Option<&str> {
        if self.pickup_address.is_empty() {
            None
        } else {
            Some(&self.pickup_address)
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One matching rule. A pass evaluates its strategies in list order and the
/// first that finds a live target wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Candidate key equals target key.
    ExactKey,
    /// Same day, equal cents, equal secondary field.
    DateAmountSecondaryExact,
    /// Same day, equal cents.
    DateAmountExact,
    /// Within ±`window_days` and ±`tolerance_cents`.
    DateAmountTolerance { window_days: u32, tolerance_cents: i64 },
    /// Same day only. Never consumes and never counts as money matched.
    DateOnly,
}

/// A target chosen by a strategy, before it is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub target: usize,
    pub level: MatchLevel,
    pub strategy: StrategyKind,
    pub delta_cents: Option<i64>,
    pub date_offset_days: i64,
}

impl Strategy {
    pub fn level(self) -> MatchLevel {
        match self {
            Self::ExactKey => MatchLevel::ExactKey,
            Self::DateAmountSecondaryExact | Self::DateAmountExact => MatchLevel::DateAmountExact,
            Self::DateAmountTolerance { .. } => MatchLevel::DateAmountTolerance,
            Self::DateOnly => MatchLevel::DateOnly,
        }
    }

    pub fn kind(self) -> StrategyKind {
        match self {
            Self::ExactKey => StrategyKind::ExactKey,
            Self::DateAmountSecondaryExact => StrategyKind::DateAmountSecondaryExact,
            Self::DateAmountExact => StrategyKind::DateAmountExact,
            Self::DateAmountTolerance { .. } => StrategyKind::DateAmountTolerance,
            Self::DateOnly => StrategyKind::DateOnly,
        }
    }

    /// Whether a hit removes the target from the pool.
    pub fn consumes(self) -> bool {
        !matches!(self, Self::DateOnly)
    }

    fn accepts<C: Matchable, T: Matchable>(self, candidate: &C, target: &T) -> bool {
        let same_day = candidate.date() == target.date();
        let amounts = candidate.amount_cents().zip(target.amount_cents());
        match self {
            Self::ExactKey => matches!(
                (candidate.key(), target.key()),
                (Some(a), Some(b)) if a == b
            ),
            Self::DateAmountSecondaryExact => {
                same_day
                    && matches!(amounts, Some((a, b)) if a == b)
                    && matches!(
                        (candidate.secondary(), target.secondary()),
                        (Some(a), Some(b)) if a == b
                    )
            }
            Self::DateAmountExact => same_day && matches!(amounts, Some((a, b)) if a == b),
            Self::DateAmountTolerance {
                window_days,
                tolerance_cents,
            } => {
                let offset = (candidate.date() - target.date()).num_days();
                offset.unsigned_abs() <= u64::from(window_days)
                    && matches!(amounts, Some((a, b)) if (a - b).abs() <= tolerance_cents)
            }
            Self::DateOnly => same_day,
        }
    }

    /// Best live target for `candidate`, without committing it.
    ///
    /// Ties go to the smallest absolute amount delta, then the earliest target
    /// date, then pool order. `DateOnly` ignores amounts and takes the first
    /// target of the day.
    pub fn evaluate<C: Matchable, T: Matchable>(
        self,
        candidate: &C,
        pool: &Pool<'_, T>,
    ) -> Option<Hit> {
        let mut best: Option<((i64, NaiveDate, usize), Hit)> = None;

        for (idx, target) in pool.live() {
            if !self.accepts(candidate, target) {
                continue;
            }
            let delta_cents = candidate
                .amount_cents()
                .zip(target.amount_cents())
                .map(|(a, b)| a - b);
            let rank_delta = match self {
                Self::DateOnly => 0,
                _ => delta_cents.map(i64::abs).unwrap_or(0),
            };
            let rank = (rank_delta, target.date(), idx);
            if best.as_ref().is_some_and(|(r, _)| *r <= rank) {
                continue;
            }
            best = Some((
                rank,
                Hit {
                    target: idx,
                    level: self.level(),
                    strategy: self.kind(),
                    delta_cents,
                    date_offset_days: (candidate.date() - target.date()).num_days(),
                },
            ));
        }

        best.map(|(_, hit)| hit)
    }
}

// ---------------------------------------------------------------------------
// Driving a pass
// ---------------------------------------------------------------------------

fn record_for<C: Matchable, T: Matchable>(
    pass: PassKind,
    candidate: &C,
    pool: &Pool<'_, T>,
    hit: &Hit,
) -> MatchRecord {
    let target = pool.get(hit.target);
    let candidate_cents = candidate.amount_cents();
    MatchRecord {
        pass,
        candidate_id: candidate.record_id().to_string(),
        candidate_date: candidate.date(),
        candidate_cents,
        target_id: Some(target.record_id().to_string()),
        target_date: Some(target.date()),
        level: hit.level,
        strategy: Some(hit.strategy),
        matched_cents: if hit.level.is_financial() {
            candidate_cents.or(target.amount_cents())
        } else {
            None
        },
        delta_cents: hit.delta_cents,
        date_offset_days: Some(hit.date_offset_days),
        batch_id: None,
        side: candidate.claim_side(),
    }
}

fn unmatched_record<C: Matchable>(pass: PassKind, candidate: &C) -> MatchRecord {
    MatchRecord {
        side: candidate.claim_side(),
        ..MatchRecord::unmatched(
            pass,
            candidate.record_id(),
            candidate.date(),
            candidate.amount_cents(),
        )
    }
}

/// Match a single candidate, consuming the target on a financial hit.
pub fn find_match<C: Matchable, T: Matchable>(
    candidate: &C,
    pool: &mut Pool<'_, T>,
    strategies: &[Strategy],
    pass: PassKind,
) -> MatchRecord {
    for strategy in strategies {
        if let Some(hit) = strategy.evaluate(candidate, pool) {
            if strategy.consumes() {
                pool.take(hit.target);
            }
            return record_for(pass, candidate, pool, &hit);
        }
    }
    unmatched_record(pass, candidate)
}

/// Match every candidate, one strategy at a time.
///
/// Within a strategy each unmatched candidate proposes its best live target.
/// A target wanted by several candidates goes to the smallest absolute delta,
/// then the earliest candidate date, then input order; the others propose
/// again against what is left until no proposal remains. Records come back
/// in candidate order, and candidates still unresolved after the last
/// strategy come back `Unmatched`. Over a shared pool there is no contention:
/// every candidate takes its best target.
pub fn match_all<C: Matchable, T: Matchable>(
    candidates: &[C],
    pool: &mut Pool<'_, T>,
    strategies: &[Strategy],
    pass: PassKind,
) -> Vec<MatchRecord> {
    let mut outcome: Vec<Option<MatchRecord>> = vec![None; candidates.len()];

    for strategy in strategies {
        if !strategy.consumes() || pool.is_shared() {
            for (ci, candidate) in candidates.iter().enumerate() {
                if outcome[ci].is_some() {
                    continue;
                }
                if let Some(hit) = strategy.evaluate(candidate, pool) {
                    outcome[ci] = Some(record_for(pass, candidate, pool, &hit));
                }
            }
            continue;
        }

        let mut rounds = 0usize;
        loop {
            let mut proposals: BTreeMap<usize, ((i64, NaiveDate, usize), Hit)> = BTreeMap::new();
            for (ci, candidate) in candidates.iter().enumerate() {
                if outcome[ci].is_some() {
                    continue;
                }
                let Some(hit) = strategy.evaluate(candidate, pool) else {
                    continue;
                };
                let rank = (
                    hit.delta_cents.map(i64::abs).unwrap_or(0),
                    candidate.date(),
                    ci,
                );
                let better = proposals
                    .get(&hit.target)
                    .map_or(true, |(existing, _)| rank < *existing);
                if better {
                    proposals.insert(hit.target, (rank, hit));
                }
            }
            if proposals.is_empty() {
                break;
            }
            rounds += 1;
            for (target, ((_, _, ci), hit)) in proposals {
                pool.take(target);
                outcome[ci] = Some(record_for(pass, &candidates[ci], pool, &hit));
            }
        }
        debug!(
            "{pass}: strategy {:?} settled after {rounds} round(s), {} target(s) left",
            strategy.kind(),
            pool.remaining()
        );
    }

    outcome
        .into_iter()
        .zip(candidates)
        .map(|(record, candidate)| record.unwrap_or_else(|| unmatched_record(pass, candidate)))
        .collect()
}
