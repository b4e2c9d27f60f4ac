use log::{debug, info, warn};

use crate::aggregate::aggregate_claims;
use crate::batch::{resolve_batch, BatchParams};
use crate::classify::{classify_all, ReimbursementIndex};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::matcher::{find_match, match_all, Strategy};
use crate::metrics::compute_metrics;
use crate::model::{
    BankTransaction, BatchMatch, ClaimAggregate, ClaimSide, InvalidRecord, MatchLevel,
    MatchRecord, PassKind, PassResult, PassStatus, PayoutClaim, ReceiptEntry, ReconInput,
    ReconMeta, ReconReport, ReconResult, SourceKind, StrategyKind, Trip, TripStatus,
};
use crate::normalize::{normalize_bank, normalize_claims, normalize_receipts, normalize_trips};
use crate::pool::Pool;
use crate::report::{category_summary, daily_reconciliation, monthly_summary, refund_lag};
use crate::status::{audit_trips, status_counts, AuditInputs};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Raw and valid row counts for one source.
#[derive(Debug, Clone, Copy, Default)]
struct SourceCounts {
    raw: usize,
    valid: usize,
    invalid: usize,
}

/// Immutable, normalized view of all four sources. Every pass builds its own
/// pool from these slices, so no pass sees another pass's consumption.
struct Snapshot {
    trips: Vec<Trip>,
    completed_trips: Vec<Trip>,
    aggregates: Vec<ClaimAggregate>,
    /// Non-zero refund and earnings sides of every aggregate, in aggregate
    /// order. These are what payout deposits settle.
    payable: Vec<PayoutClaim>,
    bank: Vec<BankTransaction>,
    /// Deposits that pass the payout filter.
    deposits: Vec<BankTransaction>,
    debits: Vec<BankTransaction>,
    receipts: Vec<ReceiptEntry>,
    invalid: Vec<InvalidRecord>,
    trips_n: SourceCounts,
    payments_n: SourceCounts,
    bank_n: SourceCounts,
    receipts_n: SourceCounts,
}

impl Snapshot {
    fn build(config: &ReconConfig, input: &ReconInput) -> Self {
        let reference = config.dates.reference;
        let trips = normalize_trips(&input.trips, reference);
        let claims = normalize_claims(&input.payments, reference);
        let bank = normalize_bank(&input.bank, reference);
        let receipts = normalize_receipts(&input.receipts, reference);

        let counts = |raw: usize, valid: usize, invalid: usize| SourceCounts {
            raw,
            valid,
            invalid,
        };
        let trips_n = counts(input.trips.len(), trips.valid.len(), trips.invalid.len());
        let payments_n = counts(input.payments.len(), claims.valid.len(), claims.invalid.len());
        let bank_n = counts(input.bank.len(), bank.valid.len(), bank.invalid.len());
        let receipts_n = counts(input.receipts.len(), receipts.valid.len(), receipts.invalid.len());

        let mut invalid = trips.invalid;
        invalid.extend(claims.invalid);
        invalid.extend(bank.invalid);
        invalid.extend(receipts.invalid);

        let mut trip_list = trips.valid;
        trip_list.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then_with(|| a.id.cmp(&b.id)));
        let completed_trips: Vec<Trip> = trip_list
            .iter()
            .filter(|t| t.status == TripStatus::Completed)
            .cloned()
            .collect();

        let aggregates = aggregate_claims(&claims.valid);
        let payable: Vec<PayoutClaim> = aggregates
            .iter()
            .flat_map(ClaimAggregate::payout_claims)
            .collect();

        let mut bank_list = bank.valid;
        bank_list.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        let deposits: Vec<BankTransaction> = bank_list
            .iter()
            .filter(|t| t.is_deposit() && config.bank.is_payout(&t.description))
            .cloned()
            .collect();
        let debits: Vec<BankTransaction> =
            bank_list.iter().filter(|t| t.is_debit()).cloned().collect();

        let mut receipt_list = receipts.valid;
        receipt_list.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        debug!(
            "snapshot: {} trip(s) ({} completed), {} claim aggregate(s), {} bank txn(s) ({} payout deposit(s), {} debit(s)), {} receipt(s), {} invalid",
            trip_list.len(),
            completed_trips.len(),
            aggregates.len(),
            bank_list.len(),
            deposits.len(),
            debits.len(),
            receipt_list.len(),
            invalid.len()
        );

        Self {
            trips: trip_list,
            completed_trips,
            aggregates,
            payable,
            bank: bank_list,
            deposits,
            debits,
            receipts: receipt_list,
            invalid,
            trips_n,
            payments_n,
            bank_n,
            receipts_n,
        }
    }

    fn counts(&self, source: SourceKind) -> SourceCounts {
        match source {
            SourceKind::Trips => self.trips_n,
            SourceKind::Payments => self.payments_n,
            SourceKind::Bank => self.bank_n,
            SourceKind::Receipts => self.receipts_n,
        }
    }

    /// Unavailable (no rows at all) outranks no-data (rows, none valid);
    /// the candidate side is reported before the target side.
    fn pass_status(&self, pass: PassKind) -> PassStatus {
        let (candidate, target) = pass.sources();
        for source in [candidate, target] {
            if self.counts(source).raw == 0 {
                return PassStatus::SourceUnavailable { source };
            }
        }
        for source in [candidate, target] {
            if self.counts(source).valid == 0 {
                return PassStatus::NoData { source };
            }
        }
        PassStatus::Complete
    }

    fn invalid_for(&self, pass: PassKind) -> usize {
        let (candidate, target) = pass.sources();
        self.counts(candidate).invalid + self.counts(target).invalid
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run every reconciliation pass, then classify spending and build reports.
///
/// Malformed rows never abort the run; only an invalid configuration does.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let snap = Snapshot::build(config, input);

    let trip_payment = run_trip_payment(&snap);
    let payment_bank = run_payment_bank(&snap, config);
    let receipt_bank = run_receipt_bank(&snap, config);
    let receipt_trip = run_receipt_trip(&snap);

    let reimbursements =
        ReimbursementIndex::from_passes(&receipt_bank.records, &payment_bank.records);
    let classified = classify_all(&snap.bank, &reimbursements, &config.categories);

    let trips = audit_trips(&AuditInputs {
        trips: &snap.trips,
        aggregates: &snap.aggregates,
        receipts: &snap.receipts,
        deposits: &snap.deposits,
        trip_payment: &trip_payment.records,
        receipt_trip: &receipt_trip.records,
        lookahead_days: config.windows.trip_match,
    });

    let report = ReconReport {
        monthly: monthly_summary(&snap.aggregates, &classified, &trips),
        categories: category_summary(&classified),
        daily: daily_reconciliation(
            &snap.aggregates,
            &snap.deposits,
            &trips,
            config.tolerance.amount_cents,
        ),
        refund_lag: refund_lag(&receipt_bank.records),
        status_counts: status_counts(&trips),
    };

    let passes = vec![trip_payment, payment_bank, receipt_bank, receipt_trip];
    for p in passes.iter().filter(|p| p.status != PassStatus::Complete) {
        warn!("{} pass degraded: {:?}", p.pass, p.status);
    }

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        passes,
        invalid: snap.invalid,
        classified,
        trips,
        report,
    })
}

fn finish(
    snap: &Snapshot,
    pass: PassKind,
    records: Vec<MatchRecord>,
    batches: Vec<BatchMatch>,
) -> PassResult {
    let metrics = compute_metrics(&records, snap.invalid_for(pass));
    info!(
        "{pass}: {} candidate(s), {} matched, {} batched, {} fallback, {} unmatched, gap {} cents",
        metrics.candidates,
        metrics.matched,
        metrics.batched,
        metrics.fallback_only,
        metrics.unmatched,
        metrics.gap_cents
    );
    PassResult {
        pass,
        status: snap.pass_status(pass),
        records,
        batches,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Claim aggregates against completed trips, by trip identifier.
fn run_trip_payment(snap: &Snapshot) -> PassResult {
    let pass = PassKind::TripPayment;
    let mut pool = Pool::new(&snap.completed_trips);
    let records = match_all(
        &snap.aggregates,
        &mut pool,
        &[Strategy::ExactKey, Strategy::DateOnly],
        pass,
    );
    finish(snap, pass, records, Vec::new())
}

/// Claim sides against payout deposits: pairwise, then batches of refunds,
/// then same-day fallback.
fn run_payment_bank(snap: &Snapshot, config: &ReconConfig) -> PassResult {
    let pass = PassKind::PaymentBank;
    let mut deposits = Pool::new(&snap.deposits);
    let mut records = match_all(
        &snap.payable,
        &mut deposits,
        &[
            Strategy::DateAmountExact,
            Strategy::DateAmountTolerance {
                window_days: config.windows.refund_match,
                tolerance_cents: config.tolerance.amount_cents,
            },
        ],
        pass,
    );

    // Only refunds are paid out in batches.
    let mut claims = Pool::new(&snap.payable);
    for (idx, (record, claim)) in records.iter().zip(&snap.payable).enumerate() {
        if record.level != MatchLevel::Unmatched || claim.side != ClaimSide::Refund {
            claims.take(idx);
        }
    }

    let params = BatchParams {
        window_days: config.windows.batch_match,
        tolerance_cents: config.tolerance.batch_cents,
        max_subset_size: config.batch.max_subset_size,
        max_nodes: config.batch.max_nodes,
    };
    let open_deposits: Vec<usize> = deposits.live().map(|(idx, _)| idx).collect();
    let mut batches = Vec::new();
    for deposit_idx in open_deposits {
        if claims.remaining() < 2 {
            break;
        }
        let deposit = deposits.get(deposit_idx);
        let Some(selection) = resolve_batch(&claims, deposit, params) else {
            continue;
        };
        deposits.take(deposit_idx);
        let batch_id = batches.len() + 1;
        for &claim_idx in &selection.members {
            claims.take(claim_idx);
            let claim = claims.get(claim_idx);
            records[claim_idx] = MatchRecord {
                pass,
                candidate_id: claim.key.clone(),
                candidate_date: claim.date,
                candidate_cents: Some(claim.amount_cents),
                target_id: Some(deposit.id.clone()),
                target_date: Some(deposit.date),
                level: MatchLevel::Batch,
                strategy: Some(StrategyKind::Batch),
                matched_cents: Some(claim.amount_cents),
                delta_cents: None,
                date_offset_days: Some((claim.date - deposit.date).num_days()),
                batch_id: Some(batch_id),
                side: Some(claim.side),
            };
        }
        debug!(
            "{pass}: batch {batch_id} explains deposit {} with {} claim(s), delta {} cents",
            deposit.id,
            selection.members.len(),
            selection.delta_cents
        );
        batches.push(BatchMatch {
            batch_id,
            deposit_id: deposit.id.clone(),
            deposit_date: deposit.date,
            deposit_cents: deposit.amount_cents,
            claim_ids: selection
                .members
                .iter()
                .map(|&i| claims.get(i).key.clone())
                .collect(),
            claims_sum_cents: selection.sum_cents,
            delta_cents: selection.delta_cents,
            nodes_visited: selection.nodes_visited,
            nodes_pruned: selection.nodes_pruned,
        });
    }

    for (idx, claim) in snap.payable.iter().enumerate() {
        if records[idx].level == MatchLevel::Unmatched {
            records[idx] = find_match(claim, &mut deposits, &[Strategy::DateOnly], pass);
        }
    }

    finish(snap, pass, records, batches)
}

/// Receipts against card debits by amount and date. The pickup address
/// settles same-day, same-amount ties when the bank export carries one.
fn run_receipt_bank(snap: &Snapshot, config: &ReconConfig) -> PassResult {
    let pass = PassKind::ReceiptBank;
    let mut pool = Pool::new(&snap.debits);
    let records = match_all(
        &snap.receipts,
        &mut pool,
        &[
            Strategy::DateAmountSecondaryExact,
            Strategy::DateAmountExact,
            Strategy::DateAmountTolerance {
                window_days: config.windows.refund_match,
                tolerance_cents: config.tolerance.amount_cents,
            },
            Strategy::DateOnly,
        ],
        pass,
    );
    finish(snap, pass, records, Vec::new())
}

/// Receipts against trips through the trip link. A trip can carry several
/// receipts, so trips are never retired.
fn run_receipt_trip(snap: &Snapshot) -> PassResult {
    let pass = PassKind::ReceiptTrip;
    let mut pool = Pool::shared(&snap.trips);
    let records = match_all(
        &snap.receipts,
        &mut pool,
        &[Strategy::ExactKey, Strategy::DateOnly],
        pass,
    );
    finish(snap, pass, records, Vec::new())
}
