//! Per-trip audit: one row per completed trip with its reconciliation status.
//!
//! Status is decided in order, first match wins:
//! - NO_PAYMENT: no claim tied to the trip, or the tied claims net to zero
//! - REFUND_TRACKED: a receipt links to the trip and records a refund
//! - BANK_MATCHED: a payout deposit posted on the trip day or within the
//!   lookahead window after it
//! - OK: paid, but nothing else corroborates it

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::model::{
    BankTransaction, ClaimAggregate, MatchLevel, MatchRecord, ReceiptEntry, ReconciliationStatus,
    Trip, TripAudit, TripStatus,
};

/// Everything the audit reads, borrowed from the engine's snapshot.
pub struct AuditInputs<'a> {
    pub trips: &'a [Trip],
    pub aggregates: &'a [ClaimAggregate],
    pub receipts: &'a [ReceiptEntry],
    /// Payout deposits only, in date order.
    pub deposits: &'a [BankTransaction],
    pub trip_payment: &'a [MatchRecord],
    pub receipt_trip: &'a [MatchRecord],
    pub lookahead_days: u32,
}

/// Map trip id → candidate ids for exact-key links in a pass, in record
/// order.
fn exact_links(records: &[MatchRecord]) -> BTreeMap<&str, Vec<&str>> {
    let mut links: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.level == MatchLevel::ExactKey) {
        if let Some(trip) = r.target_id.as_deref() {
            links.entry(trip).or_default().push(r.candidate_id.as_str());
        }
    }
    links
}

fn first_deposit_after(
    deposits: &[BankTransaction],
    from: NaiveDate,
    lookahead_days: u32,
) -> Option<NaiveDate> {
    let until = from.checked_add_days(Days::new(u64::from(lookahead_days)))?;
    deposits
        .iter()
        .map(|d| d.date)
        .filter(|date| *date >= from && *date <= until)
        .min()
}

pub fn decide_status(
    payment_net_cents: Option<i64>,
    receipt_refund_cents: Option<i64>,
    bank_deposit_date: Option<NaiveDate>,
) -> ReconciliationStatus {
    match payment_net_cents {
        None | Some(0) => ReconciliationStatus::NoPayment,
        Some(_) if receipt_refund_cents.is_some_and(|r| r != 0) => {
            ReconciliationStatus::RefundTracked
        }
        Some(_) if bank_deposit_date.is_some() => ReconciliationStatus::BankMatched,
        Some(_) => ReconciliationStatus::Ok,
    }
}

pub fn audit_trips(inputs: &AuditInputs<'_>) -> Vec<TripAudit> {
    let payments = exact_links(inputs.trip_payment);
    let receipt_links = exact_links(inputs.receipt_trip);
    let aggregates: BTreeMap<&str, &ClaimAggregate> = inputs
        .aggregates
        .iter()
        .map(|a| (a.key.as_str(), a))
        .collect();
    let receipts: BTreeMap<&str, &ReceiptEntry> = inputs
        .receipts
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect();

    inputs
        .trips
        .iter()
        .filter(|t| t.status == TripStatus::Completed)
        .map(|trip| {
            let payment = payments
                .get(trip.id.as_str())
                .and_then(|keys| keys.first())
                .and_then(|key| aggregates.get(key));
            // A trip may have several refunds tracked against it.
            let receipt_refund_cents = receipt_links
                .get(trip.id.as_str())
                .into_iter()
                .flatten()
                .filter_map(|id| receipts.get(id).and_then(|r| r.refund_cents))
                .reduce(|a, b| a + b);
            let bank_deposit_date =
                first_deposit_after(inputs.deposits, trip.date, inputs.lookahead_days);
            let payment_net_cents = payment.map(|a| a.net_claimed_cents());

            TripAudit {
                trip_id: trip.id.clone(),
                completed_at: trip.completed_at,
                pickup: trip.pickup.clone(),
                dropoff: trip.dropoff.clone(),
                distance_miles: trip.distance_miles,
                payment_date: payment.map(|a| a.date),
                payment_net_cents,
                receipt_refund_cents,
                bank_deposit_date,
                status: decide_status(payment_net_cents, receipt_refund_cents, bank_deposit_date),
            }
        })
        .collect()
}

pub fn status_counts(audits: &[TripAudit]) -> BTreeMap<ReconciliationStatus, usize> {
    let mut counts = BTreeMap::new();
    for a in audits {
        *counts.entry(a.status).or_insert(0) += 1;
    }
    counts
}
