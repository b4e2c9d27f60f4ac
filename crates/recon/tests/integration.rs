use std::path::PathBuf;

use courier_recon::config::{ReconConfig, TimeReference};
use courier_recon::load::{load_input_dir, read_rows};
use courier_recon::model::{
    Category, ClaimSide, MatchLevel, PassKind, PassStatus, ReconInput, ReconResult,
    ReconciliationStatus, SourceKind,
};
use courier_recon::run;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> ReconConfig {
    ReconConfig::load(&fixtures_dir().join("recon.toml")).unwrap()
}

fn fixture_input() -> ReconInput {
    load_input_dir(&fixtures_dir()).unwrap()
}

fn load_and_run() -> ReconResult {
    run(&fixture_config(), &fixture_input()).unwrap()
}

fn record<'a>(
    result: &'a ReconResult,
    pass: PassKind,
    candidate: &str,
) -> &'a courier_recon::model::MatchRecord {
    result
        .pass(pass)
        .unwrap()
        .records
        .iter()
        .find(|r| r.candidate_id == candidate)
        .unwrap_or_else(|| panic!("no {pass} record for {candidate}"))
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn claims_for_one_trip_are_summed_once() {
    let result = load_and_run();
    let r = record(&result, PassKind::TripPayment, "aaaaaaaa-0001");
    assert_eq!(r.level, MatchLevel::ExactKey);
    assert_eq!(r.candidate_cents, Some(1200));
    assert_eq!(r.matched_cents, Some(1200));

    let audit = result
        .trips
        .iter()
        .find(|t| t.trip_id == "aaaaaaaa-0001")
        .unwrap();
    assert_eq!(audit.payment_net_cents, Some(1200));
}

#[test]
fn three_refunds_explain_one_deposit() {
    let result = load_and_run();
    let pb = result.pass(PassKind::PaymentBank).unwrap();
    assert_eq!(pb.batches.len(), 1);
    let batch = &pb.batches[0];
    assert_eq!(batch.deposit_id, "b02");
    assert_eq!(batch.deposit_cents, 4500);
    assert_eq!(
        batch.claim_ids,
        vec!["aaaaaaaa-0002", "aaaaaaaa-0003", "aaaaaaaa-0004"]
    );
    assert_eq!(batch.claims_sum_cents, 4500);
    assert_eq!(batch.delta_cents, 0);

    for id in &batch.claim_ids {
        let r = record(&result, PassKind::PaymentBank, id);
        assert_eq!(r.level, MatchLevel::Batch);
        assert_eq!(r.batch_id, Some(batch.batch_id));
        assert_eq!(r.target_id.as_deref(), Some("b02"));
    }
}

#[test]
fn receipt_matches_debit_two_days_later() {
    let result = load_and_run();
    let r = record(&result, PassKind::ReceiptBank, "r1");
    assert_eq!(r.level, MatchLevel::DateAmountTolerance);
    assert_eq!(r.target_id.as_deref(), Some("b07"));
    assert_eq!(r.delta_cents, Some(0));
    assert_eq!(r.date_offset_days, Some(-2));
}

#[test]
fn payout_matched_to_refund_is_reimbursement() {
    let result = load_and_run();
    let r = record(&result, PassKind::PaymentBank, "aaaaaaaa-0005");
    assert_eq!(r.level, MatchLevel::DateAmountExact);
    assert_eq!(r.target_id.as_deref(), Some("b06"));

    let b06 = result.classified.iter().find(|c| c.txn_id == "b06").unwrap();
    assert_eq!(b06.category, Category::CustomerReimbursement);
    // A payout with no refund component is an ordinary deposit.
    let b01 = result.classified.iter().find(|c| c.txn_id == "b01").unwrap();
    assert_eq!(b01.category, Category::Deposit);
}

#[test]
fn malformed_timestamp_is_reported_and_excluded() {
    let result = load_and_run();
    let bad: Vec<_> = result.invalid_for(SourceKind::Payments).collect();
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].record_id, "p7");
    assert_eq!(bad[0].field, "reported_at");
    assert!(bad[0].reason.contains("XYZ"));

    let tp = result.pass(PassKind::TripPayment).unwrap();
    // 12.00 + 15.00 + 20.00 + 10.00 + 50.00 + 25.30 + 7.25; p7's 99.00 is out.
    assert_eq!(tp.metrics.total_claimed_cents, 13955);
    assert_eq!(tp.metrics.invalid_records, 1);

    let audit = result
        .trips
        .iter()
        .find(|t| t.trip_id == "aaaaaaaa-0007")
        .unwrap();
    assert_eq!(audit.status, ReconciliationStatus::NoPayment);
}

// -------------------------------------------------------------------------
// Pass metrics
// -------------------------------------------------------------------------

#[test]
fn pass_metrics() {
    let result = load_and_run();
    assert!(result.degraded_passes().is_empty());

    let tp = &result.pass(PassKind::TripPayment).unwrap().metrics;
    assert_eq!(tp.candidates, 7);
    assert_eq!(tp.matched, 6);
    assert_eq!(tp.unmatched, 1);
    assert_eq!(tp.total_matched_cents, 8955);
    assert_eq!(tp.gap_cents, 5000);

    let pb = &result.pass(PassKind::PaymentBank).unwrap().metrics;
    assert_eq!(pb.candidates, 7);
    assert_eq!((pb.matched, pb.batched, pb.fallback_only, pb.unmatched), (2, 3, 0, 2));
    assert_eq!(pb.total_claimed_cents, 13955);
    assert_eq!(pb.total_matched_cents, 8230);
    assert_eq!(pb.gap_cents, 5725);
    assert_eq!(pb.by_month["2025-09"].candidates, 7);
    // payments + bank
    assert_eq!(pb.invalid_records, 2);

    let rb = &result.pass(PassKind::ReceiptBank).unwrap().metrics;
    assert_eq!(rb.candidates, 2);
    assert_eq!(rb.matched, 1);
    assert_eq!(rb.unmatched, 1);
    assert_eq!(rb.invalid_records, 2);
}

#[test]
fn receipt_without_link_falls_back_to_trip_day() {
    let result = load_and_run();
    let r = record(&result, PassKind::ReceiptTrip, "r2");
    assert_eq!(r.level, MatchLevel::DateOnly);
    assert_eq!(r.target_id.as_deref(), Some("aaaaaaaa-0007"));
    assert_eq!(r.matched_cents, None);

    let linked = record(&result, PassKind::ReceiptTrip, "r1");
    assert_eq!(linked.level, MatchLevel::ExactKey);
}

// -------------------------------------------------------------------------
// Classification + reports
// -------------------------------------------------------------------------

#[test]
fn every_transaction_is_categorised() {
    let result = load_and_run();
    let got: Vec<(&str, Category, Option<&str>)> = result
        .classified
        .iter()
        .map(|c| (c.txn_id.as_str(), c.category, c.subcategory.as_deref()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("b01", Category::Deposit, None),
            ("b02", Category::CustomerReimbursement, None),
            ("b03", Category::BusinessExpense, Some("EV Charging")),
            ("b04", Category::Personal, Some("Fast Food")),
            ("b05", Category::Deposit, None),
            ("b06", Category::CustomerReimbursement, None),
            ("b07", Category::CustomerReimbursement, None),
            ("b08", Category::FinancialTransfer, Some("Transfers/Fees")),
            ("b09", Category::PersonalUncategorized, None),
        ]
    );
}

#[test]
fn trip_statuses() {
    let result = load_and_run();
    let counts = &result.report.status_counts;
    assert_eq!(counts[&ReconciliationStatus::BankMatched], 4);
    assert_eq!(counts[&ReconciliationStatus::RefundTracked], 1);
    assert_eq!(counts[&ReconciliationStatus::NoPayment], 1);
    assert_eq!(counts[&ReconciliationStatus::Ok], 1);
    // The cancelled trip is not audited.
    assert!(result.trips.iter().all(|t| t.trip_id != "aaaaaaaa-0006"));

    let refund = result
        .trips
        .iter()
        .find(|t| t.trip_id == "aaaaaaaa-0005")
        .unwrap();
    assert_eq!(refund.status, ReconciliationStatus::RefundTracked);
    assert_eq!(refund.receipt_refund_cents, Some(2530));
}

#[test]
fn monthly_and_lag_reports() {
    let result = load_and_run();
    let months = &result.report.monthly;
    assert_eq!(months.len(), 1);
    let sep = &months[0];
    assert_eq!(sep.month, "2025-09");
    assert_eq!(sep.trips, 7);
    assert_eq!(sep.claimed_cents, 13955);
    assert_eq!(sep.deposited_cents, 10230);
    assert_eq!(sep.reimbursed_cents, 9560);
    assert_eq!(sep.business_cents, 1450);
    assert_eq!(sep.financial_cents, 4000);
    assert_eq!(sep.personal_cents, 1099);
    assert_eq!(sep.uncategorized_cents, 500);

    let lag = &result.report.refund_lag;
    assert_eq!(lag.within_week, 1);
    assert_eq!(lag.missing_payout, 1);
    assert_eq!(lag.max_lag_days, Some(2));

    let day = result
        .report
        .daily
        .iter()
        .find(|d| d.date.to_string() == "2025-09-01")
        .unwrap();
    assert_eq!(day.claimed_cents, 1200);
    assert_eq!(day.deposited_cents, 1200);
    assert!(day.matched);
}

#[test]
fn result_serializes_to_json() {
    let result = load_and_run();
    let json = result.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["meta"]["config_name"], "September 2025");
    assert!(json.contains("\"date+amount-tolerance\""));
    assert!(json.contains("\"BANK_MATCHED\""));
    assert_eq!(value["passes"][0]["status"]["state"], "complete");
}

// -------------------------------------------------------------------------
// Configuration effects
// -------------------------------------------------------------------------

#[test]
fn utc_reference_moves_late_evening_claims() {
    let mut config = fixture_config();
    config.dates.reference = TimeReference::Utc;
    let result = run(&config, &fixture_input()).unwrap();
    // 21:45 CDT on the 1st is the 2nd in UTC; the payout posted on the 1st.
    let r = record(&result, PassKind::PaymentBank, "aaaaaaaa-0001");
    assert_eq!(r.level, MatchLevel::DateAmountTolerance);
    assert_eq!(r.date_offset_days, Some(1));
}

#[test]
fn zero_tolerance_without_window_loses_the_receipt() {
    let mut config = fixture_config();
    config.tolerance.amount_cents = 0;
    config.windows.refund_match = 1;
    let result = run(&config, &fixture_input()).unwrap();
    let r = record(&result, PassKind::ReceiptBank, "r1");
    assert_eq!(r.level, MatchLevel::Unmatched);
    let b07 = result.classified.iter().find(|c| c.txn_id == "b07").unwrap();
    assert_eq!(b07.category, Category::Personal);
    assert_eq!(b07.subcategory.as_deref(), Some("Groceries"));
}

#[test]
fn missing_receipts_degrade_only_receipt_passes() {
    let mut input = fixture_input();
    input.receipts.clear();
    let result = run(&fixture_config(), &input).unwrap();
    let degraded = result.degraded_passes();
    assert_eq!(degraded.len(), 2);
    assert_eq!(degraded[0].0, PassKind::ReceiptBank);
    assert_eq!(
        *degraded[0].1,
        PassStatus::SourceUnavailable {
            source: SourceKind::Receipts
        }
    );
    assert_eq!(degraded[1].0, PassKind::ReceiptTrip);
    // The payment side still resolves its batch.
    assert_eq!(result.pass(PassKind::PaymentBank).unwrap().batches.len(), 1);
}

// -------------------------------------------------------------------------
// Claims carrying earnings and refunds
// -------------------------------------------------------------------------

const PAYMENT_HEADER: &str =
    "claim_id,trip_id,reported_at,description,fare,tip,refund_order,refund_toll,instant_pay_fee\n";
const BANK_HEADER: &str = "txn_id,posted_date,description,amount,statement\n";

fn mixed_input(payments: &str, bank: &str) -> ReconInput {
    ReconInput {
        payments: read_rows(&format!("{PAYMENT_HEADER}{payments}")).unwrap(),
        bank: read_rows(&format!("{BANK_HEADER}{bank}")).unwrap(),
        ..Default::default()
    }
}

#[test]
fn refund_payout_found_for_a_paid_trip() {
    let input = mixed_input(
        "p1,aaaaaaaa-0009,2025-09-10 08:00:00 CDT,Trip,8.00,1.00,25.30,,\n",
        "b1,09/10/2025,Uber App Payout; Miscellaneous,$25.30,2025-09\n\
         b2,09/11/2025,Uber App Payout,$9.00,2025-09\n",
    );
    let result = run(&fixture_config(), &input).unwrap();
    let pb = result.pass(PassKind::PaymentBank).unwrap();

    let refund = pb
        .records
        .iter()
        .find(|r| r.side == Some(ClaimSide::Refund))
        .unwrap();
    assert_eq!(refund.level, MatchLevel::DateAmountExact);
    assert_eq!(refund.target_id.as_deref(), Some("b1"));
    assert_eq!(refund.matched_cents, Some(2530));

    let earnings = pb
        .records
        .iter()
        .find(|r| r.side == Some(ClaimSide::Earnings))
        .unwrap();
    assert_eq!(earnings.candidate_cents, Some(900));
    assert_eq!(earnings.target_id.as_deref(), Some("b2"));

    assert_eq!(pb.metrics.total_claimed_cents, 3430);
    assert_eq!(pb.metrics.gap_cents, 0);

    let b1 = result.classified.iter().find(|c| c.txn_id == "b1").unwrap();
    assert_eq!(b1.category, Category::CustomerReimbursement);
    let b2 = result.classified.iter().find(|c| c.txn_id == "b2").unwrap();
    assert_eq!(b2.category, Category::Deposit);
}

#[test]
fn refunds_of_paid_trips_explain_one_deposit() {
    let input = mixed_input(
        "p1,aaaaaaaa-0011,2025-09-01 12:00:00 CDT,Trip,7.00,,15.00,,\n\
         p2,aaaaaaaa-0012,2025-09-02 12:00:00 CDT,Trip,6.00,,20.00,,\n\
         p3,aaaaaaaa-0013,2025-09-03 12:00:00 CDT,Trip,5.00,,10.00,,\n",
        "b1,09/05/2025,Uber App Payout,$45.00,2025-09\n",
    );
    let result = run(&fixture_config(), &input).unwrap();
    let pb = result.pass(PassKind::PaymentBank).unwrap();
    assert_eq!(pb.batches.len(), 1);
    assert_eq!(
        pb.batches[0].claim_ids,
        vec!["aaaaaaaa-0011", "aaaaaaaa-0012", "aaaaaaaa-0013"]
    );
    assert_eq!(pb.metrics.batched, 3);
    // The 18.00 of fares has no payout in the statement.
    assert_eq!(pb.metrics.unmatched, 3);
    assert_eq!(pb.metrics.gap_cents, 1800);
    assert_eq!(result.classified[0].category, Category::CustomerReimbursement);
}

// -------------------------------------------------------------------------
// Several receipts on one trip
// -------------------------------------------------------------------------

#[test]
fn every_receipt_on_a_trip_counts() {
    let mut input = fixture_input();
    input.receipts.extend(
        read_rows::<courier_recon::model::ReceiptRow>(
            "entry_id,date,link,refund,pickup_address,total\n\
             r4,2025-09-10,https://drivers.example.com/trips/aaaaaaaa-0005,4.70,Kroger Store #512,\n",
        )
        .unwrap(),
    );
    let result = run(&fixture_config(), &input).unwrap();

    for id in ["r1", "r4"] {
        let r = record(&result, PassKind::ReceiptTrip, id);
        assert_eq!(r.level, MatchLevel::ExactKey);
        assert_eq!(r.target_id.as_deref(), Some("aaaaaaaa-0005"));
    }
    let audit = result
        .trips
        .iter()
        .find(|t| t.trip_id == "aaaaaaaa-0005")
        .unwrap();
    assert_eq!(audit.receipt_refund_cents, Some(3000));
    assert_eq!(audit.status, ReconciliationStatus::RefundTracked);
}
