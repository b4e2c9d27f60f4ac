use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Trips,
    Payments,
    Bank,
    Receipts,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trips => write!(f, "trips"),
            Self::Payments => write!(f, "payments"),
            Self::Bank => write!(f, "bank"),
            Self::Receipts => write!(f, "receipts"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw rows (column-normalized, not yet type-parsed)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripRow {
    pub trip_id: String,
    pub completed_at: String,
    #[serde(default)]
    pub pickup: String,
    #[serde(default)]
    pub dropoff: String,
    #[serde(default)]
    pub distance: Option<String>,
    pub status: String,
}

/// One payment-platform line. Monetary components are optional text; an
/// empty cell means the component is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRow {
    pub claim_id: String,
    #[serde(default)]
    pub trip_id: Option<String>,
    pub reported_at: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fare: Option<String>,
    #[serde(default)]
    pub tip: Option<String>,
    #[serde(default)]
    pub incentive: Option<String>,
    #[serde(default)]
    pub boost: Option<String>,
    #[serde(default)]
    pub quest: Option<String>,
    #[serde(default)]
    pub return_trip_fare: Option<String>,
    #[serde(default)]
    pub delivery_adjustment: Option<String>,
    #[serde(default)]
    pub adjustment: Option<String>,
    #[serde(default)]
    pub refund_order: Option<String>,
    #[serde(default)]
    pub refund_toll: Option<String>,
    #[serde(default)]
    pub instant_pay_fee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankRow {
    pub txn_id: String,
    pub posted_date: String,
    #[serde(default)]
    pub description: String,
    pub amount: String,
    #[serde(default)]
    pub statement: String,
    /// Present on refund-status exports that carry the order's pickup.
    #[serde(default)]
    pub pickup_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptRow {
    pub entry_id: String,
    pub date: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub refund: Option<String>,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub total: Option<String>,
}

/// Pre-loaded raw tables, one per source.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub trips: Vec<TripRow>,
    pub payments: Vec<PaymentRow>,
    pub bank: Vec<BankRow>,
    pub receipts: Vec<ReceiptRow>,
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Completed,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub id: String,
    pub completed_at: NaiveDateTime,
    pub date: NaiveDate,
    pub pickup: String,
    pub dropoff: String,
    pub distance_miles: Option<f64>,
    pub status: TripStatus,
}

/// Named monetary component of a payment claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Fare,
    Tip,
    Incentive,
    Boost,
    Quest,
    ReturnTripFare,
    DeliveryAdjustment,
    Adjustment,
    RefundOrder,
    RefundToll,
    InstantPayFee,
}

impl Component {
    /// Fees are exported as positive numbers and subtracted from the net.
    pub fn is_fee(self) -> bool {
        matches!(self, Self::InstantPayFee)
    }

    pub fn is_refund(self) -> bool {
        matches!(self, Self::RefundOrder | Self::RefundToll)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fare => "fare",
            Self::Tip => "tip",
            Self::Incentive => "incentive",
            Self::Boost => "boost",
            Self::Quest => "quest",
            Self::ReturnTripFare => "return_trip_fare",
            Self::DeliveryAdjustment => "delivery_adjustment",
            Self::Adjustment => "adjustment",
            Self::RefundOrder => "refund_order",
            Self::RefundToll => "refund_toll",
            Self::InstantPayFee => "instant_pay_fee",
        }
    }
}

/// Net = credit components minus fee components.
pub fn net_of(components: &BTreeMap<Component, i64>) -> i64 {
    components
        .iter()
        .map(|(c, cents)| if c.is_fee() { -cents } else { *cents })
        .sum()
}

pub fn refunds_of(components: &BTreeMap<Component, i64>) -> i64 {
    components
        .iter()
        .filter(|(c, _)| c.is_refund())
        .map(|(_, cents)| *cents)
        .sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentClaim {
    pub id: String,
    pub trip_id: Option<String>,
    pub reported_at: NaiveDateTime,
    pub date: NaiveDate,
    pub description: String,
    pub components: BTreeMap<Component, i64>,
}

impl PaymentClaim {
    pub fn net_claimed_cents(&self) -> i64 {
        net_of(&self.components)
    }

    pub fn refund_cents(&self) -> i64 {
        refunds_of(&self.components)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BankTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Signed: positive = deposit, negative = debit.
    pub amount_cents: i64,
    pub statement: String,
    /// Normalized pickup address, when the export has one.
    pub pickup_address: Option<String>,
}

impl BankTransaction {
    pub fn is_deposit(&self) -> bool {
        self.amount_cents > 0
    }

    pub fn is_debit(&self) -> bool {
        self.amount_cents < 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptEntry {
    pub id: String,
    pub date: NaiveDate,
    pub trip_id: Option<String>,
    pub refund_cents: Option<i64>,
    pub pickup_address: String,
    pub total_cents: Option<i64>,
}

impl ReceiptEntry {
    /// Amount expected on the card statement: the purchase total when
    /// tracked, otherwise the refund.
    pub fn amount_cents(&self) -> i64 {
        self.total_cents.or(self.refund_cents).unwrap_or(0)
    }
}

/// Claims sharing a trip identifier, summed component-wise. Claims without a
/// trip identifier each form their own aggregate keyed by claim id.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimAggregate {
    pub key: String,
    pub trip_id: Option<String>,
    pub date: NaiveDate,
    pub claim_ids: Vec<String>,
    pub components: BTreeMap<Component, i64>,
}

impl ClaimAggregate {
    pub fn net_claimed_cents(&self) -> i64 {
        net_of(&self.components)
    }

    pub fn refund_cents(&self) -> i64 {
        refunds_of(&self.components)
    }

    /// Split into the amounts a payout can settle: refunds come back as their
    /// own payout, earnings (net minus refunds) as another. Zero sides are
    /// dropped, so the sides always sum to the net.
    pub fn payout_claims(&self) -> Vec<PayoutClaim> {
        let refund = self.refund_cents();
        [
            (ClaimSide::Refund, refund),
            (ClaimSide::Earnings, self.net_claimed_cents() - refund),
        ]
        .into_iter()
        .filter(|(_, cents)| *cents != 0)
        .map(|(side, amount_cents)| PayoutClaim {
            key: self.key.clone(),
            trip_id: self.trip_id.clone(),
            date: self.date,
            side,
            amount_cents,
        })
        .collect()
    }
}

/// Which part of a claim aggregate a payout settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSide {
    Refund,
    Earnings,
}

/// One side of a claim aggregate, as matched against payout deposits.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutClaim {
    pub key: String,
    pub trip_id: Option<String>,
    pub date: NaiveDate,
    pub side: ClaimSide,
    pub amount_cents: i64,
}

/// A record that failed normalization. Excluded from every sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRecord {
    pub source: SourceKind,
    pub record_id: String,
    pub field: String,
    pub value: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Confidence of a candidate↔target pairing. Declared lowest first so the
/// derived `Ord` ranks `ExactKey` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MatchLevel {
    #[serde(rename = "unmatched")]
    Unmatched,
    #[serde(rename = "date-only-fallback")]
    DateOnly,
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "date+amount-tolerance")]
    DateAmountTolerance,
    #[serde(rename = "date+amount-exact")]
    DateAmountExact,
    #[serde(rename = "exact-key")]
    ExactKey,
}

impl MatchLevel {
    /// Levels that count as money actually accounted for.
    pub fn is_financial(self) -> bool {
        self >= Self::Batch
    }
}

impl std::fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmatched => write!(f, "unmatched"),
            Self::DateOnly => write!(f, "date-only-fallback"),
            Self::Batch => write!(f, "batch"),
            Self::DateAmountTolerance => write!(f, "date+amount-tolerance"),
            Self::DateAmountExact => write!(f, "date+amount-exact"),
            Self::ExactKey => write!(f, "exact-key"),
        }
    }
}

/// Which strategy produced a match. Two strategies share the
/// `date+amount-exact` level; this keeps them apart in the audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ExactKey,
    DateAmountSecondaryExact,
    DateAmountExact,
    DateAmountTolerance,
    Batch,
    DateOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    TripPayment,
    PaymentBank,
    ReceiptBank,
    ReceiptTrip,
}

impl PassKind {
    /// (candidate source, target source)
    pub fn sources(self) -> (SourceKind, SourceKind) {
        match self {
            Self::TripPayment => (SourceKind::Payments, SourceKind::Trips),
            Self::PaymentBank => (SourceKind::Payments, SourceKind::Bank),
            Self::ReceiptBank => (SourceKind::Receipts, SourceKind::Bank),
            Self::ReceiptTrip => (SourceKind::Receipts, SourceKind::Trips),
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TripPayment => write!(f, "trip_payment"),
            Self::PaymentBank => write!(f, "payment_bank"),
            Self::ReceiptBank => write!(f, "receipt_bank"),
            Self::ReceiptTrip => write!(f, "receipt_trip"),
        }
    }
}

/// Outcome for one candidate in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub pass: PassKind,
    pub candidate_id: String,
    pub candidate_date: NaiveDate,
    pub candidate_cents: Option<i64>,
    pub target_id: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub level: MatchLevel,
    pub strategy: Option<StrategyKind>,
    /// Amount credited as matched. `None` unless the level is financial.
    pub matched_cents: Option<i64>,
    /// candidate − target, when both carry amounts.
    pub delta_cents: Option<i64>,
    /// candidate date − target date.
    pub date_offset_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<usize>,
    /// Payment↔bank only: which side of the claim was compared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<ClaimSide>,
}

impl MatchRecord {
    pub fn unmatched(
        pass: PassKind,
        candidate_id: &str,
        candidate_date: NaiveDate,
        candidate_cents: Option<i64>,
    ) -> Self {
        Self {
            pass,
            candidate_id: candidate_id.to_string(),
            candidate_date,
            candidate_cents,
            target_id: None,
            target_date: None,
            level: MatchLevel::Unmatched,
            strategy: None,
            matched_cents: None,
            delta_cents: None,
            date_offset_days: None,
            batch_id: None,
            side: None,
        }
    }

    pub fn is_financial(&self) -> bool {
        self.level.is_financial()
    }
}

/// One deposit explained by several claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMatch {
    pub batch_id: usize,
    pub deposit_id: String,
    pub deposit_date: NaiveDate,
    pub deposit_cents: i64,
    pub claim_ids: Vec<String>,
    pub claims_sum_cents: i64,
    /// claims sum − deposit.
    pub delta_cents: i64,
    pub nodes_visited: u64,
    pub nodes_pruned: u64,
}

// ---------------------------------------------------------------------------
// Pass output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PassStatus {
    Complete,
    /// The raw table was empty.
    SourceUnavailable { source: SourceKind },
    /// Rows were supplied but none survived normalization.
    NoData { source: SourceKind },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthMetrics {
    pub candidates: usize,
    pub matched: usize,
    pub claimed_cents: i64,
    pub matched_cents: i64,
    pub gap_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassMetrics {
    pub candidates: usize,
    pub matched: usize,
    pub batched: usize,
    pub fallback_only: usize,
    pub unmatched: usize,
    pub invalid_records: usize,
    pub total_claimed_cents: i64,
    pub total_matched_cents: i64,
    /// claimed − matched.
    pub gap_cents: i64,
    /// gap as a percentage of claimed; `None` when nothing was claimed.
    pub gap_pct: Option<f64>,
    pub by_month: BTreeMap<String, MonthMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassResult {
    pub pass: PassKind,
    pub status: PassStatus,
    pub records: Vec<MatchRecord>,
    pub batches: Vec<BatchMatch>,
    pub metrics: PassMetrics,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CustomerReimbursement,
    Deposit,
    BusinessExpense,
    FinancialTransfer,
    Personal,
    PersonalUncategorized,
}

impl Category {
    pub fn is_personal(self) -> bool {
        matches!(self, Self::Personal | Self::PersonalUncategorized)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CustomerReimbursement => write!(f, "customer_reimbursement"),
            Self::Deposit => write!(f, "deposit"),
            Self::BusinessExpense => write!(f, "business_expense"),
            Self::FinancialTransfer => write!(f, "financial_transfer"),
            Self::Personal => write!(f, "personal"),
            Self::PersonalUncategorized => write!(f, "personal_uncategorized"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransaction {
    pub txn_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub category: Category,
    pub subcategory: Option<String>,
}

// ---------------------------------------------------------------------------
// Trip audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    NoPayment,
    RefundTracked,
    BankMatched,
    Ok,
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPayment => write!(f, "NO_PAYMENT"),
            Self::RefundTracked => write!(f, "REFUND_TRACKED"),
            Self::BankMatched => write!(f, "BANK_MATCHED"),
            Self::Ok => write!(f, "OK"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripAudit {
    pub trip_id: String,
    pub completed_at: NaiveDateTime,
    pub pickup: String,
    pub dropoff: String,
    pub distance_miles: Option<f64>,
    pub payment_date: Option<NaiveDate>,
    pub payment_net_cents: Option<i64>,
    pub receipt_refund_cents: Option<i64>,
    pub bank_deposit_date: Option<NaiveDate>,
    pub status: ReconciliationStatus,
}

// ---------------------------------------------------------------------------
// Report rollups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: String,
    pub trips: usize,
    pub claimed_cents: i64,
    pub deposited_cents: i64,
    pub reimbursed_cents: i64,
    pub business_cents: i64,
    pub financial_cents: i64,
    pub personal_cents: i64,
    pub uncategorized_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub subcategory: Option<String>,
    pub transactions: usize,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub trips: usize,
    pub claimed_cents: i64,
    pub deposited_cents: i64,
    /// claimed − deposited.
    pub difference_cents: i64,
    pub matched: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefundLag {
    pub within_week: usize,
    pub within_month: usize,
    pub over_month: usize,
    pub missing_payout: usize,
    pub max_lag_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconReport {
    pub monthly: Vec<MonthSummary>,
    pub categories: Vec<CategorySummary>,
    pub daily: Vec<DailyRow>,
    pub refund_lag: RefundLag,
    pub status_counts: BTreeMap<ReconciliationStatus, usize>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub passes: Vec<PassResult>,
    pub invalid: Vec<InvalidRecord>,
    pub classified: Vec<ClassifiedTransaction>,
    pub trips: Vec<TripAudit>,
    pub report: ReconReport,
}

impl ReconResult {
    pub fn pass(&self, kind: PassKind) -> Option<&PassResult> {
        self.passes.iter().find(|p| p.pass == kind)
    }

    /// Passes that could not run over complete data, with the reason.
    pub fn degraded_passes(&self) -> Vec<(PassKind, &PassStatus)> {
        self.passes
            .iter()
            .filter(|p| p.status != PassStatus::Complete)
            .map(|p| (p.pass, &p.status))
            .collect()
    }

    pub fn invalid_for(&self, source: SourceKind) -> impl Iterator<Item = &InvalidRecord> {
        self.invalid.iter().filter(move |r| r.source == source)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `YYYY-MM` bucket for monthly breakdowns.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(components: &[(Component, i64)]) -> PaymentClaim {
        PaymentClaim {
            id: "c1".into(),
            trip_id: Some("t1".into()),
            reported_at: NaiveDate::from_ymd_opt(2025, 9, 1)
                .unwrap()
                .and_hms_opt(22, 49, 20)
                .unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            description: "trip".into(),
            components: components.iter().copied().collect(),
        }
    }

    #[test]
    fn net_subtracts_fees() {
        let c = claim(&[
            (Component::Fare, 1000),
            (Component::Tip, 200),
            (Component::RefundOrder, 1530),
            (Component::InstantPayFee, 85),
        ]);
        assert_eq!(c.net_claimed_cents(), 1000 + 200 + 1530 - 85);
        assert_eq!(c.refund_cents(), 1530);
    }

    #[test]
    fn payout_sides_split_refunds_from_earnings() {
        let c = claim(&[
            (Component::Fare, 800),
            (Component::RefundOrder, 2530),
            (Component::InstantPayFee, 85),
        ]);
        let agg = ClaimAggregate {
            key: "t1".into(),
            trip_id: c.trip_id.clone(),
            date: c.date,
            claim_ids: vec![c.id.clone()],
            components: c.components.clone(),
        };
        let sides: Vec<(ClaimSide, i64)> = agg
            .payout_claims()
            .iter()
            .map(|p| (p.side, p.amount_cents))
            .collect();
        assert_eq!(sides, vec![(ClaimSide::Refund, 2530), (ClaimSide::Earnings, 715)]);

        let fare_only = ClaimAggregate {
            components: [(Component::Fare, 1000)].into_iter().collect(),
            ..agg
        };
        let sides = fare_only.payout_claims();
        assert_eq!(sides.len(), 1);
        assert_eq!(sides[0].side, ClaimSide::Earnings);
    }

    #[test]
    fn level_order_is_confidence_order() {
        assert!(MatchLevel::ExactKey > MatchLevel::DateAmountExact);
        assert!(MatchLevel::DateAmountExact > MatchLevel::DateAmountTolerance);
        assert!(MatchLevel::DateAmountTolerance > MatchLevel::Batch);
        assert!(MatchLevel::Batch > MatchLevel::DateOnly);
        assert!(MatchLevel::DateOnly > MatchLevel::Unmatched);
        assert!(MatchLevel::Batch.is_financial());
        assert!(!MatchLevel::DateOnly.is_financial());
        assert!(!MatchLevel::Unmatched.is_financial());
    }

    #[test]
    fn level_serializes_with_taxonomy_names() {
        let json = serde_json::to_string(&MatchLevel::DateAmountTolerance).unwrap();
        assert_eq!(json, "\"date+amount-tolerance\"");
        assert_eq!(MatchLevel::DateOnly.to_string(), "date-only-fallback");
    }

    #[test]
    fn receipt_amount_prefers_total() {
        let mut r = ReceiptEntry {
            id: "r1".into(),
            date: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
            trip_id: None,
            refund_cents: Some(2530),
            pickup_address: "kroger".into(),
            total_cents: None,
        };
        assert_eq!(r.amount_cents(), 2530);
        r.total_cents = Some(4012);
        assert_eq!(r.amount_cents(), 4012);
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ReconciliationStatus::RefundTracked).unwrap();
        assert_eq!(json, "\"REFUND_TRACKED\"");
    }
}
