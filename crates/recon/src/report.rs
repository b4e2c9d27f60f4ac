//! Report rollups layered on top of pass records, classifications and the
//! trip audit.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::{
    month_key, BankTransaction, Category, CategorySummary, ClaimAggregate, ClassifiedTransaction,
    DailyRow, MatchRecord, MonthSummary, RefundLag, TripAudit,
};

/// Per month: claimed net, money in, and spending by category. Spending
/// buckets are magnitudes; `deposited_cents` is every credit that month.
pub fn monthly_summary(
    aggregates: &[ClaimAggregate],
    classified: &[ClassifiedTransaction],
    audits: &[TripAudit],
) -> Vec<MonthSummary> {
    let mut months: BTreeMap<String, MonthSummary> = BTreeMap::new();
    for a in aggregates {
        let key = month_key(a.date);
        let row = months.entry(key.clone()).or_default();
        row.month = key;
        row.claimed_cents += a.net_claimed_cents();
    }

    for t in classified {
        let key = month_key(t.date);
        let row = months.entry(key.clone()).or_default();
        row.month = key;
        if t.amount_cents > 0 {
            row.deposited_cents += t.amount_cents;
        }
        let magnitude = t.amount_cents.abs();
        match t.category {
            Category::CustomerReimbursement => row.reimbursed_cents += magnitude,
            Category::Deposit => {}
            Category::BusinessExpense => row.business_cents += magnitude,
            Category::FinancialTransfer => row.financial_cents += magnitude,
            Category::Personal => row.personal_cents += magnitude,
            Category::PersonalUncategorized => row.uncategorized_cents += magnitude,
        }
    }

    for audit in audits {
        let key = month_key(audit.completed_at.date());
        let row = months.entry(key.clone()).or_default();
        row.month = key;
        row.trips += 1;
    }

    months.into_values().collect()
}

/// Count and signed total per (category, subcategory), in category order.
pub fn category_summary(classified: &[ClassifiedTransaction]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<(Category, Option<String>), (usize, i64)> = BTreeMap::new();
    for t in classified {
        let entry = groups
            .entry((t.category, t.subcategory.clone()))
            .or_insert((0, 0));
        entry.0 += 1;
        entry.1 += t.amount_cents;
    }
    groups
        .into_iter()
        .map(|((category, subcategory), (transactions, total_cents))| CategorySummary {
            category,
            subcategory,
            transactions,
            total_cents,
        })
        .collect()
}

/// Day-by-day claimed net against payout deposits. A day is `matched` when
/// the two agree within `tolerance_cents`.
pub fn daily_reconciliation(
    aggregates: &[ClaimAggregate],
    deposits: &[BankTransaction],
    audits: &[TripAudit],
    tolerance_cents: i64,
) -> Vec<DailyRow> {
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut claimed: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut deposited: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut trips: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for a in aggregates {
        days.insert(a.date);
        *claimed.entry(a.date).or_insert(0) += a.net_claimed_cents();
    }
    for d in deposits {
        days.insert(d.date);
        *deposited.entry(d.date).or_insert(0) += d.amount_cents;
    }
    for t in audits {
        let date = t.completed_at.date();
        days.insert(date);
        *trips.entry(date).or_insert(0) += 1;
    }

    days.into_iter()
        .map(|date| {
            let claimed_cents = claimed.get(&date).copied().unwrap_or(0);
            let deposited_cents = deposited.get(&date).copied().unwrap_or(0);
            let difference_cents = claimed_cents - deposited_cents;
            DailyRow {
                date,
                trips: trips.get(&date).copied().unwrap_or(0),
                claimed_cents,
                deposited_cents,
                difference_cents,
                matched: difference_cents.abs() <= tolerance_cents,
            }
        })
        .collect()
}

/// How long receipts waited for their bank counterpart. Lag is bank date
/// minus receipt date, floored at zero; receipts without a financial match
/// count as missing.
pub fn refund_lag(receipt_bank: &[MatchRecord]) -> RefundLag {
    let mut lag = RefundLag::default();
    for r in receipt_bank {
        if !r.is_financial() {
            lag.missing_payout += 1;
            continue;
        }
        let days = r.date_offset_days.map(|d| (-d).max(0)).unwrap_or(0);
        match days {
            0..=7 => lag.within_week += 1,
            8..=30 => lag.within_month += 1,
            _ => lag.over_month += 1,
        }
        lag.max_lag_days = Some(lag.max_lag_days.map_or(days, |m| m.max(days)));
    }
    lag
}
