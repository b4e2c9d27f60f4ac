use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::TimeReference;
use crate::model::{
    BankRow, BankTransaction, Component, InvalidRecord, PaymentClaim, PaymentRow, ReceiptEntry,
    ReceiptRow, SourceKind, Trip, TripRow, TripStatus,
};

/// Typed records that survived normalization, plus the ones that did not.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub valid: Vec<T>,
    pub invalid: Vec<InvalidRecord>,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            invalid: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

static TRAILING_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)\s*([+-])(\d{2}):?(\d{2})$")
        .expect("offset pattern is valid")
});

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Offset in hours for the timezone abbreviations the sources emit.
fn abbreviation_hours(abbr: &str) -> Option<i32> {
    let hours = match abbr {
        "UTC" | "GMT" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return None,
    };
    Some(hours)
}

/// Strip a trailing zone abbreviation (`... CDT`) or a glued `Z`.
/// An alphabetic suffix that is not a known zone is an error.
fn split_zone_abbreviation(text: &str) -> Result<(&str, Option<FixedOffset>), String> {
    if let Some(body) = text.strip_suffix('Z') {
        if body.ends_with(|c: char| c.is_ascii_digit()) {
            return Ok((body, FixedOffset::east_opt(0)));
        }
    }

    let Some((body, last)) = text.rsplit_once(char::is_whitespace) else {
        return Ok((text, None));
    };
    if !last.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok((text, None));
    }
    let upper = last.to_ascii_uppercase();
    if upper == "AM" || upper == "PM" {
        return Ok((text, None));
    }
    match abbreviation_hours(&upper) {
        Some(hours) => Ok((body.trim_end(), FixedOffset::east_opt(hours * 3600))),
        None => Err(format!("unknown timezone suffix '{last}'")),
    }
}

fn split_numeric_offset(text: &str) -> (String, Option<FixedOffset>) {
    let Some(caps) = TRAILING_OFFSET.captures(text) else {
        return (text.to_string(), None);
    };
    let hours: i32 = caps[3].parse().unwrap_or(0);
    let minutes: i32 = caps[4].parse().unwrap_or(0);
    let mut seconds = hours * 3600 + minutes * 60;
    if &caps[2] == "-" {
        seconds = -seconds;
    }
    (caps[1].trim_end().to_string(), FixedOffset::east_opt(seconds))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a source timestamp onto a single reference clock.
///
/// A numeric offset wins over an abbreviation when both are present. With
/// [`TimeReference::SourceLocal`] the wall-clock reading is kept as recorded;
/// with [`TimeReference::Utc`] offset-carrying values are shifted to UTC and
/// offset-less values are assumed to already be UTC.
pub fn parse_timestamp(text: &str, reference: TimeReference) -> Result<NaiveDateTime, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty timestamp".into());
    }

    let (body, abbr_offset) = split_zone_abbreviation(trimmed)?;
    let (body, numeric_offset) = split_numeric_offset(body);
    let offset = numeric_offset.or(abbr_offset);

    let naive =
        parse_naive(&body).ok_or_else(|| format!("unrecognized timestamp format '{trimmed}'"))?;

    match (reference, offset) {
        (TimeReference::Utc, Some(off)) => Ok(off
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.naive_utc())
            .unwrap_or(naive)),
        _ => Ok(naive),
    }
}

// ---------------------------------------------------------------------------
// Amounts, addresses, links
// ---------------------------------------------------------------------------

/// Largest magnitude accepted for one amount: ten billion dollars. Keeps
/// every later sum over a statement's worth of rows inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Parse display money text (`$1,234.50`, `(12.00)`, `+3.1`) into cents,
/// rounding half away from zero.
pub fn parse_amount_cents(text: &str) -> Result<i64, String> {
    let stripped: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '+') && !c.is_whitespace())
        .collect();

    let (digits, negate) = match stripped
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (stripped.as_str(), false),
    };
    if digits.is_empty() {
        return Err("empty amount".into());
    }

    let value = Decimal::from_str(digits).map_err(|e| format!("not a decimal amount: {e}"))?;
    let cents = value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .filter(|c| c.abs() <= MAX_AMOUNT_CENTS)
        .ok_or_else(|| "amount out of range".to_string())?;

    Ok(if negate { -cents } else { cents })
}

/// Empty or missing cells are absent; anything else must parse.
pub fn parse_optional_cents(text: Option<&str>) -> Result<Option<i64>, String> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => parse_amount_cents(t).map(Some),
    }
}

pub fn normalize_address(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trip identifiers are compared trimmed and case-folded.
pub fn normalize_key(text: &str) -> Option<String> {
    let key = text.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_lowercase())
    }
}

static TRIP_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/trips/([0-9a-fA-F-]{8,})").expect("trip link pattern is valid"));

/// Pull the trip identifier out of a trip URL. `None` when the link does not
/// carry one.
pub fn extract_trip_id(link: &str) -> Option<String> {
    TRIP_LINK
        .captures(link)
        .and_then(|caps| normalize_key(&caps[1]))
}

// ---------------------------------------------------------------------------
// Per-source normalization
// ---------------------------------------------------------------------------

fn invalid(
    source: SourceKind,
    record_id: &str,
    field: &str,
    value: &str,
    reason: String,
) -> InvalidRecord {
    warn!("invalid {source} record '{record_id}': {field}={value:?} ({reason})");
    InvalidRecord {
        source,
        record_id: record_id.to_string(),
        field: field.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn record_id(source: SourceKind, raw: &str, row: usize) -> Result<String, InvalidRecord> {
    let id = raw.trim();
    if id.is_empty() {
        let placeholder = format!("row {}", row + 1);
        return Err(invalid(source, &placeholder, "id", raw, "missing identifier".into()));
    }
    Ok(id.to_string())
}

pub fn normalize_trips(rows: &[TripRow], reference: TimeReference) -> Normalized<Trip> {
    let mut out = Normalized::default();
    for (i, row) in rows.iter().enumerate() {
        let id = match record_id(SourceKind::Trips, &row.trip_id, i) {
            Ok(id) => id.to_lowercase(),
            Err(bad) => {
                out.invalid.push(bad);
                continue;
            }
        };
        let completed_at = match parse_timestamp(&row.completed_at, reference) {
            Ok(ts) => ts,
            Err(reason) => {
                out.invalid.push(invalid(
                    SourceKind::Trips,
                    &id,
                    "completed_at",
                    &row.completed_at,
                    reason,
                ));
                continue;
            }
        };
        let distance_miles = row.distance.as_deref().and_then(|d| {
            let d = d.trim().trim_end_matches("mi").trim();
            if d.is_empty() {
                return None;
            }
            match d.parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("trip '{id}': unreadable distance {d:?}, leaving it empty");
                    None
                }
            }
        });
        let status = if row.status.trim().eq_ignore_ascii_case("completed") {
            TripStatus::Completed
        } else {
            TripStatus::Other
        };
        out.valid.push(Trip {
            id,
            date: completed_at.date(),
            completed_at,
            pickup: row.pickup.trim().to_string(),
            dropoff: row.dropoff.trim().to_string(),
            distance_miles,
            status,
        });
    }
    out
}

fn component_cells(row: &PaymentRow) -> [(Component, &Option<String>); 11] {
    [
        (Component::Fare, &row.fare),
        (Component::Tip, &row.tip),
        (Component::Incentive, &row.incentive),
        (Component::Boost, &row.boost),
        (Component::Quest, &row.quest),
        (Component::ReturnTripFare, &row.return_trip_fare),
        (Component::DeliveryAdjustment, &row.delivery_adjustment),
        (Component::Adjustment, &row.adjustment),
        (Component::RefundOrder, &row.refund_order),
        (Component::RefundToll, &row.refund_toll),
        (Component::InstantPayFee, &row.instant_pay_fee),
    ]
}

pub fn normalize_claims(rows: &[PaymentRow], reference: TimeReference) -> Normalized<PaymentClaim> {
    let mut out = Normalized::default();
    'rows: for (i, row) in rows.iter().enumerate() {
        let id = match record_id(SourceKind::Payments, &row.claim_id, i) {
            Ok(id) => id,
            Err(bad) => {
                out.invalid.push(bad);
                continue;
            }
        };
        let reported_at = match parse_timestamp(&row.reported_at, reference) {
            Ok(ts) => ts,
            Err(reason) => {
                out.invalid.push(invalid(
                    SourceKind::Payments,
                    &id,
                    "reported_at",
                    &row.reported_at,
                    reason,
                ));
                continue;
            }
        };

        let mut components = BTreeMap::new();
        for (component, cell) in component_cells(row) {
            match parse_optional_cents(cell.as_deref()) {
                Ok(Some(cents)) => {
                    components.insert(component, cents);
                }
                Ok(None) => {}
                Err(reason) => {
                    out.invalid.push(invalid(
                        SourceKind::Payments,
                        &id,
                        component.name(),
                        cell.as_deref().unwrap_or_default(),
                        reason,
                    ));
                    continue 'rows;
                }
            }
        }

        out.valid.push(PaymentClaim {
            id,
            trip_id: row.trip_id.as_deref().and_then(normalize_key),
            date: reported_at.date(),
            reported_at,
            description: row.description.trim().to_string(),
            components,
        });
    }
    out
}

pub fn normalize_bank(rows: &[BankRow], reference: TimeReference) -> Normalized<BankTransaction> {
    let mut out = Normalized::default();
    for (i, row) in rows.iter().enumerate() {
        let id = match record_id(SourceKind::Bank, &row.txn_id, i) {
            Ok(id) => id,
            Err(bad) => {
                out.invalid.push(bad);
                continue;
            }
        };
        let date = match parse_timestamp(&row.posted_date, reference) {
            Ok(ts) => ts.date(),
            Err(reason) => {
                out.invalid.push(invalid(
                    SourceKind::Bank,
                    &id,
                    "posted_date",
                    &row.posted_date,
                    reason,
                ));
                continue;
            }
        };
        let amount_cents = match parse_amount_cents(&row.amount) {
            Ok(c) => c,
            Err(reason) => {
                out.invalid
                    .push(invalid(SourceKind::Bank, &id, "amount", &row.amount, reason));
                continue;
            }
        };
        out.valid.push(BankTransaction {
            id,
            date,
            description: row.description.trim().to_string(),
            amount_cents,
            statement: row.statement.trim().to_string(),
            pickup_address: row
                .pickup_address
                .as_deref()
                .map(normalize_address)
                .filter(|a| !a.is_empty()),
        });
    }
    out
}

pub fn normalize_receipts(
    rows: &[ReceiptRow],
    reference: TimeReference,
) -> Normalized<ReceiptEntry> {
    let mut out = Normalized::default();
    for (i, row) in rows.iter().enumerate() {
        let id = match record_id(SourceKind::Receipts, &row.entry_id, i) {
            Ok(id) => id,
            Err(bad) => {
                out.invalid.push(bad);
                continue;
            }
        };
        let date = match parse_timestamp(&row.date, reference) {
            Ok(ts) => ts.date(),
            Err(reason) => {
                out.invalid
                    .push(invalid(SourceKind::Receipts, &id, "date", &row.date, reason));
                continue;
            }
        };
        let refund_cents = match parse_optional_cents(row.refund.as_deref()) {
            Ok(c) => c,
            Err(reason) => {
                let value = row.refund.as_deref().unwrap_or_default();
                out.invalid
                    .push(invalid(SourceKind::Receipts, &id, "refund", value, reason));
                continue;
            }
        };
        let total_cents = match parse_optional_cents(row.total.as_deref()) {
            Ok(c) => c,
            Err(reason) => {
                let value = row.total.as_deref().unwrap_or_default();
                out.invalid
                    .push(invalid(SourceKind::Receipts, &id, "total", value, reason));
                continue;
            }
        };
        if refund_cents.is_none() && total_cents.is_none() {
            out.invalid.push(invalid(
                SourceKind::Receipts,
                &id,
                "total",
                "",
                "neither a total nor a refund amount".into(),
            ));
            continue;
        }
        let trip_id = row.link.as_deref().and_then(extract_trip_id);
        if trip_id.is_none() && row.link.as_deref().is_some_and(|l| !l.trim().is_empty()) {
            warn!("receipt '{id}': link carries no trip identifier");
        }
        out.valid.push(ReceiptEntry {
            id,
            date,
            trip_id,
            refund_cents,
            pickup_address: normalize_address(&row.pickup_address),
            total_cents,
        });
    }
    out
}
