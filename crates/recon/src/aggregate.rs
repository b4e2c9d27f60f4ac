use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{ClaimAggregate, Component, PaymentClaim};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Trip(String),
    /// Claims with no trip identifier are never merged.
    Claim(String),
}

/// Group claims by trip identifier, sum components, track earliest date.
///
/// Output is ordered by (date, key) so downstream passes see candidates
/// chronologically.
pub fn aggregate_claims(claims: &[PaymentClaim]) -> Vec<ClaimAggregate> {
    let mut groups: BTreeMap<GroupKey, (NaiveDate, Vec<String>, BTreeMap<Component, i64>)> =
        BTreeMap::new();

    for claim in claims {
        let key = match &claim.trip_id {
            Some(trip) => GroupKey::Trip(trip.clone()),
            None => GroupKey::Claim(claim.id.clone()),
        };
        let entry = groups
            .entry(key)
            .or_insert_with(|| (claim.date, Vec::new(), BTreeMap::new()));
        if claim.date < entry.0 {
            entry.0 = claim.date;
        }
        entry.1.push(claim.id.clone());
        for (component, cents) in &claim.components {
            *entry.2.entry(*component).or_insert(0) += cents;
        }
    }

    let mut out: Vec<ClaimAggregate> = groups
        .into_iter()
        .map(|(key, (date, claim_ids, components))| {
            let (key, trip_id) = match key {
                GroupKey::Trip(trip) => (trip.clone(), Some(trip)),
                GroupKey::Claim(id) => (id, None),
            };
            ClaimAggregate {
                key,
                trip_id,
                date,
                claim_ids,
                components,
            }
        })
        .collect();
    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.key.cmp(&b.key)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: &str, trip: Option<&str>, date: &str, parts: &[(Component, i64)]) -> PaymentClaim {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        PaymentClaim {
            id: id.into(),
            trip_id: trip.map(Into::into),
            reported_at: date.and_hms_opt(12, 0, 0).unwrap(),
            date,
            description: String::new(),
            components: parts.iter().copied().collect(),
        }
    }

    #[test]
    fn sums_components_per_trip() {
        let claims = vec![
            claim("c1", Some("t1"), "2025-09-02", &[(Component::Fare, 1000)]),
            claim(
                "c2",
                Some("t1"),
                "2025-09-01",
                &[(Component::Tip, 300), (Component::Fare, 50)],
            ),
            claim("c3", Some("t2"), "2025-09-03", &[(Component::RefundOrder, 2530)]),
        ];
        let aggs = aggregate_claims(&claims);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].key, "t1");
        assert_eq!(aggs[0].components[&Component::Fare], 1050);
        assert_eq!(aggs[0].net_claimed_cents(), 1350);
        assert_eq!(aggs[0].claim_ids, vec!["c1", "c2"]);
        assert_eq!(aggs[0].date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(aggs[1].refund_cents(), 2530);
    }

    #[test]
    fn tripless_claims_stay_single() {
        let claims = vec![
            claim("q1", None, "2025-09-05", &[(Component::Quest, 5000)]),
            claim("q2", None, "2025-09-04", &[(Component::Quest, 2500)]),
        ];
        let aggs = aggregate_claims(&claims);
        assert_eq!(aggs.len(), 2);
        // chronological
        assert_eq!(aggs[0].key, "q2");
        assert!(aggs[0].trip_id.is_none());
        assert_eq!(aggs[1].net_claimed_cents(), 5000);
    }
}
