//! Admin roster bucketing and ordering.
//!
//! Clients needing action (renewal due, currently active) surface above
//! dormant ones. Bucket assignment is a pure, total function of four flags.

use chrono::NaiveDate;
use gymledger_core::types::{Client, MembershipPeriod, PeriodState};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterBucket {
    /// Holds a period that still covers today.
    Active,
    /// Has history, nothing current, not manually retired: worth a call.
    Renewal,
    /// Never held a (non-cancelled) membership.
    NoProducts,
    /// Manually flagged inactive by an operator, with membership history.
    Inactive,
}

impl RosterBucket {
    fn priority(self) -> u8 {
        match self {
            RosterBucket::Active => 0,
            RosterBucket::Renewal => 1,
            RosterBucket::NoProducts | RosterBucket::Inactive => 3,
        }
    }
}

/// Assign exactly one bucket from the four classification flags.
///
/// Buckets are considered in order: active, renewal, no-products, inactive.
/// An active-by-date period always wins, the manual inactive flag overrides
/// renewal, and a client with no membership at all stays in no-products even
/// when flagged inactive. Cancelled periods feed none of these flags.
pub fn classify(
    has_active: bool,
    has_expired_only: bool,
    has_any_membership: bool,
    manually_inactive: bool,
) -> RosterBucket {
    if has_active {
        RosterBucket::Active
    } else if has_expired_only && !manually_inactive {
        RosterBucket::Renewal
    } else if !has_any_membership {
        RosterBucket::NoProducts
    } else if manually_inactive {
        RosterBucket::Inactive
    } else {
        // has_any_membership without has_active/has_expired_only cannot
        // arise from real period data; it still maps here deterministically.
        RosterBucket::NoProducts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedClient {
    pub client_id: Uuid,
    pub document_id: String,
    pub name: String,
    pub bucket: RosterBucket,
    /// Latest non-cancelled period end, the secondary sort key.
    pub latest_end: Option<NaiveDate>,
    pub manually_inactive: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Bucket and sort the full roster for list display.
///
/// Sort: bucket priority, then latest non-cancelled end date descending,
/// then creation date descending. Clients with no membership carry no end
/// date and fall back to the creation-date tiebreak.
pub fn rank_all(
    clients: &[Client],
    periods: &[MembershipPeriod],
    as_of: NaiveDate,
) -> Vec<RankedClient> {
    let mut ranked: Vec<RankedClient> = clients
        .iter()
        .map(|client| {
            let non_cancelled: Vec<&MembershipPeriod> = periods
                .iter()
                .filter(|p| p.client_id == client.id && p.state != PeriodState::Cancelled)
                .collect();
            let has_active = non_cancelled.iter().any(|p| p.is_current(as_of));
            let has_any = !non_cancelled.is_empty();
            let has_expired_only = has_any && !has_active;
            let latest_end = non_cancelled.iter().map(|p| p.end_date).max();

            RankedClient {
                client_id: client.id,
                document_id: client.document_id.clone(),
                name: client.name.clone(),
                bucket: classify(has_active, has_expired_only, has_any, client.inactive),
                latest_end,
                manually_inactive: client.inactive,
                created_at: client.created_at,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.bucket
            .priority()
            .cmp(&b.bucket.priority())
            .then_with(|| b.latest_end.cmp(&a.latest_end))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    ranked
}

/// Filter a ranked roster down to one bucket. The inactive filter matches
/// the manual flag itself, so a flagged client still billing today is
/// caught even though their bucket is Active.
pub fn filter_roster(ranked: &[RankedClient], bucket: RosterBucket) -> Vec<RankedClient> {
    ranked
        .iter()
        .filter(|r| match bucket {
            RosterBucket::Inactive => r.manually_inactive,
            other => r.bucket == other,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_classify_is_total_over_all_flag_combinations() {
        // Every one of the 16 combinations maps to exactly one bucket.
        for bits in 0..16u8 {
            let has_active = bits & 1 != 0;
            let has_expired_only = bits & 2 != 0;
            let has_any = bits & 4 != 0;
            let inactive = bits & 8 != 0;

            let bucket = classify(has_active, has_expired_only, has_any, inactive);
            let expected = if has_active {
                RosterBucket::Active
            } else if has_expired_only && !inactive {
                RosterBucket::Renewal
            } else if !has_any {
                RosterBucket::NoProducts
            } else if inactive {
                RosterBucket::Inactive
            } else {
                RosterBucket::NoProducts
            };
            assert_eq!(bucket, expected, "bits {bits:04b}");
        }
    }

    #[test]
    fn test_active_beats_manual_inactive_flag() {
        assert_eq!(classify(true, false, true, true), RosterBucket::Active);
    }

    #[test]
    fn test_inactive_overrides_renewal() {
        assert_eq!(classify(false, true, true, true), RosterBucket::Inactive);
        assert_eq!(classify(false, true, true, false), RosterBucket::Renewal);
    }

    #[test]
    fn test_no_membership_stays_no_products_even_when_flagged() {
        assert_eq!(classify(false, false, false, true), RosterBucket::NoProducts);
        assert_eq!(classify(false, false, false, false), RosterBucket::NoProducts);
    }

    fn client(name: &str, inactive: bool, created_days_ago: i64) -> Client {
        Client {
            id: Uuid::new_v4(),
            document_id: format!("doc-{name}"),
            name: name.to_string(),
            email: None,
            phone: "11-4000-5000-6".to_string(),
            birth_date: None,
            weight_kg: None,
            medical_notes: None,
            account_id: None,
            inactive,
            created_at: Utc::now() - Duration::days(created_days_ago),
        }
    }

    fn period(client: &Client, start: &str, end: &str, state: PeriodState) -> MembershipPeriod {
        MembershipPeriod {
            id: Uuid::new_v4(),
            client_id: client.id,
            plan_id: Uuid::new_v4(),
            start_date: d(start),
            end_date: d(end),
            state,
            account_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rank_orders_active_then_renewal_then_rest() {
        let as_of = d("2024-03-15");
        let active = client("activa", false, 100);
        let renewal = client("renovar", false, 200);
        let fresh = client("nueva", false, 1);
        let retired = client("retirada", true, 300);

        let periods = vec![
            period(&active, "2024-03-01", "2024-03-30", PeriodState::TimeBound),
            period(&renewal, "2024-01-01", "2024-01-30", PeriodState::TimeBound),
            period(&retired, "2023-01-01", "2023-01-30", PeriodState::TimeBound),
        ];
        let ranked = rank_all(
            &[retired.clone(), fresh.clone(), renewal.clone(), active.clone()],
            &periods,
            as_of,
        );

        let order: Vec<Uuid> = ranked.iter().map(|r| r.client_id).collect();
        assert_eq!(order[0], active.id);
        assert_eq!(order[1], renewal.id);
        // Same bottom priority: the one with a period end sorts above the
        // membership-less client by end date, fresh beats nothing here.
        assert_eq!(order[2], retired.id);
        assert_eq!(order[3], fresh.id);
    }

    #[test]
    fn test_renewal_recency_orders_within_bucket() {
        let as_of = d("2024-03-15");
        let recent = client("reciente", false, 50);
        let stale = client("vieja", false, 50);
        let periods = vec![
            period(&recent, "2024-02-01", "2024-03-01", PeriodState::TimeBound),
            period(&stale, "2023-10-01", "2023-10-30", PeriodState::TimeBound),
        ];

        let ranked = rank_all(&[stale.clone(), recent.clone()], &periods, as_of);
        assert_eq!(ranked[0].client_id, recent.id);
        assert_eq!(ranked[1].client_id, stale.id);
    }

    #[test]
    fn test_cancelled_only_client_has_no_products() {
        let as_of = d("2024-03-15");
        let c = client("cancelada", false, 10);
        let periods = vec![period(&c, "2024-01-01", "2024-01-30", PeriodState::Cancelled)];

        let ranked = rank_all(&[c], &periods, as_of);
        assert_eq!(ranked[0].bucket, RosterBucket::NoProducts);
        assert_eq!(ranked[0].latest_end, None);
    }

    #[test]
    fn test_inactive_filter_matches_flag_not_bucket() {
        let as_of = d("2024-03-15");
        let flagged_active = client("marcada", true, 10);
        let periods = vec![period(
            &flagged_active,
            "2024-03-01",
            "2024-03-30",
            PeriodState::TimeBound,
        )];

        let ranked = rank_all(&[flagged_active.clone()], &periods, as_of);
        assert_eq!(ranked[0].bucket, RosterBucket::Active);

        let inactive_view = filter_roster(&ranked, RosterBucket::Inactive);
        assert_eq!(inactive_view.len(), 1);
        assert_eq!(inactive_view[0].client_id, flagged_active.id);
    }

    #[test]
    fn test_courtesy_period_counts_as_active() {
        let as_of = d("2024-03-15");
        let c = client("cortesia", false, 10);
        let periods = vec![period(&c, "2024-03-01", "2024-03-30", PeriodState::Courtesy)];

        let ranked = rank_all(&[c], &periods, as_of);
        assert_eq!(ranked[0].bucket, RosterBucket::Active);
    }
}
