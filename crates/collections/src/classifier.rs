//! Overdue-client classification.
//!
//! No single stored field answers "is this client current"; the scan
//! reconciles each client's period history and payment history against the
//! evaluation date alone.

use chrono::NaiveDate;
use gymledger_core::types::{Client, MembershipPeriod, Payment, PeriodState, Plan};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// One row of the collections report. Derived on every scan, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionEntry {
    pub client_id: Uuid,
    pub document_id: String,
    pub name: String,
    pub phone: String,
    /// Plan of the reference period, when resolvable.
    pub plan_name: Option<String>,
    pub plan_price: Option<f64>,
    /// The end date the overdue computation measured against.
    pub reference_end: NaiveDate,
    pub days_overdue: i64,
    pub last_payment_date: Option<NaiveDate>,
    pub last_payment_amount: Option<f64>,
}

/// Stateless classification over snapshots of the client, period, and
/// payment stores.
pub struct CollectionsClassifier;

impl CollectionsClassifier {
    /// Scan the roster for clients who are not up to date as of `as_of`.
    ///
    /// A client is up to date when a non-cancelled period still covers the
    /// date, or a payment's covered window does (the payment check catches
    /// records whose membership row went missing). Only clients with at
    /// least one non-cancelled period ever are eligible; cancelled-only
    /// histories count nowhere. Entries sort by days overdue, worst first.
    pub fn list_overdue(
        clients: &[Client],
        periods: &[MembershipPeriod],
        payments: &[Payment],
        plans: &[Plan],
        as_of: NaiveDate,
        max_days_overdue: Option<i64>,
    ) -> Vec<CollectionEntry> {
        let mut entries = Vec::new();

        for client in clients {
            let client_periods: Vec<&MembershipPeriod> = periods
                .iter()
                .filter(|p| p.client_id == client.id && p.state != PeriodState::Cancelled)
                .collect();
            let client_payments: Vec<&Payment> = payments
                .iter()
                .filter(|p| p.client_id == client.id)
                .collect();

            let membership_current = client_periods.iter().any(|p| p.is_current(as_of));
            let payment_current = client_payments.iter().any(|p| p.period_end >= as_of);
            if membership_current || payment_current {
                continue;
            }

            // Eligibility requires a non-cancelled period, so the reference
            // end always resolves from the same set. Clients with zero
            // qualifying periods are never in collections, even with stray
            // payments.
            let Some(reference_period) =
                client_periods.iter().max_by_key(|p| p.end_date).copied()
            else {
                continue;
            };
            let reference_end = reference_period.end_date;

            let days_overdue = (as_of - reference_end).num_days();
            if let Some(max) = max_days_overdue {
                if days_overdue > max {
                    continue;
                }
            }

            let plan = plans.iter().find(|pl| pl.id == reference_period.plan_id);
            let last_payment = client_payments.iter().max_by_key(|p| p.payment_date);

            entries.push(CollectionEntry {
                client_id: client.id,
                document_id: client.document_id.clone(),
                name: client.name.clone(),
                phone: client.phone.clone(),
                plan_name: plan.map(|p| p.name.clone()),
                plan_price: plan.map(|p| p.price),
                reference_end,
                days_overdue,
                last_payment_date: last_payment.map(|p| p.payment_date),
                last_payment_amount: last_payment.map(|p| p.amount),
            });
        }

        entries.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        debug!(as_of = %as_of, overdue = entries.len(), "Collections scan finished");
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn client(name: &str, doc: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            document_id: doc.to_string(),
            name: name.to_string(),
            email: None,
            phone: "11-5555-0000-1".to_string(),
            birth_date: None,
            weight_kg: None,
            medical_notes: None,
            account_id: None,
            inactive: false,
            created_at: Utc::now(),
        }
    }

    fn plan(name: &str, price: f64) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price,
            duration_days: 30,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn period(client: &Client, plan: &Plan, start: &str, end: &str, state: PeriodState) -> MembershipPeriod {
        MembershipPeriod {
            id: Uuid::new_v4(),
            client_id: client.id,
            plan_id: plan.id,
            start_date: d(start),
            end_date: d(end),
            state,
            account_id: None,
            created_at: Utc::now(),
        }
    }

    fn payment(client: &Client, date: &str, covered_end: &str, amount: f64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            membership_id: Uuid::new_v4(),
            client_id: client.id,
            plan_id: Uuid::new_v4(),
            amount,
            method: gymledger_core::types::PaymentMethod::Cash,
            payment_date: d(date),
            period_start: d(date),
            period_end: d(covered_end),
            invoice_required: false,
            invoice_number: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expired_client_is_thirty_days_overdue() {
        let c = client("Diego Mora", "27888111");
        let p = plan("Monthly", 100.0);
        let periods = vec![period(&c, &p, "2023-05-03", "2023-06-01", PeriodState::TimeBound)];

        let entries = CollectionsClassifier::list_overdue(
            &[c.clone()],
            &periods,
            &[],
            &[p],
            d("2023-07-01"),
            None,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].days_overdue, 30);
        assert_eq!(entries[0].reference_end, d("2023-06-01"));
        assert_eq!(entries[0].plan_name.as_deref(), Some("Monthly"));
        assert_eq!(entries[0].plan_price, Some(100.0));
    }

    #[test]
    fn test_current_client_never_listed() {
        let c = client("Eva Luz", "30222333");
        let p = plan("Monthly", 100.0);
        let periods = vec![period(&c, &p, "2023-06-15", "2023-07-14", PeriodState::TimeBound)];

        let entries =
            CollectionsClassifier::list_overdue(&[c], &periods, &[], &[p], d("2023-07-01"), None);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_covering_payment_keeps_client_current() {
        // Membership row lost in a migration, but the payment still covers
        // the date. The defensive payment check keeps them out of the list.
        let c = client("Hugo Paz", "25111999");
        let p = plan("Monthly", 100.0);
        let periods = vec![period(&c, &p, "2023-01-01", "2023-01-30", PeriodState::TimeBound)];
        let payments = vec![payment(&c, "2023-06-20", "2023-07-19", 100.0)];

        let entries = CollectionsClassifier::list_overdue(
            &[c],
            &periods,
            &payments,
            &[p],
            d("2023-07-01"),
            None,
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn test_zero_period_client_excluded_even_with_stray_payments() {
        let c = client("Sin Alta", "20123987");
        let payments = vec![payment(&c, "2023-01-10", "2023-02-09", 100.0)];

        let entries =
            CollectionsClassifier::list_overdue(&[c], &[], &payments, &[], d("2023-07-01"), None);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_cancelled_only_history_excluded() {
        let c = client("Baja Total", "26000444");
        let p = plan("Monthly", 100.0);
        let periods = vec![period(&c, &p, "2023-01-01", "2023-01-30", PeriodState::Cancelled)];

        let entries =
            CollectionsClassifier::list_overdue(&[c], &periods, &[], &[p], d("2023-07-01"), None);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_max_days_filter_and_descending_sort() {
        let p = plan("Monthly", 100.0);
        let recent = client("Reciente", "31000001");
        let old = client("Antiguo", "22000002");
        let ancient = client("Fundador", "15000003");
        let periods = vec![
            period(&recent, &p, "2023-05-22", "2023-06-20", PeriodState::TimeBound),
            period(&old, &p, "2023-03-03", "2023-04-01", PeriodState::TimeBound),
            period(&ancient, &p, "2022-01-01", "2022-01-30", PeriodState::TimeBound),
        ];
        let clients = vec![recent.clone(), old.clone(), ancient.clone()];

        let all = CollectionsClassifier::list_overdue(
            &clients,
            &periods,
            &[],
            &[p.clone()],
            d("2023-07-01"),
            None,
        );
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].client_id, ancient.id);
        assert_eq!(all[2].client_id, recent.id);
        assert!(all.windows(2).all(|w| w[0].days_overdue >= w[1].days_overdue));

        let capped = CollectionsClassifier::list_overdue(
            &clients,
            &periods,
            &[],
            &[p],
            d("2023-07-01"),
            Some(120),
        );
        assert_eq!(capped.len(), 2);
        assert!(capped.iter().all(|e| e.days_overdue <= 120));
    }

    #[test]
    fn test_days_overdue_never_negative() {
        let c = client("Justo Hoy", "28999000");
        let p = plan("Monthly", 100.0);
        // Ends exactly on the evaluation date: still current, not listed.
        let periods = vec![period(&c, &p, "2023-06-02", "2023-07-01", PeriodState::TimeBound)];

        let entries = CollectionsClassifier::list_overdue(
            &[c.clone()],
            &periods,
            &[],
            &[p.clone()],
            d("2023-07-01"),
            None,
        );
        assert!(entries.is_empty());

        // One day past the end: overdue by exactly 1.
        let entries =
            CollectionsClassifier::list_overdue(&[c], &periods, &[], &[p], d("2023-07-02"), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].days_overdue, 1);
    }

    #[test]
    fn test_last_payment_reported() {
        let c = client("Paga Tarde", "24555666");
        let p = plan("Monthly", 100.0);
        let periods = vec![period(&c, &p, "2023-05-03", "2023-06-01", PeriodState::TimeBound)];
        let payments = vec![
            payment(&c, "2023-04-03", "2023-05-02", 90.0),
            payment(&c, "2023-05-03", "2023-06-01", 100.0),
        ];

        let entries = CollectionsClassifier::list_overdue(
            &[c],
            &periods,
            &payments,
            &[p],
            d("2023-07-01"),
            None,
        );
        assert_eq!(entries[0].last_payment_date, Some(d("2023-05-03")));
        assert_eq!(entries[0].last_payment_amount, Some(100.0));
    }
}
