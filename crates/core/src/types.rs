//! Shared domain types for the membership and billing engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A gym client identity record, keyed by a unique tax/identity document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    /// Immutable once created; globally unique across the directory.
    pub document_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub medical_notes: Option<String>,
    /// Linked online-account reference. Set exactly once, never reset.
    pub account_id: Option<Uuid>,
    /// Manual roster flag, independent of membership state.
    pub inactive: bool,
    pub created_at: DateTime<Utc>,
}

/// A purchasable membership offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_days: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored state of a membership period.
///
/// Only `Cancelled` and `Courtesy` are authoritative as stored; a
/// `TimeBound` period's public active/expired label is always derived from
/// its end date at read time, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
    TimeBound,
    Courtesy,
    Cancelled,
}

/// The public lifecycle label of a membership period, computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Active,
    Expired,
    Cancelled,
    Courtesy,
}

/// One instance of a client holding a plan for a fixed date range.
/// Dates are inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPeriod {
    pub id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: PeriodState,
    /// Denormalized copy of the client's linked account at creation time.
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MembershipPeriod {
    /// Pure derivation of the public status from stored state, end date and
    /// the evaluation date. Never mutates the period.
    pub fn effective_status(&self, today: NaiveDate) -> EffectiveStatus {
        match self.state {
            PeriodState::Cancelled => EffectiveStatus::Cancelled,
            PeriodState::Courtesy => EffectiveStatus::Courtesy,
            PeriodState::TimeBound => {
                if self.end_date >= today {
                    EffectiveStatus::Active
                } else {
                    EffectiveStatus::Expired
                }
            }
        }
    }

    /// Whether this period is currently granting access: non-cancelled and
    /// not yet past its end date. Courtesy periods count while in range.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.state != PeriodState::Cancelled && self.end_date >= today
    }
}

/// How money was received for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Mixed,
}

/// An immutable record of money received for a membership period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub membership_id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    /// The billing period this payment pays for. May lie ahead of the
    /// membership's own dates when the client renews in advance.
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub invoice_required: bool,
    /// Unique, sequential, fixed-width zero-padded. Assigned exactly once;
    /// back-filled only by the one-time normalization pass.
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(state: PeriodState, end: NaiveDate) -> MembershipPeriod {
        MembershipPeriod {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            start_date: end - chrono::Duration::days(29),
            end_date: end,
            state,
            account_id: None,
            created_at: Utc::now(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_effective_status_time_bound() {
        let p = period(PeriodState::TimeBound, d("2024-03-01"));
        assert_eq!(p.effective_status(d("2024-03-01")), EffectiveStatus::Active);
        assert_eq!(p.effective_status(d("2024-02-15")), EffectiveStatus::Active);
        assert_eq!(p.effective_status(d("2024-03-02")), EffectiveStatus::Expired);
    }

    #[test]
    fn test_effective_status_stored_states_pass_through() {
        let cancelled = period(PeriodState::Cancelled, d("2099-01-01"));
        assert_eq!(
            cancelled.effective_status(d("2024-01-01")),
            EffectiveStatus::Cancelled
        );

        let courtesy = period(PeriodState::Courtesy, d("2020-01-01"));
        // Courtesy is authoritative even when date-expired.
        assert_eq!(
            courtesy.effective_status(d("2024-01-01")),
            EffectiveStatus::Courtesy
        );
    }

    #[test]
    fn test_effective_status_is_pure() {
        let p = period(PeriodState::TimeBound, d("2024-06-30"));
        let today = d("2024-07-01");
        let first = p.effective_status(today);
        let second = p.effective_status(today);
        assert_eq!(first, second);
        assert_eq!(p.state, PeriodState::TimeBound); // untouched
    }

    #[test]
    fn test_is_current() {
        let today = d("2024-05-10");
        assert!(period(PeriodState::TimeBound, d("2024-05-10")).is_current(today));
        assert!(period(PeriodState::Courtesy, d("2024-06-01")).is_current(today));
        assert!(!period(PeriodState::TimeBound, d("2024-05-09")).is_current(today));
        assert!(!period(PeriodState::Cancelled, d("2024-06-01")).is_current(today));
    }
}
