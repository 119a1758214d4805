//! Invoice numbering: a serialized monotonic counter.
//!
//! The number is an opaque, zero-padded numeric string. Assignment is
//! best-effort: a payment must never be blocked by numbering, so callers
//! fall back to a timestamp-derived number when the counter is unavailable.

use chrono::{DateTime, Utc};
use gymledger_core::types::Payment;
use parking_lot::Mutex;
use tracing::info;

/// Monotonic invoice counter guarded by a single mutex, so two concurrent
/// assignments can never observe the same count.
pub struct InvoiceSequencer {
    /// Last issued number. `None` until seeded from the payment store.
    counter: Mutex<Option<u64>>,
    width: usize,
}

impl InvoiceSequencer {
    pub fn new(width: usize) -> Self {
        Self {
            counter: Mutex::new(None),
            width,
        }
    }

    /// Seed the counter with the highest number already issued (the count
    /// of existing payments for a dense sequence).
    pub fn seed(&self, last_issued: u64) {
        *self.counter.lock() = Some(last_issued);
    }

    /// Issue the next number, or `None` when the counter was never seeded.
    pub fn next(&self) -> Option<String> {
        let mut guard = self.counter.lock();
        let counter = guard.as_mut()?;
        *counter += 1;
        Some(pad(*counter, self.width))
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// Timestamp-derived stand-in used when sequential assignment is
/// unavailable. Distinguishable from sequential numbers by its magnitude.
pub fn fallback_number(now: DateTime<Utc>) -> String {
    now.timestamp().to_string()
}

fn pad(value: u64, width: usize) -> String {
    format!("{value:0width$}")
}

/// One-time normalization pass: walk payments in creation order and
/// back-fill every missing invoice number, starting one past the highest
/// numeric number already present. Records that already carry a number are
/// left untouched. Returns the last number issued, if any were assigned.
pub fn normalize_invoice_numbers(payments: &mut [Payment], width: usize) -> Option<u64> {
    let mut running = payments
        .iter()
        .filter_map(|p| p.invoice_number.as_deref())
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    let mut order: Vec<usize> = (0..payments.len()).collect();
    order.sort_by_key(|&i| payments[i].created_at);

    let mut assigned = 0usize;
    for i in order {
        if payments[i].invoice_number.is_none() {
            running += 1;
            payments[i].invoice_number = Some(pad(running, width));
            assigned += 1;
        }
    }

    if assigned > 0 {
        info!(assigned, last = running, "Invoice numbers back-filled");
        Some(running)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use gymledger_core::types::PaymentMethod;
    use uuid::Uuid;

    fn payment(invoice: Option<&str>, created_offset_secs: i64) -> Payment {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Payment {
            id: Uuid::new_v4(),
            membership_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            amount: 100.0,
            method: PaymentMethod::Cash,
            payment_date: date,
            period_start: date,
            period_end: date,
            invoice_required: true,
            invoice_number: invoice.map(str::to_string),
            notes: None,
            created_at: Utc::now() + Duration::seconds(created_offset_secs),
        }
    }

    #[test]
    fn test_sequential_assignment_from_zero() {
        let seq = InvoiceSequencer::new(4);
        seq.seed(0);
        assert_eq!(seq.next().unwrap(), "0001");
        assert_eq!(seq.next().unwrap(), "0002");
        assert_eq!(seq.next().unwrap(), "0003");
    }

    #[test]
    fn test_numbers_strictly_increase() {
        let seq = InvoiceSequencer::new(4);
        seq.seed(41);
        let first: u64 = seq.next().unwrap().parse().unwrap();
        let second: u64 = seq.next().unwrap().parse().unwrap();
        assert!(second > first);
        assert_eq!(first, 42);
    }

    #[test]
    fn test_unseeded_counter_yields_none() {
        let seq = InvoiceSequencer::new(4);
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_fallback_number_is_numeric() {
        let n = fallback_number(Utc::now());
        assert!(n.parse::<i64>().is_ok());
    }

    #[test]
    fn test_normalize_backfills_in_creation_order() {
        let mut payments = vec![
            payment(Some("0007"), 0),
            payment(None, 10),
            payment(None, 5),
            payment(Some("0002"), 20),
        ];

        let last = normalize_invoice_numbers(&mut payments, 4).unwrap();
        assert_eq!(last, 9);
        // Existing numbers untouched.
        assert_eq!(payments[0].invoice_number.as_deref(), Some("0007"));
        assert_eq!(payments[3].invoice_number.as_deref(), Some("0002"));
        // Missing ones filled by created_at order, starting past the max.
        assert_eq!(payments[2].invoice_number.as_deref(), Some("0008"));
        assert_eq!(payments[1].invoice_number.as_deref(), Some("0009"));
    }

    #[test]
    fn test_normalize_noop_when_all_numbered() {
        let mut payments = vec![payment(Some("0001"), 0), payment(Some("0002"), 1)];
        assert!(normalize_invoice_numbers(&mut payments, 4).is_none());
    }
}
