//! Payment recording: validate, number, persist, reactivate, emit.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use gymledger_core::config::BillingConfig;
use gymledger_core::types::{Payment, PaymentMethod, PeriodState};
use gymledger_core::{GymError, GymResult};
use gymledger_directory::ClientDirectory;
use gymledger_ledger::MembershipLedger;
use gymledger_revenue::OrderFeed;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sequencer::{fallback_number, normalize_invoice_numbers, InvoiceSequencer};

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub membership_id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    /// The billing window this payment covers; may lie ahead of today for
    /// advance renewals.
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub invoice_required: bool,
    /// Caller-supplied number, used verbatim when present.
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

/// Thread-safe in-memory payment store plus the side effects a payment
/// carries: invoice numbering, membership reactivation, revenue emission.
pub struct PaymentRecorder {
    payments: DashMap<Uuid, Payment>,
    sequencer: InvoiceSequencer,
    ledger: Arc<MembershipLedger>,
    directory: Arc<ClientDirectory>,
    orders: Arc<OrderFeed>,
}

impl PaymentRecorder {
    pub fn new(
        config: &BillingConfig,
        ledger: Arc<MembershipLedger>,
        directory: Arc<ClientDirectory>,
        orders: Arc<OrderFeed>,
    ) -> Self {
        let sequencer = InvoiceSequencer::new(config.invoice_width);
        // Fresh store: nothing issued yet.
        sequencer.seed(0);
        info!(
            invoice_width = config.invoice_width,
            "Payment recorder initialized"
        );
        Self {
            payments: DashMap::new(),
            sequencer,
            ledger,
            directory,
            orders,
        }
    }

    /// Record a payment against an existing membership period.
    ///
    /// Validation rejects before any write. The payment itself is the
    /// primary effect; invoice numbering and revenue emission degrade
    /// gracefully and never block it.
    pub fn record(&self, req: RecordPaymentRequest) -> GymResult<Payment> {
        if req.amount <= 0.0 {
            return Err(GymError::validation("amount", "must be greater than zero"));
        }
        if req.period_end < req.period_start {
            return Err(GymError::validation(
                "period_end",
                "must not precede period_start",
            ));
        }
        if self.directory.get(req.client_id).is_none() {
            return Err(GymError::not_found("client", req.client_id));
        }
        self.ledger.plans().get_active(req.plan_id)?;

        let membership = self
            .ledger
            .get_period(req.membership_id)
            .ok_or_else(|| GymError::not_found("membership period", req.membership_id))?;
        if membership.client_id != req.client_id {
            return Err(GymError::validation(
                "client_id",
                "membership belongs to a different client",
            ));
        }
        if membership.state == PeriodState::Cancelled {
            return Err(GymError::validation(
                "membership_id",
                "membership is cancelled; reactivate it before recording a payment",
            ));
        }

        let invoice_number = match req.invoice_number {
            Some(explicit) => explicit,
            None => self.sequencer.next().unwrap_or_else(|| {
                metrics::counter!("billing.invoice_fallbacks").increment(1);
                warn!("Invoice counter unavailable, falling back to timestamp number");
                fallback_number(Utc::now())
            }),
        };

        let payment = Payment {
            id: Uuid::new_v4(),
            membership_id: req.membership_id,
            client_id: req.client_id,
            plan_id: req.plan_id,
            amount: req.amount,
            method: req.method,
            payment_date: req.payment_date,
            period_start: req.period_start,
            period_end: req.period_end,
            invoice_required: req.invoice_required,
            invoice_number: Some(invoice_number),
            notes: req.notes,
            created_at: Utc::now(),
        };
        self.payments.insert(payment.id, payment.clone());
        metrics::counter!("billing.payments_recorded").increment(1);
        info!(
            payment_id = %payment.id,
            client_id = %payment.client_id,
            amount = payment.amount,
            method = ?payment.method,
            invoice = payment.invoice_number.as_deref().unwrap_or(""),
            "Payment recorded"
        );

        // A payment always reactivates a courtesy-stamped membership.
        if membership.state == PeriodState::Courtesy {
            if let Err(e) = self.ledger.mark_time_bound(membership.id) {
                warn!(error = %e, membership_id = %membership.id, "Reactivation failed");
            }
        }

        if let Err(e) = self.emit_revenue(&payment) {
            warn!(error = %e, payment_id = %payment.id, "Revenue emission failed; payment kept");
        }

        Ok(payment)
    }

    /// Insert a historical payment as-is, bypassing numbering and side
    /// effects. Migration imports only; follow with `normalize_invoices`.
    pub fn import_payment(&self, payment: Payment) {
        self.payments.insert(payment.id, payment);
    }

    /// One-time back-fill of missing invoice numbers across the store,
    /// then re-seed the live counter past everything issued.
    pub fn normalize_invoices(&self) -> usize {
        let mut snapshot = self.all();
        let before: usize = snapshot
            .iter()
            .filter(|p| p.invoice_number.is_none())
            .count();
        let last_backfilled = normalize_invoice_numbers(&mut snapshot, self.sequencer.width());

        // The back-fill already starts past the highest existing number, so
        // its last value seeds the scan; the loop still covers the all-numbered
        // case where nothing was assigned.
        let mut max_issued = last_backfilled.unwrap_or(0);
        for payment in snapshot {
            if let Some(n) = payment
                .invoice_number
                .as_deref()
                .and_then(|n| n.parse::<u64>().ok())
            {
                max_issued = max_issued.max(n);
            }
            self.payments.insert(payment.id, payment);
        }
        self.sequencer.seed(max_issued);
        before
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    pub fn get(&self, id: Uuid) -> Option<Payment> {
        self.payments.get(&id).map(|r| r.value().clone())
    }

    pub fn all(&self) -> Vec<Payment> {
        self.payments.iter().map(|r| r.value().clone()).collect()
    }

    pub fn for_client(&self, client_id: Uuid) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|r| r.value().client_id == client_id)
            .map(|r| r.value().clone())
            .collect();
        payments.sort_by_key(|p| (p.payment_date, p.created_at));
        payments
    }

    pub fn last_payment_for(&self, client_id: Uuid) -> Option<Payment> {
        self.for_client(client_id).into_iter().last()
    }

    fn emit_revenue(&self, payment: &Payment) -> GymResult<()> {
        let document = self
            .directory
            .get(payment.client_id)
            .map(|c| c.document_id);
        self.orders
            .record_gym_sale(payment.amount, payment.method, document)?;
        Ok(())
    }
}
