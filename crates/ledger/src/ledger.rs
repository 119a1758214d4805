//! Membership period store and chaining logic.
//!
//! Chaining rule: a renewal starts the day after the client's latest
//! non-cancelled, not-yet-expired period ends, so early renewals never lose
//! paid days and no client ever holds two date-overlapping periods.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use gymledger_core::types::{MembershipPeriod, PeriodState};
use gymledger_core::{GymError, GymResult};
use gymledger_directory::ClientDirectory;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::plans::PlanCatalog;

/// The dates a new period would occupy, before anything is written.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PeriodQuote {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// True when the quoted start lies in the future: the client renewed
    /// before their current period expired.
    pub advance_payment: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePeriodRequest {
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub courtesy: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePeriodRequest {
    pub plan_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub state: Option<PeriodState>,
}

/// Thread-safe in-memory membership ledger.
pub struct MembershipLedger {
    periods: DashMap<Uuid, MembershipPeriod>,
    plans: Arc<PlanCatalog>,
    directory: Arc<ClientDirectory>,
    /// Per-client creation locks: two concurrent chained creations for the
    /// same client must not both read the same latest end date.
    client_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl MembershipLedger {
    pub fn new(plans: Arc<PlanCatalog>, directory: Arc<ClientDirectory>) -> Self {
        info!("Membership ledger initialized");
        Self {
            periods: DashMap::new(),
            plans,
            directory,
            client_locks: DashMap::new(),
        }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    // ─── Chaining ──────────────────────────────────────────────────────────

    /// Compute the dates the client's next period would occupy, without
    /// writing anything.
    ///
    /// If the client has a non-cancelled period whose end date is still
    /// `>= today`, the new period chains from it: start = that end + 1 day.
    /// Otherwise the caller-supplied dates (or today + plan duration) apply.
    pub fn quote_next_period(
        &self,
        client_id: Uuid,
        plan_id: Uuid,
        explicit_start: Option<NaiveDate>,
        explicit_end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> GymResult<PeriodQuote> {
        if self.directory.get(client_id).is_none() {
            return Err(GymError::not_found("client", client_id));
        }
        let plan = self.plans.get_active(plan_id)?;
        let span = Duration::days(i64::from(plan.duration_days) - 1);

        let quote = match self.latest_current_period(client_id, today) {
            Some(latest) => {
                let start = latest.end_date + Duration::days(1);
                PeriodQuote {
                    start_date: start,
                    end_date: start + span,
                    advance_payment: start > today,
                }
            }
            None => {
                let start = explicit_start.unwrap_or(today);
                let end = explicit_end.unwrap_or(start + span);
                if end < start {
                    return Err(GymError::validation(
                        "end_date",
                        "must not precede start_date",
                    ));
                }
                PeriodQuote {
                    start_date: start,
                    end_date: end,
                    advance_payment: start > today,
                }
            }
        };
        debug!(
            client_id = %client_id,
            start = %quote.start_date,
            end = %quote.end_date,
            advance = quote.advance_payment,
            "Next period quoted"
        );
        Ok(quote)
    }

    /// Quote and persist the client's next period in one step, serialized
    /// per client.
    pub fn create_chained_period(
        &self,
        client_id: Uuid,
        plan_id: Uuid,
        explicit_start: Option<NaiveDate>,
        explicit_end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> GymResult<(MembershipPeriod, PeriodQuote)> {
        let lock = self.client_lock(client_id);
        let _guard = lock.lock();

        let quote = self.quote_next_period(client_id, plan_id, explicit_start, explicit_end, today)?;
        let period = self.insert_period(
            client_id,
            plan_id,
            quote.start_date,
            quote.end_date,
            PeriodState::TimeBound,
        );
        metrics::counter!("ledger.periods_chained").increment(1);
        Ok((period, quote))
    }

    // ─── Plain persistence ─────────────────────────────────────────────────

    /// Operator-driven period creation with explicit dates.
    pub fn create_period(&self, req: CreatePeriodRequest) -> GymResult<MembershipPeriod> {
        if self.directory.get(req.client_id).is_none() {
            return Err(GymError::not_found("client", req.client_id));
        }
        self.plans.get_active(req.plan_id)?;
        if req.end_date < req.start_date {
            return Err(GymError::validation(
                "end_date",
                "must not precede start_date",
            ));
        }

        let lock = self.client_lock(req.client_id);
        let _guard = lock.lock();
        let state = if req.courtesy {
            PeriodState::Courtesy
        } else {
            PeriodState::TimeBound
        };
        Ok(self.insert_period(req.client_id, req.plan_id, req.start_date, req.end_date, state))
    }

    /// Re-validate and apply changes to an existing period.
    pub fn update_period(&self, id: Uuid, req: UpdatePeriodRequest) -> GymResult<MembershipPeriod> {
        if let Some(plan_id) = req.plan_id {
            self.plans.get_active(plan_id)?;
        }
        let mut entry = self
            .periods
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("membership period", id))?;
        let p = entry.value_mut();

        let start = req.start_date.unwrap_or(p.start_date);
        let end = req.end_date.unwrap_or(p.end_date);
        if end < start {
            return Err(GymError::validation(
                "end_date",
                "must not precede start_date",
            ));
        }

        if let Some(plan_id) = req.plan_id {
            p.plan_id = plan_id;
        }
        p.start_date = start;
        p.end_date = end;
        if let Some(state) = req.state {
            p.state = state;
        }
        Ok(p.clone())
    }

    /// Soft-cancel a period. It is excluded from chaining and from every
    /// classification from this point on; nothing else is renumbered.
    pub fn cancel(&self, id: Uuid) -> GymResult<MembershipPeriod> {
        let mut entry = self
            .periods
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("membership period", id))?;
        entry.value_mut().state = PeriodState::Cancelled;
        metrics::counter!("ledger.periods_cancelled").increment(1);
        info!(period_id = %id, "Membership period cancelled");
        Ok(entry.value().clone())
    }

    /// Stamp a period's stored state back to TimeBound. Used when a payment
    /// lands on a courtesy period.
    pub fn mark_time_bound(&self, id: Uuid) -> GymResult<MembershipPeriod> {
        let mut entry = self
            .periods
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("membership period", id))?;
        entry.value_mut().state = PeriodState::TimeBound;
        Ok(entry.value().clone())
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    pub fn get_period(&self, id: Uuid) -> Option<MembershipPeriod> {
        self.periods.get(&id).map(|r| r.value().clone())
    }

    pub fn periods_for_client(&self, client_id: Uuid) -> Vec<MembershipPeriod> {
        let mut periods: Vec<MembershipPeriod> = self
            .periods
            .iter()
            .filter(|r| r.value().client_id == client_id)
            .map(|r| r.value().clone())
            .collect();
        periods.sort_by_key(|p| p.start_date);
        periods
    }

    pub fn all_periods(&self) -> Vec<MembershipPeriod> {
        self.periods.iter().map(|r| r.value().clone()).collect()
    }

    /// The client's non-cancelled period with the latest end date that has
    /// not yet expired, if any. This is the chaining anchor.
    pub fn latest_current_period(
        &self,
        client_id: Uuid,
        today: NaiveDate,
    ) -> Option<MembershipPeriod> {
        self.periods
            .iter()
            .filter(|r| r.value().client_id == client_id && r.value().is_current(today))
            .max_by_key(|r| r.value().end_date)
            .map(|r| r.value().clone())
    }

    // ─── Removal guards ────────────────────────────────────────────────────

    /// A client with any non-cancelled period must never be hard-deleted.
    pub fn guard_client_removal(&self, client_id: Uuid) -> GymResult<()> {
        let has_history = self
            .periods
            .iter()
            .any(|r| r.value().client_id == client_id && r.value().state != PeriodState::Cancelled);
        if has_history {
            return Err(GymError::Conflict(
                "client has membership history; flag them inactive instead".to_string(),
            ));
        }
        Ok(())
    }

    /// Hard-remove a plan. Rejected while any non-cancelled period still
    /// references it; deactivation is the supported path in that case.
    pub fn remove_plan(&self, plan_id: Uuid) -> GymResult<()> {
        let referenced = self
            .periods
            .iter()
            .any(|r| r.value().plan_id == plan_id && r.value().state != PeriodState::Cancelled);
        if referenced {
            return Err(GymError::Conflict(
                "plan has active memberships, deactivate instead".to_string(),
            ));
        }
        self.plans
            .remove(plan_id)
            .ok_or_else(|| GymError::not_found("plan", plan_id))?;
        Ok(())
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    fn insert_period(
        &self,
        client_id: Uuid,
        plan_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        state: PeriodState,
    ) -> MembershipPeriod {
        let account_id = self.directory.get(client_id).and_then(|c| c.account_id);
        let period = MembershipPeriod {
            id: Uuid::new_v4(),
            client_id,
            plan_id,
            start_date: start,
            end_date: end,
            state,
            account_id,
            created_at: Utc::now(),
        };
        self.periods.insert(period.id, period.clone());
        metrics::counter!("ledger.periods_created").increment(1);
        info!(
            period_id = %period.id,
            client_id = %client_id,
            start = %start,
            end = %end,
            state = ?state,
            "Membership period created"
        );
        period
    }

    fn client_lock(&self, client_id: Uuid) -> Arc<Mutex<()>> {
        self.client_locks
            .entry(client_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
