//! Membership ledger: plan catalog and membership-period chaining.
//!
//! Owns the sequence of membership periods per client, computes chained
//! start/end dates for renewals (including advance payments), and derives
//! lifecycle status from the wall-clock date. Data stored in DashMap
//! (development); swap to PostgreSQL for production.

pub mod ledger;
pub mod plans;

pub use ledger::{
    CreatePeriodRequest, MembershipLedger, PeriodQuote, UpdatePeriodRequest,
};
pub use plans::{CreatePlanRequest, PlanCatalog, UpdatePlanRequest};
