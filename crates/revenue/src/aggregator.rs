//! Two-channel revenue aggregation over a date window.
//!
//! The gym row reads Payment records by payment date and method; the online
//! row reads approved storefront orders by creation date, attributed wholly
//! to transfer. The combined row sums both without double counting: the
//! gym order-equivalents in the feed are never read here.

use chrono::NaiveDate;
use gymledger_core::types::{Payment, PaymentMethod};
use serde::Serialize;
use tracing::debug;

use crate::orders::{Order, OrderStatus, SalesChannel};

/// Which channel(s) a revenue query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFilter {
    Gym,
    Online,
    Both,
}

/// Revenue totals for one channel (or the combined row).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RevenueBreakdown {
    pub total: f64,
    pub cash: f64,
    pub transfer: f64,
    pub mixed: f64,
    pub count: u64,
}

impl RevenueBreakdown {
    fn add(&mut self, amount: f64, method: PaymentMethod) {
        self.total += amount;
        match method {
            PaymentMethod::Cash => self.cash += amount,
            PaymentMethod::Transfer => self.transfer += amount,
            PaymentMethod::Mixed => self.mixed += amount,
        }
        self.count += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub gym: Option<RevenueBreakdown>,
    pub online: Option<RevenueBreakdown>,
    /// Present only when both channels were requested.
    pub combined: Option<RevenueBreakdown>,
}

/// Stateless aggregation over snapshots of payments and orders.
pub struct RevenueAggregator;

impl RevenueAggregator {
    /// Sum revenue over the inclusive `[start, end]` window.
    pub fn aggregate(
        payments: &[Payment],
        orders: &[Order],
        start: NaiveDate,
        end: NaiveDate,
        channels: ChannelFilter,
    ) -> RevenueReport {
        let gym = matches!(channels, ChannelFilter::Gym | ChannelFilter::Both)
            .then(|| Self::gym_breakdown(payments, start, end));
        let online = matches!(channels, ChannelFilter::Online | ChannelFilter::Both)
            .then(|| Self::online_breakdown(orders, start, end));

        let combined = match (channels, gym, online) {
            (ChannelFilter::Both, Some(g), Some(o)) => Some(RevenueBreakdown {
                total: g.total + o.total,
                cash: g.cash,
                transfer: g.transfer + o.transfer,
                mixed: g.mixed,
                count: g.count + o.count,
            }),
            _ => None,
        };

        debug!(%start, %end, ?channels, "Revenue aggregated");
        RevenueReport {
            start,
            end,
            gym,
            online,
            combined,
        }
    }

    fn gym_breakdown(payments: &[Payment], start: NaiveDate, end: NaiveDate) -> RevenueBreakdown {
        let mut row = RevenueBreakdown::default();
        for payment in payments {
            if payment.payment_date >= start && payment.payment_date <= end {
                row.add(payment.amount, payment.method);
            }
        }
        row
    }

    fn online_breakdown(orders: &[Order], start: NaiveDate, end: NaiveDate) -> RevenueBreakdown {
        let mut row = RevenueBreakdown::default();
        for order in orders {
            let date = order.created_at.date_naive();
            if order.channel == SalesChannel::Online
                && order.status == OrderStatus::Approved
                && date >= start
                && date <= end
            {
                // The online channel has no cash/mixed split.
                row.add(order.amount, PaymentMethod::Transfer);
            }
        }
        row
    }
}
