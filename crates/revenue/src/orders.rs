//! Unified order feed across the gym and online sales channels.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use gymledger_core::types::PaymentMethod;
use gymledger_core::{GymError, GymResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    /// In-person payment recorded at the front desk.
    Gym,
    /// Order placed through the online storefront.
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

/// One revenue event. Gym-channel rows are emitted by the payment recorder;
/// online rows arrive from the storefront's payment-confirmation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub channel: SalesChannel,
    pub status: OrderStatus,
    pub amount: f64,
    pub method: PaymentMethod,
    pub client_document: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Thread-safe in-memory order store.
pub struct OrderFeed {
    orders: DashMap<Uuid, Order>,
}

impl Default for OrderFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderFeed {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    /// Record an online storefront order. Online money always counts as a
    /// transfer; the channel has no cash handling.
    pub fn record_online(
        &self,
        amount: f64,
        client_document: Option<String>,
        status: OrderStatus,
    ) -> GymResult<Order> {
        if amount <= 0.0 {
            return Err(GymError::validation("amount", "must be greater than zero"));
        }
        let order = self.insert(SalesChannel::Online, status, amount, PaymentMethod::Transfer, client_document);
        Ok(order)
    }

    /// Record the order-equivalent of an in-person payment, already approved.
    pub fn record_gym_sale(
        &self,
        amount: f64,
        method: PaymentMethod,
        client_document: Option<String>,
    ) -> GymResult<Order> {
        if amount <= 0.0 {
            return Err(GymError::validation("amount", "must be greater than zero"));
        }
        Ok(self.insert(SalesChannel::Gym, OrderStatus::Approved, amount, method, client_document))
    }

    /// Apply a payment-confirmation (or rejection) event to an order.
    pub fn set_status(&self, id: Uuid, status: OrderStatus) -> GymResult<Order> {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("order", id))?;
        entry.value_mut().status = status;
        info!(order_id = %id, status = ?status, "Order status updated");
        Ok(entry.value().clone())
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|r| r.value().clone())
    }

    pub fn all(&self) -> Vec<Order> {
        self.orders.iter().map(|r| r.value().clone()).collect()
    }

    /// Approved orders for one channel whose creation date falls inside the
    /// inclusive window.
    pub fn approved_in_window(
        &self,
        channel: SalesChannel,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|r| {
                let o = r.value();
                let date = o.created_at.date_naive();
                o.channel == channel
                    && o.status == OrderStatus::Approved
                    && date >= start
                    && date <= end
            })
            .map(|r| r.value().clone())
            .collect()
    }

    fn insert(
        &self,
        channel: SalesChannel,
        status: OrderStatus,
        amount: f64,
        method: PaymentMethod,
        client_document: Option<String>,
    ) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            channel,
            status,
            amount,
            method,
            client_document,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        order
    }
}
