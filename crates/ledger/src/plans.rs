//! Plan catalog: purchasable membership offerings.
//!
//! Price and duration edits only shape periods created afterwards; issued
//! periods and payments keep the values they were created with.

use chrono::Utc;
use dashmap::DashMap;
use gymledger_core::types::Plan;
use gymledger_core::{GymError, GymResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_days: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_days: Option<u32>,
}

/// Thread-safe in-memory plan store.
pub struct PlanCatalog {
    plans: DashMap<Uuid, Plan>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self {
            plans: DashMap::new(),
        }
    }

    pub fn create(&self, req: CreatePlanRequest) -> GymResult<Plan> {
        if req.name.trim().is_empty() {
            return Err(GymError::validation("name", "must not be empty"));
        }
        if req.price <= 0.0 {
            return Err(GymError::validation("price", "must be greater than zero"));
        }
        if req.duration_days == 0 {
            return Err(GymError::validation(
                "duration_days",
                "must be greater than zero",
            ));
        }

        let plan = Plan {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            description: req.description,
            price: req.price,
            duration_days: req.duration_days,
            active: true,
            created_at: Utc::now(),
        };
        self.plans.insert(plan.id, plan.clone());
        info!(plan_id = %plan.id, name = %plan.name, price = plan.price, "Plan created");
        Ok(plan)
    }

    pub fn update(&self, id: Uuid, req: UpdatePlanRequest) -> GymResult<Plan> {
        if let Some(price) = req.price {
            if price <= 0.0 {
                return Err(GymError::validation("price", "must be greater than zero"));
            }
        }
        if let Some(duration) = req.duration_days {
            if duration == 0 {
                return Err(GymError::validation(
                    "duration_days",
                    "must be greater than zero",
                ));
            }
        }
        let mut entry = self
            .plans
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("plan", id))?;
        let p = entry.value_mut();
        if let Some(name) = req.name {
            p.name = name;
        }
        if let Some(description) = req.description {
            p.description = Some(description);
        }
        if let Some(price) = req.price {
            p.price = price;
        }
        if let Some(duration) = req.duration_days {
            p.duration_days = duration;
        }
        Ok(p.clone())
    }

    /// Soft-delete: the plan stays resolvable for issued periods but can no
    /// longer be billed against.
    pub fn deactivate(&self, id: Uuid) -> GymResult<Plan> {
        let mut entry = self
            .plans
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("plan", id))?;
        entry.value_mut().active = false;
        info!(plan_id = %id, "Plan deactivated");
        Ok(entry.value().clone())
    }

    pub fn get(&self, id: Uuid) -> Option<Plan> {
        self.plans.get(&id).map(|r| r.value().clone())
    }

    /// Resolve a plan and reject it when inactive. Billing paths go through
    /// here; read paths use `get`.
    pub fn get_active(&self, id: Uuid) -> GymResult<Plan> {
        let plan = self
            .get(id)
            .ok_or_else(|| GymError::not_found("plan", id))?;
        if !plan.active {
            return Err(GymError::validation(
                "plan_id",
                format!("plan {} is inactive", plan.name),
            ));
        }
        Ok(plan)
    }

    pub fn active_plans(&self) -> Vec<Plan> {
        self.plans
            .iter()
            .filter(|r| r.value().active)
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Plan> {
        self.plans.iter().map(|r| r.value().clone()).collect()
    }

    pub(crate) fn remove(&self, id: Uuid) -> Option<Plan> {
        self.plans.remove(&id).map(|(_, p)| p)
    }
}
