// Subscription plans and purchase flow

use chrono::{Duration, Utc};
use diesel_async::AsyncPgConnection;
use uuid::Uuid;

use crate::models::subscription::{NewSubscription, Subscription, SubscriptionError, STATUS_ACTIVE};
use crate::utils::ServiceError;

/// A purchasable plan. Plans are startup configuration, not database rows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Plan {
    pub name: &'static str,
    pub price_cents: i64,
    /// Credit granted per purchased month
    pub credit_cents: i64,
    pub generation_limit: i32,
    pub template_tier: &'static str,
    pub duration_months: i32,
}

impl Plan {
    /// Credit granted by one purchase: the per-month allowance scaled by
    /// the plan's duration
    pub fn total_credit_cents(&self) -> i64 {
        self.credit_cents * self.duration_months as i64
    }
}

/// The fixed set of plans on offer
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        PlanCatalog {
            plans: vec![
                Plan {
                    name: "starter",
                    price_cents: 9_90,
                    credit_cents: 10_00,
                    generation_limit: 10,
                    template_tier: "basic",
                    duration_months: 1,
                },
                Plan {
                    name: "creator",
                    price_cents: 19_90,
                    credit_cents: 25_00,
                    generation_limit: 25,
                    template_tier: "premium",
                    duration_months: 1,
                },
                Plan {
                    name: "studio",
                    price_cents: 49_90,
                    credit_cents: 70_00,
                    generation_limit: 70,
                    template_tier: "premium",
                    duration_months: 1,
                },
            ],
        }
    }
}

impl PlanCatalog {
    pub fn all(&self) -> &[Plan] {
        &self.plans
    }

    pub fn find(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.name == name)
    }
}

/// Purchase and extension of subscriptions
#[derive(Debug, Clone)]
pub struct SubscriptionService {
    catalog: PlanCatalog,
}

impl SubscriptionService {
    pub fn new(catalog: PlanCatalog) -> Self {
        SubscriptionService { catalog }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Current subscription state for a user, after lazy expiry
    pub async fn current_for_user(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, ServiceError> {
        Subscription::expire_lapsed(conn, user_id)
            .await
            .map_err(map_err)?;
        Subscription::find_active_for_user(conn, user_id)
            .await
            .map_err(map_err)
    }

    /// Purchase a plan. A user with an active subscription gets it extended
    /// in place: credit topped up by the plan's allowance and the end date
    /// pushed out by the plan's duration. Otherwise a fresh row is created.
    pub async fn purchase(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        plan_name: &str,
    ) -> Result<Subscription, ServiceError> {
        let plan = self
            .catalog
            .find(plan_name)
            .ok_or_else(|| ServiceError::ValidationError(format!("unknown plan: {}", plan_name)))?;

        Subscription::expire_lapsed(conn, user_id)
            .await
            .map_err(map_err)?;

        match Subscription::extend_active(
            conn,
            user_id,
            plan.total_credit_cents(),
            plan.duration_months,
        )
        .await
        {
            Ok(extended) => {
                tracing::info!(
                    user_id = %user_id,
                    plan = plan.name,
                    end_date = %extended.end_date,
                    "Extended active subscription"
                );
                return Ok(extended);
            },
            Err(SubscriptionError::NoActive) => {},
            Err(e) => return Err(map_err(e)),
        }

        let now = Utc::now();
        // Month granularity is applied by Postgres on extension; the initial
        // term uses a 30-day month approximation consistently with display
        let end = now + Duration::days(30 * plan.duration_months as i64);

        let created = Subscription::create(
            conn,
            NewSubscription {
                user_id,
                plan_name: plan.name.to_string(),
                credit_cents: plan.total_credit_cents(),
                generation_limit: plan.generation_limit,
                template_tier: plan.template_tier.to_string(),
                status: STATUS_ACTIVE.to_string(),
                start_date: now,
                end_date: end,
            },
        )
        .await;

        match created {
            Ok(sub) => {
                tracing::info!(user_id = %user_id, plan = plan.name, "Created subscription");
                Ok(sub)
            },
            // Lost a race with a concurrent purchase; fold into that row
            Err(SubscriptionError::AlreadyActive) => Subscription::extend_active(
                conn,
                user_id,
                plan.total_credit_cents(),
                plan.duration_months,
            )
            .await
            .map_err(map_err),
            Err(e) => Err(map_err(e)),
        }
    }
}

fn map_err(e: SubscriptionError) -> ServiceError {
    match e {
        SubscriptionError::NoActive => ServiceError::NoSubscription,
        SubscriptionError::InsufficientCredit => ServiceError::InsufficientCredit,
        SubscriptionError::AlreadyActive => {
            ServiceError::ValidationError("already subscribed".to_string())
        },
        SubscriptionError::Database(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = PlanCatalog::default();
        assert!(catalog.find("starter").is_some());
        assert!(catalog.find("creator").is_some());
        assert!(catalog.find("studio").is_some());
        assert!(catalog.find("enterprise").is_none());
    }

    #[test]
    fn test_plan_credit_covers_generation_limit() {
        // Each plan's credit should fund exactly its advertised image count
        for plan in PlanCatalog::default().all() {
            assert_eq!(
                plan.credit_cents,
                plan.generation_limit as i64 * crate::services::ledger::IMAGE_COST_CENTS,
                "plan {} credit does not match its generation limit",
                plan.name
            );
        }
    }

    #[test]
    fn test_purchase_credit_scales_with_duration() {
        // A d-month purchase grants d times the monthly allowance, both on
        // the fresh-row path and on the extension UPDATE's increment
        let quarterly = Plan {
            name: "studio-quarterly",
            price_cents: 139_90,
            credit_cents: 70_00,
            generation_limit: 70,
            template_tier: "premium",
            duration_months: 3,
        };
        assert_eq!(quarterly.total_credit_cents(), 210_00);

        for plan in PlanCatalog::default().all() {
            assert_eq!(
                plan.total_credit_cents(),
                plan.credit_cents * plan.duration_months as i64
            );
        }
    }
}
