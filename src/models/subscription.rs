// Subscription database model and credit ledger updates

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::subscriptions;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_EXPIRED: &str = "expired";

/// Subscription database model
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, QueryableByName, Selectable, Identifiable,
)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: String,
    pub credit_cents: i64,
    pub generation_limit: i32,
    pub template_tier: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New subscription for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub plan_name: String,
    pub credit_cents: i64,
    pub generation_limit: i32,
    pub template_tier: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Admin-editable subscription fields
#[derive(Debug, Default, Deserialize, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionUpdate {
    pub credit_cents: Option<i64>,
    pub generation_limit: Option<i32>,
    pub template_tier: Option<String>,
    pub status: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Errors for subscription operations
#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("No active subscription")]
    NoActive,

    #[error("Insufficient credit")]
    InsufficientCredit,

    #[error("User already has an active subscription")]
    AlreadyActive,
}

impl Subscription {
    /// Find the user's active subscription, if any
    pub async fn find_active_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Option<Self>, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        subscriptions
            .filter(user_id.eq(owner))
            .filter(status.eq(STATUS_ACTIVE))
            .first::<Subscription>(conn)
            .await
            .optional()
            .map_err(SubscriptionError::Database)
    }

    /// Create a new subscription row.
    ///
    /// The partial unique index on (user_id) WHERE status = 'active' makes
    /// a second active row a unique violation, mapped to AlreadyActive.
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_sub: NewSubscription,
    ) -> Result<Self, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        diesel::insert_into(subscriptions)
            .values(&new_sub)
            .get_result::<Subscription>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => SubscriptionError::AlreadyActive,
                _ => SubscriptionError::Database(e),
            })
    }

    /// Atomically debit `cost_cents` from the user's active subscription.
    ///
    /// The balance check lives in the UPDATE's WHERE clause, so two
    /// concurrent debits can never drive the balance negative: the second
    /// one matches zero rows once the first has spent the remainder.
    /// Returns the subscription with its post-debit balance.
    pub async fn try_debit(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        cost_cents: i64,
    ) -> Result<Self, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        let debited = diesel::update(
            subscriptions
                .filter(user_id.eq(owner))
                .filter(status.eq(STATUS_ACTIVE))
                .filter(credit_cents.ge(cost_cents)),
        )
        .set((
            credit_cents.eq(credit_cents - cost_cents),
            updated_at.eq(diesel::dsl::now),
        ))
        .get_result::<Subscription>(conn)
        .await
        .optional()?;

        match debited {
            Some(sub) => Ok(sub),
            // Zero rows: either no active row, or the balance was short.
            // Re-read to tell the two apart for the caller's error.
            None => match Self::find_active_for_user(conn, owner).await? {
                Some(_) => Err(SubscriptionError::InsufficientCredit),
                None => Err(SubscriptionError::NoActive),
            },
        }
    }

    /// Extend the active subscription in place: top up credit and push the
    /// end date out by whole months. Returns the updated row.
    pub async fn extend_active(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        add_credit_cents: i64,
        add_months: i32,
    ) -> Result<Self, SubscriptionError> {
        use diesel::sql_types::{Int4, Int8, Uuid as SqlUuid};

        diesel::sql_query(
            "UPDATE subscriptions \
             SET credit_cents = credit_cents + $2, \
                 end_date = end_date + make_interval(months => $3), \
                 updated_at = NOW() \
             WHERE user_id = $1 AND status = 'active' \
             RETURNING *",
        )
        .bind::<SqlUuid, _>(owner)
        .bind::<Int8, _>(add_credit_cents)
        .bind::<Int4, _>(add_months)
        .get_result::<Subscription>(conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => SubscriptionError::NoActive,
            _ => SubscriptionError::Database(e),
        })
    }

    /// Flip lapsed rows to expired so the partial unique index frees up.
    /// Called lazily before reads and purchases rather than by a sweeper.
    pub async fn expire_lapsed(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<usize, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        diesel::update(
            subscriptions
                .filter(user_id.eq(owner))
                .filter(status.eq(STATUS_ACTIVE))
                .filter(end_date.le(diesel::dsl::now)),
        )
        .set((status.eq(STATUS_EXPIRED), updated_at.eq(diesel::dsl::now)))
        .execute(conn)
        .await
        .map_err(SubscriptionError::Database)
    }

    /// Most recent subscriptions across all users, for the admin dashboard
    pub async fn list_recent(
        conn: &mut AsyncPgConnection,
        limit: i64,
    ) -> Result<Vec<Self>, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        subscriptions
            .order(created_at.desc())
            .limit(limit)
            .load::<Subscription>(conn)
            .await
            .map_err(SubscriptionError::Database)
    }

    /// Admin adjustment of an arbitrary subscription row
    pub async fn admin_update(
        conn: &mut AsyncPgConnection,
        sub_id: Uuid,
        changes: SubscriptionUpdate,
    ) -> Result<Option<Self>, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        diesel::update(subscriptions.filter(id.eq(sub_id)))
            .set((&changes, updated_at.eq(diesel::dsl::now)))
            .get_result::<Subscription>(conn)
            .await
            .optional()
            .map_err(SubscriptionError::Database)
    }

    pub async fn admin_delete(
        conn: &mut AsyncPgConnection,
        sub_id: Uuid,
    ) -> Result<usize, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        diesel::delete(subscriptions.filter(id.eq(sub_id)))
            .execute(conn)
            .await
            .map_err(SubscriptionError::Database)
    }

    pub async fn count_active(conn: &mut AsyncPgConnection) -> Result<i64, SubscriptionError> {
        use crate::schema::subscriptions::dsl::*;

        subscriptions
            .filter(status.eq(STATUS_ACTIVE))
            .count()
            .get_result::<i64>(conn)
            .await
            .map_err(SubscriptionError::Database)
    }
}
