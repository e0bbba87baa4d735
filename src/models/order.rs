// Order history model

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::order_items;

/// One purchased line, written at checkout settlement
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_ref: String,
    pub transaction_ref: String,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub payment_method: String,
    pub ordered_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_ref: String,
    pub transaction_ref: String,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub payment_method: String,
}

impl OrderItem {
    pub async fn create_batch(
        conn: &mut AsyncPgConnection,
        items: &[NewOrderItem],
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::order_items::dsl::*;

        diesel::insert_into(order_items)
            .values(items)
            .get_results::<OrderItem>(conn)
            .await
    }

    /// Order history for a user, newest first
    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::order_items::dsl::*;

        order_items
            .filter(user_id.eq(owner))
            .order(ordered_at.desc())
            .load::<OrderItem>(conn)
            .await
    }

    pub async fn count_all(conn: &mut AsyncPgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::order_items::dsl::*;

        order_items.count().get_result::<i64>(conn).await
    }
}
