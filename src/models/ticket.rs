// Ticket catalog and category models

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{categories, tickets};

/// Ticket listing for an event
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ticket {
    pub id: Uuid,
    pub event_name: String,
    pub event_description: String,
    pub event_image: Option<String>,
    pub price_cents: i64,
    pub available_quantity: i32,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tickets)]
pub struct NewTicket {
    pub event_name: String,
    pub event_description: String,
    pub event_image: Option<String>,
    pub price_cents: i64,
    pub available_quantity: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct TicketUpdate {
    pub event_name: Option<String>,
    pub event_description: Option<String>,
    pub event_image: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub available_quantity: Option<i32>,
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = categories)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Ticket {
    pub async fn list_all(
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        tickets.order(created_at.desc()).load::<Ticket>(conn).await
    }

    pub async fn list_by_category(
        conn: &mut AsyncPgConnection,
        category: Uuid,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        tickets
            .filter(category_id.eq(category))
            .order(created_at.desc())
            .load::<Ticket>(conn)
            .await
    }

    /// Case-insensitive prefix search on the event name
    pub async fn search_by_name(
        conn: &mut AsyncPgConnection,
        prefix: &str,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;
        use diesel::PgTextExpressionMethods;

        let pattern = format!("{}%", crate::utils::escape_like(prefix));
        tickets
            .filter(event_name.ilike(pattern))
            .order(created_at.desc())
            .load::<Ticket>(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        ticket_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        tickets
            .filter(id.eq(ticket_id))
            .first::<Ticket>(conn)
            .await
            .optional()
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_ticket: NewTicket,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        diesel::insert_into(tickets)
            .values(&new_ticket)
            .get_result::<Ticket>(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        ticket_id: Uuid,
        changes: TicketUpdate,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        diesel::update(tickets.filter(id.eq(ticket_id)))
            .set((&changes, updated_at.eq(diesel::dsl::now)))
            .get_result::<Ticket>(conn)
            .await
            .optional()
    }

    pub async fn delete(
        conn: &mut AsyncPgConnection,
        ticket_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        diesel::delete(tickets.filter(id.eq(ticket_id)))
            .execute(conn)
            .await
    }

    /// Atomically reserve stock at checkout. The quantity check lives in the
    /// WHERE clause so oversubscribed carts fail instead of going negative.
    pub async fn reserve_stock(
        conn: &mut AsyncPgConnection,
        ticket_id: Uuid,
        quantity: i32,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        let updated = diesel::update(
            tickets
                .filter(id.eq(ticket_id))
                .filter(available_quantity.ge(quantity)),
        )
        .set((
            available_quantity.eq(available_quantity - quantity),
            updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;

        Ok(updated == 1)
    }

    pub async fn count_all(conn: &mut AsyncPgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::tickets::dsl::*;

        tickets.count().get_result::<i64>(conn).await
    }
}

impl Category {
    pub async fn list_all(
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::categories::dsl::*;

        categories.order(name.asc()).load::<Category>(conn).await
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_category: NewCategory,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::categories::dsl::*;

        diesel::insert_into(categories)
            .values(&new_category)
            .get_result::<Category>(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        category_id: Uuid,
        changes: CategoryUpdate,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::categories::dsl::*;

        diesel::update(categories.filter(id.eq(category_id)))
            .set(&changes)
            .get_result::<Category>(conn)
            .await
            .optional()
    }

    /// Delete a category. Tickets in it fall back to uncategorized via
    /// ON DELETE SET NULL.
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        category_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::categories::dsl::*;

        diesel::delete(categories.filter(id.eq(category_id)))
            .execute(conn)
            .await
    }
}
