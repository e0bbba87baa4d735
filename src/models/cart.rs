// Shopping cart model

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::cart_items;

/// Cart line item
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItem {
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
}

/// Cart line joined with its ticket for display and totals
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub event_name: String,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl CartItem {
    /// Add a ticket to the cart. Re-adding the same ticket accumulates
    /// quantity through the (user_id, ticket_id) unique constraint.
    pub async fn add(
        conn: &mut AsyncPgConnection,
        new_item: NewCartItem,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::cart_items::dsl::*;

        diesel::insert_into(cart_items)
            .values(&new_item)
            .on_conflict((user_id, ticket_id))
            .do_update()
            .set((
                quantity.eq(quantity + new_item.quantity),
                updated_at.eq(diesel::dsl::now),
            ))
            .get_result::<CartItem>(conn)
            .await
    }

    /// Cart lines joined with tickets, with per-line totals
    pub async fn lines_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Vec<CartLine>, diesel::result::Error> {
        use crate::schema::{cart_items, tickets};

        let rows: Vec<(CartItem, crate::models::Ticket)> = cart_items::table
            .inner_join(tickets::table)
            .filter(cart_items::user_id.eq(owner))
            .order(cart_items::created_at.asc())
            .select((
                CartItem::as_select(),
                crate::models::Ticket::as_select(),
            ))
            .load(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, ticket)| {
                let line_total_cents = ticket.price_cents * item.quantity as i64;
                CartLine {
                    unit_price_cents: ticket.price_cents,
                    event_name: ticket.event_name,
                    line_total_cents,
                    item,
                }
            })
            .collect())
    }

    /// Set quantity for an owned cart line. Zero rows means not found.
    pub async fn set_quantity(
        conn: &mut AsyncPgConnection,
        item_id: Uuid,
        owner: Uuid,
        new_quantity: i32,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::cart_items::dsl::*;

        diesel::update(cart_items.filter(id.eq(item_id)).filter(user_id.eq(owner)))
            .set((quantity.eq(new_quantity), updated_at.eq(diesel::dsl::now)))
            .get_result::<CartItem>(conn)
            .await
            .optional()
    }

    pub async fn remove(
        conn: &mut AsyncPgConnection,
        item_id: Uuid,
        owner: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::cart_items::dsl::*;

        diesel::delete(cart_items.filter(id.eq(item_id)).filter(user_id.eq(owner)))
            .execute(conn)
            .await
    }

    /// Empty the cart, used after a successful checkout
    pub async fn clear_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::cart_items::dsl::*;

        diesel::delete(cart_items.filter(user_id.eq(owner)))
            .execute(conn)
            .await
    }
}

/// Sum of line totals in cents
pub fn cart_total_cents(lines: &[CartLine]) -> i64 {
    lines.iter().map(|l| l.line_total_cents).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price_cents: i64) -> CartLine {
        let now = Utc::now();
        CartLine {
            item: CartItem {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                ticket_id: Uuid::new_v4(),
                quantity,
                created_at: now,
                updated_at: now,
            },
            event_name: "Concert".to_string(),
            unit_price_cents,
            line_total_cents: unit_price_cents * quantity as i64,
        }
    }

    #[test]
    fn test_cart_total() {
        assert_eq!(cart_total_cents(&[]), 0);
        assert_eq!(cart_total_cents(&[line(2, 1_500)]), 3_000);
        assert_eq!(cart_total_cents(&[line(2, 1_500), line(1, 4_999)]), 7_999);
    }
}
