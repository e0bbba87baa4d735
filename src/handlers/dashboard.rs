// Admin dashboard: totals and date-ranged order stats

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        generation::GenerationRecord, order::OrderItem, subscription::Subscription, ticket::Ticket,
    },
    utils::ServiceError,
};

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub total_users: i64,
    pub total_tickets: i64,
    pub total_order_items: i64,
    pub total_generations: i64,
    pub total_reviews: i64,
    pub total_cart_items: i64,
    pub active_subscriptions: i64,
    pub recent_subscriptions: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
pub struct StatsRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// A resolved half-open range: `to` itself is excluded.
struct ResolvedRange {
    from: NaiveDate,
    to: NaiveDate,
    from_ts: chrono::DateTime<Utc>,
    to_ts: chrono::DateTime<Utc>,
}

impl StatsRange {
    /// Fill in defaults (last 30 days ending today, inclusive) and convert
    /// the day bounds to UTC midnight timestamps.
    fn resolve(&self, today: NaiveDate) -> Result<ResolvedRange, ServiceError> {
        let to = self.to.unwrap_or_else(|| today + Duration::days(1));
        let from = self.from.unwrap_or_else(|| to - Duration::days(30));
        if from >= to {
            return Err(ServiceError::ValidationError(
                "from must be before to".to_string(),
            ));
        }

        let from_ts = from
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .ok_or(ServiceError::InternalError)?;
        let to_ts = to
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .ok_or(ServiceError::InternalError)?;

        Ok(ResolvedRange {
            from,
            to,
            from_ts,
            to_ts,
        })
    }
}

#[derive(Debug, Serialize, QueryableByName)]
pub struct DailyOrderStat {
    #[diesel(sql_type = Date)]
    pub day: NaiveDate,
    #[diesel(sql_type = BigInt)]
    pub orders: i64,
    #[diesel(sql_type = BigInt)]
    pub revenue_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderStatsResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub new_users: i64,
    pub new_subscriptions: i64,
    pub daily: Vec<DailyOrderStat>,
}

/// Good is 4 stars and up, bad is everything below
#[derive(Debug, Serialize, QueryableByName)]
pub struct MonthlyReviewStat {
    #[diesel(sql_type = Text)]
    pub month: String,
    #[diesel(sql_type = BigInt)]
    pub good: i64,
    #[diesel(sql_type = BigInt)]
    pub bad: i64,
}

fn require_admin(auth_user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// GET /admin/dashboard
pub async fn overview(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;

    let total_users: i64 = {
        use crate::schema::users::dsl::*;
        users.count().get_result(&mut conn).await?
    };
    let total_reviews: i64 = {
        use crate::schema::reviews::dsl::*;
        reviews.count().get_result(&mut conn).await?
    };
    let total_cart_items: i64 = {
        use crate::schema::cart_items::dsl::*;
        cart_items.count().get_result(&mut conn).await?
    };
    let active_subscriptions = Subscription::count_active(&mut conn)
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;
    let recent_subscriptions = Subscription::list_recent(&mut conn, 5)
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;
    let total_tickets = Ticket::count_all(&mut conn).await?;
    let total_order_items = OrderItem::count_all(&mut conn).await?;
    let total_generations = GenerationRecord::count_all(&mut conn).await?;

    Ok(Json(OverviewResponse {
        total_users,
        total_tickets,
        total_order_items,
        total_generations,
        total_reviews,
        total_cart_items,
        active_subscriptions,
        recent_subscriptions,
    }))
}

/// GET /admin/dashboard/orders?from=YYYY-MM-DD&to=YYYY-MM-DD
///
/// Defaults to the last 30 days. The range is half-open: `to` itself is
/// excluded.
pub async fn order_stats(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(range): Query<StatsRange>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let ResolvedRange {
        from,
        to,
        from_ts,
        to_ts,
    } = range.resolve(Utc::now().date_naive())?;

    let mut conn = state.diesel_pool.get().await?;
    let daily: Vec<DailyOrderStat> = diesel::sql_query(
        "SELECT DATE(ordered_at) AS day, \
                COUNT(*) AS orders, \
                COALESCE(SUM(quantity * unit_price_cents), 0) AS revenue_cents \
         FROM order_items \
         WHERE ordered_at >= $1 AND ordered_at < $2 \
         GROUP BY DATE(ordered_at) \
         ORDER BY day",
    )
    .bind::<Timestamptz, _>(from_ts)
    .bind::<Timestamptz, _>(to_ts)
    .load(&mut conn)
    .await?;

    let new_users: i64 = {
        use crate::schema::users::dsl::*;
        users
            .filter(created_at.ge(from_ts))
            .filter(created_at.lt(to_ts))
            .count()
            .get_result(&mut conn)
            .await?
    };
    let new_subscriptions: i64 = {
        use crate::schema::subscriptions::dsl::*;
        subscriptions
            .filter(created_at.ge(from_ts))
            .filter(created_at.lt(to_ts))
            .count()
            .get_result(&mut conn)
            .await?
    };

    Ok(Json(OrderStatsResponse {
        from,
        to,
        new_users,
        new_subscriptions,
        daily,
    }))
}

/// GET /admin/dashboard/reviews?from=YYYY-MM-DD&to=YYYY-MM-DD
///
/// Monthly good/bad buckets over the requested range, oldest month first.
/// Same defaults and half-open semantics as the order stats.
pub async fn review_buckets(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(range): Query<StatsRange>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let resolved = range.resolve(Utc::now().date_naive())?;

    let mut conn = state.diesel_pool.get().await?;
    let buckets: Vec<MonthlyReviewStat> = diesel::sql_query(
        "SELECT to_char(created_at, 'YYYY-MM') AS month, \
                COUNT(*) FILTER (WHERE rating >= 4) AS good, \
                COUNT(*) FILTER (WHERE rating < 4) AS bad \
         FROM reviews \
         WHERE created_at >= $1 AND created_at < $2 \
         GROUP BY to_char(created_at, 'YYYY-MM') \
         ORDER BY month",
    )
    .bind::<Timestamptz, _>(resolved.from_ts)
    .bind::<Timestamptz, _>(resolved.to_ts)
    .load(&mut conn)
    .await?;

    Ok(Json(buckets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_range_defaults_to_last_thirty_days() {
        let today = d("2026-08-15");
        let range = StatsRange {
            from: None,
            to: None,
        };
        let resolved = range.resolve(today).unwrap();
        assert_eq!(resolved.to, d("2026-08-16"));
        assert_eq!(resolved.from, d("2026-07-17"));
        assert_eq!(resolved.to_ts - resolved.from_ts, Duration::days(30));
    }

    #[test]
    fn test_explicit_range_is_half_open_midnights() {
        let range = StatsRange {
            from: Some(d("2026-01-01")),
            to: Some(d("2026-02-01")),
        };
        let resolved = range.resolve(d("2026-08-15")).unwrap();
        assert_eq!(resolved.from_ts.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(resolved.to_ts.to_rfc3339(), "2026-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let range = StatsRange {
            from: Some(d("2026-03-01")),
            to: Some(d("2026-03-01")),
        };
        assert!(matches!(
            range.resolve(d("2026-08-15")),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
