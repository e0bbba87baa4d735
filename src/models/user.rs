// User database model and daily generation counter updates

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::users;

/// User database model - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub avatar: Option<String>,
    pub daily_gen_count: i32,
    pub last_gen_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// User update struct
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<Option<String>>,
}

/// Errors for user operations
#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("User not found")]
    NotFound,

    #[error("Email already registered")]
    DuplicateEmail,
}

/// Outcome of reserving a daily free-quota slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailySlot {
    /// A slot was consumed; the counter now reflects it
    Consumed,
    /// The daily limit for today is already exhausted
    Exhausted,
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Find user by email (case-insensitive). The input is escaped so
    /// LIKE wildcards in a submitted email cannot match other rows.
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        users
            .filter(email.ilike(crate::utils::escape_like(email_str)))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Create a new user
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_user: NewUser,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::insert_into(users)
            .values(&new_user)
            .get_result::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => UserError::DuplicateEmail,
                _ => UserError::Database(e),
            })
    }

    /// All users, newest first, for the admin listing
    pub async fn list_all(
        conn: &mut AsyncPgConnection,
        limit: i64,
    ) -> Result<Vec<Self>, UserError> {
        use crate::schema::users::dsl::*;

        users
            .order(created_at.desc())
            .limit(limit)
            .load::<User>(conn)
            .await
            .map_err(UserError::Database)
    }

    /// Delete a user row. Dependent rows go with it via ON DELETE CASCADE.
    pub async fn delete(conn: &mut AsyncPgConnection, user_id: Uuid) -> Result<usize, UserError> {
        use crate::schema::users::dsl::*;

        diesel::delete(users.filter(id.eq(user_id)))
            .execute(conn)
            .await
            .map_err(UserError::Database)
    }

    /// Update user profile fields
    pub async fn update(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        update: UserUpdate,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set((&update, updated_at.eq(diesel::dsl::now)))
            .get_result::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Atomically reserve one free-quota slot for `today`.
    ///
    /// Two conditional UPDATEs, each deciding by affected-row count so
    /// concurrent requests from the same user cannot overshoot the limit:
    /// the first rolls the counter over to 1 when the stored date is not
    /// today, the second increments only while the counter is below `limit`.
    pub async fn reserve_daily_slot(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        today: NaiveDate,
        limit: i32,
    ) -> Result<DailySlot, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgExpressionMethods;

        if limit <= 0 {
            return Ok(DailySlot::Exhausted);
        }

        // Day rollover: reset the counter to 1 for the first request of the day
        let rolled = diesel::update(
            users
                .filter(id.eq(user_id))
                .filter(last_gen_date.is_distinct_from(today)),
        )
        .set((daily_gen_count.eq(1), last_gen_date.eq(today)))
        .execute(conn)
        .await?;

        if rolled == 1 {
            return Ok(DailySlot::Consumed);
        }

        // Same day: bounded increment, zero rows means the limit is spent
        let bumped = diesel::update(
            users
                .filter(id.eq(user_id))
                .filter(last_gen_date.eq(today))
                .filter(daily_gen_count.lt(limit)),
        )
        .set(daily_gen_count.eq(daily_gen_count + 1))
        .execute(conn)
        .await?;

        if bumped == 1 {
            Ok(DailySlot::Consumed)
        } else {
            Ok(DailySlot::Exhausted)
        }
    }

    /// Free-quota slots remaining today, without mutating the counter
    pub fn remaining_daily_slots(&self, today: NaiveDate, limit: i32) -> i32 {
        match self.last_gen_date {
            Some(d) if d == today => (limit - self.daily_gen_count).max(0),
            _ => limit,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_user(count: i32, gen_date: Option<NaiveDate>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: "user".to_string(),
            avatar: None,
            daily_gen_count: count,
            last_gen_date: gen_date,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_remaining_slots_fresh_day() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let yesterday = today.pred_opt().unwrap();

        // Never generated
        assert_eq!(sample_user(0, None).remaining_daily_slots(today, 20), 20);
        // Stale counter from a previous day is ignored
        assert_eq!(
            sample_user(20, Some(yesterday)).remaining_daily_slots(today, 20),
            20
        );
    }

    #[test]
    fn test_remaining_slots_same_day() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        assert_eq!(
            sample_user(7, Some(today)).remaining_daily_slots(today, 20),
            13
        );
        assert_eq!(
            sample_user(20, Some(today)).remaining_daily_slots(today, 20),
            0
        );
        // Counter above limit (limit lowered in config) never goes negative
        assert_eq!(
            sample_user(25, Some(today)).remaining_daily_slots(today, 20),
            0
        );
    }

    #[test]
    fn test_is_admin() {
        let mut u = sample_user(0, None);
        assert!(!u.is_admin());
        u.role = "admin".to_string();
        assert!(u.is_admin());
    }
}
