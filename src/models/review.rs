// Review model and rating aggregation

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::reviews;

/// Review database model
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReview {
    pub user_id: Uuid,
    pub content_id: i32,
    pub rating: i32,
    pub comment: String,
}

/// Aggregated rating stats for one content item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewStats {
    pub content_id: i32,
    pub review_count: usize,
    pub average_rating: f64,
    /// Count of 1-star through 5-star ratings, in that order
    pub star_counts: [usize; 5],
}

impl ReviewStats {
    /// Reduce a slice of ratings to count, average and per-star buckets.
    ///
    /// The average is rounded half-up to one decimal place. Zero reviews
    /// yields an average of 0.0, not NaN. Out-of-range ratings are not
    /// possible past request validation, but are ignored here rather than
    /// panicking.
    pub fn from_ratings(content_id: i32, ratings: &[i32]) -> Self {
        let review_count = ratings.len();
        let average_rating = if review_count == 0 {
            0.0
        } else {
            let sum: i64 = ratings.iter().map(|&r| r as i64).sum();
            let raw = sum as f64 / review_count as f64;
            (raw * 10.0 + 0.5).floor() / 10.0
        };

        let mut star_counts = [0usize; 5];
        for &r in ratings {
            if (1..=5).contains(&r) {
                star_counts[(r - 1) as usize] += 1;
            }
        }

        ReviewStats {
            content_id,
            review_count,
            average_rating,
            star_counts,
        }
    }
}

impl Review {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_review: NewReview,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        diesel::insert_into(reviews)
            .values(&new_review)
            .get_result::<Review>(conn)
            .await
    }

    /// All reviews for a content item, newest first
    pub async fn list_for_content(
        conn: &mut AsyncPgConnection,
        content: i32,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        reviews
            .filter(content_id.eq(content))
            .order(created_at.desc())
            .load::<Review>(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        review_id: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        reviews
            .filter(id.eq(review_id))
            .first::<Review>(conn)
            .await
            .optional()
    }

    /// Update the caller's own review. Zero rows means not found or not owned.
    pub async fn update_own(
        conn: &mut AsyncPgConnection,
        review_id: Uuid,
        owner: Uuid,
        new_rating: i32,
        new_comment: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        diesel::update(reviews.filter(id.eq(review_id)).filter(user_id.eq(owner)))
            .set((
                rating.eq(new_rating),
                comment.eq(new_comment),
                updated_at.eq(diesel::dsl::now),
            ))
            .get_result::<Review>(conn)
            .await
            .optional()
    }

    /// Delete the caller's own review
    pub async fn delete_own(
        conn: &mut AsyncPgConnection,
        review_id: Uuid,
        owner: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        diesel::delete(reviews.filter(id.eq(review_id)).filter(user_id.eq(owner)))
            .execute(conn)
            .await
    }

    /// Delete any review regardless of owner. Admin moderation path.
    pub async fn delete_any(
        conn: &mut AsyncPgConnection,
        review_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        diesel::delete(reviews.filter(id.eq(review_id)))
            .execute(conn)
            .await
    }

    /// Most recent reviews across all content, for the landing feed
    pub async fn list_latest(
        conn: &mut AsyncPgConnection,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        reviews
            .order(created_at.desc())
            .limit(limit)
            .load::<Review>(conn)
            .await
    }

    /// Rating stats for a content item
    pub async fn stats_for_content(
        conn: &mut AsyncPgConnection,
        content: i32,
    ) -> Result<ReviewStats, diesel::result::Error> {
        use crate::schema::reviews::dsl::*;

        let ratings: Vec<i32> = reviews
            .filter(content_id.eq(content))
            .select(rating)
            .load::<i32>(conn)
            .await?;

        Ok(ReviewStats::from_ratings(content, &ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_empty() {
        let stats = ReviewStats::from_ratings(7, &[]);
        assert_eq!(stats.review_count, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.star_counts, [0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_stats_rounds_half_up_one_decimal() {
        // 11 / 3 = 3.666... rounds up to 3.7
        let stats = ReviewStats::from_ratings(1, &[5, 5, 1]);
        assert_eq!(stats.review_count, 3);
        assert_eq!(stats.average_rating, 3.7);
        assert_eq!(stats.star_counts, [1, 0, 0, 0, 2]);

        // 7 / 2 = 3.5 stays exact
        let stats = ReviewStats::from_ratings(1, &[4, 3]);
        assert_eq!(stats.average_rating, 3.5);

        // 13 / 4 = 3.25 rounds half up to 3.3
        let stats = ReviewStats::from_ratings(1, &[5, 4, 3, 1]);
        assert_eq!(stats.average_rating, 3.3);
    }

    #[test]
    fn test_stats_single_rating() {
        let stats = ReviewStats::from_ratings(9, &[4]);
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.average_rating, 4.0);
    }
}
