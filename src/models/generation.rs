// Generation history records (append-only ledger trail)

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::generation_records;

/// Media kind for a generation request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// Generation record - one row per successful generation
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = generation_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenerationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media_kind: String,
    pub prompt: String,
    pub payload: String,
    pub cost_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = generation_records)]
pub struct NewGenerationRecord {
    pub user_id: Uuid,
    pub media_kind: String,
    pub prompt: String,
    pub payload: String,
    pub cost_cents: i64,
}

impl GenerationRecord {
    /// Append a record. Rows are never updated or deleted.
    pub async fn create(
        conn: &mut AsyncPgConnection,
        record: NewGenerationRecord,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::generation_records::dsl::*;

        diesel::insert_into(generation_records)
            .values(&record)
            .get_result::<GenerationRecord>(conn)
            .await
    }

    /// Recent history for a user, newest first
    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::generation_records::dsl::*;

        generation_records
            .filter(user_id.eq(owner))
            .order(created_at.desc())
            .limit(limit)
            .load::<GenerationRecord>(conn)
            .await
    }

    /// Total rows, for the admin dashboard
    pub async fn count_all(conn: &mut AsyncPgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::generation_records::dsl::*;

        generation_records.count().get_result::<i64>(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_round_trip() {
        assert_eq!(MediaKind::Image.as_str(), "image");
        assert_eq!(MediaKind::Video.as_str(), "video");
        assert_eq!(MediaKind::from_str("image"), Ok(MediaKind::Image));
        assert_eq!(MediaKind::from_str("video"), Ok(MediaKind::Video));
        assert!(MediaKind::from_str("audio").is_err());
    }

    #[test]
    fn test_media_kind_serde() {
        assert_eq!(serde_json::to_string(&MediaKind::Image).unwrap(), "\"image\"");
        let parsed: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(parsed, MediaKind::Video);
    }
}
