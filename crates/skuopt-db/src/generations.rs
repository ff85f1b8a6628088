//! Database operations for `generations`: the per-user listing history.
//!
//! Recording a generation and charging its credit happen in one
//! transaction, so a failed insert never costs the user a credit and a
//! user at zero credits never gets a stored listing.

use chrono::{DateTime, Utc};
use serde_json::Value;
use skuopt_core::{GenerationRecord, GenerationSettings};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::DbError;

const GENERATION_COLUMNS: &str = "id, user_id, product_name, content, settings, score_ia, created_at";

/// A row from the `generations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GenerationRow {
    pub id: i64,
    pub user_id: Uuid,
    pub product_name: String,
    pub content: Value,
    pub settings: Value,
    pub score_ia: Option<i16>,
    pub created_at: DateTime<Utc>,
}

impl GenerationRow {
    /// Converts into the storage-independent record. Settings that fail to
    /// parse fall back to defaults rather than hiding the row.
    #[must_use]
    pub fn into_record(self) -> GenerationRecord {
        let settings: GenerationSettings =
            serde_json::from_value(self.settings).unwrap_or_default();
        GenerationRecord {
            id: self.id,
            product_name: self.product_name,
            created_at: self.created_at,
            settings,
            content: self.content,
            score_ia: self.score_ia,
        }
    }
}

/// Input for [`record_generation`].
#[derive(Debug, Clone, Copy)]
pub struct NewGeneration<'a> {
    pub product_name: &'a str,
    pub content: &'a Value,
    pub settings: &'a GenerationSettings,
    pub score_ia: Option<i16>,
}

/// Result of [`record_generation`].
#[derive(Debug, Clone)]
pub struct RecordedGeneration {
    pub row: GenerationRow,
    /// Balance after the charge; `None` when the user was not charged.
    pub credits_remaining: Option<i32>,
}

/// Stores a generation and, when `charge` is set, spends one credit.
///
/// The decrement is guarded by `credits > 0`; if no row is updated the
/// transaction is rolled back and nothing is stored.
///
/// # Errors
///
/// Returns [`DbError::InsufficientCredits`] when `charge` is set and the
/// balance is zero (or the profile is missing), or [`DbError::Sqlx`] if
/// any statement fails.
pub async fn record_generation(
    pool: &PgPool,
    user_id: Uuid,
    generation: &NewGeneration<'_>,
    charge: bool,
) -> Result<RecordedGeneration, DbError> {
    let mut tx = pool.begin().await?;

    let credits_remaining = if charge {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE profiles SET credits = credits - 1, updated_at = NOW() \
             WHERE id = $1 AND credits > 0 \
             RETURNING credits",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match remaining {
            Some(credits) => Some(credits),
            None => {
                tx.rollback().await?;
                return Err(DbError::InsufficientCredits);
            }
        }
    } else {
        None
    };

    let row = sqlx::query_as::<_, GenerationRow>(&format!(
        "INSERT INTO generations (user_id, product_name, content, settings, score_ia) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {GENERATION_COLUMNS}"
    ))
    .bind(user_id)
    .bind(generation.product_name)
    .bind(generation.content)
    .bind(Json(generation.settings))
    .bind(generation.score_ia)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(RecordedGeneration {
        row,
        credits_remaining,
    })
}

/// Lists a user's generations, newest first. `limit` of `None` returns all.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_generations(
    pool: &PgPool,
    user_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<GenerationRow>, DbError> {
    let rows = sqlx::query_as::<_, GenerationRow>(&format!(
        "SELECT {GENERATION_COLUMNS} FROM generations \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one generation owned by `user_id`.
///
/// Rows belonging to other users are reported as missing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_generation(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
) -> Result<Option<GenerationRow>, DbError> {
    let row = sqlx::query_as::<_, GenerationRow>(&format!(
        "SELECT {GENERATION_COLUMNS} FROM generations WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Counts a user's generations created at or after `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_generations_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM generations WHERE user_id = $1 AND created_at >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(settings: Value) -> GenerationRow {
        GenerationRow {
            id: 7,
            user_id: Uuid::nil(),
            product_name: "Botella".to_string(),
            content: json!({"seoTitle": "Botella"}),
            settings,
            score_ia: Some(88),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn into_record_parses_settings() {
        let record = row(json!({"category": "Hogar", "channel": "marketplace"})).into_record();
        assert_eq!(record.id, 7);
        assert_eq!(record.settings.category, "Hogar");
        assert_eq!(record.settings.channel.as_deref(), Some("marketplace"));
        assert_eq!(record.score_ia, Some(88));
    }

    #[test]
    fn into_record_tolerates_bad_settings() {
        let record = row(json!("not an object")).into_record();
        assert_eq!(record.settings, GenerationSettings::default());
    }
}
