//! Database operations for `profiles`: plan membership and credit balance.

use chrono::{DateTime, Utc};
use skuopt_core::{Plan, TRIAL_DAYS};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PROFILE_COLUMNS: &str = "id, email, plan, credits, trial_ends_at, credits_refreshed_at, \
                               created_at, updated_at";

/// A row from the `profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: Option<String>,
    /// Constrained by the schema to `lite`, `pro` or `enterprise`.
    pub plan: String,
    pub credits: i32,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub credits_refreshed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    #[must_use]
    pub fn plan(&self) -> Plan {
        self.plan.parse().unwrap_or_default()
    }

    #[must_use]
    pub fn in_trial(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|ends| ends > now)
    }
}

/// Fetches a profile by user id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a profile by email, case-insensitively.
///
/// Emails are not unique across provider accounts; the newest profile wins.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_profile_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE LOWER(email) = LOWER($1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates the profile on first sign-in, or refreshes its email afterwards.
///
/// New profiles start on the default plan with its full allowance and a
/// trial window of [`TRIAL_DAYS`]. Existing balances are never touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn ensure_profile(
    pool: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
) -> Result<ProfileRow, DbError> {
    let plan = Plan::default();
    let trial_days = i32::try_from(TRIAL_DAYS).unwrap_or(i32::MAX);

    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "INSERT INTO profiles (id, email, plan, credits, trial_ends_at) \
         VALUES ($1, $2, $3, $4, NOW() + make_interval(days => $5)) \
         ON CONFLICT (id) DO UPDATE SET \
             email      = COALESCE(EXCLUDED.email, profiles.email), \
             updated_at = NOW() \
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(email)
    .bind(plan.as_str())
    .bind(plan.starting_credits())
    .bind(trial_days)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Moves a profile to `plan` and resets its balance to the plan allowance.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the profile does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_plan(pool: &PgPool, user_id: Uuid, plan: Plan) -> Result<ProfileRow, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "UPDATE profiles \
         SET plan = $2, credits = $3, credits_refreshed_at = NOW(), updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(plan.as_str())
    .bind(plan.starting_credits())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Adds `amount` credits to a profile and returns the new balance.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the profile does not exist, or
/// [`DbError::Sqlx`] if the update fails (including a negative result).
pub async fn grant_credits(pool: &PgPool, user_id: Uuid, amount: i32) -> Result<i32, DbError> {
    let credits = sqlx::query_scalar::<_, i32>(
        "UPDATE profiles SET credits = credits + $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING credits",
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(credits)
}

/// Resets every limited-plan profile to its monthly allowance.
///
/// Runs in one transaction so a failure leaves all balances untouched.
/// Returns the number of profiles refilled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any update fails.
pub async fn refill_monthly_credits(pool: &PgPool) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut refilled = 0;

    for plan in Plan::ALL {
        let Some(allowance) = plan.monthly_credits() else {
            continue;
        };
        let result = sqlx::query(
            "UPDATE profiles \
             SET credits = $2, credits_refreshed_at = NOW(), updated_at = NOW() \
             WHERE plan = $1",
        )
        .bind(plan.as_str())
        .bind(allowance)
        .execute(&mut *tx)
        .await?;
        refilled += result.rows_affected();
    }

    tx.commit().await?;
    Ok(refilled)
}
