use chrono::Utc;
use skuopt_core::{is_exempt_email, AppConfig, Plan};
use skuopt_db::ProfileRow;

pub(crate) async fn find_profile(pool: &sqlx::PgPool, email: &str) -> anyhow::Result<ProfileRow> {
    skuopt_db::get_profile_by_email(pool, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no profile with email {email}; the user must sign in once"))
}

fn describe(profile: &ProfileRow) -> String {
    let plan = profile.plan();
    let balance = if plan.is_unlimited() {
        "unlimited".to_string()
    } else {
        profile.credits.to_string()
    };
    format!("plan={plan} credits={balance}")
}

/// Print a user's plan, balance and trial window.
///
/// # Errors
///
/// Returns an error if the user is unknown or the query fails.
pub(crate) async fn run_show(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    email: &str,
) -> anyhow::Result<()> {
    let profile = find_profile(pool, email).await?;
    let exempt = is_exempt_email(profile.email.as_deref(), &config.exempt_email_domains);
    let trial = match profile.trial_ends_at {
        Some(ends) if profile.in_trial(Utc::now()) => format!("until {}", ends.format("%Y-%m-%d")),
        Some(_) => "ended".to_string(),
        None => "none".to_string(),
    };

    println!("{:<12}{}", "ID", profile.id);
    println!("{:<12}{}", "EMAIL", profile.email.as_deref().unwrap_or("-"));
    println!("{:<12}{}", "ACCOUNT", describe(&profile));
    println!("{:<12}{}", "EXEMPT", if exempt { "yes" } else { "no" });
    println!("{:<12}{trial}", "TRIAL");
    println!(
        "{:<12}{}",
        "REFILLED",
        profile.credits_refreshed_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Move a user to `plan`, resetting the balance.
///
/// # Errors
///
/// Returns an error if the user is unknown or the update fails.
pub(crate) async fn run_set_plan(pool: &sqlx::PgPool, email: &str, plan: Plan) -> anyhow::Result<()> {
    let profile = find_profile(pool, email).await?;
    let updated = skuopt_db::set_plan(pool, profile.id, plan).await?;
    tracing::info!(user_id = %updated.id, plan = %plan, "plan changed");
    println!("{email}: {}", describe(&updated));
    Ok(())
}

/// Add `credits` to a user's balance.
///
/// # Errors
///
/// Returns an error if the user is unknown, the plan is unlimited, or the
/// balance would go negative.
pub(crate) async fn run_grant(pool: &sqlx::PgPool, email: &str, credits: i32) -> anyhow::Result<()> {
    let profile = find_profile(pool, email).await?;
    if profile.plan().is_unlimited() {
        anyhow::bail!("{email} is on an unlimited plan; credits are not tracked");
    }
    if profile.credits.saturating_add(credits) < 0 {
        anyhow::bail!(
            "{email} has {} credits; cannot remove {}",
            profile.credits,
            credits.unsigned_abs()
        );
    }
    let balance = skuopt_db::grant_credits(pool, profile.id, credits).await?;
    tracing::info!(user_id = %profile.id, delta = credits, balance, "credits granted");
    println!("{email}: credits={balance}");
    Ok(())
}
