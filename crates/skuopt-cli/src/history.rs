use std::path::PathBuf;

use skuopt_db::GenerationRow;

/// Write a user's whole generation history as the dashboard's CSV export.
///
/// # Errors
///
/// Returns an error if the user is unknown, the query fails, or the file
/// cannot be written.
pub(crate) async fn run_export(
    pool: &sqlx::PgPool,
    email: &str,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let profile = super::users::find_profile(pool, email).await?;
    let records: Vec<_> = skuopt_db::list_generations(pool, profile.id, None)
        .await?
        .into_iter()
        .map(GenerationRow::into_record)
        .collect();

    if records.is_empty() {
        println!("{email} has no generations");
        return Ok(());
    }

    let bytes = skuopt_docs::history_csv(&records)?;
    let path = out.unwrap_or_else(|| PathBuf::from(skuopt_docs::HISTORY_CSV_FILENAME));
    tokio::fs::write(&path, bytes).await?;

    println!("wrote {} generations to {}", records.len(), path.display());
    Ok(())
}
