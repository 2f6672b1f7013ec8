//! Default reference data.
//!
//! Groups and tags are lookup tables every talkgroup points into. They are
//! seeded once, on first start against an empty table, and never touched
//! again: seeding is a cold-start convenience, not a sync mechanism, so an
//! operator who edits or deletes rows keeps their edits.

use anyhow::{Context, Result};
use sqlx::AnyPool;

pub const DEFAULT_GROUPS: &[&str] = &[
    "Air Traffic",
    "EMS",
    "Fire",
    "Interop",
    "Law Enforcement",
    "Public Works",
    "Schools",
    "Transportation",
    "Utilities",
];

pub const DEFAULT_TAGS: &[&str] = &[
    "Air Traffic Control",
    "Dispatch",
    "Fire Dispatch",
    "Fire Tactical",
    "Interop",
    "Law Dispatch",
    "Law Tactical",
    "Service",
    "Talk",
];

/// Inserts the default groups and tags, each set only if its table is
/// currently empty. Runs after every migration has committed.
pub async fn seed(pool: &AnyPool) -> Result<()> {
    seed_labels(pool, "wavecap_groups", DEFAULT_GROUPS)
        .await
        .context("failed to seed groups")?;
    seed_labels(pool, "wavecap_tags", DEFAULT_TAGS)
        .await
        .context("failed to seed tags")?;
    Ok(())
}

async fn seed_labels(pool: &AnyPool, table: &str, labels: &[&str]) -> Result<()> {
    let sql = format!("select count(*) from {table}");
    let count: i64 = sqlx::query_scalar(&sql)
        .fetch_one(pool)
        .await
        .with_context(|| format!("while executing {sql}"))?;
    if count > 0 {
        return Ok(());
    }

    let sql = format!("insert into {table} (label) values (?)");
    let mut tx = pool.begin().await?;
    for label in labels {
        if let Err(err) = sqlx::query(&sql).bind(*label).execute(&mut *tx).await {
            tx.rollback().await.ok();
            return Err(err).with_context(|| format!("while executing {sql}"));
        }
    }
    tx.commit()
        .await
        .with_context(|| format!("failed to commit seed data for {table}"))?;
    Ok(())
}
