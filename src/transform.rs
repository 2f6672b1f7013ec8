//! Legacy JSON column normalization.
//!
//! Older schema generations stored a system's talkgroups and radio units as
//! single JSON-encoded text columns on the system row. The normalization
//! migration replaces those blobs with one relational row per talkgroup and
//! per unit. This module decodes the blobs into typed records and produces
//! the parameterized INSERT statements that the runner executes inside the
//! same transaction as the accompanying DDL.
//!
//! The statement list for that migration is the only data-dependent one in
//! the registry: everything here runs against the *pre-migration* schema,
//! before the runner opens the transaction that drops the JSON columns.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sqlx::{AnyPool, Row};

use crate::migrations::{SqlValue, Statement};

/// Talkgroup record as encoded by the Node-era releases. Missing fields
/// decode to their zero values, matching how the old app tolerated sparse
/// entries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTalkgroup {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub name: String,
    /// Kept as raw JSON: legacy data holds numbers, strings, or nothing here.
    #[serde(default)]
    pub frequency: Value,
    #[serde(default)]
    pub led: Value,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub tag_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LegacyUnit {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub label: String,
}

/// Reads every system row and builds the INSERT statements that re-emit its
/// talkgroups and units as normalized rows, talkgroups before units, in
/// system-row iteration order.
///
/// A malformed JSON column aborts before any statement is handed to the
/// runner; the tracking table is left untouched and the migration can be
/// retried once the upstream data is fixed.
pub async fn normalization_inserts(pool: &AnyPool) -> Result<Vec<Statement>> {
    let rows = sqlx::query("select id, talkgroups, units from wavecap_systems")
        .fetch_all(pool)
        .await
        .context("failed to read legacy system rows")?;

    let mut statements = Vec::new();
    for row in rows {
        let system_id: i64 = row.try_get("id")?;
        let talkgroups: String = row.try_get("talkgroups")?;
        let units: String = row.try_get("units")?;
        statements.extend(system_rows(system_id, &talkgroups, &units)?);
    }
    Ok(statements)
}

/// Decodes one system's JSON columns into INSERT statements. Pure with
/// respect to the database, so the reordering and null-sentinel rules are
/// testable without a live pool.
pub fn system_rows(system_id: i64, talkgroups_json: &str, units_json: &str) -> Result<Vec<Statement>> {
    let talkgroups: Vec<LegacyTalkgroup> = serde_json::from_str(talkgroups_json)
        .with_context(|| format!("malformed talkgroups JSON on system {system_id}"))?;
    let units: Vec<LegacyUnit> = serde_json::from_str(units_json)
        .with_context(|| format!("malformed units JSON on system {system_id}"))?;

    let mut statements = Vec::with_capacity(talkgroups.len() + units.len());
    for (index, talkgroup) in talkgroups.iter().enumerate() {
        statements.push(talkgroup_row(system_id, index + 1, talkgroup));
    }
    for (index, unit) in units.iter().enumerate() {
        statements.push(unit_row(system_id, index + 1, unit));
    }
    Ok(statements)
}

// sort_order is overwritten with the 1-based array position; whatever order
// values the legacy blob carried are discarded so the sequence is always
// contiguous from 1.
fn talkgroup_row(system_id: i64, position: usize, talkgroup: &LegacyTalkgroup) -> Statement {
    let frequency = match talkgroup.frequency.as_i64() {
        Some(value) => SqlValue::Int(value),
        None => SqlValue::Null,
    };
    let led = match &talkgroup.led {
        Value::String(value) => SqlValue::Text(value.clone()),
        _ => SqlValue::Null,
    };
    Statement::with_args(
        "insert into wavecap_talkgroups (frequency, group_id, id, label, led, name, sort_order, system_id, tag_id) values (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            frequency,
            SqlValue::Int(talkgroup.group_id),
            SqlValue::Int(talkgroup.id),
            SqlValue::Text(talkgroup.label.clone()),
            led,
            SqlValue::Text(talkgroup.name.clone()),
            SqlValue::Int(position as i64),
            SqlValue::Int(system_id),
            SqlValue::Int(talkgroup.tag_id),
        ],
    )
}

fn unit_row(system_id: i64, position: usize, unit: &LegacyUnit) -> Statement {
    Statement::with_args(
        "insert into wavecap_units (id, label, sort_order, system_id) values (?, ?, ?, ?)",
        vec![
            SqlValue::Int(unit.id),
            SqlValue::Text(unit.label.clone()),
            SqlValue::Int(position as i64),
            SqlValue::Int(system_id),
        ],
    )
}
