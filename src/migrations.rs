//! Ordered migration registry, bootstrap, and runner.
//!
//! The registry is explicit immutable data: an ordered list of named units,
//! each mapping to one statement list per dialect. Registry order is the only
//! execution order. The runner walks the list, skips units already recorded
//! in the tracking table, and applies each pending unit inside a single
//! transaction that also records the unit, so a tracking row exists for a
//! unit if and only if its statements fully committed.
//!
//! `migrate()` is deliberately not transactional across units: an already
//! committed unit stays committed when a later one fails, and a subsequent
//! run resumes from the first unapplied unit.

use anyhow::{Context, Result};
use sqlx::{Any, AnyPool, Transaction};

use crate::dialect::{Dialect, SchemaStatements};
use crate::transform;

/// Current tracking table name.
pub const META_TABLE: &str = "wavecap_meta";

/// Tracking table name used by the Node-era releases; renamed in place on
/// first start under this version.
pub const LEGACY_META_TABLE: &str = "SequelizeMeta";

/// One SQL statement with its bound arguments. Static DDL carries no
/// arguments; the normalization unit binds every runtime-derived value
/// instead of splicing it into the SQL text.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

#[derive(Debug, Clone)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Null,
}

impl Statement {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// A named, ordered set of schema/data statements applied exactly once.
pub struct MigrationUnit {
    pub name: &'static str,
    pub source: StatementSource,
}

pub enum StatementSource {
    /// Static per-dialect statement list.
    Schema(fn(&dyn SchemaStatements) -> Vec<String>),
    /// Dialect DDL plus INSERTs derived from existing rows at run time.
    NormalizeSystems,
}

/// The full migration history, oldest first. Names are unique and
/// timestamp-prefixed; by convention their lexical order matches the
/// registry order, but the registry is the only ordering authority.
pub fn registry() -> Vec<MigrationUnit> {
    vec![
        MigrationUnit {
            name: "20200312091400-create-systems",
            source: StatementSource::Schema(|d| d.create_systems()),
        },
        MigrationUnit {
            name: "20200314102233-create-calls",
            source: StatementSource::Schema(|d| d.create_calls()),
        },
        MigrationUnit {
            name: "20200501120000-drop-call-indexes",
            source: StatementSource::Schema(|d| d.drop_call_indexes()),
        },
        MigrationUnit {
            name: "20200615083000-audio-metadata",
            source: StatementSource::Schema(|d| d.add_audio_metadata()),
        },
        MigrationUnit {
            name: "20200702141500-restore-call-indexes",
            source: StatementSource::Schema(|d| d.restore_call_indexes()),
        },
        MigrationUnit {
            name: "20200918160000-rebuild-calls",
            source: StatementSource::Schema(|d| d.rebuild_calls()),
        },
        MigrationUnit {
            name: "20210212103000-core-tables",
            source: StatementSource::Schema(|d| d.create_core_tables()),
        },
        MigrationUnit {
            name: "20210704090000-widen-talkgroup-blobs",
            source: StatementSource::Schema(|d| d.widen_talkgroup_blobs()),
        },
        MigrationUnit {
            name: "20211120113000-relax-downstream-key",
            source: StatementSource::Schema(|d| d.relax_downstream_key()),
        },
        MigrationUnit {
            name: "20220109070000-normalize-systems",
            source: StatementSource::NormalizeSystems,
        },
    ]
}

/// Terminal state of the tracking-table bootstrap.
///
/// The distinction only controls logging verbosity: a fresh install has
/// nothing meaningful to announce, while an upgrade prints each migration
/// it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    AlreadyCurrent,
    UpgradedFromLegacy,
    Fresh,
}

impl BootstrapState {
    pub fn verbose(self) -> bool {
        !matches!(self, BootstrapState::Fresh)
    }
}

/// Puts the tracking table in place: already current, renamed from the
/// legacy name, or created fresh.
pub async fn prepare_migration(pool: &AnyPool) -> Result<BootstrapState> {
    if table_exists(pool, META_TABLE).await {
        return Ok(BootstrapState::AlreadyCurrent);
    }

    if table_exists(pool, LEGACY_META_TABLE).await {
        println!("preparing for database migration");
        let sql = format!("alter table {LEGACY_META_TABLE} rename to {META_TABLE}");
        sqlx::query(&sql)
            .execute(pool)
            .await
            .with_context(|| format!("while executing {sql}"))?;
        return Ok(BootstrapState::UpgradedFromLegacy);
    }

    let sql = format!("create table {META_TABLE} (name varchar(255) not null primary key)");
    sqlx::query(&sql)
        .execute(pool)
        .await
        .with_context(|| format!("while executing {sql}"))?;
    Ok(BootstrapState::Fresh)
}

// Probed the same way on both engines: a failing select means no table.
async fn table_exists(pool: &AnyPool, table: &str) -> bool {
    let sql = format!("select count(*) from {table}");
    sqlx::query(&sql).execute(pool).await.is_ok()
}

/// Brings the store from any prior known schema generation to the current
/// one. Fail-fast: the first failing unit stops the walk, its transaction is
/// rolled back, and earlier units stay committed and recorded. Safe to call
/// again at any time; applied units are skipped.
pub async fn migrate(pool: &AnyPool, dialect: Dialect) -> Result<()> {
    let state = prepare_migration(pool).await?;
    let verbose = state.verbose();
    let statements = dialect.statements();

    for unit in registry() {
        run_pending(pool, statements, &unit, verbose).await?;
    }
    Ok(())
}

async fn run_pending(
    pool: &AnyPool,
    dialect: &dyn SchemaStatements,
    unit: &MigrationUnit,
    verbose: bool,
) -> Result<()> {
    let sql = format!("select count(*) from {META_TABLE} where name = ?");
    let applied: i64 = sqlx::query_scalar(&sql)
        .bind(unit.name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("while executing {sql}"))?;
    if applied > 0 {
        return Ok(());
    }

    if verbose {
        println!("running database migration {}", unit.name);
    }

    let statements = assemble(pool, dialect, unit).await?;
    run_unit(pool, unit.name, &statements).await
}

// The normalization unit reads the pre-migration schema here, before the
// transaction opens; a decode failure therefore aborts with the tracking
// table untouched.
async fn assemble(
    pool: &AnyPool,
    dialect: &dyn SchemaStatements,
    unit: &MigrationUnit,
) -> Result<Vec<Statement>> {
    match unit.source {
        StatementSource::Schema(build) => {
            Ok(build(dialect).into_iter().map(Statement::raw).collect())
        }
        StatementSource::NormalizeSystems => {
            let mut statements: Vec<Statement> = dialect
                .normalize_systems()
                .into_iter()
                .map(Statement::raw)
                .collect();
            statements.extend(transform::normalization_inserts(pool).await?);
            Ok(statements)
        }
    }
}

/// Applies one unit: every statement in order, then the tracking row, all in
/// one transaction. Any failure rolls the whole unit back and surfaces the
/// offending statement text.
pub async fn run_unit(pool: &AnyPool, name: &str, statements: &[Statement]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in statements {
        if let Err(err) = execute(&mut tx, statement).await {
            tx.rollback().await.ok();
            return Err(err);
        }
    }

    let sql = format!("insert into {META_TABLE} (name) values (?)");
    if let Err(err) = sqlx::query(&sql).bind(name).execute(&mut *tx).await {
        tx.rollback().await.ok();
        return Err(err).with_context(|| format!("while executing {sql}"));
    }

    tx.commit()
        .await
        .with_context(|| format!("failed to commit migration {name}"))?;
    Ok(())
}

async fn execute(tx: &mut Transaction<'_, Any>, statement: &Statement) -> Result<()> {
    let mut query = sqlx::query(&statement.sql);
    for arg in &statement.args {
        query = match arg {
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Null => query.bind(Option::<i64>::None),
        };
    }
    query
        .execute(&mut **tx)
        .await
        .with_context(|| format!("while executing {}", statement.sql))?;
    Ok(())
}
