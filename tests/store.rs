use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};

use wavecap_store::config::{Config, DbConfig};
use wavecap_store::db::Database;
use wavecap_store::dialect::Dialect;
use wavecap_store::migrations::{self, BootstrapState, META_TABLE};
use wavecap_store::seed::{self, DEFAULT_GROUPS, DEFAULT_TAGS};

async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn table_names(pool: &AnyPool) -> Vec<String> {
    let rows = sqlx::query(
        "select name from sqlite_master where type = 'table' and name not like 'sqlite_%' order by name",
    )
    .fetch_all(pool)
    .await
    .unwrap();
    rows.iter().map(|r| r.try_get("name").unwrap()).collect()
}

async fn applied_count(pool: &AnyPool) -> i64 {
    let sql = format!("select count(*) from {META_TABLE}");
    sqlx::query_scalar(&sql).fetch_one(pool).await.unwrap()
}

#[tokio::test]
async fn test_connect_bootstraps_file_backed_store() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data").join("wavecap.sqlite");
    let config = Config {
        db: DbConfig {
            driver: "sqlite".to_string(),
            path: path.clone(),
            ..DbConfig::default()
        },
    };

    let database = Database::connect(&config).await.unwrap();

    // database file created along with its parent directory
    assert!(path.exists());

    // connect only returns with the schema current and reference data seeded
    let applied: i64 = sqlx::query_scalar("select count(*) from wavecap_meta")
        .fetch_one(&database.pool)
        .await
        .unwrap();
    assert_eq!(applied, migrations::registry().len() as i64);
    let tags: i64 = sqlx::query_scalar("select count(*) from wavecap_tags")
        .fetch_one(&database.pool)
        .await
        .unwrap();
    assert_eq!(tags, DEFAULT_TAGS.len() as i64);

    // a second connect against the same file is a no-op upgrade
    let database = Database::connect(&config).await.unwrap();
    let applied_again: i64 = sqlx::query_scalar("select count(*) from wavecap_meta")
        .fetch_one(&database.pool)
        .await
        .unwrap();
    assert_eq!(applied_again, applied);
}

#[tokio::test]
async fn test_connect_rejects_unknown_driver() {
    let config = Config {
        db: DbConfig {
            driver: "postgres".to_string(),
            ..DbConfig::default()
        },
    };
    let err = Database::connect(&config).await.unwrap_err();
    assert!(format!("{err:#}").contains("unknown database driver"));
}

#[tokio::test]
async fn test_fresh_migrate_creates_full_schema() {
    let pool = memory_pool().await;
    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();

    let tables = table_names(&pool).await;
    for expected in [
        "wavecap_accesses",
        "wavecap_api_keys",
        "wavecap_calls",
        "wavecap_configs",
        "wavecap_dir_watches",
        "wavecap_downstreams",
        "wavecap_groups",
        "wavecap_logs",
        "wavecap_meta",
        "wavecap_systems",
        "wavecap_tags",
        "wavecap_talkgroups",
        "wavecap_units",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing {expected}");
    }
    // no leftover scratch tables from the copy-and-rename migrations
    assert!(!tables.iter().any(|t| t.ends_with('2')), "{tables:?}");

    assert_eq!(
        applied_count(&pool).await,
        migrations::registry().len() as i64
    );
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let pool = memory_pool().await;
    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();
    let first_tables = table_names(&pool).await;
    let first_count = applied_count(&pool).await;

    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();
    assert_eq!(table_names(&pool).await, first_tables);
    assert_eq!(applied_count(&pool).await, first_count);
}

#[tokio::test]
async fn test_fail_fast_preserves_earlier_units() {
    let pool = memory_pool().await;
    // conflicts with the second unit's create table
    sqlx::query("create table wavecap_calls (id integer primary key)")
        .execute(&pool)
        .await
        .unwrap();

    let err = migrations::migrate(&pool, Dialect::Sqlite)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("create table wavecap_calls"));

    // the first unit committed and stays recorded; nothing after it ran
    let sql = format!("select name from {META_TABLE} order by name");
    let rows = sqlx::query(&sql).fetch_all(&pool).await.unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.try_get("name").unwrap()).collect();
    assert_eq!(names, vec!["20200312091400-create-systems".to_string()]);

    let tables = table_names(&pool).await;
    assert!(tables.iter().any(|t| t == "wavecap_systems"));
    assert!(!tables.iter().any(|t| t == "wavecap_talkgroups"));
}

#[tokio::test]
async fn test_bootstrap_states() {
    let pool = memory_pool().await;
    let state = migrations::prepare_migration(&pool).await.unwrap();
    assert_eq!(state, BootstrapState::Fresh);
    assert!(!state.verbose());

    let state = migrations::prepare_migration(&pool).await.unwrap();
    assert_eq!(state, BootstrapState::AlreadyCurrent);
    assert!(state.verbose());
}

#[tokio::test]
async fn test_bootstrap_renames_legacy_tracking_table() {
    let pool = memory_pool().await;
    sqlx::query("create table SequelizeMeta (name varchar(255) not null primary key)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("insert into SequelizeMeta (name) values ('X')")
        .execute(&pool)
        .await
        .unwrap();

    let state = migrations::prepare_migration(&pool).await.unwrap();
    assert_eq!(state, BootstrapState::UpgradedFromLegacy);

    // the recorded row survived the rename and the legacy table is gone
    let sql = format!("select count(*) from {META_TABLE} where name = 'X'");
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&pool).await.unwrap();
    assert_eq!(count, 1);
    assert!(sqlx::query("select count(*) from SequelizeMeta")
        .execute(&pool)
        .await
        .is_err());
}

#[tokio::test]
async fn test_seed_populates_empty_tables() {
    let pool = memory_pool().await;
    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();
    seed::seed(&pool).await.unwrap();

    let groups: i64 = sqlx::query_scalar("select count(*) from wavecap_groups")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(groups, DEFAULT_GROUPS.len() as i64);
    let tags: i64 = sqlx::query_scalar("select count(*) from wavecap_tags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tags, DEFAULT_TAGS.len() as i64);

    // second run inserts nothing
    seed::seed(&pool).await.unwrap();
    let groups_again: i64 = sqlx::query_scalar("select count(*) from wavecap_groups")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(groups_again, groups);
}

#[tokio::test]
async fn test_seed_skips_nonempty_table() {
    let pool = memory_pool().await;
    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();
    sqlx::query("insert into wavecap_tags (label) values ('Custom')")
        .execute(&pool)
        .await
        .unwrap();

    seed::seed(&pool).await.unwrap();

    let rows = sqlx::query("select label from wavecap_tags")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let label: String = rows[0].try_get("label").unwrap();
    assert_eq!(label, "Custom");

    // groups table was empty, so it still gets its defaults
    let groups: i64 = sqlx::query_scalar("select count(*) from wavecap_groups")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(groups, DEFAULT_GROUPS.len() as i64);
}

// Checks dialect parity structurally for the normalized tables: the columns
// the live SQLite schema ends up with match the columns the MySQL statement
// list declares.
#[tokio::test]
async fn test_dialect_parity_for_normalized_tables() {
    let pool = memory_pool().await;
    migrations::migrate(&pool, Dialect::Sqlite).await.unwrap();

    for table in ["wavecap_talkgroups", "wavecap_units"] {
        let sql = format!("select name from pragma_table_info('{table}') order by name");
        let rows = sqlx::query(&sql).fetch_all(&pool).await.unwrap();
        let mut live: Vec<String> = rows.iter().map(|r| r.try_get("name").unwrap()).collect();
        live.sort();

        let mut declared = mysql_columns(table);
        declared.sort();
        assert_eq!(live, declared, "column mismatch for {table}");
    }
}

// Pulls the column names out of the MySQL create-table statement for the
// given table.
fn mysql_columns(table: &str) -> Vec<String> {
    let statements = Dialect::MySql.statements().normalize_systems();
    let create = statements
        .iter()
        .find(|s| s.starts_with(&format!("create table {table} (")))
        .unwrap_or_else(|| panic!("no create statement for {table}"));
    let body = create
        .split_once('(')
        .unwrap()
        .1
        .rsplit_once(')')
        .unwrap()
        .0;
    body.split(", ")
        .map(|column| column.split_whitespace().next().unwrap().to_string())
        .collect()
}
