use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::Config;
use crate::dialect::Dialect;
use crate::{migrations, seed};

/// An open, fully migrated store.
///
/// `connect` only returns once every pending migration has committed and
/// reference data is seeded, so holders of a `Database` never observe a
/// partially migrated schema.
#[derive(Debug)]
pub struct Database {
    pub pool: AnyPool,
    pub dialect: Dialect,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Database> {
        let dialect = Dialect::from_driver(&config.db.driver)?;
        sqlx::any::install_default_drivers();

        let url = match dialect {
            Dialect::Sqlite => {
                if let Some(parent) = config.db.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("failed to create database directory {}", parent.display())
                        })?;
                    }
                }
                format!("sqlite://{}?mode=rwc", config.db.path.display())
            }
            Dialect::MySql => format!(
                "mysql://{}:{}@{}:{}/{}",
                config.db.user, config.db.password, config.db.host, config.db.port, config.db.name
            ),
        };

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .with_context(|| format!("failed to open {} database", config.db.driver))?;

        migrations::migrate(&pool, dialect).await?;
        seed::seed(&pool).await?;

        Ok(Database { pool, dialect })
    }

    /// Renders a datetime the way the active engine stores it.
    pub fn format_datetime(&self, value: DateTime<Utc>) -> String {
        value
            .format(self.dialect.statements().datetime_format())
            .to_string()
    }

    /// Parses a stored datetime literal using the active engine's format.
    pub fn parse_datetime(&self, value: &str) -> Result<DateTime<Utc>> {
        parse_datetime_as(self.dialect, value)
    }
}

fn parse_datetime_as(dialect: Dialect, value: &str) -> Result<DateTime<Utc>> {
    let format = dialect.statements().datetime_format();
    match dialect {
        // offset-aware literal
        Dialect::Sqlite => Ok(DateTime::parse_from_str(value, format)
            .with_context(|| format!("unknown datetime format: {value}"))?
            .with_timezone(&Utc)),
        Dialect::MySql => Ok(NaiveDateTime::parse_from_str(value, format)
            .with_context(|| format!("unknown datetime format: {value}"))?
            .and_utc()),
    }
}
