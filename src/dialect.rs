//! Per-engine DDL statement sets.
//!
//! The two supported engine families diverge in three places that matter to
//! this schema's history: the auto-incrementing primary key keyword, the
//! index-drop syntax (SQLite drops by index name alone, MySQL requires
//! `on <table>`), and column type changes (MySQL has `alter table ... modify`,
//! SQLite rebuilds the table and copies rows). Each migration unit therefore
//! carries one statement list per dialect, chosen once at startup.

use anyhow::{bail, Result};

/// Engine family the store runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

impl Dialect {
    /// Maps the configured driver string to a dialect. An unknown driver is
    /// a fatal configuration error, raised before any migration runs.
    pub fn from_driver(driver: &str) -> Result<Dialect> {
        match driver {
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            other => bail!("unknown database driver: {other}"),
        }
    }

    pub fn statements(self) -> &'static dyn SchemaStatements {
        match self {
            Dialect::Sqlite => &SqliteStatements,
            Dialect::MySql => &MySqlStatements,
        }
    }
}

/// Statement lists for every migration unit, one implementation per engine
/// family. These are static per-unit choices, not runtime transforms: the
/// lists are written out in full so the exact SQL each generation of the
/// schema saw is readable in one place.
pub trait SchemaStatements: Send + Sync {
    fn create_systems(&self) -> Vec<String>;
    fn create_calls(&self) -> Vec<String>;
    fn drop_call_indexes(&self) -> Vec<String>;
    fn add_audio_metadata(&self) -> Vec<String>;
    fn restore_call_indexes(&self) -> Vec<String>;
    fn rebuild_calls(&self) -> Vec<String>;
    fn create_core_tables(&self) -> Vec<String>;
    fn widen_talkgroup_blobs(&self) -> Vec<String>;
    fn relax_downstream_key(&self) -> Vec<String>;
    /// DDL portion of the normalization unit; the data-derived INSERTs are
    /// appended by [`crate::transform`].
    fn normalize_systems(&self) -> Vec<String>;

    /// chrono format string for datetime literals stored by this engine.
    fn datetime_format(&self) -> &'static str;
}

pub struct SqliteStatements;
pub struct MySqlStatements;

fn owned(statements: &[&str]) -> Vec<String> {
    statements.iter().map(|s| s.to_string()).collect()
}

impl SchemaStatements for SqliteStatements {
    fn create_systems(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_systems (id integer primary key autoincrement, created_at datetime not null, updated_at datetime not null, name varchar(255) not null, system integer not null, talkgroups json not null)",
            "create unique index wavecap_systems_system on wavecap_systems (system)",
        ])
    }

    fn create_calls(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_calls (id integer primary key autoincrement, created_at datetime not null, updated_at datetime not null, audio longblob not null, emergency tinyint(1) not null, freq integer not null, freq_list json not null, start_time datetime not null, stop_time datetime not null, src_list json not null, system integer not null, talkgroup integer not null)",
            "create index wavecap_calls_start_time on wavecap_calls (start_time)",
            "create index wavecap_calls_system on wavecap_calls (system)",
            "create index wavecap_calls_talkgroup on wavecap_calls (talkgroup)",
        ])
    }

    fn drop_call_indexes(&self) -> Vec<String> {
        owned(&[
            "drop index wavecap_calls_system",
            "drop index wavecap_calls_talkgroup",
        ])
    }

    fn add_audio_metadata(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_calls add column audio_name varchar(255)",
            "alter table wavecap_calls add column audio_type varchar(255)",
            "alter table wavecap_systems add column aliases json not null",
        ])
    }

    fn restore_call_indexes(&self) -> Vec<String> {
        owned(&[
            "create index wavecap_calls_system on wavecap_calls (system)",
            "create index wavecap_calls_system_talkgroup on wavecap_calls (system, talkgroup)",
        ])
    }

    fn rebuild_calls(&self) -> Vec<String> {
        owned(&[
            "drop table wavecap_systems",
            "create table wavecap_calls2 (id integer primary key autoincrement, audio longblob not null, audio_name varchar(255), audio_type varchar(255), date_time datetime not null, frequencies json not null, frequency integer, source integer, sources json not null, system integer not null, talkgroup integer not null)",
            "insert into wavecap_calls2 select id, audio, audio_name, audio_type, start_time, freq_list, freq, null, src_list, system, talkgroup from wavecap_calls",
            "drop table wavecap_calls",
            "alter table wavecap_calls2 rename to wavecap_calls",
            "create index wavecap_calls_date_time_system_talkgroup on wavecap_calls (date_time, system, talkgroup)",
        ])
    }

    fn create_core_tables(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_accesses (_id integer primary key autoincrement, code varchar(255) not null unique, expiration datetime, ident varchar(255), conn_limit integer, sort_order integer, systems text not null)",
            "create table wavecap_api_keys (_id integer primary key autoincrement, disabled tinyint(1) default 0, ident varchar(255), api_key varchar(255) not null unique, sort_order integer, systems text not null)",
            "create table wavecap_calls2 (id integer primary key autoincrement, audio longblob not null, audio_name varchar(255), audio_type varchar(255), date_time datetime not null, frequencies text not null, frequency integer, source integer, sources text not null, system integer not null, talkgroup integer not null)",
            "create index wavecap_calls2_date_time_system_talkgroup on wavecap_calls2 (date_time, system, talkgroup)",
            "insert into wavecap_calls2 select id, audio, audio_name, audio_type, date_time, frequencies, frequency, source, sources, system, talkgroup from wavecap_calls",
            "drop table wavecap_calls",
            "alter table wavecap_calls2 rename to wavecap_calls",
            "create table wavecap_configs (_id integer primary key autoincrement, config_key varchar(255) not null unique, val text not null)",
            "create index wavecap_configs_config_key on wavecap_configs (config_key)",
            "create table wavecap_dir_watches (_id integer primary key autoincrement, delay integer default 0, delete_after tinyint(1) default 0, directory varchar(255) not null unique, disabled tinyint(1) default 0, extension varchar(255), frequency integer, mask varchar(255), sort_order integer, system_id integer, talkgroup_id integer, kind varchar(255), use_polling tinyint(1) default 0)",
            "create table wavecap_downstreams (_id integer primary key autoincrement, api_key varchar(255) not null unique, disabled tinyint(1) default 0, sort_order integer, systems text not null, url varchar(255) not null)",
            "create table wavecap_groups (_id integer primary key autoincrement, label varchar(255) not null)",
            "create table wavecap_logs (_id integer primary key autoincrement, date_time datetime not null, level varchar(255) not null, message varchar(255) not null)",
            "create index wavecap_logs_date_time_level on wavecap_logs (date_time, level)",
            "create table wavecap_systems (_id integer primary key autoincrement, auto_populate tinyint(1) default 0, blacklists text not null, id integer not null unique, label varchar(255) not null, led varchar(255), sort_order integer, talkgroups text not null, units text not null)",
            "create table wavecap_tags (_id integer primary key autoincrement, label varchar(255) not null)",
        ])
    }

    // SQLite could not alter a column type in place when this generation
    // shipped, hence the copy-and-rename dance.
    fn widen_talkgroup_blobs(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_systems2 (_id integer primary key autoincrement, auto_populate tinyint(1) default 0, blacklists text not null, id integer not null unique, label varchar(255) not null, led varchar(255), sort_order integer, talkgroups longtext not null, units longtext not null)",
            "insert into wavecap_systems2 select _id, auto_populate, blacklists, id, label, led, sort_order, talkgroups, units from wavecap_systems",
            "drop table wavecap_systems",
            "alter table wavecap_systems2 rename to wavecap_systems",
            "drop index wavecap_calls2_date_time_system_talkgroup",
            "create index wavecap_calls_date_time_system_talkgroup on wavecap_calls (date_time, system, talkgroup)",
        ])
    }

    fn relax_downstream_key(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_downstreams rename to wavecap_downstreams2",
            "create table wavecap_downstreams (_id integer primary key autoincrement, api_key varchar(255) not null, disabled tinyint(1) default 0, sort_order integer, systems text not null, url varchar(255) not null)",
            "insert into wavecap_downstreams select * from wavecap_downstreams2",
            "drop table wavecap_downstreams2",
        ])
    }

    fn normalize_systems(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_calls2 (id integer primary key autoincrement, audio longblob not null, audio_name varchar(255), audio_type varchar(255), date_time datetime not null, frequencies text not null, frequency integer, patches text not null, source integer, sources text not null, system integer not null, talkgroup integer not null)",
            "insert into wavecap_calls2 select id, audio, audio_name, audio_type, date_time, frequencies, frequency, '[]', source, sources, system, talkgroup from wavecap_calls",
            "drop table wavecap_calls",
            "alter table wavecap_calls2 rename to wavecap_calls",
            "create index wavecap_calls_date_time_system_talkgroup on wavecap_calls (date_time, system, talkgroup)",
            "create table wavecap_systems2 (_id integer primary key autoincrement, auto_populate tinyint(1) default 0, blacklists text not null, id integer not null unique, label varchar(255) not null, led varchar(255), sort_order integer)",
            "insert into wavecap_systems2 select _id, auto_populate, blacklists, id, label, led, sort_order from wavecap_systems",
            "drop table wavecap_systems",
            "alter table wavecap_systems2 rename to wavecap_systems",
            "create table wavecap_talkgroups (_id integer primary key autoincrement, frequency integer, group_id integer not null, id integer not null, label varchar(255) not null, led varchar(255), name varchar(255) not null, sort_order integer, system_id integer not null, tag_id integer not null)",
            "create unique index wavecap_talkgroups_system_id_id on wavecap_talkgroups (system_id, id)",
            "create table wavecap_units (_id integer primary key autoincrement, id integer not null, label varchar(255) not null, sort_order integer, system_id integer not null)",
            "create unique index wavecap_units_system_id_id on wavecap_units (system_id, id)",
        ])
    }

    // Offset-aware with millisecond precision, matching what the embedded
    // engine stores for datetime columns.
    fn datetime_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S%.3f %:z"
    }
}

impl SchemaStatements for MySqlStatements {
    fn create_systems(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_systems (id integer primary key auto_increment, created_at datetime not null, updated_at datetime not null, name varchar(255) not null, system integer not null, talkgroups json not null)",
            "create unique index wavecap_systems_system on wavecap_systems (system)",
        ])
    }

    fn create_calls(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_calls (id integer primary key auto_increment, created_at datetime not null, updated_at datetime not null, audio longblob not null, emergency tinyint(1) not null, freq integer not null, freq_list json not null, start_time datetime not null, stop_time datetime not null, src_list json not null, system integer not null, talkgroup integer not null)",
            "create index wavecap_calls_start_time on wavecap_calls (start_time)",
            "create index wavecap_calls_system on wavecap_calls (system)",
            "create index wavecap_calls_talkgroup on wavecap_calls (talkgroup)",
        ])
    }

    fn drop_call_indexes(&self) -> Vec<String> {
        owned(&[
            "drop index wavecap_calls_system on wavecap_calls",
            "drop index wavecap_calls_talkgroup on wavecap_calls",
        ])
    }

    fn add_audio_metadata(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_calls add column audio_name varchar(255)",
            "alter table wavecap_calls add column audio_type varchar(255)",
            "alter table wavecap_systems add column aliases json not null",
        ])
    }

    fn restore_call_indexes(&self) -> Vec<String> {
        owned(&[
            "create index wavecap_calls_system on wavecap_calls (system)",
            "create index wavecap_calls_system_talkgroup on wavecap_calls (system, talkgroup)",
        ])
    }

    fn rebuild_calls(&self) -> Vec<String> {
        owned(&[
            "drop table wavecap_systems",
            "create table wavecap_calls2 (id integer primary key auto_increment, audio longblob not null, audio_name varchar(255), audio_type varchar(255), date_time datetime not null, frequencies json not null, frequency integer, source integer, sources json not null, system integer not null, talkgroup integer not null)",
            "insert into wavecap_calls2 select id, audio, audio_name, audio_type, start_time, freq_list, freq, null, src_list, system, talkgroup from wavecap_calls",
            "drop table wavecap_calls",
            "alter table wavecap_calls2 rename to wavecap_calls",
            "create index wavecap_calls_date_time_system_talkgroup on wavecap_calls (date_time, system, talkgroup)",
        ])
    }

    fn create_core_tables(&self) -> Vec<String> {
        owned(&[
            "create table wavecap_accesses (_id integer primary key auto_increment, code varchar(255) not null unique, expiration datetime, ident varchar(255), conn_limit integer, sort_order integer, systems text not null)",
            "create table wavecap_api_keys (_id integer primary key auto_increment, disabled tinyint(1) default 0, ident varchar(255), api_key varchar(255) not null unique, sort_order integer, systems text not null)",
            "create table wavecap_calls2 (id integer primary key auto_increment, audio longblob not null, audio_name varchar(255), audio_type varchar(255), date_time datetime not null, frequencies text not null, frequency integer, source integer, sources text not null, system integer not null, talkgroup integer not null)",
            "create index wavecap_calls2_date_time_system_talkgroup on wavecap_calls2 (date_time, system, talkgroup)",
            "insert into wavecap_calls2 select id, audio, audio_name, audio_type, date_time, frequencies, frequency, source, sources, system, talkgroup from wavecap_calls",
            "drop table wavecap_calls",
            "alter table wavecap_calls2 rename to wavecap_calls",
            "create table wavecap_configs (_id integer primary key auto_increment, config_key varchar(255) not null unique, val text not null)",
            "create index wavecap_configs_config_key on wavecap_configs (config_key)",
            "create table wavecap_dir_watches (_id integer primary key auto_increment, delay integer default 0, delete_after tinyint(1) default 0, directory varchar(255) not null unique, disabled tinyint(1) default 0, extension varchar(255), frequency integer, mask varchar(255), sort_order integer, system_id integer, talkgroup_id integer, kind varchar(255), use_polling tinyint(1) default 0)",
            "create table wavecap_downstreams (_id integer primary key auto_increment, api_key varchar(255) not null unique, disabled tinyint(1) default 0, sort_order integer, systems text not null, url varchar(255) not null)",
            "create table wavecap_groups (_id integer primary key auto_increment, label varchar(255) not null)",
            "create table wavecap_logs (_id integer primary key auto_increment, date_time datetime not null, level varchar(255) not null, message varchar(255) not null)",
            "create index wavecap_logs_date_time_level on wavecap_logs (date_time, level)",
            "create table wavecap_systems (_id integer primary key auto_increment, auto_populate tinyint(1) default 0, blacklists text not null, id integer not null unique, label varchar(255) not null, led varchar(255), sort_order integer, talkgroups text not null, units text not null)",
            "create table wavecap_tags (_id integer primary key auto_increment, label varchar(255) not null)",
        ])
    }

    fn widen_talkgroup_blobs(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_systems modify talkgroups longtext not null",
            "alter table wavecap_systems modify units longtext not null",
            "drop index wavecap_calls2_date_time_system_talkgroup on wavecap_calls",
            "create index wavecap_calls_date_time_system_talkgroup on wavecap_calls (date_time, system, talkgroup)",
        ])
    }

    fn relax_downstream_key(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_downstreams rename to wavecap_downstreams2",
            "create table wavecap_downstreams (_id integer primary key auto_increment, api_key varchar(255) not null, disabled tinyint(1) default 0, sort_order integer, systems text not null, url varchar(255) not null)",
            "insert into wavecap_downstreams select * from wavecap_downstreams2",
            "drop table wavecap_downstreams2",
        ])
    }

    fn normalize_systems(&self) -> Vec<String> {
        owned(&[
            "alter table wavecap_calls add column patches text not null",
            "alter table wavecap_systems drop column talkgroups",
            "alter table wavecap_systems drop column units",
            "create table wavecap_talkgroups (_id integer primary key auto_increment, frequency integer, group_id integer not null, id integer not null, label varchar(255) not null, led varchar(255), name varchar(255) not null, sort_order integer, system_id integer not null, tag_id integer not null)",
            "create unique index wavecap_talkgroups_system_id_id on wavecap_talkgroups (system_id, id)",
            "create table wavecap_units (_id integer primary key auto_increment, id integer not null, label varchar(255) not null, sort_order integer, system_id integer not null)",
            "create unique index wavecap_units_system_id_id on wavecap_units (system_id, id)",
        ])
    }

    fn datetime_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S"
    }
}
