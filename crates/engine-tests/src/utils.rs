#![allow(dead_code)]

use super::{mysql_execute, mysql_url, pg_execute, pg_url};
use connectors::source::{
    config::{DataSourceConfig, PoolConfig},
    pool::PooledDataSourceProvider,
};
use engine_core::channel::record_channel;
use engine_processing::dumper::{InventoryDumper, handle::DumpHandle};
use model::{
    core::{
        identifiers::{SourceDialect, SourceRef},
        value::Value,
    },
    execution::{dump_task::DumpTaskConfig, state::DumpState},
    records::record::{Record, StreamItem},
};
use std::sync::Arc;

pub const SOURCE: &str = "test-source";
pub const ROW_COUNT: i64 = 250;

/// Seeds `dump_items` in MySQL with every column kind the dumper decodes.
pub async fn seed_mysql() {
    mysql_execute(
        r#"
        DROP TABLE IF EXISTS dump_items;
        CREATE TABLE dump_items (
            id INT PRIMARY KEY,
            name VARCHAR(64) NOT NULL,
            price DECIMAL(10, 2),
            ratio DOUBLE,
            active TINYINT(1) NOT NULL,
            big BIGINT UNSIGNED,
            payload BLOB,
            born DATE,
            updated DATETIME(6),
            span TIME,
            made YEAR
        );
        DROP TABLE IF EXISTS dump_log;
        CREATE TABLE dump_log (message VARCHAR(32) NOT NULL);
        "#,
    )
    .await;

    let values: Vec<String> = (1..=ROW_COUNT)
        .map(|id| {
            format!(
                "({id}, 'item-{id}', {id}.50, 0.25, {active}, 18446744073709551615, X'00ff', \
                 '2024-01-15', '2024-01-15 10:30:00.123456', '-838:59:59', 2024)",
                active = id % 2
            )
        })
        .collect();
    mysql_execute(&format!(
        "INSERT INTO dump_items VALUES {};",
        values.join(",")
    ))
    .await;
    mysql_execute("INSERT INTO dump_log VALUES ('a'), ('b'), ('c'), ('d'), ('e');").await;
}

/// Seeds `dump_items` in PostgreSQL, including enum, uuid and json columns.
pub async fn seed_postgres() {
    pg_execute(
        r#"
        DROP TABLE IF EXISTS dump_items;
        DROP TABLE IF EXISTS dump_log;
        DROP TABLE IF EXISTS dump_hosts;
        DROP TYPE IF EXISTS dump_mood;
        CREATE TYPE dump_mood AS ENUM ('happy', 'sad');
        CREATE TABLE dump_items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            price NUMERIC(10, 2),
            ratio DOUBLE PRECISION,
            active BOOLEAN NOT NULL,
            payload BYTEA,
            born DATE,
            updated TIMESTAMP,
            stamped TIMESTAMPTZ,
            mood dump_mood,
            tag UUID,
            doc JSONB,
            huge NUMERIC,
            elapsed INTERVAL,
            addr INET,
            scores INTEGER[],
            notes JSON
        );
        CREATE TABLE dump_log (message TEXT NOT NULL);
        INSERT INTO dump_log VALUES ('a'), ('b'), ('c'), ('d'), ('e');
        CREATE TABLE dump_hosts (addr INET PRIMARY KEY);
        INSERT INTO dump_hosts VALUES ('10.0.0.10'), ('10.0.0.1'), ('10.0.0.9');
        "#,
    )
    .await;

    pg_execute(&format!(
        r#"
        INSERT INTO dump_items
        SELECT id, 'item-' || id, id + 0.5, 0.25, id % 2 = 1, '\x00ff'::bytea,
               DATE '2024-01-15', TIMESTAMP '2024-01-15 10:30:00.5',
               TIMESTAMPTZ '2024-01-15 10:30:00+00', 'happy',
               'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', '{{"k": 1}}',
               '1e32'::numeric, INTERVAL '1 year 2 mons 3 days 04:05:06',
               INET '10.0.0.1', ARRAY[1, 2, 3], '{{"b": 1,  "a": 2}}'
        FROM generate_series(1, {ROW_COUNT}) AS id;
        "#
    ))
    .await;
}

pub fn provider(dialect: SourceDialect) -> Arc<PooledDataSourceProvider> {
    let url = match dialect {
        SourceDialect::MySql => mysql_url(),
        SourceDialect::Postgres => pg_url(),
    };
    Arc::new(
        PooledDataSourceProvider::new(PoolConfig { max_connections: 4 })
            .with_source(SourceRef::from(SOURCE), DataSourceConfig::new(dialect, url)),
    )
}

pub fn items_config(dialect: SourceDialect) -> DumpTaskConfig {
    DumpTaskConfig::builder("dump_items", dialect, SourceRef::from(SOURCE))
        .columns(["id", "name"])
        .unique_key("id")
        .batch_size(64)
        .build()
}

pub struct DumpRun {
    pub records: Vec<Record>,
    pub terminal: Option<StreamItem>,
    pub state: DumpState,
    pub handle: DumpHandle,
}

impl DumpRun {
    pub fn ids(&self) -> Vec<i64> {
        self.records
            .iter()
            .map(|r| r.get_value("id").as_i64().expect("integer id"))
            .collect()
    }

    pub fn first_value(&self, column: &str) -> Value {
        self.records
            .first()
            .map(|r| r.get_value(column))
            .expect("at least one record")
    }
}

/// Dumps `config` through a fresh pooled provider and drains the channel.
pub async fn run_dump(config: DumpTaskConfig) -> DumpRun {
    let provider = provider(config.dialect);
    let (sender, mut receiver) = record_channel(16);
    let (handle, task) = InventoryDumper::for_source(config, provider.clone(), sender).spawn();

    let mut records = Vec::new();
    let mut terminal = None;
    while let Some(item) = receiver.pop().await {
        match item {
            StreamItem::Record(record) => records.push(record),
            other => terminal = Some(other),
        }
    }

    let state = task.await.expect("dump task");
    provider.close().await;
    DumpRun {
        records,
        terminal,
        state,
        handle,
    }
}
