//! Local SQL engine on SQLite.
//!
//! Curated partitions live in the object store. Before a refresh statement
//! runs, the partition of its run date is mirrored into a `prices_daily` table
//! with a `dt` partition column, so refresh SQL reads the lake the way an
//! external engine reads a partitioned table. Other dates already in the
//! table are left alone.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diesel::{
    Connection, QueryableByName, RunQueryDsl, SqliteConnection,
    connection::SimpleConnection,
    sql_query,
    sql_types::{BigInt, Double, Nullable, Text},
};
use tracing::{debug, info};

use super::{QueryContext, QueryEngine, QueryError, Record, RenderedStatement};
use crate::{
    models::{PriceRow, RunDate},
    store::{ObjectStore, keys::curated_partition_key, require_bucket},
};

const CREATE_PRICES_DAILY: &str = "CREATE TABLE IF NOT EXISTS prices_daily (
    dt     TEXT    NOT NULL,
    symbol TEXT    NOT NULL,
    date   TEXT    NOT NULL,
    open   REAL    NOT NULL,
    high   REAL    NOT NULL,
    low    REAL    NOT NULL,
    close  REAL    NOT NULL,
    volume INTEGER NOT NULL
)";

const INSERT_PRICE: &str = "INSERT INTO prices_daily (dt, symbol, date, open, high, low, close, volume)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

/// Opens a SQLite connection with WAL journaling and a 5000ms busy timeout.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, QueryError> {
    let mut conn = SqliteConnection::establish(database_url)?;
    conn.batch_execute("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

#[derive(QueryableByName)]
struct ScalarRow {
    #[diesel(sql_type = Nullable<Text>)]
    value: Option<String>,
}

pub struct SqliteWarehouse {
    conn: Arc<Mutex<SqliteConnection>>,
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl SqliteWarehouse {
    /// Opens (or creates) the warehouse at `database_url` reading curated
    /// partitions from `bucket`.
    pub fn open(
        database_url: &str,
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let mut conn = connect_sqlite(database_url)?;
        conn.batch_execute(CREATE_PRICES_DAILY)?;
        info!(database_url, "opened warehouse");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            store,
            bucket: bucket.into(),
        })
    }

    async fn load_partition(&self, run_date: RunDate) -> Result<Vec<PriceRow>, QueryError> {
        let bucket = require_bucket(&self.bucket)?;
        let key = curated_partition_key(run_date);
        let body = self.store.get(bucket, &key).await?;

        csv::Reader::from_reader(body.as_slice())
            .deserialize()
            .collect::<Result<Vec<PriceRow>, _>>()
            .map_err(|source| QueryError::Csv { key, source })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, QueryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| QueryError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

fn replace_partition(
    conn: &mut SqliteConnection,
    run_date: RunDate,
    rows: &[PriceRow],
) -> Result<usize, QueryError> {
    let dt = run_date.to_string();
    conn.transaction(|conn| {
        sql_query("DELETE FROM prices_daily WHERE dt = ?")
            .bind::<Text, _>(dt.clone())
            .execute(conn)?;

        for row in rows {
            let volume = i64::try_from(row.volume).map_err(|_| {
                QueryError::UnexpectedResult(format!("volume {} does not fit INTEGER", row.volume))
            })?;
            sql_query(INSERT_PRICE)
                .bind::<Text, _>(dt.clone())
                .bind::<Text, _>(row.symbol.to_string())
                .bind::<Text, _>(row.date.to_string())
                .bind::<Double, _>(row.open)
                .bind::<Double, _>(row.high)
                .bind::<Double, _>(row.low)
                .bind::<Double, _>(row.close)
                .bind::<BigInt, _>(volume)
                .execute(conn)?;
        }
        Ok(rows.len())
    })
}

#[async_trait]
impl QueryEngine for SqliteWarehouse {
    async fn execute(&self, statement: &RenderedStatement, ctx: &QueryContext) -> Result<(), QueryError> {
        info!(
            statement = statement.name,
            target = statement.target_table,
            database = %ctx.database,
            output_location = ?ctx.output_location,
            "executing refresh statement"
        );
        let run_date = statement.run_date;
        let rows = self.load_partition(run_date).await?;
        let name = statement.name;
        let sql = statement.sql.clone();

        self.with_conn(move |conn| {
            let mirrored = replace_partition(conn, run_date, &rows)?;
            debug!(%run_date, rows = mirrored, "mirrored curated partition");
            for stmt in &sql {
                conn.batch_execute(stmt).map_err(|e| QueryError::Execution {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            }
            Ok(())
        })
        .await
    }

    /// Returns at most one row holding the first column of the first result
    /// row, or `NULL` when the query yields nothing.
    async fn fetch_records(&self, sql: &str, ctx: &QueryContext) -> Result<Vec<Record>, QueryError> {
        debug!(sql, database = %ctx.database, "fetching records");
        let wrapped = format!(
            "SELECT CAST(({}) AS TEXT) AS value",
            sql.trim().trim_end_matches(';')
        );
        self.with_conn(move |conn| {
            let rows: Vec<ScalarRow> = sql_query(wrapped).load(conn)?;
            Ok(rows.into_iter().map(|row| vec![row.value]).collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::CuratedPartitionWriter,
        models::Symbol,
        store::{InMemoryObjectStore, StoreError},
        warehouse::{ANOMALY_COUNT_SQL, REFRESH_ANOMALIES, REFRESH_DAILY_RETURNS},
    };
    use chrono::NaiveDate;

    fn dt() -> RunDate {
        "2026-01-29".parse().unwrap()
    }

    fn row(symbol: &str, day: u32, close: f64, volume: u64) -> PriceRow {
        PriceRow {
            symbol: Symbol::new(symbol).unwrap(),
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    async fn warehouse_with(rows: &[PriceRow]) -> SqliteWarehouse {
        let store = Arc::new(InMemoryObjectStore::new());
        CuratedPartitionWriter::new(store.clone(), "lake")
            .write(dt(), rows)
            .await
            .unwrap();
        SqliteWarehouse::open(":memory:", store, "lake").unwrap()
    }

    async fn refresh_and_count(warehouse: &SqliteWarehouse) -> Vec<Record> {
        let ctx = QueryContext::new("fin_risk", None);
        warehouse.execute(&REFRESH_DAILY_RETURNS.render(dt()), &ctx).await.unwrap();
        warehouse.execute(&REFRESH_ANOMALIES.render(dt()), &ctx).await.unwrap();
        warehouse.fetch_records(ANOMALY_COUNT_SQL, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn calm_prices_produce_no_anomalies() {
        let warehouse = warehouse_with(&[
            row("AAPL", 27, 100.0, 10),
            row("AAPL", 28, 101.0, 10),
            row("AAPL", 29, 102.0, 10),
        ])
        .await;
        assert_eq!(refresh_and_count(&warehouse).await, vec![vec![Some("0".to_string())]]);
    }

    #[tokio::test]
    async fn return_spike_is_flagged() {
        let warehouse = warehouse_with(&[row("MSFT", 28, 100.0, 10), row("MSFT", 29, 120.0, 10)]).await;
        assert_eq!(refresh_and_count(&warehouse).await, vec![vec![Some("1".to_string())]]);

        let ctx = QueryContext::new("fin_risk", None);
        let reason = warehouse
            .fetch_records("SELECT reason FROM fct_anomalies", &ctx)
            .await
            .unwrap();
        assert_eq!(reason, vec![vec![Some("return_spike".to_string())]]);
    }

    #[tokio::test]
    async fn zero_volume_is_flagged() {
        let warehouse = warehouse_with(&[row("TSLA", 29, 250.0, 0)]).await;
        assert_eq!(refresh_and_count(&warehouse).await, vec![vec![Some("1".to_string())]]);
    }

    #[tokio::test]
    async fn only_the_run_date_partition_is_mirrored() {
        let store = Arc::new(InMemoryObjectStore::new());
        let other: RunDate = "2026-01-28".parse().unwrap();
        store
            .put("lake", &curated_partition_key(other), b"not,a,partition\n1".to_vec(), "text/csv")
            .await
            .unwrap();
        CuratedPartitionWriter::new(store.clone(), "lake")
            .write(dt(), &[row("AAPL", 28, 100.0, 10), row("AAPL", 29, 101.0, 10)])
            .await
            .unwrap();
        let warehouse = SqliteWarehouse::open(":memory:", store, "lake").unwrap();
        let ctx = QueryContext::new("fin_risk", None);

        warehouse.execute(&REFRESH_DAILY_RETURNS.render(dt()), &ctx).await.unwrap();
        warehouse.execute(&REFRESH_DAILY_RETURNS.render(dt()), &ctx).await.unwrap();

        let count = warehouse
            .fetch_records("SELECT COUNT(*) FROM prices_daily", &ctx)
            .await
            .unwrap();
        assert_eq!(count, vec![vec![Some("2".to_string())]]);

        let err = warehouse
            .execute(&REFRESH_DAILY_RETURNS.render(other), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Csv { .. }));
    }

    #[tokio::test]
    async fn missing_partition_fails_the_refresh() {
        let store = Arc::new(InMemoryObjectStore::new());
        let warehouse = SqliteWarehouse::open(":memory:", store, "lake").unwrap();
        let err = warehouse
            .execute(&REFRESH_DAILY_RETURNS.render(dt()), &QueryContext::new("fin_risk", None))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn empty_result_is_null() {
        let warehouse = warehouse_with(&[row("AAPL", 29, 100.0, 10)]).await;
        let ctx = QueryContext::new("fin_risk", None);
        let records = warehouse
            .fetch_records("SELECT symbol FROM prices_daily WHERE symbol = 'ZZZ'", &ctx)
            .await
            .unwrap();
        assert_eq!(records, vec![vec![None]]);
    }

    #[tokio::test]
    async fn failing_statement_is_named() {
        let warehouse = warehouse_with(&[row("AAPL", 29, 100.0, 10)]).await;
        let bad = RenderedStatement {
            name: "refresh_broken",
            target_table: "broken",
            run_date: dt(),
            sql: vec!["SELECT * FROM no_such_table".into()],
        };
        let err = warehouse
            .execute(&bad, &QueryContext::new("fin_risk", None))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Execution { name, .. } if name == "refresh_broken"));
    }
}
