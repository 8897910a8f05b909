use crate::models::RunDate;

const DT_PLACEHOLDER: &str = "{dt}";

/// Row count of the anomaly table, read by the gate.
pub const ANOMALY_COUNT_SQL: &str = "SELECT COUNT(*) AS anomaly_count FROM fct_anomalies";

/// A named derived-table refresh. Each SQL string may reference the run date
/// as `{dt}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStatement {
    pub name: &'static str,
    pub target_table: &'static str,
    template: &'static [&'static str],
}

/// A refresh statement bound to one run date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatement {
    pub name: &'static str,
    pub target_table: &'static str,
    /// Partition the statement reads.
    pub run_date: RunDate,
    pub sql: Vec<String>,
}

impl RefreshStatement {
    pub fn render(&self, run_date: RunDate) -> RenderedStatement {
        let dt = run_date.to_string();
        RenderedStatement {
            name: self.name,
            target_table: self.target_table,
            run_date,
            sql: self
                .template
                .iter()
                .map(|sql| sql.replace(DT_PLACEHOLDER, &dt))
                .collect(),
        }
    }
}

/// `close / prev_close - 1` per symbol, for the run's partition.
pub const REFRESH_DAILY_RETURNS: RefreshStatement = RefreshStatement {
    name: "refresh_fct_daily_returns",
    target_table: "fct_daily_returns",
    template: &[
        "DROP TABLE IF EXISTS fct_daily_returns",
        "CREATE TABLE fct_daily_returns AS
         SELECT symbol,
                date,
                close,
                prev_close,
                CASE WHEN prev_close IS NULL OR prev_close = 0 THEN NULL
                     ELSE close / prev_close - 1
                END AS daily_return
         FROM (
             SELECT symbol,
                    date,
                    close,
                    LAG(close) OVER (PARTITION BY symbol ORDER BY date) AS prev_close
             FROM prices_daily
             WHERE dt = '{dt}'
         )",
    ],
};

/// Return spikes above 10%, inverted high/low and zero-volume days.
pub const REFRESH_ANOMALIES: RefreshStatement = RefreshStatement {
    name: "refresh_fct_anomalies",
    target_table: "fct_anomalies",
    template: &[
        "DROP TABLE IF EXISTS fct_anomalies",
        "CREATE TABLE fct_anomalies AS
         SELECT symbol, date, 'return_spike' AS reason, daily_return AS value
         FROM fct_daily_returns
         WHERE ABS(daily_return) > 0.10
         UNION ALL
         SELECT symbol, date, 'price_inverted', high - low
         FROM prices_daily
         WHERE dt = '{dt}' AND high < low
         UNION ALL
         SELECT symbol, date, 'zero_volume', CAST(volume AS REAL)
         FROM prices_daily
         WHERE dt = '{dt}' AND volume = 0",
    ],
};
