//! Warehouse integration over the SQL REST API.
//!
//! Both extraction statements cast dates to `YYYY-MM-DD` text so the rows
//! arrive in the same shape the synthetic generator produces.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::source::LiveSource;
use crate::domain::{RawInflationRow, RawPriceRow};
use crate::error::SourceError;

const DEFAULT_WAREHOUSE: &str = "COMPUTE_WH";
const DEFAULT_DATABASE: &str = "DATAEXPERT_STUDENT";

const INFLATION_STATEMENT: &str = "SELECT i.country_code, i.product_name, \
     TO_VARCHAR(i.date_key, 'YYYY-MM-DD') AS date_key, i.inflation_rate_yoy \
     FROM FACT_INFLATION_RATES i \
     ORDER BY i.country_code, i.product_name, i.date_key";

const PRODUCT_STATEMENT: &str = "SELECT p.product_id, p.brand, p.food_category, p.country_code, \
     TO_VARCHAR(p.date_key, 'YYYY-MM-DD') AS date_key, p.price_value, p.price_currency \
     FROM FACT_PRODUCT_PRICES p";

/// Connection options for the warehouse.
#[derive(Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub user: String,
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

impl WarehouseConfig {
    /// Read the configuration from the environment (and `.env`).
    ///
    /// Returns `None` when user, password, account, or schema is missing.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            user: get("SNOWFLAKE_USER")?,
            password: get("SNOWFLAKE_PASSWORD")?,
            account: get("SNOWFLAKE_ACCOUNT")?,
            schema: get("STUDENT_SCHEMA")?,
            warehouse: get("SNOWFLAKE_WAREHOUSE").unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string()),
            database: get("SNOWFLAKE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        })
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

pub struct WarehouseClient {
    client: Client,
    config: WarehouseConfig,
    timeout: Duration,
}

impl WarehouseClient {
    pub fn new(config: WarehouseConfig, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Connectivity(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}.snowflakecomputing.com/api/v2/statements",
            self.config.account
        )
    }

    fn run_statement(&self, statement: &str) -> Result<ResultTable, SourceError> {
        let body = StatementRequest {
            statement,
            timeout: self.timeout.as_secs(),
            database: &self.config.database,
            schema: &self.config.schema,
            warehouse: &self.config.warehouse,
        };

        info!(account = %self.config.account, user = %self.config.user, "Querying warehouse");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.password)
            .header("X-Snowflake-Authorization-Token-Type", "PROGRAMMATIC_ACCESS_TOKEN")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .map_err(|e| self.classify(e))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Authentication(format!(
                    "status {}",
                    resp.status()
                )));
            }
            // Statement still running once the server-side timeout elapsed.
            StatusCode::ACCEPTED => return Err(SourceError::Timeout(self.timeout.as_secs())),
            status if !status.is_success() => {
                return Err(SourceError::Connectivity(format!("status {status}")));
            }
            _ => {}
        }

        let body: StatementResponse = resp
            .json()
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;
        let mut table = ResultTable::from_response(body)?;

        let pending = table.pending_partitions();
        if !pending.is_empty() {
            let handle = table.handle.clone().ok_or_else(|| {
                SourceError::MalformedResponse("partitioned result without a statement handle".into())
            })?;
            for index in pending {
                let rows = self.fetch_partition(&handle, index)?;
                table.append_partition(index, rows)?;
            }
        }
        table.verify_complete()?;

        debug!(
            rows = table.data.len(),
            partitions = table.partitions.len().max(1),
            "Warehouse statement returned"
        );
        Ok(table)
    }

    /// Rows of one result partition past the first.
    fn fetch_partition(&self, handle: &str, index: usize) -> Result<Vec<Vec<Option<String>>>, SourceError> {
        let url = format!("{}/{handle}?partition={index}", self.endpoint());
        debug!(partition = index, "Fetching result partition");
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.config.password)
            .header("X-Snowflake-Authorization-Token-Type", "PROGRAMMATIC_ACCESS_TOKEN")
            .header("Accept", "application/json")
            .send()
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::MalformedResponse(format!(
                "partition {index} returned status {status}"
            )));
        }
        let body: PartitionResponse = resp
            .json()
            .map_err(|e| SourceError::MalformedResponse(format!("partition {index}: {e}")))?;
        Ok(body.data)
    }

    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout.as_secs())
        } else {
            SourceError::Connectivity(err.to_string())
        }
    }
}

impl LiveSource for WarehouseClient {
    fn fetch_inflation(&self) -> Result<Vec<RawInflationRow>, SourceError> {
        let table = self.run_statement(INFLATION_STATEMENT)?;
        Ok(table.inflation_rows())
    }

    fn fetch_products(&self) -> Result<Vec<RawPriceRow>, SourceError> {
        let table = self.run_statement(PRODUCT_STATEMENT)?;
        Ok(table.price_rows())
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    result_set_meta_data: ResultSetMetaData,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<ColumnType>,
    /// One entry per result partition; the first partition arrives inline.
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[serde(default)]
    row_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

/// Result rows addressed by (normalized) column name.
#[derive(Debug)]
struct ResultTable {
    columns: HashMap<String, usize>,
    data: Vec<Vec<Option<String>>>,
    handle: Option<String>,
    partitions: Vec<PartitionInfo>,
    /// Partitions received so far, counting the inline one.
    received: usize,
}

impl ResultTable {
    fn from_response(resp: StatementResponse) -> Result<Self, SourceError> {
        let meta = resp.result_set_meta_data;
        let columns: HashMap<String, usize> = meta
            .row_type
            .iter()
            .enumerate()
            .map(|(idx, col)| (normalize_column_name(&col.name), idx))
            .collect();
        if columns.is_empty() {
            return Err(SourceError::MalformedResponse("no columns in result".into()));
        }
        let table = Self {
            columns,
            data: resp.data,
            handle: resp.statement_handle,
            partitions: meta.partition_info,
            received: 1,
        };
        table.check_partition_rows(0, table.data.len())?;
        Ok(table)
    }

    /// Indices of partitions still to fetch.
    fn pending_partitions(&self) -> std::ops::Range<usize> {
        self.received..self.partitions.len().max(self.received)
    }

    fn append_partition(&mut self, index: usize, rows: Vec<Vec<Option<String>>>) -> Result<(), SourceError> {
        if index != self.received {
            return Err(SourceError::MalformedResponse(format!(
                "partition {index} arrived out of order (expected {})",
                self.received
            )));
        }
        self.check_partition_rows(index, rows.len())?;
        self.data.extend(rows);
        self.received += 1;
        Ok(())
    }

    /// A partial result must never pass as a complete live dataset.
    fn verify_complete(&self) -> Result<(), SourceError> {
        if self.received < self.partitions.len() {
            return Err(SourceError::MalformedResponse(format!(
                "received {} of {} result partitions",
                self.received,
                self.partitions.len()
            )));
        }
        Ok(())
    }

    fn check_partition_rows(&self, index: usize, rows: usize) -> Result<(), SourceError> {
        match self.partitions.get(index).and_then(|p| p.row_count) {
            Some(expected) if expected != rows => Err(SourceError::MalformedResponse(format!(
                "partition {index} has {rows} rows, metadata says {expected}"
            ))),
            _ => Ok(()),
        }
    }

    fn cell(&self, row: &[Option<String>], name: &str) -> Option<String> {
        let idx = *self.columns.get(name)?;
        row.get(idx).cloned().flatten()
    }

    fn inflation_rows(&self) -> Vec<RawInflationRow> {
        self.data
            .iter()
            .map(|row| RawInflationRow {
                country: self.cell(row, "country_code"),
                category: self.cell(row, "product_name"),
                period: self.cell(row, "date_key"),
                rate: self.cell(row, "inflation_rate_yoy"),
            })
            .collect()
    }

    fn price_rows(&self) -> Vec<RawPriceRow> {
        self.data
            .iter()
            .map(|row| RawPriceRow {
                product_id: self.cell(row, "product_id"),
                brand: self.cell(row, "brand"),
                category: self.cell(row, "food_category"),
                country: self.cell(row, "country_code"),
                observed_date: self.cell(row, "date_key"),
                price: self.cell(row, "price_value"),
                currency: self.cell(row, "price_currency"),
            })
            .collect()
    }
}

fn normalize_column_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}
