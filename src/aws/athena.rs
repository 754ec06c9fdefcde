// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::config::{load_aws_config, AthenaClient, GlueClient};
use super::s3::{get_s3_range, list_s3_keys, parse_s3_uri, s3_object_size, S3Client};
use crate::common::{Error, WranglerConfig};
use crate::log::StringLogger;
use arrow::datatypes::{DataType, Schema};
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_glue::operation::delete_table::DeleteTableError;
use aws_sdk_glue::types::DatabaseInput;
use futures::{stream, StreamExt};
use parquet::arrow::parquet_to_arrow_schema;
use parquet::file::metadata::ParquetMetaDataReader;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

const TARGET: &str = "aws_athena";

/// Tables refreshed concurrently by [`athena_refresh`].
const REFRESH_WORKERS: usize = 15;

/// Delay between two polls of a running Athena query.
const QUERY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Trailing bytes of every Parquet file: metadata length (u32 LE) and magic.
const FOOTER_SIZE: u64 = 8;
const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// The clients needed to register Parquet data as Athena tables.
#[derive(Clone, Debug)]
pub struct AthenaClients {
    /// Runs the CTAS queries.
    pub athena: AthenaClient,
    /// Catalog (database and table) management.
    pub glue: GlueClient,
    /// Reads Parquet footers.
    pub s3: S3Client,
}

impl AthenaClients {
    /// Creates all three clients from a single AWS configuration.
    pub async fn new(wrangler_config: &WranglerConfig) -> Self {
        let aws_config = load_aws_config(wrangler_config).await;
        Self {
            athena: AthenaClient::new(&aws_config),
            glue: GlueClient::new(&aws_config),
            s3: S3Client::new(&aws_config),
        }
    }
}

/// Describes one table refreshed by [`athena_refresh`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AthenaTableMetadata {
    /// Source table name.
    pub name: String,
    /// Source schema name.
    pub schema: String,
    /// Base S3 path; data lives under `{s3_path}/transac/parquet/`.
    pub s3_path: String,
    /// Athena workgroup to run the CTAS query in.
    #[serde(default)]
    pub athena_work_group: Option<String>,
}

impl AthenaTableMetadata {
    /// Athena table name, `{database}_{schema}_{name}`.
    pub fn table_name(&self, database: &str) -> String {
        format!("{database}_{}_{}", self.schema, self.name)
    }

    fn base_path(&self) -> &str {
        self.s3_path.trim_end_matches('/')
    }

    /// Location of the table's Parquet data.
    pub fn parquet_path(&self, database: &str) -> String {
        format!("{}/transac/parquet/{}", self.base_path(), self.table_name(database))
    }

    /// Location of the Athena query results.
    pub fn s3_staging_dir(&self) -> String {
        format!("{}/athena-results", self.base_path())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetadataFile {
    List(Vec<AthenaTableMetadata>),
    Tables { tables: Vec<AthenaTableMetadata> },
}

/// Parses table metadata from YAML, either a bare list or a list under `tables:`.
pub fn parse_table_metadatas(yaml: &str) -> Result<Vec<AthenaTableMetadata>, Error> {
    match serde_yaml::from_str(yaml) {
        Ok(MetadataFile::List(tables)) | Ok(MetadataFile::Tables { tables }) => Ok(tables),
        Err(e) => Err(Error::Yaml(e, "parse_table_metadatas".to_string())),
    }
}

/// Reads table metadata from a YAML file.
pub fn load_table_metadatas(path: impl AsRef<Path>) -> Result<Vec<AthenaTableMetadata>, Error> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(e, format!("load_table_metadatas({})", path.display())))?;
    parse_table_metadatas(&yaml)
}

/// Creates a SQL CTAS query for the given columns, table name and parquet path.
///
/// No database is named in the query; it runs in the database of the query context.
pub fn athena_ctas_sql(columns: &[(String, String)], parquet_path: &str, table_name: &str) -> String {
    let columns = columns
        .iter()
        .map(|(name, data_type)| format!("{name} {data_type}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("CREATE EXTERNAL TABLE {table_name} ({columns}) STORED AS PARQUET LOCATION '{parquet_path}'")
}

/// Maps an Arrow data type to its Athena DDL name.
pub fn athena_type_name(data_type: &DataType) -> Result<String, Error> {
    let name = match data_type {
        DataType::Boolean => "boolean".to_string(),
        DataType::Int8 => "tinyint".to_string(),
        DataType::Int16 | DataType::UInt8 => "smallint".to_string(),
        DataType::Int32 | DataType::UInt16 => "int".to_string(),
        DataType::Int64 | DataType::UInt32 => "bigint".to_string(),
        DataType::UInt64 => "decimal(20,0)".to_string(),
        DataType::Float16 | DataType::Float32 => "float".to_string(),
        DataType::Float64 => "double".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string".to_string(),
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => "binary".to_string(),
        DataType::Date32 | DataType::Date64 => "date".to_string(),
        DataType::Timestamp(_, _) => "timestamp".to_string(),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            format!("decimal({precision},{scale})")
        }
        DataType::List(field) | DataType::LargeList(field) | DataType::FixedSizeList(field, _) => {
            format!("array<{}>", athena_type_name(field.data_type())?)
        }
        DataType::Map(entries, _) => match entries.data_type() {
            DataType::Struct(fields) if fields.len() == 2 => format!(
                "map<{},{}>",
                athena_type_name(fields[0].data_type())?,
                athena_type_name(fields[1].data_type())?
            ),
            other => return Err(Error::String(format!("{other}: malformed map entries"))),
        },
        DataType::Struct(fields) => {
            let members = fields
                .iter()
                .map(|field| Ok(format!("{}:{}", field.name(), athena_type_name(field.data_type())?)))
                .collect::<Result<Vec<_>, Error>>()?;
            format!("struct<{}>", members.join(","))
        }
        DataType::Dictionary(_, value) => athena_type_name(value)?,
        other => return Err(Error::String(format!("{other}: unsupported by Athena"))),
    };
    Ok(name)
}

/// Maps every field of an Arrow schema to `(column name, Athena type)`.
pub fn athena_columns(schema: &Schema) -> Result<Vec<(String, String)>, Error> {
    schema
        .fields()
        .iter()
        .map(|field| Ok((field.name().clone(), athena_type_name(field.data_type())?)))
        .collect()
}

/// Returns the metadata length stored in the last 8 bytes of a Parquet file.
pub(crate) fn footer_metadata_len(footer: &[u8]) -> Result<u64, Error> {
    match footer {
        [a, b, c, d, magic @ ..] if magic == PARQUET_MAGIC => {
            Ok(u32::from_le_bytes([*a, *b, *c, *d]) as u64)
        }
        _ => Err(Error::String("not a parquet footer".to_string())),
    }
}

/// Decodes the Arrow schema from the Thrift-encoded Parquet file metadata.
pub(crate) fn arrow_schema_from_metadata(metadata: &[u8]) -> Result<Schema, Error> {
    let metadata = ParquetMetaDataReader::decode_metadata(metadata)
        .map_err(|e| Error::Parquet(e, "decode_metadata".to_string()))?;
    let file_metadata = metadata.file_metadata();
    parquet_to_arrow_schema(file_metadata.schema_descr(), file_metadata.key_value_metadata())
        .map_err(|e| Error::Parquet(e, "parquet_to_arrow_schema".to_string()))
}

/// Reads the column names and Athena types of a Parquet dataset in S3.
///
/// `parquet_path` is either a `.parquet` object or a folder; for a folder the first
/// `.parquet` object (by key) is used. Only the file footer is downloaded. Returns an
/// empty list when there is no Parquet object.
pub async fn read_parquet_metadata_s3(
    s3: &S3Client,
    parquet_path: &str,
) -> Result<Vec<(String, String)>, Error> {
    let uri = parse_s3_uri(parquet_path)?;
    let key = if uri.key.ends_with(".parquet") {
        uri.key
    } else {
        let prefix = match uri.key.trim_end_matches('/') {
            "" => String::new(),
            folder => format!("{folder}/"),
        };
        let mut keys = list_s3_keys(s3, &uri.bucket, &prefix).await?;
        keys.retain(|key| key.ends_with(".parquet"));
        keys.sort();
        match keys.into_iter().next() {
            Some(key) => key,
            None => return Ok(Vec::new()),
        }
    };

    let size = s3_object_size(s3, &uri.bucket, &key).await?;
    if size < FOOTER_SIZE + PARQUET_MAGIC.len() as u64 {
        return Err(Error::String(format!("s3://{}/{key}: too small for parquet", uri.bucket)));
    }
    let footer = get_s3_range(s3, &uri.bucket, &key, size - FOOTER_SIZE..size).await?;
    let metadata_len = footer_metadata_len(&footer)?;
    let metadata_end = size - FOOTER_SIZE;
    let metadata_start = metadata_end.checked_sub(metadata_len).ok_or_else(|| {
        Error::String(format!("s3://{}/{key}: corrupt parquet footer", uri.bucket))
    })?;
    let metadata = get_s3_range(s3, &uri.bucket, &key, metadata_start..metadata_end).await?;
    athena_columns(&arrow_schema_from_metadata(&metadata)?)
}

/// Lists the names of all Glue (Athena) databases.
pub async fn glue_databases(glue: &GlueClient) -> Result<Vec<String>, Error> {
    let mut ret = Vec::new();
    let mut next_token = None;
    loop {
        let output = glue
            .get_databases()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| Error::Anyhow(e.into(), "glue_databases".to_string()))?;
        ret.extend(output.database_list().iter().map(|db| db.name().to_string()));
        next_token = output.next_token().map(String::from);
        if next_token.is_none() {
            break;
        }
    }
    Ok(ret)
}

/// Creates a Glue (Athena) database.
pub async fn create_glue_database(glue: &GlueClient, database: &str) -> Result<(), Error> {
    let input = DatabaseInput::builder()
        .name(database)
        .build()
        .map_err(|e| Error::Anyhow(e.into(), format!("create_glue_database({database})")))?;
    glue.create_database()
        .database_input(input)
        .send()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("create_glue_database({database})")))?;
    Ok(())
}

/// Deletes a Glue table. Returns `Ok(false)` if it did not exist.
pub async fn delete_glue_table_if_exists(
    glue: &GlueClient,
    database: &str,
    table: &str,
) -> Result<bool, Error> {
    match glue
        .delete_table()
        .database_name(database)
        .name(table)
        .send()
        .await
    {
        Ok(_) => Ok(true),
        Err(e) => match e.into_service_error() {
            DeleteTableError::EntityNotFoundException(_) => Ok(false),
            e => Err(Error::Anyhow(
                e.into(),
                format!("delete_glue_table_if_exists({database}, {table})"),
            )),
        },
    }
}

/// Runs a query in Athena and waits for it to finish. Returns the query execution id.
pub async fn run_athena_query(
    athena: &AthenaClient,
    sql: &str,
    database: &str,
    s3_staging_dir: &str,
    work_group: Option<&str>,
) -> Result<String, Error> {
    let started = athena
        .start_query_execution()
        .query_string(sql)
        .query_execution_context(QueryExecutionContext::builder().database(database).build())
        .result_configuration(
            ResultConfiguration::builder()
                .output_location(s3_staging_dir)
                .build(),
        )
        .set_work_group(work_group.map(String::from))
        .send()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("run_athena_query({database})")))?;
    let id = started
        .query_execution_id()
        .ok_or_else(|| Error::String("athena returned no query execution id".to_string()))?
        .to_string();

    loop {
        let output = athena
            .get_query_execution()
            .query_execution_id(&id)
            .send()
            .await
            .map_err(|e| Error::Anyhow(e.into(), format!("get_query_execution({id})")))?;
        let status = output.query_execution().and_then(|q| q.status());
        match status.and_then(|s| s.state()) {
            Some(QueryExecutionState::Succeeded) => return Ok(id),
            Some(state @ (QueryExecutionState::Failed | QueryExecutionState::Cancelled)) => {
                let reason = status
                    .and_then(|s| s.state_change_reason())
                    .unwrap_or("no reason given");
                return Err(Error::String(format!(
                    "athena query {id} {}: {reason}",
                    state.as_str()
                )));
            }
            _ => tokio::time::sleep(QUERY_POLL_INTERVAL).await,
        }
    }
}

/// Where a CTAS query reads from and writes to.
struct CtasTarget<'a> {
    parquet_path: &'a str,
    database: &'a str,
    s3_staging_dir: &'a str,
    table_name: &'a str,
    work_group: Option<&'a str>,
}

async fn replace_table(
    clients: &AthenaClients,
    columns: &[(String, String)],
    target: &CtasTarget<'_>,
    verbose: bool,
) -> Result<(), Error> {
    let table_name = target.table_name;
    delete_glue_table_if_exists(&clients.glue, target.database, table_name).await?;
    tracing::info!(target: TARGET, "[create_athena_table_from_parquet] Deleted {table_name}.");

    let ctas_sql = athena_ctas_sql(columns, target.parquet_path, table_name);
    run_athena_query(
        &clients.athena,
        &ctas_sql,
        target.database,
        target.s3_staging_dir,
        target.work_group,
    )
    .await?;

    tracing::info!(target: TARGET, "[create_athena_table_from_parquet] Created {table_name}.");
    if verbose {
        tracing::info!(target: TARGET, "[create_athena_table_from_parquet] SQL CTAS query:\n{ctas_sql}");
    }
    Ok(())
}

/// The last non-empty segment of an S3 path, e.g. `orders` for `s3://bucket/data/orders/`.
pub(crate) fn default_table_name(parquet_path: &str) -> Option<String> {
    let uri = parse_s3_uri(parquet_path).ok()?;
    uri.file_name().map(str::to_string)
}

/// Creates (or replaces) an Athena table over Parquet data in S3.
///
/// `table_name` defaults to the last non-empty segment of `parquet_path`. The database must
/// already exist. Returns `false` if any step failed; a dataset without columns is
/// skipped and still counts as success.
pub async fn create_athena_table_from_parquet(
    clients: &AthenaClients,
    parquet_path: &str,
    database: &str,
    s3_staging_dir: &str,
    table_name: Option<&str>,
    work_group: Option<&str>,
    verbose: bool,
) -> bool {
    let table_name = match table_name {
        Some(table_name) => table_name.to_string(),
        None => match default_table_name(parquet_path) {
            Some(table_name) => table_name,
            None => {
                tracing::error!(
                    target: TARGET,
                    "[create_athena_table_from_parquet] Cannot derive a table name from {parquet_path}."
                );
                return false;
            }
        },
    };

    let columns = match read_parquet_metadata_s3(&clients.s3, parquet_path).await {
        Ok(columns) => columns,
        Err(e) => {
            tracing::error!(
                target: TARGET,
                "[create_athena_table_from_parquet] Cannot read metadata of {parquet_path}. {e}"
            );
            return false;
        }
    };

    if columns.is_empty() {
        tracing::warn!(
            target: TARGET,
            "[create_athena_table_from_parquet] There is no metadata for the parquet_path. Skipping table {table_name} creation..."
        );
        return true;
    }

    let target = CtasTarget {
        parquet_path,
        database,
        s3_staging_dir,
        table_name: &table_name,
        work_group,
    };
    match replace_table(clients, &columns, &target, verbose).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                target: TARGET,
                "[create_athena_table_from_parquet] Error on CTAS of {table_name} on Athena. {e}"
            );
            false
        }
    }
}

/// Refreshes the Athena tables of a database from their Parquet data.
///
/// Tables come from `tables_metadatas` or, when given, from the YAML file at
/// `yaml_metadatas_file_path`; an empty list counts as not given. The database is created if missing. Up to 15 tables are
/// refreshed at once. The returned report has one line per table and contains warnings
/// if any table failed.
pub async fn athena_refresh(
    clients: &AthenaClients,
    database: &str,
    tables_metadatas: Option<Vec<AthenaTableMetadata>>,
    yaml_metadatas_file_path: Option<&Path>,
) -> Result<StringLogger, Error> {
    let report = StringLogger::new(TARGET);
    let started = Instant::now();

    if database.is_empty() {
        report.warn("[athena_refresh] No database was given.".to_string());
        return Ok(report);
    }
    let no_tables = tables_metadatas.as_ref().map_or(true, Vec::is_empty);
    if no_tables && yaml_metadatas_file_path.is_none() {
        report.warn(
            "[athena_refresh] Please, specify one of those parameters: `tables_metadatas` or `yaml_metadatas_file_path`."
                .to_string(),
        );
        return Ok(report);
    }

    if !glue_databases(&clients.glue)
        .await?
        .iter()
        .any(|name| name == database)
    {
        tracing::warn!(target: TARGET, "[athena_refresh] Database {database} does not exist. Creating a new one...");
        if let Err(e) = create_glue_database(&clients.glue, database).await {
            tracing::error!(target: TARGET, "[athena_refresh] {e}");
            return Err(e);
        }
        tracing::info!(target: TARGET, "[athena_refresh] Database {database} created.");
    }

    let tables = match yaml_metadatas_file_path {
        Some(path) => load_table_metadatas(path)?,
        None => tables_metadatas.unwrap_or_default(),
    };
    if tables.is_empty() {
        report.warn("[athena_refresh] No table metadata was found.".to_string());
        return Ok(report);
    }

    stream::iter(tables)
        .map(|meta| {
            let report = report.clone();
            async move {
                let table = meta.table_name(database);
                let created = create_athena_table_from_parquet(
                    clients,
                    &meta.parquet_path(database),
                    database,
                    &meta.s3_staging_dir(),
                    Some(table.as_str()),
                    meta.athena_work_group.as_deref(),
                    true,
                )
                .await;
                if created {
                    report.trace(format!("[athena_refresh] Table {table} refreshed with success."));
                } else {
                    report.warn(format!("[athena_refresh] Table {table} was not refreshed."));
                }
            }
        })
        .buffer_unordered(REFRESH_WORKERS)
        .collect::<Vec<()>>()
        .await;

    tracing::info!(
        target: TARGET,
        "[athena_refresh] Completed in {:.3}s.",
        started.elapsed().as_secs_f64()
    );
    Ok(report)
}
