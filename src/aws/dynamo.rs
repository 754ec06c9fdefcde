// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::load_aws_config;
use crate::common::{Error, WranglerConfig};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ProvisionedThroughput, ScalarAttributeType, Select, TableDescription,
};
use aws_sdk_dynamodb::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TARGET: &str = "aws_dynamodb";

/// A convenient alias for Dynamo DB client so consuming code doesn't need to add it to `Cargo.toml`
pub type DynamoDbClient = aws_sdk_dynamodb::Client;

/// Creates a Dynamo DB client.
pub async fn new_ddb_client(config: &WranglerConfig) -> DynamoDbClient {
    let config = load_aws_config(config).await;
    Client::new(&config)
}

/// The attributes returned by [`scan_ddb`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynamoSelect {
    /// Every attribute of every item.
    #[default]
    AllAttributes,
    /// Only the attributes projected into the index.
    AllProjectedAttributes,
    /// Only the attributes named by a projection expression.
    SpecificAttributes,
    /// No items, only the count.
    Count,
}

impl From<DynamoSelect> for Select {
    fn from(select: DynamoSelect) -> Self {
        match select {
            DynamoSelect::AllAttributes => Select::AllAttributes,
            DynamoSelect::AllProjectedAttributes => Select::AllProjectedAttributes,
            DynamoSelect::SpecificAttributes => Select::SpecificAttributes,
            DynamoSelect::Count => Select::Count,
        }
    }
}

/// Scalar type of a key attribute.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DynamoKeyKind {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
}

impl From<DynamoKeyKind> for ScalarAttributeType {
    fn from(kind: DynamoKeyKind) -> Self {
        match kind {
            DynamoKeyKind::S => ScalarAttributeType::S,
            DynamoKeyKind::N => ScalarAttributeType::N,
            DynamoKeyKind::B => ScalarAttributeType::B,
        }
    }
}

/// A key attribute of a table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DynamoKeySpec {
    /// Attribute name.
    pub name: String,
    /// Attribute type.
    #[serde(rename = "type")]
    pub kind: DynamoKeyKind,
}

/// Provisioned capacity of a table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DynamoThroughput {
    /// Read capacity units.
    pub read_capacity_units: i64,
    /// Write capacity units.
    pub write_capacity_units: i64,
}

/// A table to be created by [`create_ddb_tables`].
///
/// Tables without `provisioned_throughput` are billed per request.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DynamoTableSpec {
    /// Table name.
    pub table_name: String,
    /// Partition key.
    pub hash_key: DynamoKeySpec,
    /// Sort key, if any.
    #[serde(default)]
    pub range_key: Option<DynamoKeySpec>,
    /// Provisioned capacity, if any.
    #[serde(default)]
    pub provisioned_throughput: Option<DynamoThroughput>,
}

fn key_schema(key: &DynamoKeySpec, key_type: KeyType) -> Result<(KeySchemaElement, AttributeDefinition), Error> {
    let context = || format!("key_schema({})", key.name);
    let element = KeySchemaElement::builder()
        .attribute_name(&key.name)
        .key_type(key_type)
        .build()
        .map_err(|e| Error::Anyhow(e.into(), context()))?;
    let definition = AttributeDefinition::builder()
        .attribute_name(&key.name)
        .attribute_type(key.kind.into())
        .build()
        .map_err(|e| Error::Anyhow(e.into(), context()))?;
    Ok((element, definition))
}

async fn create_ddb_table(client: &DynamoDbClient, spec: &DynamoTableSpec) -> Result<TableDescription, Error> {
    let table = &spec.table_name;
    let mut req = client.create_table().table_name(table);

    let keys = std::iter::once((&spec.hash_key, KeyType::Hash))
        .chain(spec.range_key.as_ref().map(|range_key| (range_key, KeyType::Range)));
    for (key, key_type) in keys {
        let (element, definition) = key_schema(key, key_type)?;
        req = req.key_schema(element).attribute_definitions(definition);
    }

    req = match spec.provisioned_throughput {
        Some(DynamoThroughput {
            read_capacity_units,
            write_capacity_units,
        }) => req.billing_mode(BillingMode::Provisioned).provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(read_capacity_units)
                .write_capacity_units(write_capacity_units)
                .build()
                .map_err(|e| Error::Anyhow(e.into(), format!("create_table(t={table})")))?,
        ),
        None => req.billing_mode(BillingMode::PayPerRequest),
    };

    let output = req
        .send()
        .await
        .map_err(|e| Error::Dynamo(e.into(), format!("create_table(t={table})")))?;
    output
        .table_description
        .ok_or_else(|| Error::String(format!("create_table(t={table}): no table description")))
}

/// Creates tables in order.
///
/// Stops at the first failure, which is logged, and returns the descriptions of the
/// tables created until then.
pub async fn create_ddb_tables(client: &DynamoDbClient, tables: &[DynamoTableSpec]) -> Vec<TableDescription> {
    let mut ret = Vec::with_capacity(tables.len());
    for spec in tables {
        match create_ddb_table(client, spec).await {
            Ok(description) => {
                tracing::info!(target: TARGET, "[create_tables] Table {} created", spec.table_name);
                ret.push(description);
            }
            Err(e) => {
                tracing::error!(target: TARGET, "[create_tables] {e}");
                break;
            }
        }
    }
    ret
}

/// Deletes an item with the specified hash key, if any, from the specified Dynamo DB table.
pub async fn delete_ddb_item<HK: Serialize>(
    client: &DynamoDbClient,
    table: &str,
    hash_name: &str,
    hash_value: &HK,
) -> Result<(), Error> {
    client
        .delete_item()
        .table_name(table)
        .key(hash_name, to_dynamo_av(hash_value)?)
        .send()
        .await
        .map_err(|e| Error::Dynamo(e.into(), format!("delete_item(t={table}, h={hash_name})")))?;
    Ok(())
}

/// Gets the first item whose key attribute `key` equals `value`.
///
/// With `fields`, the item is narrowed to those attributes before it is deserialized;
/// absent ones become null.
pub async fn get_ddb_item_by_key<V: Serialize, O: DeserializeOwned>(
    client: &DynamoDbClient,
    table: &str,
    key: &str,
    value: V,
    fields: Option<&[&str]>,
) -> Result<Option<O>, Error> {
    let output = client
        .query()
        .table_name(table)
        .key_condition_expression("#k = :v")
        .expression_attribute_names("#k", key)
        .expression_attribute_values(":v", to_dynamo_av(value)?)
        .limit(1)
        .send()
        .await
        .map_err(|e| Error::Dynamo(e.into(), format!("get_item_by_key(t={table}, k={key})")))?;

    let Some(mut item) = output.items.unwrap_or_default().into_iter().next() else {
        return Ok(None);
    };
    if let Some(fields) = fields {
        item = project_item(item, fields);
    }
    serde_dynamo::from_item(item).map(Some).map_err(Error::Serde)
}

/// Keeps only `fields` of an item; missing ones are set to null.
pub(crate) fn project_item(
    mut item: HashMap<String, AttributeValue>,
    fields: &[&str],
) -> HashMap<String, AttributeValue> {
    fields
        .iter()
        .map(|field| {
            let value = item.remove(*field).unwrap_or(AttributeValue::Null(true));
            (field.to_string(), value)
        })
        .collect()
}

/// Returns the names of all tables of the account and endpoint.
pub async fn list_ddb_table_names(client: &DynamoDbClient) -> Result<Vec<String>, Error> {
    let mut ret = Vec::new();
    let mut last_evaluated_table_name = None;
    loop {
        let output = client
            .list_tables()
            .set_exclusive_start_table_name(last_evaluated_table_name)
            .send()
            .await
            .map_err(|e| Error::Dynamo(e.into(), "list_tables".to_string()))?;
        last_evaluated_table_name = output.last_evaluated_table_name;
        ret.extend(output.table_names.unwrap_or_default());
        if last_evaluated_table_name.is_none() {
            break;
        }
    }
    Ok(ret)
}

/// Put an item into the specified Dynamo DB table, replacing any item with the same key.
pub async fn put_ddb_item<I: Serialize>(
    client: &DynamoDbClient,
    table: &str,
    item: I,
) -> Result<(), Error> {
    let ser = serde_dynamo::to_item(item).map_err(Error::Serde)?;

    client
        .put_item()
        .table_name(table)
        .set_item(Some(ser))
        .send()
        .await
        .map_err(|e| Error::Dynamo(e.into(), format!("put_item(t={table})")))?;
    Ok(())
}

async fn scan_inner<O: DeserializeOwned>(
    client: &DynamoDbClient,
    table: &str,
    select: DynamoSelect,
    last_evaluated_key: Option<HashMap<String, AttributeValue>>,
) -> Result<(Vec<O>, Option<HashMap<String, AttributeValue>>), Error> {
    let scan_output = client
        .scan()
        .table_name(table)
        .select(select.into())
        .set_exclusive_start_key(last_evaluated_key)
        .send()
        .await
        .map_err(|e| Error::Dynamo(e.into(), format!("scan_inner(t={table})")))?;

    let mut ret = Vec::new();
    for item in scan_output.items.unwrap_or_default() {
        ret.push(serde_dynamo::from_item(item).map_err(Error::Serde)?);
    }
    Ok((ret, scan_output.last_evaluated_key))
}

/// Scan and return all items from the specified Dynamo DB table.
pub async fn scan_ddb<O: DeserializeOwned>(
    client: &DynamoDbClient,
    table: &str,
    select: DynamoSelect,
) -> Result<Vec<O>, Error> {
    let mut ret = Vec::new();
    let mut last_evaluated_key = None;
    loop {
        let (mut items, lek) = scan_inner(client, table, select, last_evaluated_key).await?;
        ret.append(&mut items);
        last_evaluated_key = lek;

        if last_evaluated_key.is_none() {
            break;
        }
    }

    Ok(ret)
}

/// Packs a Dynamo DB `AttributeValue`.
pub fn to_dynamo_av<T: Serialize>(value: T) -> Result<AttributeValue, Error> {
    serde_dynamo::to_attribute_value(value).map_err(Error::Serde)
}
