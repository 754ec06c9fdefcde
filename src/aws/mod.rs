// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

/// Athena tables created from parquet data in S3.
mod athena;
/// A wrapper around Cognito user pool client.
mod cognito;
/// AWS config loading and client constructors.
mod config;
/// A wrapper around Dynamo DB client.
mod dynamo;
/// A wrapper around S3 client.
mod s3;
/// Cognito app client secret hash.
mod secret_hash;
/// Env files generated from Secrets Manager.
mod secrets;
/// Unit tests.
mod tests;
/// Concurrent folder upload to S3.
mod upload;

pub use crate::aws::athena::{
    athena_columns, athena_ctas_sql, athena_refresh, athena_type_name,
    create_athena_table_from_parquet, create_glue_database, delete_glue_table_if_exists,
    glue_databases, load_table_metadatas, parse_table_metadatas, read_parquet_metadata_s3,
    run_athena_query, AthenaClients, AthenaTableMetadata,
};
pub use crate::aws::cognito::{
    add_user_to_group, authenticate_user, create_group, create_user, get_all_users, get_user,
    get_users_from_group, remove_user_from_group, remove_user_from_userpool,
    resend_confirmation_code, set_user_password, user_attribute, DEFAULT_AUTH_FLOW,
};
pub use crate::aws::config::{
    create_aws_config_loader, load_aws_config, new_athena_client, new_cognito_client,
    new_glue_client, new_secrets_client, AthenaClient, CognitoClient, GlueClient,
    SecretsManagerClient,
};
pub use crate::aws::dynamo::{
    create_ddb_tables, delete_ddb_item, get_ddb_item_by_key, list_ddb_table_names,
    new_ddb_client, put_ddb_item, scan_ddb, to_dynamo_av, DynamoDbClient, DynamoKeyKind,
    DynamoKeySpec, DynamoSelect, DynamoTableSpec, DynamoThroughput,
};
pub use crate::aws::s3::{
    get_s3_range, list_s3_keys, new_s3_client, parse_s3_uri, s3_object_size, upload_file_s3,
    S3Client, S3Uri,
};
pub use crate::aws::secret_hash::user_secret_hash;
pub use crate::aws::secrets::{
    generate_env_from_secretsmanager, get_secret_json, render_env, EnvFileFormat,
    AVAILABLE_EXTENSIONS,
};
pub use crate::aws::upload::upload_folder_s3;
