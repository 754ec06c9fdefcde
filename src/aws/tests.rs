// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

#[cfg(test)]
mod aws_tests {
    use crate::aws::athena::{arrow_schema_from_metadata, default_table_name, footer_metadata_len};
    use crate::aws::config::aws_section;
    use crate::aws::dynamo::project_item;
    use crate::aws::upload::{folder_files, upload_target};
    use crate::aws::{
        athena_columns, athena_ctas_sql, athena_refresh, athena_type_name,
        create_athena_table_from_parquet, generate_env_from_secretsmanager, parse_s3_uri,
        parse_table_metadatas, render_env, upload_folder_s3, user_attribute, user_secret_hash,
        AthenaClients, DynamoKeyKind, DynamoSelect, DynamoTableSpec, EnvFileFormat, S3Client,
        S3Uri,
    };
    use crate::common::WranglerConfig;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Fields, Schema};
    use arrow::record_batch::RecordBatch;
    use aws_sdk_dynamodb::types::{AttributeValue, Select};
    use parquet::arrow::ArrowWriter;
    use serde_json::{json, Map, Value};
    use std::collections::HashMap;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    /// Nothing listens on port 1 of the loopback interface, so every request fails fast.
    const CLOSED_ENDPOINT: &str = "http://127.0.0.1:1";

    fn closed_s3_client() -> S3Client {
        use aws_sdk_s3::config::retry::RetryConfig;
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .endpoint_url(CLOSED_ENDPOINT)
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();
        S3Client::from_conf(conf)
    }

    fn closed_athena_clients() -> AthenaClients {
        use aws_sdk_athena::config::retry::RetryConfig;
        use aws_sdk_athena::config::{BehaviorVersion, Credentials, Region};
        let athena = aws_sdk_athena::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .endpoint_url(CLOSED_ENDPOINT)
            .retry_config(RetryConfig::disabled())
            .build();
        let glue = aws_sdk_glue::Config::builder()
            .behavior_version(aws_sdk_glue::config::BehaviorVersion::latest())
            .region(aws_sdk_glue::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_glue::config::Credentials::new(
                "test", "test", None, None, "tests",
            ))
            .endpoint_url(CLOSED_ENDPOINT)
            .retry_config(aws_sdk_glue::config::retry::RetryConfig::disabled())
            .build();
        AthenaClients {
            athena: aws_sdk_athena::Client::from_conf(athena),
            glue: aws_sdk_glue::Client::from_conf(glue),
            s3: closed_s3_client(),
        }
    }

    #[test]
    fn secret_hash_tests() {
        let hash = user_secret_hash("client123", "app-secret", "alice");
        println!("secret hash: {hash:?}");
        assert_eq!(
            hash.as_deref(),
            Some("U7qdwmuZW3LlKTruYDLyA+/d9Ox9iSJWzvo3xvNHc9A=")
        );
        assert_eq!(user_secret_hash("client123", "", "alice"), None);
        assert_eq!(user_secret_hash("", "app-secret", "alice"), None);
    }

    #[test]
    fn s3_uri_tests() {
        let uri = parse_s3_uri("s3://my-bucket/some/folder/").expect("s3 uri");
        assert_eq!(uri.bucket, "my-bucket");
        assert_eq!(uri.key, "some/folder/");
        assert_eq!(uri.join("chunk_0.parquet").to_string(), "s3://my-bucket/some/folder/chunk_0.parquet");
        assert_eq!(uri.file_name(), Some("folder"));

        let root: S3Uri = "s3a://my-bucket".parse().expect("bucket only");
        assert_eq!(root.key, "");
        assert_eq!(root.join("a.txt").to_string(), "s3://my-bucket/a.txt");
        assert_eq!(root.file_name(), None);

        assert!(parse_s3_uri("my-bucket/key").is_err());
        assert!(parse_s3_uri("s3:///key").is_err());
    }

    #[test]
    fn aws_section_tests() {
        let config = WranglerConfig::builder()
            .toml_str(
                r#"
                [aws]
                profile = "test_profile"
                region = "sa-east-1"
                "#,
            )
            .build()
            .expect("aws_section.toml");
        let section = aws_section(&config);
        assert_eq!(section.profile.as_deref(), Some("test_profile"));
        assert_eq!(section.region.as_deref(), Some("sa-east-1"));

        let empty = WranglerConfig::builder().toml_str("").build().expect("empty config");
        assert!(aws_section(&empty).profile.is_none());
    }

    #[test]
    fn ctas_tests() {
        let columns = vec![
            ("id".to_string(), "bigint".to_string()),
            ("name".to_string(), "string".to_string()),
        ];
        let sql = athena_ctas_sql(&columns, "s3://bucket/transac/parquet/db_s_t", "db_s_t");
        println!("{sql}");
        assert_eq!(
            sql,
            "CREATE EXTERNAL TABLE db_s_t (id bigint,name string) STORED AS PARQUET LOCATION 's3://bucket/transac/parquet/db_s_t'"
        );
    }

    #[test]
    fn athena_type_tests() {
        let item = Arc::new(Field::new("item", DataType::Int32, true));
        let schema = Schema::new(vec![
            Field::new("flag", DataType::Boolean, false),
            Field::new("amount", DataType::Decimal128(10, 2), true),
            Field::new("tags", DataType::List(Arc::clone(&item)), true),
            Field::new(
                "point",
                DataType::Struct(Fields::from(vec![
                    Field::new("x", DataType::Float64, false),
                    Field::new("y", DataType::Float64, false),
                ])),
                true,
            ),
        ]);
        let columns = athena_columns(&schema).expect("athena columns");
        let types: Vec<&str> = columns.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            types,
            ["boolean", "decimal(10,2)", "array<int>", "struct<x:double,y:double>"]
        );
        assert!(athena_type_name(&DataType::Null).is_err());
    }

    #[test]
    fn parquet_footer_tests() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])) as ArrayRef,
            ],
        )
        .expect("batch");

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).expect("writer");
        writer.write(&batch).expect("write");
        writer.close().expect("close");

        let footer = &buf[buf.len() - 8..];
        let metadata_len = footer_metadata_len(footer).expect("footer") as usize;
        let metadata_end = buf.len() - 8;
        let metadata = &buf[metadata_end - metadata_len..metadata_end];
        let decoded = arrow_schema_from_metadata(metadata).expect("schema");
        let columns = athena_columns(&decoded).expect("columns");
        assert_eq!(
            columns,
            vec![
                ("id".to_string(), "bigint".to_string()),
                ("name".to_string(), "string".to_string()),
            ]
        );

        assert!(footer_metadata_len(b"\0\0\0\0NOPE").is_err());
        assert!(footer_metadata_len(b"PAR1").is_err());
    }

    #[test]
    fn table_metadata_tests() {
        let list = parse_table_metadatas(
            r#"
            - name: orders
              schema: sales
              s3_path: s3://lake/raw/
            "#,
        )
        .expect("list");
        let tables = parse_table_metadatas(
            r#"
            tables:
              - name: orders
                schema: sales
                s3_path: s3://lake/raw
                athena_work_group: analysts
            "#,
        )
        .expect("tables");
        assert_eq!(list.len(), 1);
        assert_eq!(tables[0].athena_work_group.as_deref(), Some("analysts"));

        let meta = &list[0];
        assert_eq!(meta.table_name("lake"), "lake_sales_orders");
        assert_eq!(meta.parquet_path("lake"), "s3://lake/raw/transac/parquet/lake_sales_orders");
        assert_eq!(meta.s3_staging_dir(), "s3://lake/raw/athena-results");
        assert_eq!(tables[0].parquet_path("lake"), meta.parquet_path("lake"));

        assert!(parse_table_metadatas("name: orders").is_err());
    }

    #[test]
    fn render_env_tests() {
        let Value::Object(secrets) = json!({"DB_HOST": "localhost", "DB_PORT": 5432, "DEBUG": true}) else {
            unreachable!();
        };
        assert_eq!(
            render_env(&secrets, EnvFileFormat::Env),
            "DB_HOST='localhost'\nDB_PORT='5432'\nDEBUG='true'"
        );
        assert_eq!(
            render_env(&secrets, EnvFileFormat::Yaml),
            "DB_HOST: 'localhost'\nDB_PORT: '5432'\nDEBUG: 'true'"
        );
        assert_eq!(render_env(&Map::new(), EnvFileFormat::Env), "");

        assert_eq!("".parse::<EnvFileFormat>().ok(), Some(EnvFileFormat::Env));
        assert_eq!("yaml".parse::<EnvFileFormat>().ok(), Some(EnvFileFormat::Yaml));
        assert!("json".parse::<EnvFileFormat>().is_err());
    }

    #[tokio::test]
    async fn generate_env_tests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let filename = dir.path().join(".env");
        let filename = filename.to_str().expect("utf-8 path");
        let mut secrets = Map::new();
        secrets.insert("API_KEY".to_string(), Value::from("abc"));
        secrets.insert("RETRIES".to_string(), Value::from(3));

        let path = generate_env_from_secretsmanager(
            None,
            Some(secrets.clone()),
            None,
            filename,
            EnvFileFormat::Env,
        )
        .await
        .expect("env file");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read env"),
            "API_KEY='abc'\nRETRIES='3'"
        );

        let path = generate_env_from_secretsmanager(
            None,
            Some(secrets),
            None,
            filename,
            EnvFileFormat::Yaml,
        )
        .await
        .expect("yaml file");
        assert!(path.to_string_lossy().ends_with(".env.yaml"));
        assert_eq!(
            std::fs::read_to_string(&path).expect("read yaml"),
            "API_KEY: 'abc'\nRETRIES: '3'"
        );

        let missing = generate_env_from_secretsmanager(None, None, None, filename, EnvFileFormat::Env).await;
        assert!(missing.is_err());
        let no_client =
            generate_env_from_secretsmanager(None, None, Some("prod/app"), filename, EnvFileFormat::Env).await;
        assert!(no_client.is_err());
        let mut one = Map::new();
        one.insert("A".to_string(), Value::from("b"));
        let no_filename = generate_env_from_secretsmanager(None, Some(one), None, "", EnvFileFormat::Env).await;
        assert!(no_filename.is_err());
    }

    #[test]
    fn folder_files_tests() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.parquet"), b"b").expect("write b");
        std::fs::write(dir.path().join("a.parquet"), b"a").expect("write a");
        std::fs::create_dir(dir.path().join("nested")).expect("nested");
        std::fs::write(dir.path().join("nested").join("c.parquet"), b"c").expect("write c");

        let files = folder_files(dir.path()).expect("folder files");
        let names: Vec<_> = files
            .iter()
            .filter_map(|f| f.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, ["a.parquet", "b.parquet"]);

        assert!(folder_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn upload_target_tests() {
        let folder = parse_s3_uri("s3://bucket/landing/").expect("s3 folder");
        let target = upload_target(&folder, std::path::Path::new("/tmp/out/chunk_0.parquet"));
        assert_eq!(
            target.map(|t| t.to_string()).as_deref(),
            Some("s3://bucket/landing/chunk_0.parquet")
        );
        assert_eq!(upload_target(&folder, std::path::Path::new("/")), None);
    }

    #[cfg(unix)]
    #[test]
    fn upload_target_non_utf8_tests() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(OsStr::from_bytes(b"bad\xffname.parquet"));
        std::fs::write(&path, b"x").expect("write non UTF-8 name");

        let files = folder_files(dir.path()).expect("folder files");
        assert_eq!(files.len(), 1);
        let folder = parse_s3_uri("s3://bucket/landing").expect("s3 folder");
        let target = upload_target(&folder, &files[0]).expect("target");
        println!("{target}");
        assert_eq!(target.key, "landing/bad\u{fffd}name.parquet");
    }

    #[tokio::test]
    async fn upload_folder_tests() {
        let client = closed_s3_client();
        let workers = NonZeroUsize::new(2);

        let empty = tempfile::tempdir().expect("tempdir");
        let uploaded = upload_folder_s3(&client, empty.path(), "s3://bucket/landing", workers)
            .await
            .expect("empty folder");
        assert!(uploaded);

        // Every upload fails, so the folder is not reported as uploaded.
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.parquet"), b"a").expect("write a");
        std::fs::write(dir.path().join("b.parquet"), b"b").expect("write b");
        let uploaded = upload_folder_s3(&client, dir.path(), "s3://bucket/landing", workers)
            .await
            .expect("failed uploads are not an error");
        assert!(!uploaded);

        assert!(upload_folder_s3(&client, dir.path(), "bucket/landing", workers).await.is_err());
        assert!(
            upload_folder_s3(&client, dir.path().join("missing"), "s3://bucket/landing", workers)
                .await
                .is_err()
        );
    }

    #[test]
    fn default_table_name_tests() {
        assert_eq!(
            default_table_name("s3://bucket/data/orders").as_deref(),
            Some("orders")
        );
        assert_eq!(
            default_table_name("s3://bucket/data/orders/").as_deref(),
            Some("orders")
        );
        assert_eq!(default_table_name("s3://bucket"), None);
        assert_eq!(default_table_name("data/orders"), None);
    }

    #[tokio::test]
    async fn create_table_without_name_tests() {
        let clients = closed_athena_clients();
        let created =
            create_athena_table_from_parquet(&clients, "s3://bucket", "db", "s3://staging/", None, None, false)
                .await;
        assert!(!created);
    }

    #[tokio::test]
    async fn athena_refresh_guard_tests() {
        // Any catalog call would fail against the closed endpoint.
        let clients = closed_athena_clients();

        let report = athena_refresh(&clients, "", None, None).await.expect("no database");
        println!("{:?}", report.lines());
        assert!(report.contains_warnings());
        assert_eq!(report.lines().len(), 1);

        let report = athena_refresh(&clients, "analytics", None, None)
            .await
            .expect("no tables given");
        assert!(report.contains_warnings());
        assert_eq!(report.lines().len(), 1);

        let report = athena_refresh(&clients, "analytics", Some(Vec::new()), None)
            .await
            .expect("empty tables");
        assert!(report.contains_warnings());
        assert_eq!(report.lines().len(), 1);
    }

    #[test]
    fn dynamo_tests() {
        let spec: DynamoTableSpec = serde_json::from_value(json!({
            "table_name": "users",
            "hash_key": {"name": "user_id", "type": "S"},
            "range_key": {"name": "created", "type": "N"},
        }))
        .expect("table spec");
        assert_eq!(spec.hash_key.kind, DynamoKeyKind::S);
        assert_eq!(spec.range_key.map(|k| k.kind), Some(DynamoKeyKind::N));
        assert!(spec.provisioned_throughput.is_none());

        assert_eq!(Select::from(DynamoSelect::default()), Select::AllAttributes);
        assert_eq!(Select::from(DynamoSelect::Count), Select::Count);

        let mut item = HashMap::new();
        item.insert("user_id".to_string(), AttributeValue::S("u1".to_string()));
        item.insert("email".to_string(), AttributeValue::S("u1@example.com".to_string()));
        let projected = project_item(item, &["user_id", "phone"]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.get("user_id"), Some(&AttributeValue::S("u1".to_string())));
        assert_eq!(projected.get("phone"), Some(&AttributeValue::Null(true)));
        assert!(!projected.contains_key("email"));
    }

    #[test]
    fn cognito_tests() {
        let attribute = user_attribute("email", "alice@example.com").expect("attribute");
        assert_eq!(attribute.name(), "email");
        assert_eq!(attribute.value(), Some("alice@example.com"));
    }
}
