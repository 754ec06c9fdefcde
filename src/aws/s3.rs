// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::load_aws_config;
use crate::common::{Error, WranglerConfig};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

const TARGET: &str = "aws_s3";

/// A convenient alias for S3 client so consuming code doesn't need to add it to `Cargo.toml`
pub type S3Client = aws_sdk_s3::Client;

/// Creates an S3 client.
pub async fn new_s3_client(wrangler_config: &WranglerConfig) -> S3Client {
    let aws_config = load_aws_config(wrangler_config).await;
    Client::new(&aws_config)
}

/// The bucket and object key of an `s3://bucket/key` path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct S3Uri {
    /// Bucket name.
    pub bucket: String,
    /// Object key (or key prefix) without a leading slash, possibly empty.
    pub key: String,
}

impl S3Uri {
    /// Returns the URI of `name` inside this prefix.
    pub fn join(&self, name: &str) -> Self {
        let key = if self.key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.key.trim_end_matches('/'))
        };
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }

    /// Returns the last non-empty segment of the key, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.key.rsplit('/').find(|s| !s.is_empty())
    }
}

impl FromStr for S3Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("s3://")
            .or_else(|| s.strip_prefix("s3a://"))
            .ok_or_else(|| Error::String(format!("{s}: not an s3:// path")))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(Error::String(format!("{s}: missing bucket")));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        })
    }
}

impl Display for S3Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Splits an `s3://bucket/key` path into its bucket and key.
pub fn parse_s3_uri(s3_path: &str) -> Result<S3Uri, Error> {
    s3_path.parse()
}

/// Uploads a single local file to the given S3 path.
///
/// Returns `Ok(false)` when S3 rejects the upload; an unparsable path or an unreadable
/// file is an error.
pub async fn upload_file_s3(
    client: &S3Client,
    file_name: impl AsRef<Path>,
    s3_path: &str,
) -> Result<bool, Error> {
    let file_name = file_name.as_ref();
    let S3Uri { bucket, key } = parse_s3_uri(s3_path)?;
    let body = ByteStream::from_path(file_name).await.map_err(|e| {
        Error::Anyhow(e.into(), format!("upload_file_s3({})", file_name.display()))
    })?;

    match client
        .put_object()
        .bucket(&bucket)
        .key(&key)
        .body(body)
        .send()
        .await
    {
        Ok(_) => {
            tracing::debug!(target: TARGET, "[upload_file_s3] {} -> {s3_path}", file_name.display());
            Ok(true)
        }
        Err(e) => {
            tracing::error!(
                target: TARGET,
                "[upload_file_s3] {} -> {s3_path}: {}",
                file_name.display(),
                e.into_service_error()
            );
            Ok(false)
        }
    }
}

/// Lists every object key in the bucket starting with `prefix`.
pub async fn list_s3_keys(client: &S3Client, bucket: &str, prefix: &str) -> Result<Vec<String>, Error> {
    let mut ret = Vec::new();
    let mut continuation_token = None;
    loop {
        let output = client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| Error::Anyhow(e.into(), format!("list_s3_keys({bucket}, {prefix})")))?;

        ret.extend(
            output
                .contents()
                .iter()
                .filter_map(|obj| obj.key().map(String::from)),
        );

        continuation_token = output.next_continuation_token().map(String::from);
        if !output.is_truncated().unwrap_or(false) || continuation_token.is_none() {
            break;
        }
    }
    Ok(ret)
}

/// Returns the size of an object in bytes.
pub async fn s3_object_size(client: &S3Client, bucket: &str, key: &str) -> Result<u64, Error> {
    let output = client
        .head_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("s3_object_size({bucket}, {key})")))?;
    let len = output.content_length().unwrap_or(0);
    Ok(len.try_into().unwrap_or(0))
}

/// Retrieves a byte range of an object.
pub async fn get_s3_range(
    client: &S3Client,
    bucket: &str,
    key: &str,
    range: Range<u64>,
) -> Result<Vec<u8>, Error> {
    if range.is_empty() {
        return Ok(Vec::new());
    }
    let mut object = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .range(format!("bytes={}-{}", range.start, range.end - 1))
        .send()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("get_s3_range({bucket}, {key})")))?;

    let mut buf: Vec<u8> = Vec::with_capacity((range.end - range.start) as usize);
    while let Some(bytes) = object
        .body
        .try_next()
        .await
        .map_err(|e| Error::Anyhow(e.into(), format!("s3_try_next({bucket}, {key})")))?
    {
        buf.extend_from_slice(&bytes);
    }
    Ok(buf)
}
