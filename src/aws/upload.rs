// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use super::s3::{parse_s3_uri, upload_file_s3, S3Client, S3Uri};
use crate::common::Error;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::available_parallelism;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const TARGET: &str = "aws_s3";

/// Lists the regular files directly inside `folder_path`, sorted by name.
pub(crate) fn folder_files(folder_path: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = std::fs::read_dir(folder_path)
        .map_err(|e| Error::Io(e, format!("read_dir({})", folder_path.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| Error::Io(e, format!("read_dir({})", folder_path.display())))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The object a local file is uploaded to; file names that are not UTF-8 are converted
/// lossily.
pub(crate) fn upload_target(s3_folder: &S3Uri, file: &Path) -> Option<S3Uri> {
    let file_name = file.file_name()?;
    Some(s3_folder.join(&file_name.to_string_lossy()))
}

/// Uploads every file of a local folder to `{s3_folder_path}/{file_name}`.
///
/// At most `workers` uploads run at once (default: available parallelism). Uploads are
/// independent; a failed one doesn't stop the others. Returns `Ok(true)` only if every
/// file was uploaded.
pub async fn upload_folder_s3(
    client: &S3Client,
    folder_path: impl AsRef<Path>,
    s3_folder_path: &str,
    workers: Option<NonZeroUsize>,
) -> Result<bool, Error> {
    let folder_path = folder_path.as_ref();
    let s3_folder = parse_s3_uri(s3_folder_path)?;
    let files = folder_files(folder_path)?;
    let workers = workers
        .or_else(|| available_parallelism().ok())
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    tracing::info!(
        target: TARGET,
        "[upload_folder_s3] Uploading {} files from {} to {s3_folder} with {workers} workers.",
        files.len(),
        folder_path.display()
    );

    let mut all_uploaded = true;
    let permits = Arc::new(Semaphore::new(workers));
    let mut join = JoinSet::new();
    for file in files {
        let Some(s3_path) = upload_target(&s3_folder, &file) else {
            tracing::error!(target: TARGET, "[upload_folder_s3] {} has no file name.", file.display());
            all_uploaded = false;
            continue;
        };
        let s3_path = s3_path.to_string();
        let client = client.clone();
        let permits = Arc::clone(&permits);
        join.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = upload_file_s3(&client, &file, &s3_path).await;
            (file, result)
        });
    }

    while let Some(res) = join.join_next().await {
        match res {
            Ok((_, Ok(true))) => {}
            Ok((file, Ok(false))) => {
                tracing::warn!(target: TARGET, "[upload_folder_s3] {} was not uploaded.", file.display());
                all_uploaded = false;
            }
            Ok((file, Err(e))) => {
                tracing::error!(target: TARGET, "[upload_folder_s3] {}: {e}", file.display());
                all_uploaded = false;
            }
            Err(e) => {
                tracing::error!(target: TARGET, "[upload_folder_s3] upload task join error: {e}");
                all_uploaded = false;
            }
        }
    }
    Ok(all_uploaded)
}
