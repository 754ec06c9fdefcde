// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use crate::common::Error;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TARGET: &str = "parquet_transform";

/// Where [`write_parquet`] puts its chunks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParquetOutput {
    /// Every chunk appended to one file.
    SingleFile(PathBuf),
    /// One `chunk_{i}.parquet` file per chunk in this directory.
    MultipleFiles(PathBuf),
}

impl ParquetOutput {
    /// The file or directory written to.
    pub fn path(&self) -> &Path {
        match self {
            Self::SingleFile(path) | Self::MultipleFiles(path) => path,
        }
    }
}

fn snappy_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn create_writer(path: &Path, schema: SchemaRef) -> Result<ArrowWriter<File>, Error> {
    let file = File::create(path).map_err(|e| Error::Io(e, format!("create({})", path.display())))?;
    ArrowWriter::try_new(file, schema, Some(snappy_properties()))
        .map_err(|e| Error::Parquet(e, format!("create_writer({})", path.display())))
}

/// Overwrites `output` with the chunks of `stream`.
///
/// The schema of the first chunk is used for the whole output; a later chunk with other
/// fields fails the call. Returns the number of chunks written. On failure no file
/// without a footer is left behind: the single output file, or the chunk file being
/// written, is removed.
pub fn write_parquet<I>(
    stream: I,
    output: &ParquetOutput,
    print_every: Option<usize>,
) -> Result<usize, Error>
where
    I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
{
    let mut single_writer: Option<ArrowWriter<File>> = None;
    let written = write_chunks(stream, output, print_every, &mut single_writer);
    let Some(writer) = single_writer else {
        return written;
    };
    let path = output.path();
    let closed = written.and_then(|chunks| {
        writer
            .close()
            .map(|_| chunks)
            .map_err(|e| Error::Parquet(e, format!("close({})", path.display())))
    });
    if closed.is_err() {
        remove_partial(path);
    }
    closed
}

fn write_chunks<I>(
    stream: I,
    output: &ParquetOutput,
    print_every: Option<usize>,
    single_writer: &mut Option<ArrowWriter<File>>,
) -> Result<usize, Error>
where
    I: IntoIterator<Item = Result<RecordBatch, ArrowError>>,
{
    let print_every = print_every.filter(|n| *n > 0);
    let mut first_schema: Option<SchemaRef> = None;
    let mut chunks = 0;

    for (i, chunk) in stream.into_iter().enumerate() {
        if print_every.is_some_and(|n| i % n == 0) {
            tracing::info!(target: TARGET, "[write_parquet] Reading chunk {i}.");
        }
        let chunk = chunk.map_err(|e| Error::Arrow(e, format!("write_parquet(chunk {i})")))?;
        let schema = match first_schema.clone() {
            Some(schema) => {
                if schema.fields() != chunk.schema().fields() {
                    return Err(Error::String(format!(
                        "write_parquet(chunk {i}): schema differs from the first chunk"
                    )));
                }
                schema
            }
            None => {
                let schema = chunk.schema();
                first_schema = Some(Arc::clone(&schema));
                schema
            }
        };

        match output {
            ParquetOutput::SingleFile(path) => {
                if single_writer.is_none() {
                    *single_writer = Some(create_writer(path, schema)?);
                }
                if let Some(writer) = single_writer {
                    writer
                        .write(&chunk)
                        .map_err(|e| Error::Parquet(e, format!("write_parquet(chunk {i})")))?;
                }
            }
            ParquetOutput::MultipleFiles(dir) => {
                if i == 0 {
                    std::fs::create_dir_all(dir)
                        .map_err(|e| Error::Io(e, format!("create_dir_all({})", dir.display())))?;
                }
                let path = dir.join(format!("chunk_{i}.parquet"));
                write_chunk_file(&path, schema, &chunk).inspect_err(|_| remove_partial(&path))?;
            }
        }
        chunks += 1;
    }
    Ok(chunks)
}

fn write_chunk_file(path: &Path, schema: SchemaRef, chunk: &RecordBatch) -> Result<(), Error> {
    let mut writer = create_writer(path, schema)?;
    writer
        .write(chunk)
        .map_err(|e| Error::Parquet(e, format!("write_parquet({})", path.display())))?;
    writer
        .close()
        .map_err(|e| Error::Parquet(e, format!("close({})", path.display())))?;
    Ok(())
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!(target: TARGET, "[write_parquet] Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::error!(target: TARGET, "[write_parquet] Cannot remove {}: {e}", path.display()),
    }
}

/// Splits a batch into zero-copy slices of at most `chunksize` rows.
pub fn split_batch(batch: &RecordBatch, chunksize: usize) -> Result<Vec<RecordBatch>, Error> {
    if chunksize == 0 {
        return Err(Error::String("split_batch: chunksize must be positive".to_string()));
    }
    let rows = batch.num_rows();
    Ok((0..rows)
        .step_by(chunksize)
        .map(|offset| batch.slice(offset, chunksize.min(rows - offset)))
        .collect())
}

/// Converts a CSV file with a header row to Parquet, `chunksize` rows per chunk.
///
/// Column types are inferred from the whole file.
pub fn csv_to_parquet(
    csv_path: impl AsRef<Path>,
    output: &ParquetOutput,
    chunksize: usize,
    print_every: Option<usize>,
) -> Result<usize, Error> {
    let csv_path = csv_path.as_ref();
    if chunksize == 0 {
        return Err(Error::String("csv_to_parquet: chunksize must be positive".to_string()));
    }
    let context = || format!("csv_to_parquet({})", csv_path.display());
    let mut file = File::open(csv_path).map_err(|e| Error::Io(e, context()))?;
    let (schema, records) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, None)
        .map_err(|e| Error::Arrow(e, context()))?;
    file.rewind().map_err(|e| Error::Io(e, context()))?;
    tracing::info!(target: TARGET, "[csv_to_parquet] {records} records in {}", csv_path.display());

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_batch_size(chunksize)
        .build(file)
        .map_err(|e| Error::Arrow(e, context()))?;
    write_parquet(reader, output, print_every)
}
