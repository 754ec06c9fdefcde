// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

/// Chunked Parquet writing.
mod writer;

pub use self::writer::{csv_to_parquet, split_batch, write_parquet, ParquetOutput};
