// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct LoggerInner {
    lines: Vec<String>,
    warn: bool,
}

/// Thread-safe string logger.
///
/// Batch operations hand one of these back as a report; clones share the same lines,
/// so concurrent tasks can append to a single report. Every line is also emitted as a
/// `tracing` event tagged with the logger's scope.
#[derive(Clone, Default)]
pub struct StringLogger {
    scope: &'static str,
    inner: Arc<Mutex<LoggerInner>>,
}

impl StringLogger {
    /// Create a new string logger whose events are tagged with `scope`.
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            inner: Arc::new(Mutex::new(Default::default())),
        }
    }

    /// Whether the log contains any warnings.
    pub fn contains_warnings(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.warn)
            .unwrap_or(false)
    }

    /// Add all lines from the specified logger to this logger.
    pub fn extend(&self, string_logger: &StringLogger) {
        if Arc::ptr_eq(&self.inner, &string_logger.inner) {
            return;
        }
        if let (Ok(mut to_inner), Ok(from_inner)) = (self.inner.lock(), string_logger.inner.lock())
        {
            to_inner.warn |= from_inner.warn;
            to_inner.lines.extend(from_inner.lines.iter().cloned());
        }
    }

    /// Returns true if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.lines.is_empty())
            .unwrap_or(true)
    }

    /// Returns a copy of the logged lines.
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.lines.clone())
            .unwrap_or_default()
    }

    /// Add a trace line to this logger.
    pub fn trace(&self, line: String) {
        if line.is_empty() {
            return;
        }
        tracing::info!(scope = self.scope, "{line}");
        if let Ok(mut inner) = self.inner.lock() {
            inner.lines.push(line);
        }
    }

    /// Add a warning or error line to this logger.
    pub fn warn(&self, line: String) {
        if line.is_empty() {
            return;
        }
        tracing::warn!(scope = self.scope, "{line}");
        if let Ok(mut inner) = self.inner.lock() {
            inner.lines.push(line);
            inner.warn = true;
        }
    }
}

impl Display for StringLogger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.inner.lock() {
            Ok(inner) => f.write_str(&inner.lines.join("\n")),
            Err(_) => Ok(()),
        }
    }
}
