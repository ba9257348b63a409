//! Strongly-typed migration name and the `YYYY-MM-DD-NNNNNNNNN.<ext>` file
//! naming scheme.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::OnceLock;

/// Matches `2024-01-31-000000001.sql` and captures the date, suffix and extension.
static FILE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn file_name_re() -> &'static Regex {
    FILE_NAME_RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})-(\d{9})\.([A-Za-z0-9]+)$").expect("valid regex literal")
    })
}

/// Strongly-typed wrapper for migration names.
///
/// Names discovered on disk always follow the `YYYY-MM-DD-NNNNNNNNN` pattern,
/// so lexicographic order equals chronological order. Names read back from the
/// ledger are only required to be non-empty: a ledger row may outlive the
/// file that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationName(String);

impl MigrationName {
    /// Create a new `MigrationName`, panicking in debug builds if the name is empty.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(!s.is_empty(), "MigrationName must not be empty");
        Self(s)
    }

    /// Try to create a new `MigrationName`, returning `None` if the name is empty.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Build a fresh name for a migration created at `now`.
    ///
    /// The 9-digit suffix is the UTC time of day as `HHMMSSmmm`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(now.format("%Y-%m-%d-%H%M%S%3f").to_string())
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for MigrationName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MigrationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MigrationName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for MigrationName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A file name that follows the migration naming scheme, split into parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFileName {
    /// File name without extension.
    pub name: MigrationName,
    /// Creation date taken from the `YYYY-MM-DD` prefix.
    pub created_at: NaiveDate,
    /// File extension without the leading dot.
    pub extension: String,
}

impl MigrationFileName {
    /// Parse a bare file name (no directory components).
    ///
    /// Returns `Ok(None)` when the name does not fit the pattern at all, and
    /// an error when it fits but the date portion is not a calendar date.
    pub fn parse(file_name: &str) -> CoreResult<Option<Self>> {
        let Some(caps) = file_name_re().captures(file_name) else {
            return Ok(None);
        };
        let date = &caps[1];
        let created_at = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            CoreError::InvalidMigrationName {
                name: file_name.to_string(),
                reason: format!("'{date}' is not a valid date: {e}"),
            }
        })?;
        let stem = format!("{}-{}", date, &caps[2]);
        Ok(Some(Self {
            name: MigrationName(stem),
            created_at,
            extension: caps[3].to_string(),
        }))
    }

    /// Render back to `<name>.<extension>`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }
}
