//! Migration model: identity, persisted state, per-run state and the
//! executable up/down capability.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use keel_core::MigrationName;
use keel_db::{Connection, DbResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Which half of a migration runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Whether a migration is currently applied to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpDownState {
    Down,
    Up,
}

impl fmt::Display for UpDownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpDownState::Down => write!(f, "down"),
            UpDownState::Up => write!(f, "up"),
        }
    }
}

/// Outcome of a migration within the current run. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Pending,
    Completed,
    Error,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Pending => write!(f, "pending"),
            RunState::Completed => write!(f, "completed"),
            RunState::Error => write!(f, "error"),
        }
    }
}

/// The executable half of a migration.
///
/// Both steps receive the connection of the current run; inside a
/// transactional run that connection has an open transaction, so a step must
/// not commit or roll back itself.
#[async_trait]
pub trait MigrationCapability: Send + Sync {
    /// Apply the change.
    async fn up(&self, conn: &dyn Connection) -> DbResult<()>;

    /// Reverse the change.
    async fn down(&self, conn: &dyn Connection) -> DbResult<()>;

    /// Human-readable summary stored in the ledger.
    fn description(&self) -> &str {
        ""
    }
}

/// A migration defined by a `.sql` file with `-- up` / `-- down` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    pub description: String,
    pub up_sql: String,
    pub down_sql: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Up,
    Down,
}

impl SqlMigration {
    /// Split file content into its up and down sections.
    ///
    /// A section marker is a comment line that reads just `up` or `down`
    /// (case-insensitive). An optional `-- description: ...` line before the
    /// first marker sets the description; only comments and blank lines may
    /// appear there. Both markers are required; an empty section is allowed
    /// and runs nothing.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut description = String::new();
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut section = Section::Header;
        let mut seen_up = false;
        let mut seen_down = false;
        let mut stray_line = None;

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(comment) = trimmed.strip_prefix("--") {
                let comment = comment.trim();
                if comment.eq_ignore_ascii_case("up") {
                    if seen_up {
                        return Err("more than one '-- up' marker".to_string());
                    }
                    seen_up = true;
                    section = Section::Up;
                    continue;
                }
                if comment.eq_ignore_ascii_case("down") {
                    if seen_down {
                        return Err("more than one '-- down' marker".to_string());
                    }
                    seen_down = true;
                    section = Section::Down;
                    continue;
                }
                if section == Section::Header {
                    if let Some((key, value)) = comment.split_once(':') {
                        if key.trim().eq_ignore_ascii_case("description") {
                            description = value.trim().to_string();
                        }
                    }
                    continue;
                }
            }
            match section {
                Section::Header => {
                    if !trimmed.is_empty() && stray_line.is_none() {
                        stray_line = Some(line_no + 1);
                    }
                }
                Section::Up => up.push(line),
                Section::Down => down.push(line),
            }
        }

        match (seen_up, seen_down) {
            (false, false) => Err("missing '-- up' and '-- down' markers".to_string()),
            (false, true) => Err("missing '-- up' marker".to_string()),
            (true, false) => Err("missing '-- down' marker".to_string()),
            (true, true) => match stray_line {
                Some(line) => Err(format!(
                    "line {line} has SQL before the first '-- up' or '-- down' marker"
                )),
                None => Ok(Self {
                    description,
                    up_sql: up.join("\n").trim().to_string(),
                    down_sql: down.join("\n").trim().to_string(),
                }),
            },
        }
    }

    /// Render a new migration file body.
    pub fn template(description: &str) -> String {
        format!(
            "-- description: {description}\n\
             -- up\n\
             \n\
             -- down\n\
             \n"
        )
    }
}

#[async_trait]
impl MigrationCapability for SqlMigration {
    async fn up(&self, conn: &dyn Connection) -> DbResult<()> {
        if self.up_sql.is_empty() {
            return Ok(());
        }
        conn.execute_batch(&self.up_sql).await
    }

    async fn down(&self, conn: &dyn Connection) -> DbResult<()> {
        if self.down_sql.is_empty() {
            return Ok(());
        }
        conn.execute_batch(&self.down_sql).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// One named, ordered, reversible change-set.
///
/// `Up` migrations always carry `batch` and `run_at`; `Down` migrations
/// never do. A migration without a capability (a ledger row whose file is
/// gone) is reported by status but never executed.
#[derive(Clone)]
pub struct Migration {
    pub name: MigrationName,
    pub description: String,
    pub created_at: NaiveDate,
    pub run_at: Option<DateTime<Utc>>,
    pub batch: Option<i64>,
    pub up_down_state: UpDownState,
    pub run_state: RunState,
    capability: Option<Arc<dyn MigrationCapability>>,
}

impl Migration {
    /// A migration discovered on disk, not yet applied.
    pub fn new(
        name: MigrationName,
        description: impl Into<String>,
        created_at: NaiveDate,
        capability: Arc<dyn MigrationCapability>,
    ) -> Self {
        Self {
            name,
            description: description.into(),
            created_at,
            run_at: None,
            batch: None,
            up_down_state: UpDownState::Down,
            run_state: RunState::Pending,
            capability: Some(capability),
        }
    }

    /// A migration known only from the ledger.
    pub fn ghost(
        name: MigrationName,
        description: impl Into<String>,
        created_at: NaiveDate,
        batch: i64,
        run_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            description: description.into(),
            created_at,
            run_at: Some(run_at),
            batch: Some(batch),
            up_down_state: UpDownState::Up,
            run_state: RunState::Pending,
            capability: None,
        }
    }

    /// True if this migration can be executed.
    pub fn is_runnable(&self) -> bool {
        self.capability.is_some()
    }

    pub fn capability(&self) -> Option<&Arc<dyn MigrationCapability>> {
        self.capability.as_ref()
    }

    pub fn is_up(&self) -> bool {
        self.up_down_state == UpDownState::Up
    }

    /// Record a successful `up` step.
    pub(crate) fn mark_applied(&mut self, batch: i64, run_at: DateTime<Utc>) {
        self.up_down_state = UpDownState::Up;
        self.batch = Some(batch);
        self.run_at = Some(run_at);
        self.run_state = RunState::Completed;
    }

    /// Record a successful `down` step.
    pub(crate) fn mark_reverted(&mut self) {
        self.up_down_state = UpDownState::Down;
        self.batch = None;
        self.run_at = None;
        self.run_state = RunState::Completed;
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("created_at", &self.created_at)
            .field("run_at", &self.run_at)
            .field("batch", &self.batch)
            .field("up_down_state", &self.up_down_state)
            .field("run_state", &self.run_state)
            .field("runnable", &self.is_runnable())
            .finish()
    }
}

/// Which migrations a status query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Up,
    Down,
    #[default]
    All,
}

impl StatusFilter {
    pub fn matches(&self, migration: &Migration) -> bool {
        match self {
            StatusFilter::Up => migration.up_down_state == UpDownState::Up,
            StatusFilter::Down => migration.up_down_state == UpDownState::Down,
            StatusFilter::All => true,
        }
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
