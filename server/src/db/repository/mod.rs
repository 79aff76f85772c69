//! Repository Module
//!
//! Per-table CRUD on SurrealDB plus [`TxnScript`], the guarded multi-statement
//! transaction builder used everywhere a write must be all-or-nothing.

pub mod category;
pub mod order;
pub mod product;
pub mod shop;
pub mod stock_batch;

pub use category::CategoryRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use shop::ShopRepository;
pub use stock_batch::StockBatchRepository;

use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================
//
// API 层和模型的引用字段都是 "table:id" 字符串；
// 寻址具体记录时在这里解析为 RecordId。

/// Parse an id ("table:id" or bare key) into a RecordId for the given table
pub fn parse_record_id(table: &str, id: &str) -> RepoResult<RecordId> {
    if id.contains(':') {
        let rid: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid record id: {}", id)))?;
        if rid.table() != table {
            return Err(RepoError::Validation(format!(
                "Record id {} does not belong to table {}",
                id, table
            )));
        }
        Ok(rid)
    } else {
        Ok(RecordId::from_table_key(table, id))
    }
}

// =============================================================================
// Guarded transaction builder
// =============================================================================

/// Marker thrown by failed guards; callers match on it to detect
/// optimistic-concurrency conflicts and retry.
pub const TXN_CONFLICT_MARKER: &str = "settlement conflict";

/// Whether a database error came from a failed transaction guard
pub fn is_conflict_error(err: &RepoError) -> bool {
    matches!(err, RepoError::Database(msg) if msg.contains(TXN_CONFLICT_MARKER))
}

/// Builder for a single `BEGIN TRANSACTION … COMMIT` SurrealQL script
///
/// Statements are pushed with `$`-placeholders returned by the bind methods.
/// `push_guarded` wraps a statement so that an empty result set cancels the
/// whole transaction via `THROW` — this is the optimistic-concurrency
/// primitive protecting stock writes against lost updates.
pub struct TxnScript {
    stmts: Vec<String>,
    value_binds: Vec<(String, serde_json::Value)>,
    record_binds: Vec<(String, RecordId)>,
    guard_count: usize,
}

impl TxnScript {
    pub fn new() -> Self {
        Self {
            stmts: Vec::new(),
            value_binds: Vec::new(),
            record_binds: Vec::new(),
            guard_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Bind a JSON-serializable value, returning its `$placeholder`
    pub fn bind_value(&mut self, value: serde_json::Value) -> String {
        let name = format!("v{}", self.value_binds.len());
        self.value_binds.push((name.clone(), value));
        format!("${}", name)
    }

    /// Bind a record id, returning its `$placeholder`
    pub fn bind_record(&mut self, id: RecordId) -> String {
        let name = format!("r{}", self.record_binds.len());
        self.record_binds.push((name.clone(), id));
        format!("${}", name)
    }

    /// Push a raw statement (placeholders already bound)
    pub fn push(&mut self, stmt: impl Into<String>) {
        self.stmts.push(stmt.into());
    }

    /// Push a statement whose empty result aborts the transaction
    pub fn push_guarded(&mut self, stmt: impl AsRef<str>) {
        let var = format!("$g{}", self.guard_count);
        self.guard_count += 1;
        self.stmts.push(format!("LET {} = ({});", var, stmt.as_ref()));
        self.stmts.push(format!(
            "IF array::len({}) == 0 {{ THROW \"{}\" }};",
            var, TXN_CONFLICT_MARKER
        ));
    }

    /// Execute the script as one transaction
    pub async fn run(self, db: &Surreal<Db>) -> RepoResult<()> {
        let mut script = String::from("BEGIN TRANSACTION;\n");
        for stmt in &self.stmts {
            script.push_str(stmt);
            if !stmt.trim_end().ends_with(';') {
                script.push(';');
            }
            script.push('\n');
        }
        script.push_str("COMMIT TRANSACTION;");

        let mut query = db.query(script);
        for (name, value) in self.value_binds {
            query = query.bind((name, value));
        }
        for (name, id) in self.record_binds {
            query = query.bind((name, id));
        }

        let response = query.await?;
        response.check()?;
        Ok(())
    }
}

impl Default for TxnScript {
    fn default() -> Self {
        Self::new()
    }
}
