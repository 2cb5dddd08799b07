//! The database-driver boundary: where declarative [`Predicate`]s and typed
//! [`StepOp`] values are finally turned into SQL. Nothing above this layer
//! ever builds a SQL string.

use migrate_core::model::{Predicate, StepOp};

use crate::errors::ExecError;

/// Renders a predicate to a boolean SQL expression. Kept here (rather than
/// in `migrate-core`) because rendering is a driver concern — a
/// non-Postgres backend would render these differently.
pub fn render_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::TableExists(t) => format!(
            "EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = '{t}')"
        ),
        Predicate::ColumnExists(t, c) => format!(
            "EXISTS (SELECT 1 FROM information_schema.columns WHERE table_name = '{t}' AND column_name = '{c}')"
        ),
        Predicate::IndexExists(n) => format!(
            "EXISTS (SELECT 1 FROM pg_indexes WHERE indexname = '{n}')"
        ),
        Predicate::ConstraintExists(n) => format!(
            "EXISTS (SELECT 1 FROM information_schema.table_constraints WHERE constraint_name = '{n}')"
        ),
        Predicate::Not(inner) => format!("NOT ({})", render_predicate(inner)),
        Predicate::And(a, b) => format!("({}) AND ({})", render_predicate(a), render_predicate(b)),
    }
}

/// Synthesizes the DDL/DML statement for a typed op. `backfill_sql` carries
/// its own SQL already, so it passes through unchanged.
pub fn render_statement(op: &StepOp) -> String {
    match op {
        StepOp::CreateView { name, definition } => format!("CREATE VIEW {name} AS {definition}"),
        StepOp::AddComment { target, comment } => format!("COMMENT ON {target} IS '{comment}'"),
        StepOp::CreateTable { name, columns } => {
            let cols = columns
                .iter()
                .map(|c| format!("{} {}{}", c.name, c.type_, if c.nullable { "" } else { " NOT NULL" }))
                .collect::<Vec<_>>()
                .join(", ");
            format!("CREATE TABLE {name} ({cols})")
        }
        StepOp::AddColumn { table, name, type_, nullable, default } => {
            let null_clause = if *nullable { "" } else { " NOT NULL" };
            let default_clause = default.as_deref().map(|d| format!(" DEFAULT {d}")).unwrap_or_default();
            format!("ALTER TABLE {table} ADD COLUMN {name} {type_}{default_clause}{null_clause}")
        }
        StepOp::AddIndexConcurrently { table, cols, name, where_, unique } => {
            let idx_name = name.clone().unwrap_or_else(|| format!("{table}_{}_idx", cols.join("_")));
            let unique_kw = if *unique { "UNIQUE " } else { "" };
            let where_clause = where_.as_deref().map(|w| format!(" WHERE {w}")).unwrap_or_default();
            format!(
                "CREATE {unique_kw}INDEX CONCURRENTLY {idx_name} ON {table} ({}){where_clause}",
                cols.join(", ")
            )
        }
        StepOp::AddIndexBlocking { table, cols, name, unique } => {
            let idx_name = name.clone().unwrap_or_else(|| format!("{table}_{}_idx", cols.join("_")));
            let unique_kw = if *unique { "UNIQUE " } else { "" };
            format!("CREATE {unique_kw}INDEX {idx_name} ON {table} ({})", cols.join(", "))
        }
        StepOp::AddForeignKeyNotValid { src, col, tgt, tgt_col, name } => {
            let fk_name = name.clone().unwrap_or_else(|| format!("{src}_{col}_fkey"));
            format!(
                "ALTER TABLE {src} ADD CONSTRAINT {fk_name} FOREIGN KEY ({col}) REFERENCES {tgt} ({tgt_col}) NOT VALID"
            )
        }
        StepOp::ValidateConstraint { table, name } => format!("ALTER TABLE {table} VALIDATE CONSTRAINT {name}"),
        StepOp::BackfillSql { sql, .. } => sql.clone(),
        StepOp::SetNotNull { table, column } => format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL"),
        StepOp::DropColumn { table, column } => format!("ALTER TABLE {table} DROP COLUMN {column}"),
        StepOp::DropTable { table } => format!("DROP TABLE {table}"),
        StepOp::AlterColumnType { table, column, new_type } => {
            format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {new_type}")
        }
    }
}

/// The outcome of executing one step's statement, before it's folded into
/// an `Event`/`LedgerEntry`.
#[derive(Debug, Clone, Default)]
pub struct StatementOutcome {
    pub rows_affected: Option<u64>,
}

/// Abstracts the actual database interaction so the executor's state
/// machine is testable without a running Postgres instance.
pub trait DatabaseDriver {
    /// Sets `lock_timeout`/`statement_timeout` for the session. Scoped to
    /// the current database interaction only; never leaks across steps.
    fn set_session_timeouts(&mut self, max_lock_ms: u64, max_stmt_ms: u64) -> Result<(), ExecError>;

    fn evaluate(&mut self, predicate: &Predicate) -> Result<bool, ExecError>;

    fn execute(&mut self, op: &StepOp, step_sha: &str) -> Result<StatementOutcome, ExecError>;
}
