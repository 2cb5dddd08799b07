//! An in-memory `DatabaseDriver` used by this crate's own tests. Tracks a
//! toy schema so predicate evaluation is real, and a simulated statement
//! duration so `StatementTimeout` can be exercised without wall-clock
//! sleeps longer than the test needs to tolerate.

use std::collections::HashSet;
use std::time::Duration;

use migrate_core::model::{Predicate, StepOp};

use crate::driver::{DatabaseDriver, StatementOutcome};
use crate::errors::ExecError;

#[derive(Default)]
pub struct FakeDriver {
    pub tables: HashSet<String>,
    pub columns: HashSet<(String, String)>,
    pub indexes: HashSet<String>,
    pub constraints: HashSet<String>,
    /// If set, `execute` reports this as the statement's simulated
    /// duration; `set_session_timeouts` compares it against `max_stmt_ms`.
    pub simulated_duration: Option<Duration>,
    current_max_stmt_ms: Option<u64>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str) -> Self {
        self.tables.insert(name.to_string());
        self
    }
}

impl DatabaseDriver for FakeDriver {
    fn set_session_timeouts(&mut self, _max_lock_ms: u64, max_stmt_ms: u64) -> Result<(), ExecError> {
        self.current_max_stmt_ms = Some(max_stmt_ms);
        Ok(())
    }

    fn evaluate(&mut self, predicate: &Predicate) -> Result<bool, ExecError> {
        Ok(match predicate {
            Predicate::TableExists(t) => self.tables.contains(t),
            Predicate::ColumnExists(t, c) => self.columns.contains(&(t.clone(), c.clone())),
            Predicate::IndexExists(n) => self.indexes.contains(n),
            Predicate::ConstraintExists(n) => self.constraints.contains(n),
            Predicate::Not(inner) => !self.evaluate(inner)?,
            Predicate::And(a, b) => self.evaluate(a)? && self.evaluate(b)?,
        })
    }

    fn execute(&mut self, op: &StepOp, step_sha: &str) -> Result<StatementOutcome, ExecError> {
        if let (Some(duration), Some(budget)) = (self.simulated_duration, self.current_max_stmt_ms) {
            if duration.as_millis() as u64 > budget {
                return Err(ExecError::StatementTimeout(step_sha.to_string()));
            }
        }

        match op {
            StepOp::CreateTable { name, columns } => {
                self.tables.insert(name.clone());
                for c in columns {
                    self.columns.insert((name.clone(), c.name.clone()));
                }
            }
            StepOp::AddColumn { table, name, .. } => {
                self.columns.insert((table.clone(), name.clone()));
            }
            StepOp::AddIndexConcurrently { name, table, cols, .. } | StepOp::AddIndexBlocking { name, table, cols, .. } => {
                let idx_name = name.clone().unwrap_or_else(|| format!("{table}_{}_idx", cols.join("_")));
                self.indexes.insert(idx_name);
            }
            StepOp::AddForeignKeyNotValid { src, col, name, .. } => {
                let fk_name = name.clone().unwrap_or_else(|| format!("{src}_{col}_fkey"));
                self.constraints.insert(fk_name);
            }
            StepOp::SetNotNull { .. } | StepOp::ValidateConstraint { .. } => {}
            StepOp::DropColumn { table, column } => {
                self.columns.remove(&(table.clone(), column.clone()));
            }
            StepOp::DropTable { table } => {
                self.tables.remove(table);
            }
            StepOp::AlterColumnType { .. } | StepOp::CreateView { .. } | StepOp::AddComment { .. } | StepOp::BackfillSql { .. } => {}
        }

        Ok(StatementOutcome { rows_affected: Some(1) })
    }
}
