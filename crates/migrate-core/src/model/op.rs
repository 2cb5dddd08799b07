//! The closed set of step operations a plan can declare.
//!
//! This is the typed replacement for dynamic dispatch over string op codes:
//! [`HazardClassifier`](crate::hazard_classifier) and
//! [`ProofObligationBuilder`](crate::obligation_builder) match exhaustively
//! over `StepOp`, so the compiler rejects any new variant that isn't handled
//! everywhere it needs to be. Unknown input (an op tag the caller's JSON
//! layer couldn't map to a variant) never reaches this type — it fails at
//! deserialization instead of reaching `hazard_classifier::classify`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepOp {
    CreateView { name: String, definition: String },
    AddComment { target: String, comment: String },
    CreateTable { name: String, columns: Vec<ColumnDef> },
    AddColumn {
        table: String,
        name: String,
        #[serde(rename = "type")]
        type_: String,
        nullable: bool,
        default: Option<String>,
    },
    AddIndexConcurrently {
        table: String,
        cols: Vec<String>,
        name: Option<String>,
        #[serde(rename = "where")]
        where_: Option<String>,
        #[serde(default)]
        unique: bool,
    },
    AddIndexBlocking {
        table: String,
        cols: Vec<String>,
        name: Option<String>,
        #[serde(default)]
        unique: bool,
    },
    AddForeignKeyNotValid {
        src: String,
        col: String,
        tgt: String,
        tgt_col: String,
        name: Option<String>,
    },
    ValidateConstraint { table: String, name: String },
    BackfillSql {
        sql: String,
        rows_per_second: Option<u64>,
        max_lock_ms: Option<u64>,
    },
    SetNotNull { table: String, column: String },
    DropColumn { table: String, column: String },
    DropTable { table: String },
    AlterColumnType { table: String, column: String, new_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub nullable: bool,
}

impl StepOp {
    /// Stable snake_case tag, used in fingerprints and event payloads
    /// independent of how the enum is ultimately (de)serialized.
    pub fn tag(&self) -> &'static str {
        match self {
            StepOp::CreateView { .. } => "create_view",
            StepOp::AddComment { .. } => "add_comment",
            StepOp::CreateTable { .. } => "create_table",
            StepOp::AddColumn { .. } => "add_column",
            StepOp::AddIndexConcurrently { .. } => "add_index_concurrently",
            StepOp::AddIndexBlocking { .. } => "add_index",
            StepOp::AddForeignKeyNotValid { .. } => "add_foreign_key_not_valid",
            StepOp::ValidateConstraint { .. } => "validate_constraint",
            StepOp::BackfillSql { .. } => "backfill_sql",
            StepOp::SetNotNull { .. } => "set_not_null",
            StepOp::DropColumn { .. } => "drop_column",
            StepOp::DropTable { .. } => "drop_table",
            StepOp::AlterColumnType { .. } => "alter_column_type",
        }
    }
}
