//! Declarative proof obligations. Predicates stay a small closed enum here
//! and are only ever rendered to SQL at the database-driver boundary
//! (`migrate-exec`'s `DatabaseDriver`), never mixed with user-supplied SQL
//! at this layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    TableExists(String),
    ColumnExists(String, String),
    IndexExists(String),
    ConstraintExists(String),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligations {
    pub prechecks: Vec<Predicate>,
    pub postchecks: Vec<Predicate>,
    pub max_lock_ms: u64,
    pub max_stmt_ms: u64,
}
