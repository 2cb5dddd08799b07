//! Maps a step's operation to a `(HazardClass, LockClass)` pair. The match
//! below is exhaustive over [`StepOp`]; adding a variant without updating it
//! is a compile error, not a silent default.

use crate::model::{HazardClass, LockClass, StepOp};

pub fn classify(op: &StepOp) -> (HazardClass, LockClass) {
    use HazardClass::*;
    use LockClass::*;

    match op {
        StepOp::CreateView { .. } | StepOp::AddComment { .. } => (H0, AccessShare),

        StepOp::CreateTable { .. } => (H1, AccessExclusive),

        StepOp::AddColumn { nullable, .. } => {
            if *nullable {
                (H1, ShareUpdateExclusive)
            } else {
                (H3, AccessExclusive)
            }
        }

        StepOp::AddIndexConcurrently { .. } => (H1, ShareUpdateExclusive),
        StepOp::AddIndexBlocking { .. } => (H3, Share),
        StepOp::AddForeignKeyNotValid { .. } => (H1, ShareRowExclusive),
        StepOp::ValidateConstraint { .. } => (H3, ShareUpdateExclusive),
        StepOp::BackfillSql { .. } => (H2, RowExclusive),
        StepOp::SetNotNull { .. } => (H3, AccessExclusive),
        StepOp::DropColumn { .. } | StepOp::DropTable { .. } | StepOp::AlterColumnType { .. } => {
            (H3, AccessExclusive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_add_column_is_h1() {
        let op = StepOp::AddColumn {
            table: "t".into(),
            name: "c".into(),
            type_: "int".into(),
            nullable: true,
            default: None,
        };
        assert_eq!(classify(&op), (HazardClass::H1, LockClass::ShareUpdateExclusive));
    }

    #[test]
    fn non_null_add_column_is_h3() {
        let op = StepOp::AddColumn {
            table: "t".into(),
            name: "c".into(),
            type_: "int".into(),
            nullable: false,
            default: None,
        };
        assert_eq!(classify(&op), (HazardClass::H3, LockClass::AccessExclusive));
    }

    #[test]
    fn blocking_index_is_h3_share() {
        let op = StepOp::AddIndexBlocking { table: "t".into(), cols: vec!["a".into()], name: None, unique: false };
        assert_eq!(classify(&op), (HazardClass::H3, LockClass::Share));
    }

    #[test]
    fn concurrent_index_is_h1() {
        let op = StepOp::AddIndexConcurrently {
            table: "t".into(),
            cols: vec!["a".into()],
            name: None,
            where_: None,
            unique: false,
        };
        assert_eq!(classify(&op), (HazardClass::H1, LockClass::ShareUpdateExclusive));
    }

    #[test]
    fn drop_table_is_h3() {
        let op = StepOp::DropTable { table: "t".into() };
        assert_eq!(classify(&op), (HazardClass::H3, LockClass::AccessExclusive));
    }

    #[test]
    fn backfill_is_h2() {
        let op = StepOp::BackfillSql { sql: "update t set x=1".into(), rows_per_second: None, max_lock_ms: None };
        assert_eq!(classify(&op), (HazardClass::H2, LockClass::RowExclusive));
    }
}
