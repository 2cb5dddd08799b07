//! Diesel schema, hand-declared to match `migrations/`. Regenerate with
//! `diesel print-schema` if the migrations change.
//!
//! Tables:
//! - `ledger`: the idempotency boundary, one row per `step_sha`.
//! - `events`: append-only execution event stream, `(plan_id, seq)` keyed.
//! - `plans`: per-plan lifecycle state.

diesel::table! {
    ledger (step_sha) {
        step_sha -> Text,
        plan_id -> Text,
        wave_name -> Text,
        applied_at -> Timestamptz,
        applied_by -> Text,
        status -> Text,
        execution_time_ms -> Nullable<BigInt>,
        rows_affected -> Nullable<BigInt>,
        error_summary -> Nullable<Text>,
    }
}

diesel::table! {
    events (plan_id, seq) {
        plan_id -> Text,
        seq -> BigInt,
        ts -> Timestamptz,
        event_type -> Text,
        wave_name -> Nullable<Text>,
        step_sha -> Nullable<Text>,
        payload -> Jsonb,
    }
}

diesel::table! {
    plans (plan_id) {
        plan_id -> Text,
        state -> Text,
        annotated_at -> Timestamptz,
        started_at -> Nullable<Timestamptz>,
        terminated_at -> Nullable<Timestamptz>,
        terminal_state -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(ledger, events, plans,);
