//! `plan` is the one subcommand exercisable without a running Postgres
//! instance — the others all need `DATABASE_URL`, so they're left to
//! `migrate-persistence`'s integration tests.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn write_plan_input(path: &Path, title: &str) {
    let body = format!(
        r#"{{
  "plan_id": null,
  "title": "{title}",
  "reason": "add an index for the new lookup path",
  "mode": "ci",
  "policy": null,
  "waves": [
    {{
      "name": "expand",
      "limits": null,
      "steps": [
        {{
          "op": "add_index_concurrently",
          "table": "orders",
          "cols": ["customer_id"],
          "name": "orders_customer_id_idx",
          "where": null,
          "unique": false
        }}
      ]
    }}
  ]
}}"#
    );
    fs::write(path, body).expect("write plan input fixture");
}

#[test]
fn plan_accepts_a_valid_single_wave_input() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("plan.json");
    write_plan_input(&input_path, "add customer lookup index");

    Command::cargo_bin("migrate")
        .expect("binary builds")
        .arg("plan")
        .arg(&input_path)
        .assert()
        .success()
        .stdout(contains("\"title\": \"add customer lookup index\""))
        .stdout(contains("\"max_hazard_class\""));
}

#[test]
fn plan_rejects_two_steps_with_an_identical_fingerprint() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("plan.json");
    let body = r#"{
  "plan_id": null,
  "title": "duplicate step",
  "reason": "exercises the rejection path",
  "mode": "ci",
  "policy": null,
  "waves": [
    {
      "name": "expand",
      "limits": null,
      "steps": [
        { "op": "add_comment", "target": "orders", "comment": "dup" },
        { "op": "add_comment", "target": "orders", "comment": "dup" }
      ]
    }
  ]
}"#;
    fs::write(&input_path, body).expect("write plan input fixture");

    Command::cargo_bin("migrate")
        .expect("binary builds")
        .arg("plan")
        .arg(&input_path)
        .assert()
        .code(2)
        .stderr(contains("DuplicateStep"));
}

#[test]
fn plan_rejects_a_malformed_input_file() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("plan.json");
    fs::write(&input_path, "not json").expect("write fixture");

    Command::cargo_bin("migrate")
        .expect("binary builds")
        .arg("plan")
        .arg(&input_path)
        .assert()
        .code(2)
        .stderr(contains("parsing"));
}
