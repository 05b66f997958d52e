use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TAX_ID: &str = "0105536000313";

fn taxbox(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("taxbox").expect("bin");
    cmd.env("TAXBOX_DATA_DIR", data_dir)
        .env_remove("TAXBOX_USER")
        .env_remove("TAXBOX_ORG")
        .env_remove("RUST_LOG");
    cmd
}

/// A store with a default user, one organization and one VAT expense box with a tax invoice
fn seeded() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    taxbox(dir.path())
        .args(["init", "--email", "owner@example.com", "--name", "Owner"])
        .assert()
        .success();
    taxbox(dir.path())
        .args(["org", "create", "Siam Widgets", "--tax-id", TAX_ID])
        .assert()
        .success();
    taxbox(dir.path())
        .args([
            "box", "create", "Printer paper", "--amount", "1070", "--date", "2025-01-15", "--vat",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXP-202501-0001"));

    let receipt = dir.path().join("receipt.pdf");
    fs::write(&receipt, b"%PDF-1.4 test").expect("write receipt");
    taxbox(dir.path())
        .args(["doc", "attach", "EXP-202501-0001", "--type", "tax_invoice"])
        .arg(&receipt)
        .assert()
        .success();
    dir
}

fn json_of(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("json output")
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().expect("tempdir");
    taxbox(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("box"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn commands_need_a_user() {
    let dir = TempDir::new().expect("tempdir");
    taxbox(dir.path())
        .args(["org", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No acting user"));
}

#[test]
fn box_workflow_reports_success_objects() {
    let dir = seeded();

    let output = taxbox(dir.path())
        .args(["--json", "box", "submit", "EXP-202501-0001"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let result = json_of(&output.stdout);
    assert_eq!(result["success"], true);
    assert_eq!(result["data"]["status"], "PENDING");
    assert_eq!(result["data"]["vat_amount"], 7000);

    taxbox(dir.path())
        .args(["box", "complete", "EXP-202501-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"));

    taxbox(dir.path())
        .args(["box", "list", "--status", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer paper"));
}

#[test]
fn failures_are_reported_as_json() {
    let dir = seeded();

    let output = taxbox(dir.path())
        .args(["--json", "box", "show", "EXP-209912-0042"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let result = json_of(&output.stdout);
    assert_eq!(result["success"], false);
    assert!(result["error"]
        .as_str()
        .unwrap_or_default()
        .contains("not found"));
}

#[test]
fn invalid_transition_is_rejected() {
    let dir = seeded();
    taxbox(dir.path())
        .args(["box", "complete", "EXP-202501-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot move box"));
}

#[test]
fn payment_updates_status() {
    let dir = seeded();
    taxbox(dir.path())
        .args(["payment", "add", "EXP-202501-0001", "500", "--date", "2025-01-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Partial"));
}

#[test]
fn csv_export_is_written_to_directory() {
    let dir = seeded();
    let out = TempDir::new().expect("tempdir");

    taxbox(dir.path())
        .args(["export", "run", "--target", "generic", "--format", "csv", "--output"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 boxes"));

    let written: Vec<_> = fs::read_dir(out.path())
        .expect("read dir")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(name.starts_with(&format!("{}-generic-", TAX_ID)));
    assert!(name.ends_with(".csv"));

    let text = fs::read_to_string(&written[0]).expect("csv");
    assert!(text.starts_with('\u{feff}'));
    assert!(text.contains("EXP-202501-0001"));

    taxbox(dir.path())
        .args(["export", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains(name));
}

#[test]
fn audit_log_records_changes() {
    let dir = seeded();
    taxbox(dir.path())
        .args(["audit", "list", "--limit", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXP-202501-0001"));
}
