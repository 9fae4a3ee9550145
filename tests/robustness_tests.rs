mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{CATALOG_HEADER, COMMAND_HEADER, write_csv};
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

fn run(catalog: &[&[&str]], commands: &[&[&str]]) -> assert_cmd::assert::Assert {
    let dir = tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.csv");
    let commands_path = dir.path().join("commands.csv");
    write_csv(&catalog_path, CATALOG_HEADER, catalog).unwrap();
    write_csv(&commands_path, COMMAND_HEADER, commands).unwrap();

    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg(&commands_path)
        .arg("--catalog")
        .arg(&catalog_path)
        .args(["--latency-ms", "0", "--success-rate", "1"]);
    cmd.assert()
}

#[test]
fn test_malformed_command_rows_are_skipped() {
    run(
        &[&["1", "Apple", "10", "5"]],
        &[
            // Valid order
            &["create", "1", "", "", "1:1", "", "card"],
            // Unknown operation
            &["explode", "1", "", "", "", "", ""],
            // Cancel without an order id
            &["cancel", "1", "", "", "", "", ""],
            // Malformed item list
            &["create", "1", "", "", "1x1", "", "card"],
            // Text in amount field
            &["refund", "1", "admin", "1", "", "lots", ""],
            // Valid order again
            &["create", "1", "", "", "1:2", "", "card"],
        ],
    )
    .success()
    .stderr(predicate::str::contains("Error reading command"))
    .stdout(predicate::str::contains("1,1,PAID,10,0"))
    .stdout(predicate::str::contains("2,1,PAID,20,0"))
    .stdout(predicate::str::contains("1,Apple,10,2"));
}

#[test]
fn test_unauthenticated_and_unknown_role_rows() {
    run(
        &[&["1", "Apple", "10", "5"]],
        &[
            // No user at all
            &["create", "", "", "", "1:1", "", "card"],
            // Role outside the known set
            &["create", "1", "root", "", "1:1", "", "card"],
            &["create", "2", "support", "", "1:1", "", "card"],
        ],
    )
    .success()
    .stderr(predicate::str::contains("status=401"))
    .stderr(predicate::str::contains("Error reading command"))
    .stdout(predicate::str::contains("1,2,PAID,10,0"))
    .stdout(predicate::str::contains("1,Apple,10,4"));
}

#[test]
fn test_bad_catalog_rows_are_skipped() {
    run(
        &[
            &["1", "Apple", "10", "5"],
            &["2", "Free", "0", "5"],
            &["3", "Broken", "abc", "5"],
        ],
        &[&["create", "1", "", "", "2:1", "", "card"]],
    )
    .success()
    .stderr(predicate::str::contains("Error reading product"))
    .stderr(predicate::str::contains("Product with id 2 not found"))
    .stdout(predicate::str::contains("1,Apple,10,5"))
    .stdout(predicate::str::contains("2,Free").not());
}

#[test]
fn test_order_total_too_large_is_rejected() {
    run(
        &[
            &["1", "Apple", "10", "5"],
            &["2", "Big", "50000000000000000000000000000.5", "5"],
        ],
        &[
            &["create", "1", "", "", "2:2", "", "card"],
            &["create", "1", "", "", "1:1", "", "card"],
        ],
    )
    .success()
    .stderr(predicate::str::contains("status=400"))
    .stderr(predicate::str::contains("is too large"))
    .stdout(predicate::str::contains("2,1,PAID,10,0"))
    .stdout(predicate::str::contains("1,Apple,10,4"));
}
