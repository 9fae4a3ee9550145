#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const HEADER: &str = "op, user, role, order, items, amount, method";

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut catalog = tempfile::NamedTempFile::new().unwrap();
    writeln!(catalog, "product, name, price, stock").unwrap();
    writeln!(catalog, "1, Apple, 10.00, 5").unwrap();

    // 1. First run: load the catalog and pay for an order
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "{HEADER}").unwrap();
    writeln!(csv1, "create, 1, , , 1:2, , card").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("orderflow"));
    cmd1.arg(csv1.path())
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["--latency-ms", "0", "--success-rate", "1"]);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,1,PAID,20,0"));
    assert!(stdout1.contains("1,Apple,10,3"));

    // 2. Second run: cancel the stored order and place a new one, no catalog
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "{HEADER}").unwrap();
    writeln!(csv2, "cancel, 1, , 1, , ,").unwrap();
    writeln!(csv2, "create, 1, , , 1:1, , card").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("orderflow"));
    cmd2.arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["--latency-ms", "0", "--success-rate", "1"]);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Cancel restored 2 units, the new order (next id) took 1: 3 + 2 - 1 = 4
    assert!(stdout2.contains("1,1,CANCELLED,20,0"));
    assert!(stdout2.contains("2,1,PAID,10,0"));
    assert!(stdout2.contains("1,Apple,10,4"));
}
