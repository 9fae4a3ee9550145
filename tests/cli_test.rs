use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn orderflow() -> Command {
    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg("tests/fixtures/commands.csv")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.csv")
        .args(["--latency-ms", "0", "--success-rate", "1.0", "--seed", "1"]);
    cmd
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    orderflow()
        .assert()
        .success()
        .stdout(predicate::str::contains("order,user,status,total,refunded"))
        // Order 1 was paid, then cancelled by its owner
        .stdout(predicate::str::contains("1,1,CANCELLED,20,0"))
        // Order 2 was partially refunded by an admin
        .stdout(predicate::str::contains("2,2,REFUNDED,20,5"))
        .stdout(predicate::str::contains("product,name,price,stock"))
        .stdout(predicate::str::contains("1,Apple,10,4"))
        .stdout(predicate::str::contains("2,Pear,2.5,6"))
        .stdout(predicate::str::contains("3,1,").not());

    Ok(())
}

#[test]
fn test_cli_logs_rejected_commands() {
    orderflow()
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing command"))
        .stderr(predicate::str::contains("status=403"))
        .stderr(predicate::str::contains("Insufficient stock"));
}

#[test]
fn test_cli_json_report() -> Result<(), Box<dyn std::error::Error>> {
    let output = orderflow().args(["--format", "json"]).output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let orders = report["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["status"], "CANCELLED");
    assert_eq!(orders[1]["status"], "REFUNDED");
    assert_eq!(report["products"][1]["stock"], 6);

    Ok(())
}

#[test]
fn test_cli_declining_processor() {
    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg("tests/fixtures/commands.csv")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.csv")
        .env("ORDERFLOW_LATENCY_MS", "0")
        .env("ORDERFLOW_SUCCESS_RATE", "0");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,1,PAYMENT_FAILED,20,0"))
        .stdout(predicate::str::contains("1,Apple,10,5"))
        .stdout(predicate::str::contains("2,Pear,2.5,10"));
}

#[test]
fn test_cli_rejects_bad_success_rate() {
    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg("tests/fixtures/commands.csv")
        .args(["--latency-ms", "0", "--success-rate", "1.5"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("success rate must be between 0 and 1"));
}
