use std::path::PathBuf;

use assert_cmd::Command;

fn sample_csv() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/sample.csv")
}

fn bookrev() -> Command {
    let mut cmd = Command::cargo_bin("bookrev").unwrap();
    // Keep the workspace config out of these runs.
    cmd.env("BOOKREV_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("BOOKREV_ENV", "local")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = bookrev().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "import", "export"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn import_reports_created_records() {
    let output = bookrev()
        .arg("import")
        .arg("--csv")
        .arg(sample_csv())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Publisher: 3 created"));
    assert!(stdout.contains("Book: 4 created"));
}

#[test]
fn import_of_missing_file_fails() {
    bookrev()
        .arg("import")
        .arg("--csv")
        .arg("does/not/exist.csv")
        .assert()
        .failure();
}

#[test]
fn export_writes_reimportable_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("export.csv");

    let output = bookrev()
        .arg("export")
        .arg("--csv")
        .arg(sample_csv())
        .arg("--out")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // 3 publishers, 4 books, 6 contributors, 6 credits, 4 reviews.
    assert!(stdout.contains("exported 23 records"), "{stdout}");

    let output = bookrev()
        .arg("import")
        .arg("--csv")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Review: 4 created"));
}
