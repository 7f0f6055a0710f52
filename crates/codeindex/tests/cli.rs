//! CLI integration tests driving the `codeindex` binary against a small
//! fixture tree, in the teacher's `assert_cmd`/`predicates` style.

use assert_cmd::Command;
use predicates::prelude::*;

fn write_fixture(dir: &std::path::Path) {
    std::fs::write(dir.join("lib.rs"), "pub fn add(a: i32, b: i32) -> i32 {\n    helper(a, b)\n}\n\nfn helper(a: i32, b: i32) -> i32 {\n    a + b\n}\n").unwrap();
}

#[test]
fn index_reports_files_indexed() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let db = tmp.path().join("index.db");

    let mut cmd = Command::cargo_bin("codeindex").unwrap();
    cmd.arg("--root").arg(tmp.path()).arg("--db").arg(&db).arg("index");
    cmd.assert().success().stdout(predicate::str::contains("\"filesIndexed\": 1"));
}

#[test]
fn index_then_find_returns_the_symbol() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let db = tmp.path().join("index.db");

    Command::cargo_bin("codeindex")
        .unwrap()
        .arg("--root")
        .arg(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("index")
        .assert()
        .success();

    Command::cargo_bin("codeindex")
        .unwrap()
        .arg("--root")
        .arg(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("find")
        .arg("add")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"add\""));
}

#[test]
fn rebuild_drops_removed_files_from_the_index() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let db = tmp.path().join("index.db");

    Command::cargo_bin("codeindex")
        .unwrap()
        .arg("--root")
        .arg(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("index")
        .assert()
        .success();

    std::fs::remove_file(tmp.path().join("lib.rs")).unwrap();
    std::fs::write(tmp.path().join("other.rs"), "fn only() {}\n").unwrap();

    Command::cargo_bin("codeindex")
        .unwrap()
        .arg("--root")
        .arg(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("rebuild")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"filesIndexed\": 1"));

    Command::cargo_bin("codeindex")
        .unwrap()
        .arg("--root")
        .arg(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("find")
        .arg("add")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}
