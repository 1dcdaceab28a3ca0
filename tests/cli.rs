use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn reader(dir: &tempfile::TempDir) -> Command {
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "content:\n  asset_root: {}\nstorage:\n  path: {}\n",
            dir.path().join("assets").display(),
            dir.path().join("state.db").display()
        ),
    )
    .unwrap();
    let mut cmd = Command::cargo_bin("vita-reader").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn prints_version() {
    Command::cargo_bin("vita-reader")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("vita-reader")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vita-reader"))
        .stdout(predicate::str::contains("--list"));
}

#[test]
fn rejects_unknown_argument() {
    Command::cargo_bin("vita-reader")
        .unwrap()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument --bogus"));
}

#[test]
fn lists_bundled_posts() {
    let dir = tempdir().unwrap();
    reader(&dir)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Social Impact] Empowering Her Future"))
        .stdout(predicate::str::contains("[Education] Every Child a Reader"))
        .stdout(predicate::str::contains("Archives"))
        .stdout(predicate::str::contains("Environment & Climate"));
}

#[test]
fn lists_posts_from_file_with_duplicate_ids() {
    let dir = tempdir().unwrap();
    let posts = dir.path().join("posts.yaml");
    fs::write(
        &posts,
        "- id: x\n  title: First X\n  category: Health\n\
         - id: x\n  title: Second X\n  category: Education\n\
         - id: y\n  title: Later Health\n  category: Health\n",
    )
    .unwrap();
    reader(&dir)
        .arg("--list")
        .arg("--posts")
        .arg(&posts)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Health] First X"))
        .stdout(predicate::str::contains("Second X").not())
        .stdout(predicate::str::contains("Later Health"));
}

#[test]
fn missing_posts_file_fails() {
    let dir = tempdir().unwrap();
    reader(&dir)
        .arg("--list")
        .arg("--posts")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}
