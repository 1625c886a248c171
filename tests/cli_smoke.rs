use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn rtsync(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rtsync").expect("binary");
    cmd.current_dir(dir.path())
        .env_remove("RTSYNC_CONFIG")
        .env_remove("RTSYNC_SERVER")
        .env_remove("RTSYNC_USER")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn rtsync_help_works() {
    let dir = TempDir::new().expect("tempdir");
    rtsync(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ticket mirror and link synchronizer"));
}

#[test]
fn subcommand_help_works() {
    let dir = TempDir::new().expect("tempdir");
    let subcommands: [&[&str]; 14] = [
        &["show"],
        &["search"],
        &["queues"],
        &["create"],
        &["comment"],
        &["edit"],
        &["resolve"],
        &["history"],
        &["links"],
        &["link", "attach"],
        &["link", "detach"],
        &["pull"],
        &["names", "refresh"],
        &["names", "get"],
    ];

    for cmd in subcommands {
        rtsync(&dir).args(cmd).arg("--help").assert().success();
    }
}

#[test]
fn self_link_exits_with_user_error() {
    let dir = TempDir::new().expect("tempdir");
    rtsync(&dir)
        .args([
            "link", "attach", "--parent", "10", "--child", "10", "--kind", "member", "--server",
            "http://127.0.0.1:9",
        ])
        .assert()
        .code(2)
        .stderr(contains("itself"));
}

#[test]
fn unknown_kind_is_rejected_by_parser() {
    let dir = TempDir::new().expect("tempdir");
    rtsync(&dir)
        .args(["link", "detach", "--parent", "1", "--child", "2", "--kind", "blocks"])
        .assert()
        .code(2);
}

#[test]
fn missing_server_reports_json_error() {
    let dir = TempDir::new().expect("tempdir");
    rtsync(&dir)
        .args(["--json", "show", "42"])
        .assert()
        .code(2)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("\"command\": \"show\""));
}

#[test]
fn unreachable_server_is_operation_failure() {
    let dir = TempDir::new().expect("tempdir");
    rtsync(&dir)
        .args(["show", "42", "--server", "http://127.0.0.1:9"])
        .assert()
        .code(4);
}

#[test]
fn names_get_reads_persisted_table() {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join(".rtsync");
    fs::create_dir_all(&state).expect("state dir");
    fs::write(
        state.join("mirror.json"),
        r#"{"entries": {}, "names": {"5": "Printer on fire"}}"#,
    )
    .expect("mirror");

    rtsync(&dir)
        .args(["names", "get", "5"])
        .assert()
        .success()
        .stdout(contains("#5 Printer on fire"));

    rtsync(&dir).args(["names", "get", "6"]).assert().code(2);
}
