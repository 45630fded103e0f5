//! End-to-end tests of the `rollgate` binary.

use assert_cmd::Command;

fn rollgate() -> Command {
    let mut cmd = Command::cargo_bin("rollgate").unwrap();
    cmd.env_remove("ROLLGATE_CONFIG")
        .env_remove("KUDU_MASTERS")
        .env_remove("KUDU_HOME")
        .env_remove("MINOS_CONFIG_FILE")
        .env_remove("MINOS_CLIENT_DIR")
        .env_remove("MINOS2_CONFIG_FILE")
        .env_remove("MINOS2_CLIENT_DIR")
        .env("RUST_LOG", "warn");
    cmd
}

const BASE_ARGS: [&str; 10] = [
    "--cluster",
    "c3prc",
    "--masters",
    "m1:7051",
    "--deploy-client-dir",
    "/opt/minos",
    "--deploy-generation",
    "minos1.0",
    "--operation",
    "stop",
];

#[test]
fn plan_prints_deploy_commands() {
    let output = rollgate()
        .arg("plan")
        .args(BASE_ARGS)
        .args(["--tasks", "0..2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert!(stdout.contains("tasks:      0,1"));
    assert!(stdout.contains("/opt/minos/deploy stop kudu c3prc --job tablet_server --task 0 --skip_confirm"));
    assert!(stdout.contains("/opt/minos/deploy stop kudu c3prc --job tablet_server --task 1 --skip_confirm"));
}

#[test]
fn plan_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollgate.toml");
    std::fs::write(
        &path,
        r#"
cluster = "from-file"
masters = "m1:7051"
operation = "rolling_update"
tasks = [4, "6-7"]
deploy_client_dir = "/opt/minos2"
deploy_generation = "minos2.0"
"#,
    )
    .unwrap();

    let output = rollgate()
        .arg("plan")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert!(stdout.contains("tasks:      4,6,7"));
    assert!(stdout.contains(
        "/opt/minos2/deploy rolling_update kudu from-file --job tablet_server --task 6 --skip_confirm --update_package --confirm_install"
    ));
}

#[test]
fn invalid_task_fails_without_deploying() {
    rollgate()
        .arg("plan")
        .args(BASE_ARGS)
        .args(["--tasks", "0,x,2"])
        .assert()
        .failure();
}

#[test]
fn declined_prompt_aborts_run() {
    let assert = rollgate()
        .arg("run")
        .args(BASE_ARGS)
        .args(["--tasks", "0"])
        .write_stdin("n\n")
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Please confirm the cluster name: c3prc? (y/n)"));
}

#[cfg(unix)]
#[test]
fn run_stops_tasks_and_reports_stopped_nodes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let client = dir.path().join("client");
    std::fs::create_dir(&client).unwrap();

    let write_script = |path: &std::path::Path, body: &str| {
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    };

    let kudu = dir.path().join("kudu");
    write_script(
        &kudu,
        "#!/bin/sh\necho '{\"master_summaries\":[{\"address\":\"m1:7051\",\"health\":\"HEALTHY\"}],\"tserver_summaries\":[]}'\n",
    );
    write_script(
        &client.join("deploy"),
        "#!/bin/sh\necho \"Stop task $7 of tablet_server on host-$7.local(0) success\"\n",
    );

    let output = rollgate()
        .arg("run")
        .args(["--cluster", "c3prc", "--masters", "m1:7051", "--operation", "stop"])
        .args(["--tasks", "0,3"])
        .arg("--deploy-client-dir")
        .arg(&client)
        .args(["--deploy-generation", "minos1.0"])
        .arg("--kudu-bin")
        .arg(&kudu)
        .args(["--settle-interval", "0", "--yes", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["operation"], "stop");
    assert_eq!(summary["tasks"][0]["task"], 0);
    assert_eq!(summary["tasks"][0]["stopped_node"], "host-0.local");
    assert_eq!(summary["tasks"][1]["stopped_node"], "host-3.local");
    assert_eq!(
        summary["excluded"],
        serde_json::json!(["host-0.local", "host-3.local"])
    );
}
