use std::path::PathBuf;
use std::process::{Command, Output};

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("config")
}

fn run_server(server_config: PathBuf, agent_config: PathBuf, api_key: Option<&str>) -> Output {
    // Run from an empty directory so no stray .env file is picked up.
    let workdir = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wiki-agent"));
    cmd.current_dir(workdir.path())
        .arg("--server-config")
        .arg(server_config)
        .arg("--agent-config")
        .arg(agent_config)
        .arg("--port")
        .arg("0")
        .env("RUST_LOG", "info")
        .env_remove("GOOGLE_API_KEY");
    for idx in 2..=10 {
        cmd.env_remove(format!("GOOGLE_API_KEY_{}", idx));
    }
    if let Some(key) = api_key {
        cmd.env("GOOGLE_API_KEY", key);
    }
    cmd.output().unwrap()
}

#[test]
fn missing_api_key_exits_with_code_one() {
    let dir = config_dir();
    let output = run_server(dir.join("server.toml"), dir.join("agent.toml"), None);

    assert_eq!(output.status.code(), Some(1));
    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("GOOGLE_API_KEY environment variable not set."), "{logs}");
}

#[test]
fn broken_agent_config_exits_before_serving() {
    let dir = config_dir();
    let scratch = tempfile::tempdir().unwrap();
    let agent_config = scratch.path().join("agent.toml");
    let raw = std::fs::read_to_string(dir.join("agent.toml")).unwrap();
    std::fs::write(&agent_config, raw.replace("error_message", "error_text")).unwrap();

    let output = run_server(dir.join("server.toml"), agent_config, Some("test-key"));

    assert_eq!(output.status.code(), Some(1));
    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("An error occurred during server startup"), "{logs}");
}
