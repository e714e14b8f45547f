use std::path::PathBuf;
use std::process::Command;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vdp_cli_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_headless_run_writes_png_and_state() {
    let dir = scratch_dir("run");
    let png = dir.join("frame.png");
    let state = dir.join("state.json");

    let output = Command::new(env!("CARGO_BIN_EXE_vdp-headless"))
        .args(["--frames", "5", "--fast", "--mode", "8", "--pattern", "frame-stamp"])
        .args(["--key", "2:1C", "--send", "16 12 17 00 80 2A"])
        .arg("--config")
        .arg(dir.join("config.json"))
        .arg("--png")
        .arg(&png)
        .arg("--state")
        .arg(&state)
        .output()
        .expect("failed to run vdp-headless");
    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let bytes = std::fs::read(&png).expect("expected frame.png to be written");
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(state["vsync"], 5);
    assert_eq!(state["adapter"]["state"], "shut-down");
    assert_eq!(state["adapter"]["scancodes"], 2);
    assert_eq!(state["adapter"]["captures"], 5);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unknown_startup_mode_fails() {
    let dir = scratch_dir("bad_mode");
    let output = Command::new(env!("CARGO_BIN_EXE_vdp-headless"))
        .args(["--frames", "1", "--fast", "--mode", "99", "--quiet"])
        .arg("--config")
        .arg(dir.join("config.json"))
        .output()
        .expect("failed to run vdp-headless");
    assert!(!output.status.success());
    std::fs::remove_dir_all(&dir).unwrap();
}
