use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("servoscale.toml");
    fs::write(&path, format!("[pins]\npulse_in = 4\npulse_out = 3\n{extra}")).unwrap();
    path
}

fn json_cmd(cfg: &PathBuf, widths: &str) -> Command {
    let mut cmd = Command::cargo_bin("servoscale").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("SERVOSCALE_SIM_WIDTHS", widths)
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg);
    cmd
}

/// The last stdout line that parses as a JSON object.
fn last_json(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .rev()
        .find_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .unwrap_or_else(|| panic!("no JSON line on stdout: {text}"))
}

/// A calibrated run that then drives forward reports its summary as one JSON line.
#[rstest]
fn run_summary_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = json_cmd(&cfg, "1500x20,1900x5")
        .arg("run")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = last_json(&out);

    assert_eq!(v["stopped_by"], "IterationLimit");
    assert_eq!(v["final_state"], "forward");
    assert_eq!(v["offset_us"], 0);
    assert_eq!(v["iterations"], 25);
    // Calibrating -> Idle, Idle -> Forward
    assert_eq!(v["transitions"], 2);
    for key in ["missed_frames", "min_period_us", "mean_period_us", "max_period_us"] {
        assert!(v[key].is_u64(), "{key} should be an unsigned integer");
    }
    assert_eq!(v["min_period_us"], 20_000);
}

/// Signal loss is reported on stdout as a structured error with its own exit code.
#[rstest]
fn signal_lost_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[timeouts]\nsignal_lost_ms = 40\n");

    let out = json_cmd(&cfg, "1500x2")
        .arg("run")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let v = last_json(&out);

    assert_eq!(v["reason"], "SignalLost");
    assert_eq!(v["exit_code"], 3);
    assert_eq!(v["details"]["waited_ms"], 40);
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}

#[rstest]
fn config_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[runner]\nframe_hz = 0\n");

    let out = json_cmd(&cfg, "1500")
        .arg("health")
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let v = last_json(&out);

    assert_eq!(v["reason"], "Config");
    assert!(v.get("details").is_none());
    assert!(v["message"].as_str().unwrap().contains("runner.frame_hz"));
}

#[rstest]
#[case(&["health"], "status", "ok")]
#[case(&["self-check"], "status", "ok")]
#[case(&["passthrough", "--mode", "pulse"], "mode", "Pulse")]
fn auxiliary_commands_report_json(#[case] args: &[&str], #[case] key: &str, #[case] value: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = json_cmd(&cfg, "1500x3");
    for a in args {
        cmd.arg(a);
    }
    let out = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(last_json(&out)[key], value);
}
