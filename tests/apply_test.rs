#![cfg(unix)]

mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use std::fs;

const CONFIG: &str = r#"{
    "part": [
        {"timestamp": "00:05 - 00:15", "speed": 1.5, "comment": "intro"},
        {"timestamp": "00:00:17.5 - 00:00:19", "speed": 4}
    ]
}"#;

#[test]
fn apply_renders_full_mode_in_one_pass() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let output = utils::run_vspeed(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 0, "apply failed: {}", output.stderr);

    let rendered = env.path().join("lecture_speed.mp4");
    assert_eq!(fs::read_to_string(&rendered)?, "fake media");
    assert!(output.stdout.contains("lecture_speed.mp4"));

    let calls = env.ffmpeg_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("-filter_complex"));
    assert!(calls[0].contains("concat=n=5:v=1:a=1"));
    assert!(calls[0].contains("atempo=2.0,atempo=2.0"));
    assert!(env.files_with_prefix(".vspeed-").is_empty());
    Ok(())
}

#[test]
fn apply_accepts_inline_config_and_multi_pass() -> Result<()> {
    let env = TestEnvironment::new()?;
    let target = env.path().join("out/cut.mkv");

    let output = utils::run_vspeed(
        &env,
        &[
            "--output",
            "json",
            "apply",
            env.input_path().to_str().unwrap(),
            r#"{"part": [{"timestamp": "0:02 - 0:04", "speed": 2}, {"timestamp": "0:10 - 0:12"}]}"#,
            target.to_str().unwrap(),
            "--mode",
            "cut",
            "--strategy",
            "multi-pass",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "apply failed: {}", output.stderr);
    assert!(target.exists());

    // extract + retime for the 2x part, extract only for the 1x part, concat
    let calls = env.ffmpeg_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].contains("-ss 2.000000"));
    assert!(calls[1].contains("setpts=0.5*PTS"));
    assert!(calls[2].contains("-ss 10.000000"));
    assert!(calls[3].contains("-f concat"));

    let success = output
        .stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["code"] == "speed.apply.success")
        .expect("success event");
    assert_eq!(success["data"]["segments"], 2);
    assert_eq!(success["data"]["strategy"], "multi-pass");

    let work = env.path().join("work");
    assert_eq!(fs::read_dir(&work)?.count(), 0);
    Ok(())
}

#[test]
fn dry_run_prints_commands_only() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let output = utils::run_vspeed(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
            "--dry-run",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "dry run failed: {}", output.stderr);
    assert!(output.stdout.contains("-filter_complex"));
    assert!(env.ffmpeg_calls().is_empty());
    assert!(!env.path().join("lecture_speed.mp4").exists());
    Ok(())
}

#[test]
fn zero_length_segment_fails_validation_without_ffmpeg() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config(
        "speeds.json",
        r#"{"part": [{"timestamp": "00:10 - 00:10", "speed": 2.0}]}"#,
    )?;

    let output = utils::run_vspeed(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 2);
    assert!(output.stdout.contains("segment #0"), "{}", output.stdout);
    assert!(env.ffmpeg_calls().is_empty());
    Ok(())
}

#[test]
fn malformed_config_is_a_validation_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", r#"{"part": [{"timestamp": "00:10"}]}"#)?;

    let output = utils::run_vspeed(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 2);
    assert!(env.ffmpeg_calls().is_empty());
    Ok(())
}

#[test]
fn ffmpeg_failure_leaves_no_output() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let output = utils::run_vspeed_with_env(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
        ],
        &[("FAKE_FFMPEG_FAIL", "1")],
    )?;
    assert_eq!(output.exit_code, 4);
    assert!(output.stdout.contains("exit code 1"), "{}", output.stdout);
    assert!(!env.path().join("lecture_speed.mp4").exists());
    assert!(env.files_with_prefix(".vspeed-").is_empty());
    Ok(())
}

#[test]
fn probe_failure_exits_with_probe_code() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let output = utils::run_vspeed_with_env(
        &env,
        &[
            "apply",
            env.input_path().to_str().unwrap(),
            config.to_str().unwrap(),
        ],
        &[("FAKE_DURATION", "N/A")],
    )?;
    assert_eq!(output.exit_code, 3, "{}", output.stderr);
    assert!(env.ffmpeg_calls().is_empty());
    Ok(())
}

#[test]
fn rerun_overwrites_previous_output() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;
    let rendered = env.path().join("lecture_speed.mp4");
    fs::write(&rendered, "previous")?;

    let input = env.input_path();
    let args = ["apply", input.to_str().unwrap(), config.to_str().unwrap()];
    let first = utils::run_vspeed(&env, &args)?;
    assert_eq!(first.exit_code, 0, "{}", first.stderr);
    let after_first = fs::read_to_string(&rendered)?;
    assert_eq!(after_first, "fake media");

    let second = utils::run_vspeed(&env, &args)?;
    assert_eq!(second.exit_code, 0, "{}", second.stderr);
    assert_eq!(fs::read_to_string(&rendered)?, after_first);
    assert_eq!(env.ffmpeg_calls().len(), 2);
    assert!(env.files_with_prefix(".vspeed-").is_empty());
    Ok(())
}

#[test]
fn output_over_source_is_refused() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let input = env.input_path();
    let output = utils::run_vspeed(
        &env,
        &[
            "apply",
            input.to_str().unwrap(),
            config.to_str().unwrap(),
            input.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 1, "{}", output.stderr);
    assert!(output.stdout.contains("overwrite the source"));
    assert!(env.ffmpeg_calls().is_empty());
    Ok(())
}

#[test]
fn check_lists_planned_segments() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config("speeds.json", CONFIG)?;

    let output = utils::run_vspeed(
        &env,
        &["check", config.to_str().unwrap(), "--duration", "30"],
    )?;
    assert_eq!(output.exit_code, 0, "{}", output.stderr);
    assert!(output.stdout.contains("Config is valid: 5 segment(s)"));
    assert!(output.stdout.contains("# intro"));
    assert!(output.stdout.contains("[atempo=2.0,atempo=2.0]"));
    assert!(env.ffmpeg_calls().is_empty());
    Ok(())
}
