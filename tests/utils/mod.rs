use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built binary with the environment's settings file.
pub fn run_vspeed(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    run_vspeed_with_env(env, args, &[])
}

pub fn run_vspeed_with_env(
    env: &TestEnvironment,
    args: &[&str],
    vars: &[(&str, &str)],
) -> Result<CommandOutput> {
    let settings = env.settings_path();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vspeed"));
    cmd.arg("--no-color")
        .arg("--settings")
        .arg(&settings)
        .args(args)
        .current_dir(env.path())
        .env_remove("FAKE_FFMPEG_FAIL");
    for (key, value) in vars {
        cmd.env(key, value);
    }

    let output = cmd.output()?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
