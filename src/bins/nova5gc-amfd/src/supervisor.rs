//! Out-of-process supervisor entry
//!
//! Runs the AMF daemon as a child process with its output relayed through
//! this process's logger. Kept apart from the in-process path: the core is
//! always invokable directly, the supervisor is opt-in.

use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Build the child argument list, forwarding only the config options that
/// were actually set.
pub fn filter_args(shared_config: Option<&str>, config: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = shared_config {
        args.push("--shared-config".to_string());
        args.push(path.to_string());
    }
    if let Some(path) = config {
        args.push("--config".to_string());
        args.push(path.to_string());
    }
    args
}

/// Spawn the AMF binary as a child and wait for it to exit. Stdout and
/// stderr are piped and relayed line by line; the relays and the wait run
/// as three tasks joined before returning.
pub async fn exec(
    program: &str,
    shared_config: Option<&str>,
    config: Option<&str>,
) -> Result<ExitStatus> {
    let args = filter_args(shared_config, config);
    log::info!("Supervising {program} {}", args.join(" "));

    let mut child = Command::new(program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start child process '{program}'"))?;

    let stdout = child
        .stdout
        .take()
        .context("Failed to acquire child stdout pipe")?;
    let stderr = child
        .stderr
        .take()
        .context("Failed to acquire child stderr pipe")?;

    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::info!("[amfd] {line}");
        }
    });

    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::warn!("[amfd] {line}");
        }
    });

    let wait_task = tokio::spawn(async move { child.wait().await });

    let (stdout_res, stderr_res, wait_res) = tokio::join!(stdout_task, stderr_task, wait_task);
    if let Err(e) = stdout_res {
        log::warn!("Child stdout relay task failed: {e}");
    }
    if let Err(e) = stderr_res {
        log::warn!("Child stderr relay task failed: {e}");
    }

    let status = wait_res
        .context("Child wait task failed")?
        .context("Failed to wait for child process")?;
    log::info!("Child process exited with {status}");
    Ok(status)
}
