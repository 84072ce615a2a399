use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

/// Time the installed binary gets to answer `--version`.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `<binary> --version` and return the first line it printed.
pub fn version_check(binary_path: &Path, timeout: Duration) -> Result<String, String> {
    let mut child = Command::new(binary_path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to run: {e}"))?;

    // Stdout is drained while the child runs.
    let reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            out.read_to_end(&mut buf).map(|_| buf)
        })
    });

    let status = match child
        .wait_timeout(timeout)
        .map_err(|e| format!("failed to wait for process: {e}"))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("no response within {timeout:?}"));
        }
    };

    if !status.success() {
        return Err(format!("--version exited with {status}"));
    }

    let stdout = match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| "output reader panicked".to_string())?
            .map_err(|e| format!("failed to read output: {e}"))?,
        None => Vec::new(),
    };
    let stdout = String::from_utf8_lossy(&stdout);

    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}
