//! External tool invocation.
//!
//! Every subprocess the core launches goes through [`run_tool`], which keeps
//! the calling worker responsive to pipeline cancellation.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::consts::{TOOL_POLL_INTERVAL_MS, TOOL_CHECK_TIMEOUT_MS};
use crate::error::{PhotonicError, Result};

/// Captured output of a finished tool.
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `program` with `args`, optionally feeding `stdin`, until it exits.
///
/// Polls the child every few milliseconds; if `cancel` fires the child is
/// killed and `Cancelled` is returned. A non-zero exit becomes `ToolFailed`
/// carrying the tool's stderr.
pub fn run_tool<S: AsRef<str>>(
    cancel: &CancelToken,
    program: &str,
    args: &[S],
    stdin: Option<Vec<u8>>,
) -> Result<ToolOutput> {
    cancel.check()?;
    let start = Instant::now();
    let arg_list: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    debug!(tool = program, args = ?arg_list, "spawning tool");

    let mut child = Command::new(program)
        .args(&arg_list)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PhotonicError::ToolFailed {
            tool: program.to_string(),
            message: format!("failed to start: {e}"),
        })?;

    let stdin_writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(thread::spawn(move || {
            // A tool that exits early closes the pipe; its exit status reports it.
            let _ = pipe.write_all(&bytes);
        })),
        _ => None,
    };
    let stdout_reader = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let status = wait_or_kill(cancel, program, &mut child)?;

    if let Some(handle) = stdin_writer {
        let _ = handle.join();
    }
    let stdout = stdout_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    let elapsed = start.elapsed();
    if !status.success() {
        let message = match status.code() {
            Some(code) => format!("exit code {code}: {}", stderr.trim()),
            None => format!("terminated by signal: {}", stderr.trim()),
        };
        return Err(PhotonicError::ToolFailed {
            tool: program.to_string(),
            message,
        });
    }

    debug!(tool = program, elapsed_ms = elapsed.as_millis() as u64, "tool finished");
    Ok(ToolOutput {
        stdout,
        stderr,
        elapsed,
    })
}

fn wait_or_kill(cancel: &CancelToken, program: &str, child: &mut Child) -> Result<ExitStatus> {
    let poll = Duration::from_millis(TOOL_POLL_INTERVAL_MS);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            warn!(tool = program, "cancelling running tool");
            let _ = child.kill();
            let _ = child.wait();
            return Err(PhotonicError::Cancelled);
        }
        thread::sleep(poll);
    }
}

/// Whether `program` can be launched at all.
///
/// The first call per program runs [`check_tool`]; the answer is cached for
/// the life of the process.
pub fn tool_available(program: &str) -> bool {
    static CHECKED: OnceLock<Mutex<HashMap<String, bool>>> = OnceLock::new();
    let cache = CHECKED.get_or_init(|| Mutex::new(HashMap::new()));
    let lock = || match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(&known) = lock().get(program) {
        return known;
    }
    let available = check_tool(program, Duration::from_millis(TOOL_CHECK_TIMEOUT_MS));
    lock().insert(program.to_string(), available);
    available
}

/// Run `program --version` for at most `timeout`.
///
/// Only a missing binary or a check that never finishes counts as
/// unavailable, since several tools exit non-zero on `--version`.
pub fn check_tool(program: &str, timeout: Duration) -> bool {
    let spawned = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
        Err(e) => {
            debug!(tool = program, error = %e, "tool check failed");
            return false;
        }
    };

    let deadline = Instant::now() + timeout;
    let poll = Duration::from_millis(TOOL_POLL_INTERVAL_MS);
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => thread::sleep(poll),
            Ok(None) => {
                warn!(tool = program, timeout_ms = timeout.as_millis() as u64, "tool check timed out");
                let _ = child.kill();
                let _ = child.wait();
                return false;
            }
            Err(e) => {
                debug!(tool = program, error = %e, "tool check failed");
                return false;
            }
        }
    }
}
