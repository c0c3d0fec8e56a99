//! Process execution and executable lookup
//!
//! Strategies talk to the host only through [`CommandRunner`], so tests can
//! replay recorded tool output without spawning anything.

use std::env;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::ProbeError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Host facilities used by the platform strategies.
pub trait CommandRunner {
    /// Resolve `program` on the search path.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Run `program` with an argument vector (no shell), optionally feeding `input` on stdin.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CommandOutput, ProbeError>;
}

/// Fail with `ToolNotFound` for the first tool that is not on the search path.
///
/// Nothing is spawned here; a tool that passes may still vanish before it runs.
pub fn ensure_tools(runner: &dyn CommandRunner, tools: &[&str]) -> Result<(), ProbeError> {
    for tool in tools {
        match runner.resolve(tool) {
            Some(path) => debug!(tool, path = %path.display(), "tool resolved"),
            None => return Err(ProbeError::ToolNotFound((*tool).to_string())),
        }
    }
    Ok(())
}

/// Run a command that must succeed and return its trimmed stdout.
pub fn capture(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<String, ProbeError> {
    let output = runner.run(program, args, None)?;
    if !output.success() {
        return Err(ProbeError::CommandExecution {
            command: command_line(program, args),
            status: output.status,
        });
    }
    Ok(output.stdout.trim().to_string())
}

/// Human-readable command line used in logs and errors.
pub fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs real processes, bounding each one by an optional timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// `None` waits on each process indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Timeout in whole seconds; `0` disables it.
    pub fn with_timeout_secs(seconds: u64) -> Self {
        Self::new((seconds > 0).then(|| Duration::from_secs(seconds)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::with_timeout_secs(30)
    }
}

impl CommandRunner for SystemRunner {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }

    fn run(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CommandOutput, ProbeError> {
        let label = command_line(program, args);
        debug!(command = %label, "running");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::CommandSpawn {
                command: label.clone(),
                source,
            })?;

        // Feed stdin from its own thread so a full stdout pipe cannot deadlock us.
        let stdin_handle = match (input, child.stdin.take()) {
            (Some(text), Some(mut stdin)) => {
                let text = text.to_owned();
                Some(thread::spawn(move || {
                    let _ = stdin.write_all(text.as_bytes());
                }))
            }
            _ => None,
        };
        let stdout_handle = child.stdout.take().map(drain);
        let stderr_handle = child.stderr.take().map(drain);

        // On timeout the pipe threads are left detached: a grandchild of the killed
        // tool may still hold the pipes open.
        let status = wait_for(&mut child, self.timeout, &label)?;

        if let Some(handle) = stdin_handle {
            let _ = handle.join();
        }
        let stdout = collect(stdout_handle);
        let stderr = collect(stderr_handle);

        debug!(command = %label, status = ?status.code(), "finished");
        if !status.success() && !stderr.trim().is_empty() {
            debug!(command = %label, stderr = %stderr.trim(), "stderr");
        }

        Ok(CommandOutput {
            status: status.code(),
            stdout,
            stderr,
        })
    }
}

fn drain<S: Read + Send + 'static>(mut stream: S) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn wait_for(
    child: &mut Child,
    timeout: Option<Duration>,
    label: &str,
) -> Result<ExitStatus, ProbeError> {
    let io_error = |source: std::io::Error| ProbeError::CommandSpawn {
        command: label.to_string(),
        source,
    };

    let Some(timeout) = timeout else {
        return child.wait().map_err(io_error);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            return Ok(status);
        }

        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProbeError::CommandTimedOut {
                command: label.to_string(),
                timeout,
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Look `program` up on `PATH` without spawning anything.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    find_executable_in(program, &path_var)
}

/// Look `program` up in an explicit `PATH`-style list.
pub fn find_executable_in(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidate_names(program).map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidate_names(program: &str) -> impl Iterator<Item = String> + '_ {
    let extensions = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    std::iter::once(program.to_string()).chain(
        extensions
            .split(';')
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!("{program}{}", ext.to_ascii_lowercase()))
            .collect::<Vec<_>>(),
    )
}

#[cfg(not(windows))]
fn candidate_names(program: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(program.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
