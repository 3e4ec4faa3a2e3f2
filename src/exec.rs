use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// How many trailing stderr lines of a failed tool ride along in the error. The
/// interesting part of a long tool transcript is almost always the end.
const ERROR_TAIL_LINES: usize = 15;

/// Represents different external tool failure possibilities, shared by every engine
/// that shells out.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ExecError {
    /// The tool could not be spawned at all, usually because the binary is not
    /// installed or not on PATH.
    #[error("could not launch '{bin}'; {reason}")]
    Launch { bin: String, reason: String },

    /// The tool ran and exited non-zero; its own error text is surfaced as-is.
    #[error("'{cmd}' exited with {status}; {tail}")]
    Failed {
        cmd: String,
        status: String,
        tail: String,
    },
}

/// Runs a command to completion, capturing stdout and stderr. Stdin is closed so a
/// misconfigured tool that tries to prompt fails instead of hanging the run.
pub async fn run(mut cmd: Command) -> Result<Output, ExecError> {
    cmd.stdin(Stdio::null());

    let pretty = display_command(&cmd);
    let bin = program_of(&cmd);
    debug!(command = %pretty, "running external tool");

    let output = cmd
        .output()
        .await
        .map_err(|e| launch_error(&bin, &e))?;

    interpret(pretty, output)
}

/// Runs a command that consumes sensitive bytes on stdin. The input never appears in
/// argv, where any other process on the machine could read it.
pub async fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Result<Output, ExecError> {
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let pretty = display_command(&cmd);
    let bin = program_of(&cmd);
    debug!(command = %pretty, "running external tool");

    let mut child = cmd.spawn().map_err(|e| launch_error(&bin, &e))?;

    if let Some(mut stdin) = child.stdin.take() {
        // A tool that fails fast can exit before draining stdin, breaking the
        // pipe. The exit status and stderr tail below carry the real diagnosis,
        // not the pipe error.
        if let Err(e) = stdin.write_all(input).await {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(launch_error(&bin, &e));
            }
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| launch_error(&bin, &e))?;

    interpret(pretty, output)
}

fn interpret(cmd: String, output: Output) -> Result<Output, ExecError> {
    if output.status.success() {
        return Ok(output);
    }

    // Some tools report failures on stdout instead.
    let mut tail = tail_of(&String::from_utf8_lossy(&output.stderr));
    if tail.is_empty() {
        tail = tail_of(&String::from_utf8_lossy(&output.stdout));
    }

    Err(ExecError::Failed {
        cmd,
        status: output.status.to_string(),
        tail,
    })
}

/// The program and arguments as one printable line. Environment values are left out
/// deliberately; secrets travel on the environment.
pub fn display_command(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let mut parts = vec![std_cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(std_cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn program_of(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

fn launch_error(bin: &str, e: &std::io::Error) -> ExecError {
    ExecError::Launch {
        bin: bin.to_string(),
        reason: e.to_string(),
    }
}

fn tail_of(text: &str) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
