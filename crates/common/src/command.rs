//! External command execution
//!
//! Thin wrapper over [`std::process::Command`] that captures stdout and turns
//! spawn failures and non-zero exits into [`Error::Command`].

use crate::{Error, Result};
use std::ffi::OsStr;
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// Run `program` with `args` and return its stdout
///
/// Stdin is closed. On a non-zero exit the trimmed stderr (or the exit
/// status when stderr is empty) becomes the error message.
pub fn run_command<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Running {:?}", command);

    let output = command.output().map_err(|e| Error::Command {
        program: program.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(Error::Command {
            program: program.to_string(),
            message,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    trace!("{} produced {} bytes", program, stdout.len());
    Ok(stdout)
}
