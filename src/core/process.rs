//! External command execution.
//!
//! The shell-out collaborators (`kind`, `kapp`, `docker`, `kubectl`) all run
//! through [`Tool`], which locates the binary once and maps every failure to
//! a `RemoteError` naming the operation and resource.

use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::trace;

use crate::error::{RemoteError, Result};

/// A located command-line tool.
#[derive(Debug, Clone)]
pub struct Tool {
    name: &'static str,
    binary: PathBuf,
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl Tool {
    /// Find `name` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the binary is not installed.
    pub fn locate(name: &'static str) -> Result<Self> {
        let binary = which::which(name).map_err(|e| {
            RemoteError::new("locate", name, format!("{} not found on PATH: {}", name, e))
        })?;
        Ok(Self { name, binary })
    }

    /// Tool at an explicit path.
    pub fn at(name: &'static str, binary: impl Into<PathBuf>) -> Self {
        Self {
            name,
            binary: binary.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run and capture output without judging the exit status.
    pub fn capture<I, S>(&self, args: I, stdin: Option<&[u8]>) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        trace!(tool = self.name, command = ?cmd, "spawning");

        let mut child = cmd.spawn().map_err(|e| {
            RemoteError::new("spawn", self.name, format!("failed to spawn: {}", e))
        })?;

        // The pipe is dropped at the end of the match so the child sees EOF.
        let written = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => pipe.write_all(input),
            _ => Ok(()),
        };

        // Reaped even when the write failed.
        let output = child.wait_with_output().map_err(|e| {
            RemoteError::new("wait", self.name, format!("command failed: {}", e))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if let Err(e) = written {
            return Err(RemoteError::new(
                "write",
                self.name,
                format!("failed to write stdin: {}: {}", e, stderr),
            )
            .into());
        }

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }

    /// Run and require a zero exit status.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError { operation, resource, stderr }` on failure.
    pub fn run<I, S>(
        &self,
        operation: &str,
        resource: &str,
        args: I,
        stdin: Option<&[u8]>,
    ) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.capture(args, stdin)?;
        if !output.success {
            return Err(RemoteError::new(
                operation,
                resource,
                format!("{} failed: {}", self.name, output.stderr),
            )
            .into());
        }
        Ok(output.stdout)
    }
}
