//! Helpers intended for [`std::process::Command`], used to run rendered
//! scripts locally.

// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io::{Read, Seek, SeekFrom};
use std::process::Command;

use anyhow::Result;
use fn_error_context::context;

/// Interpreter for rendered Unix scripts.
pub const SHELL: &str = "/bin/sh";

/// Helpers intended for [`std::process::Command`].
pub trait CommandRunExt {
    /// Log (at debug level) the full child commandline.
    fn log_debug(&mut self) -> &mut Self;

    /// Execute the child process.
    fn run(&mut self) -> Result<()>;
}

/// Helpers intended for [`std::process::ExitStatus`].
pub trait ExitStatusExt {
    /// Fail with the tail of `stderr` unless the child succeeded.  The
    /// command line is left out, as rendered scripts carry password hashes.
    fn check_status(&mut self, stderr: std::fs::File) -> Result<()>;
}

/// The tail of the captured stderr, lossily decoded.
fn stderr_tail(mut f: std::fs::File) -> String {
    const MAX_STDERR_BYTES: u64 = 1024;
    let len = f.metadata().map(|m| m.len()).unwrap_or(0);
    let offset = len.min(MAX_STDERR_BYTES) as i64;
    let mut buf = Vec::new();
    match f
        .seek(SeekFrom::End(-offset))
        .and_then(|_| f.read_to_end(&mut buf))
    {
        Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => {
            tracing::warn!("reading stderr: {e}");
            "<failed to read stderr>".into()
        }
    }
}

impl ExitStatusExt for std::process::ExitStatus {
    fn check_status(&mut self, stderr: std::fs::File) -> Result<()> {
        if self.success() {
            return Ok(());
        }
        anyhow::bail!("Subprocess failed: {self:?}\n{}", stderr_tail(stderr))
    }
}

impl CommandRunExt for Command {
    /// Synchronously execute the child, and return an error if the child exited unsuccessfully.
    fn run(&mut self) -> Result<()> {
        let stderr = tempfile::tempfile()?;
        self.stderr(stderr.try_clone()?);
        self.status()?.check_status(stderr)
    }

    /// Output a debug-level log message with this command's program name.
    fn log_debug(&mut self) -> &mut Self {
        tracing::debug!("exec: {:?}", self.get_program());
        self
    }
}

/// Run a rendered Unix script with [`SHELL`], stopping at the first failing
/// command.
#[context("Running script")]
pub fn run_script(script: &str) -> Result<()> {
    Command::new(SHELL)
        .args(["-e", "-c", script])
        .log_debug()
        .run()
}
