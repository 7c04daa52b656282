//! Privileged command execution
//!
//! The executor receives one ordered batch of shell command strings per
//! pass and runs them in order, fire-and-forget: the engine never needs
//! per-command success signals, but total unavailability (no elevated
//! access at all) must be detectable before a pass starts mutating
//! anything.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub trait PrivilegedExecutor {
    /// Whether elevated execution is available at all. Checked before a
    /// pass begins; a pass never starts without it.
    fn available(&self) -> bool;

    /// Run the batch in order. Individual command failures are not
    /// surfaced; order is preserved.
    fn run_batch(&mut self, commands: &[String]) -> Result<()>;
}

/// Elevated execution through `su`
pub struct SuExecutor;

impl SuExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SuExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedExecutor for SuExecutor {
    fn available(&self) -> bool {
        match Command::new("su")
            .args(["-c", "id"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains("uid=0")
            }
            Err(e) => {
                debug!(error = %e, "su not runnable");
                false
            }
        }
    }

    fn run_batch(&mut self, commands: &[String]) -> Result<()> {
        let mut child = Command::new("su")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn su")?;

        {
            let stdin = child.stdin.as_mut().context("su stdin unavailable")?;
            for command in commands {
                debug!(command = %command, "running privileged command");
                writeln!(stdin, "{command}").context("Failed to write to su")?;
            }
            writeln!(stdin, "exit").context("Failed to write to su")?;
        }

        let status = child.wait().context("Failed to wait for su")?;
        if !status.success() {
            // Best-effort batch: log and move on, restorability is
            // guaranteed by the state snapshot
            warn!(%status, "privileged shell exited with failure");
        }
        Ok(())
    }
}

/// Debug-mode executor: reports the batch instead of running it and always
/// claims availability, so passes can be exercised on unrooted hardware
#[derive(Default)]
pub struct LoggingExecutor {
    pub batches: Vec<Vec<String>>,
}

impl LoggingExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrivilegedExecutor for LoggingExecutor {
    fn available(&self) -> bool {
        true
    }

    fn run_batch(&mut self, commands: &[String]) -> Result<()> {
        for command in commands {
            info!(command = %command, "debug mode: would run");
        }
        self.batches.push(commands.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_executor_records_batches_in_order() {
        let mut executor = LoggingExecutor::new();
        assert!(executor.available());
        executor
            .run_batch(&["wm density 240".to_string(), "wm size 1920x1080".to_string()])
            .unwrap();
        executor.run_batch(&["wm overscan reset".to_string()]).unwrap();
        assert_eq!(executor.batches.len(), 2);
        assert_eq!(executor.batches[0][1], "wm size 1920x1080");
    }
}
