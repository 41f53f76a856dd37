use std::{
    io,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::debug;
use thiserror::Error;

/// Captured result of a bounded external command.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    /// Launching the command failed (binary missing, not executable, ...).
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on or reading from the running command failed.
    #[error("i/o error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command did not finish within its deadline and was killed.
    #[error("'{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// Runs `program` with `args`, killing it if it outlives `timeout`.
///
/// Output is drained after exit; the commands driven through here
/// (`crontab`, `systemctl`, `which`) emit far less than a pipe buffer.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let display = display_command(program, args);
    debug!("running '{}' (timeout {:?})", display, timeout);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            command: display.clone(),
            source,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        let exited = child.try_wait().map_err(|source| ProcessError::Io {
            command: display.clone(),
            source,
        })?;
        if exited.is_some() {
            break;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessError::TimedOut {
                command: display,
                timeout,
            });
        }
        thread::sleep(Duration::from_millis(50));
    }

    let output = child.wait_with_output().map_err(|source| ProcessError::Io {
        command: display.clone(),
        source,
    })?;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    })
}

fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_successful_command() {
        let out = run_with_timeout("echo", &["hello"], Duration::from_secs(5)).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, "hello");
    }

    #[test]
    fn reports_nonzero_exit_without_erroring() {
        let out = run_with_timeout("false", &[], Duration::from_secs(5)).unwrap();
        assert!(!out.success);
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let err =
            run_with_timeout("tuxmate-no-such-binary", &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn slow_command_times_out() {
        let err = run_with_timeout("sleep", &["5"], Duration::from_millis(200)).unwrap_err();
        match err {
            ProcessError::TimedOut { command, .. } => assert!(command.contains("sleep")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
