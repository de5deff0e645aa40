use crate::error::CaptureError;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// A fixed external command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run `spec` to completion and return its stdout as text.
///
/// Stdout and stderr are captured separately. A non-zero exit status, output
/// that is not UTF-8, or a run longer than `limit` are all capture failures.
/// The child is killed if the limit elapses.
pub async fn run_captured(spec: &CommandSpec, limit: Duration) -> Result<String, CaptureError> {
    let command = spec.to_string();
    debug!(%command, "running external command");

    let child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CaptureError::Spawn {
            command: command.clone(),
            source,
        })?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(CaptureError::Spawn { command, source }),
        Err(_) => {
            return Err(CaptureError::Timeout {
                command,
                timeout: limit,
            })
        }
    };

    if !output.status.success() {
        return Err(CaptureError::NonZeroExit {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|source| CaptureError::Decode { command, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", ["-c", script])
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = run_captured(&sh("printf 'RULE A\\nRULE B\\n'"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "RULE A\nRULE B\n");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let err = run_captured(&sh("echo denied >&2; echo partial; exit 3"), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            CaptureError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "denied"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_captured(&sh("sleep 5"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Timeout { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let err = run_captured(&sh("printf '\\377\\376'"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Decode { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = CommandSpec::new("hostwatch-no-such-binary", Vec::<String>::new());
        let err = run_captured(&spec, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("getent", ["passwd"]);
        assert_eq!(spec.to_string(), "getent passwd");
    }
}
