//! [`WindowManager`] implementation for i3 (and sway) via `i3-msg`.

use crate::traits::WindowManager;
use log::debug;
use serde::Deserialize;
use std::process::{Command, Stdio};

/// Switches workspaces by running `i3-msg workspace <label>`.
#[derive(Debug, Clone)]
pub struct I3Msg {
    program: String,
}

/// Errors that can occur when talking to i3.
#[derive(Debug, thiserror::Error)]
#[error("i3 IPC error: {0}")]
pub struct I3Error(String);

/// One element of the JSON array `i3-msg` prints for a command.
#[derive(Deserialize)]
struct CommandReply {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Default for I3Msg {
    fn default() -> Self {
        Self::new()
    }
}

impl I3Msg {
    pub fn new() -> Self {
        Self::with_program("i3-msg")
    }

    /// Use a different messaging binary, e.g. `swaymsg`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Check the replies `i3-msg` printed.
///
/// Output that is not a reply array is accepted; only an explicit
/// `"success": false` is treated as a failure.
fn check_replies(stdout: &str) -> Result<(), I3Error> {
    let replies: Vec<CommandReply> = match serde_json::from_str(stdout.trim()) {
        Ok(r) => r,
        Err(e) => {
            debug!("ignoring unparseable i3-msg output ({}): {}", e, stdout.trim());
            return Ok(());
        }
    };
    match replies.into_iter().find(|r| !r.success) {
        Some(failed) => Err(I3Error(
            failed.error.unwrap_or_else(|| "command failed".into()),
        )),
        None => Ok(()),
    }
}

impl WindowManager for I3Msg {
    type Error = I3Error;

    fn switch_workspace(&self, label: &str) -> Result<(), Self::Error> {
        let output = Command::new(&self.program)
            .arg(format!("workspace {}", label))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| I3Error(format!("{}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(I3Error(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stdout.trim()
            )));
        }
        check_replies(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_reply_is_ok() {
        assert!(check_replies(r#"[{"success":true}]"#).is_ok());
        assert!(check_replies("[]").is_ok());
    }

    #[test]
    fn failed_reply_carries_error_text() {
        let err = check_replies(r#"[{"success":false,"error":"No such workspace"}]"#).unwrap_err();
        assert_eq!(err.to_string(), "i3 IPC error: No such workspace");
    }

    #[test]
    fn unparseable_output_is_accepted() {
        assert!(check_replies("workspace 3").is_ok());
    }

    #[test]
    fn switch_runs_the_messaging_binary() {
        // `echo` stands in for i3-msg and prints something that is not JSON.
        assert!(I3Msg::with_program("echo").switch_workspace("3").is_ok());
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = I3Msg::with_program("false").switch_workspace("3").unwrap_err();
        assert!(err.to_string().contains("false exited with"), "got: {err}");
    }

    #[test]
    fn missing_binary_is_an_error() {
        assert!(I3Msg::with_program("wsgator-no-such-i3-msg")
            .switch_workspace("3")
            .is_err());
    }
}
