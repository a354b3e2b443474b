//! Core traits that decouple wsgator from any specific window manager or
//! process-spawning mechanism.
//!
//! The [`WorkspaceDriver`](crate::driver::WorkspaceDriver) only depends on
//! these abstractions, so the check/do protocol can be exercised with
//! recording test doubles instead of a live compositor and real children.

use crate::process::{ProcessError, ProcessOutput};
use std::path::Path;

/// Abstraction over a window manager that can switch workspaces.
///
/// An implementation might shell out to `i3-msg`, talk to Hyprland via IPC,
/// or be a no-op stub used in tests.
pub trait WindowManager {
    /// The error type produced by this window manager.
    type Error: std::error::Error + Send + 'static;

    /// Focus the workspace called `label`, creating it if the window manager
    /// does so on demand.
    fn switch_workspace(&self, label: &str) -> Result<(), Self::Error>;
}

/// Something that can run a concrete argument vector to completion.
///
/// # Contract
///
/// * `argv[0]` is the executable; `argv` is never empty.
/// * [`run`](ProcessRunner::run) **blocks** until the child has exited and
///   all of its stdout has been collected.
/// * A non-zero exit status is reported through
///   [`ProcessOutput::code`], never as an `Err`.
pub trait ProcessRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ProcessOutput, ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    //  Mock WindowManager

    #[derive(Debug, Default)]
    struct MockWm {
        switch_log: RefCell<Vec<String>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    impl WindowManager for MockWm {
        type Error = MockError;

        fn switch_workspace(&self, label: &str) -> Result<(), MockError> {
            self.switch_log.borrow_mut().push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn mock_wm_records_switches() {
        let wm = MockWm::default();
        wm.switch_workspace("3").unwrap();
        wm.switch_workspace("mail").unwrap();
        assert_eq!(*wm.switch_log.borrow(), vec!["3", "mail"]);
    }

    //  Mock ProcessRunner

    /// Echoes its arguments back as stdout and records the directory.
    #[derive(Debug, Default)]
    struct EchoRunner {
        dirs: RefCell<Vec<PathBuf>>,
    }

    impl ProcessRunner for EchoRunner {
        fn run(&self, argv: &[String], cwd: &Path) -> Result<ProcessOutput, ProcessError> {
            self.dirs.borrow_mut().push(cwd.to_path_buf());
            Ok(ProcessOutput {
                code: 0,
                stdout: argv[1..].join(" "),
            })
        }
    }

    #[test]
    fn mock_runner_is_usable_through_the_trait() {
        fn call(r: &dyn ProcessRunner) -> ProcessOutput {
            r.run(&["echo".to_string(), "a".to_string(), "b".to_string()], Path::new("/srv"))
                .unwrap()
        }
        let runner = EchoRunner::default();
        let out = call(&runner);
        assert_eq!(out.stdout, "a b");
        assert!(out.success());
        assert_eq!(*runner.dirs.borrow(), vec![PathBuf::from("/srv")]);
    }
}
