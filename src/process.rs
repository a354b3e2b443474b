//! Running external programs and capturing their output.
//!
//! [`SystemRunner`] starts the child with stdin closed, stderr inherited, and
//! stdout connected to a pipe that a helper thread drains while the control
//! thread waits for the child to exit.  Reading only after the exit would
//! deadlock as soon as a child writes more than the pipe buffer holds.
//!
//! ```text
//!   control thread                      drain thread
//!   ──────────────                      ────────────
//!   pipe()            ──reader──▶       read_to_end()
//!   spawn(child, stdout = writer)            │
//!   wait(child)                              │
//!   drop(writer)      ─────EOF──────▶        ▼
//!   join(drain)       ◀────bytes──────  return
//! ```

use crate::traits::ProcessRunner;
use log::debug;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `-1` if the child was terminated by a signal.
    pub code: i32,
    /// Everything written to stdout, trimmed of surrounding whitespace.
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub stdout: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Errors that prevent a child from being run to completion.
///
/// A non-zero exit status is *not* one of these.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("empty argument vector")]
    EmptyArgv,
    #[error("unable to find path for {executable}")]
    NotFound { executable: String },
    #[error("unable to pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("unable to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to wait for {}: {source}", .path.display())]
    Wait {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to read out pipe: {0}")]
    Drain(#[source] io::Error),
    #[error("output drain thread panicked")]
    DrainPanicked,
}

/// [`ProcessRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ProcessOutput, ProcessError> {
        run_captured(argv, cwd)
    }
}

/// Locate `name` the way a shell would.
///
/// A name containing `/` is taken as a path relative to `cwd`; anything else
/// is searched for in the directories of `$PATH`.
pub fn find_executable(name: &str, cwd: &Path) -> Result<PathBuf, ProcessError> {
    let found = if name.contains('/') {
        let candidate = cwd.join(name);
        is_executable(&candidate).then_some(candidate)
    } else {
        find_in_path(name, std::env::var_os("PATH").as_deref())
    };
    found.ok_or_else(|| ProcessError::NotFound {
        executable: name.to_string(),
    })
}

/// Search the directories of a `PATH`-style list for an executable `name`.
///
/// Empty entries are skipped rather than treated as the current directory.
pub fn find_in_path(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    std::env::split_paths(path_var?)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Run `argv` in `cwd` and collect its stdout.
///
/// Blocks until the child has exited **and** the drain thread has been
/// joined.
pub fn run_captured(argv: &[String], cwd: &Path) -> Result<ProcessOutput, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyArgv)?;
    let path = find_executable(program, cwd)?;

    let (mut reader, writer) = io::pipe().map_err(ProcessError::Pipe)?;

    let drain = thread::spawn(move || -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    });

    let child_stdout = match writer.try_clone() {
        Ok(w) => w,
        Err(e) => {
            drop(writer);
            let _ = drain.join();
            return Err(ProcessError::Pipe(e));
        }
    };

    // The temporary `Command` holds the child's copy of the write end and is
    // dropped at the end of this statement.
    let spawned = Command::new(&path)
        .arg0(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(child_stdout)
        .stderr(Stdio::inherit())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(source) => {
            drop(writer);
            let _ = drain.join();
            return Err(ProcessError::Spawn { path, source });
        }
    };
    debug!("started {} (pid {})", path.display(), child.id());

    let status = child.wait();

    // Last write end held by us; once the child (and anything it handed the
    // descriptor to) is gone the reader sees EOF.
    drop(writer);

    let captured = drain
        .join()
        .map_err(|_| ProcessError::DrainPanicked)?
        .map_err(ProcessError::Drain)?;
    let status = status.map_err(|source| ProcessError::Wait {
        path: path.clone(),
        source,
    })?;

    Ok(ProcessOutput {
        code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&captured).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn root() -> &'static Path {
        Path::new("/")
    }

    #[test]
    fn captures_trimmed_stdout() {
        let out = run_captured(&argv(&["sh", "-c", "printf '  main \\n\\n'"]), root()).unwrap();
        assert_eq!(out, ProcessOutput { code: 0, stdout: "main".into() });
    }

    #[test]
    fn non_zero_exit_is_data() {
        let out = run_captured(&argv(&["sh", "-c", "echo partial; exit 3"]), root()).unwrap();
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout, "partial");
        assert!(!out.success());
    }

    #[test]
    fn killed_child_reports_minus_one() {
        let out = run_captured(&argv(&["sh", "-c", "kill -9 $$"]), root()).unwrap();
        assert_eq!(out.code, -1);
    }

    #[test]
    fn output_larger_than_pipe_buffer_does_not_deadlock() {
        let out = run_captured(&argv(&["sh", "-c", "yes x | head -n 100000"]), root()).unwrap();
        assert_eq!(out.code, 0);
        // 100000 lines of "x\n", minus the trailing newline.
        assert_eq!(out.stdout.len(), 199_999);
    }

    #[test]
    fn runs_in_requested_directory() {
        let out = run_captured(&argv(&["pwd"]), Path::new("/usr")).unwrap();
        assert_eq!(out.stdout, "/usr");
    }

    #[test]
    fn stdin_is_closed() {
        // `cat` would block forever on an inherited terminal.
        let out = run_captured(&argv(&["cat"]), root()).unwrap();
        assert_eq!(out, ProcessOutput { code: 0, stdout: String::new() });
    }

    #[test]
    fn argv0_is_passed_verbatim() {
        let out = run_captured(&argv(&["sh", "-c", "echo $0"]), root()).unwrap();
        assert_eq!(out.stdout, "sh");
    }

    #[test]
    fn missing_executable_is_an_error() {
        let err = run_captured(&argv(&["wsgator-no-such-binary"]), root()).unwrap_err();
        assert!(
            matches!(err, ProcessError::NotFound { ref executable } if executable == "wsgator-no-such-binary"),
            "got: {err}"
        );
    }

    #[test]
    fn empty_argv_is_an_error() {
        assert!(matches!(run_captured(&[], root()), Err(ProcessError::EmptyArgv)));
    }

    #[test]
    fn path_search_skips_missing_and_empty_dirs() {
        let found = find_in_path("sh", Some(OsStr::new("/nonexistent::/bin")));
        assert_eq!(found, Some(PathBuf::from("/bin/sh")));
        assert_eq!(find_in_path("sh", None), None);
        assert_eq!(find_in_path("sh", Some(OsStr::new("/nonexistent"))), None);
    }

    #[test]
    fn slash_names_resolve_against_cwd() {
        assert_eq!(
            find_executable("bin/sh", root()).unwrap(),
            PathBuf::from("/bin/sh")
        );
        assert!(find_executable("./nope", root()).is_err());
    }
}
