//! The per-workspace check/do protocol.
//!
//! [`WorkspaceDriver`] takes one decoded [`Workspace`] through
//!
//! ```text
//! Switching ─▶ Checking ─▶ Deciding ─┬─▶ Doing ─▶ Done
//!                                    └──────────▶ Done
//! ```
//!
//! exactly once.  A failing check is information: it stops the check list
//! and forces the do list.  A failing do step is fatal: the workspace could
//! not be brought into the desired state and the whole run stops.
//!
//! Each phase gets its own fresh variable bindings.  The working directory
//! starts at the process's current directory, follows `cwd` operations, and
//! carries over from check into do.

use crate::operation::{Operation, Phase, Workspace};
use crate::process::{ProcessError, ProcessOutput};
use crate::program::ProgramRegistry;
use crate::resolve::{resolve, Bindings, ResolveError};
use crate::traits::{ProcessRunner, WindowManager};
use log::{debug, info};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Label meaning "stay on the current workspace".
pub const CURRENT_WORKSPACE: &str = "-";

/// What happened to a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOutcome {
    /// The do list ran to completion.
    Applied,
    /// Every check passed, so the do list was skipped.
    AlreadySatisfied,
}

/// Errors that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to switch to workspace {label:?}: {message}")]
    Switch { label: String, message: String },

    #[error("unable to determine current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("unable to expand {path}: home directory is unknown")]
    HomeUnknown { path: String },

    #[error("unable to get abs path for {path}: {source}")]
    AbsPath {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Only reachable for workspaces built by hand rather than decoded.
    #[error("[{label} {phase}] cwd operation has no directory")]
    MissingCwd { label: String, phase: Phase },

    /// Only reachable for workspaces built by hand rather than decoded.
    #[error("[{label} {phase}] unknown program {program}")]
    UnknownProgram {
        label: String,
        phase: Phase,
        program: String,
    },

    #[error("[{label} {phase}] {source}")]
    Resolve {
        label: String,
        phase: Phase,
        #[source]
        source: ResolveError,
    },

    #[error("[{label} {phase}] {source}")]
    Process {
        label: String,
        phase: Phase,
        #[source]
        source: ProcessError,
    },

    #[error("[{label} do] {argv:?} failed with exit code: {code}")]
    DoFailed {
        label: String,
        argv: Vec<String>,
        code: i32,
    },
}

/// Fold `.` and `..` components without touching the filesystem.  `..`
/// at the root stays at the root.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Expand a `cwd` argument into a clean absolute path.
///
/// A leading `~/` is replaced by `home`; relative results are joined onto
/// `base`.
pub fn expand_cwd(dir: &str, home: Option<&Path>, base: &Path) -> Result<PathBuf, RunError> {
    let expanded = match dir.strip_prefix("~/") {
        Some(rest) => {
            let home = home.ok_or_else(|| RunError::HomeUnknown {
                path: dir.to_string(),
            })?;
            home.join(rest)
        }
        None => PathBuf::from(dir),
    };
    let joined = base.join(expanded);
    std::path::absolute(&joined)
        .map(|abs| clean(&abs))
        .map_err(|source| RunError::AbsPath {
            path: dir.to_string(),
            source,
        })
}

/// Runs the check/do protocol for one workspace at a time.
///
/// Generic over the [`WindowManager`] and [`ProcessRunner`], so the same
/// protocol drives i3, Hyprland, or a test harness.
pub struct WorkspaceDriver<'r, W: WindowManager, R: ProcessRunner> {
    registry: &'r ProgramRegistry,
    wm: W,
    runner: R,
    start_dir: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl<'r, W: WindowManager, R: ProcessRunner> WorkspaceDriver<'r, W, R> {
    /// Create a driver that starts every workspace in the process's current
    /// directory and expands `~/` with the user's home directory.
    pub fn new(registry: &'r ProgramRegistry, wm: W, runner: R) -> Self {
        Self {
            registry,
            wm,
            runner,
            start_dir: None,
            home: dirs::home_dir(),
        }
    }

    /// Start every workspace in `dir` instead of the process's current
    /// directory.
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    /// Expand `~/` with `home` instead of the user's home directory.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn window_manager(&self) -> &W {
        &self.wm
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn initial_dir(&self) -> Result<PathBuf, RunError> {
        match &self.start_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(RunError::CurrentDir),
        }
    }

    /// Take `ws` through switch, check, and (if needed) do.
    pub fn apply(&self, ws: &Workspace) -> Result<WorkspaceOutcome, RunError> {
        if ws.label != CURRENT_WORKSPACE {
            info!("switching to workspace {}", ws.label);
            self.wm
                .switch_workspace(&ws.label)
                .map_err(|e| RunError::Switch {
                    label: ws.label.clone(),
                    message: e.to_string(),
                })?;
        }

        let mut cwd = self.initial_dir()?;

        // No checks means "always apply".
        let should_do = ws.check.is_empty() || !self.run_checks(ws, &mut cwd)?;
        if !should_do {
            info!("[{} check] all checks passed, nothing to do", ws.label);
            return Ok(WorkspaceOutcome::AlreadySatisfied);
        }

        self.run_do(ws, &mut cwd)?;
        Ok(WorkspaceOutcome::Applied)
    }

    /// Returns `true` when every check exited 0.
    fn run_checks(&self, ws: &Workspace, cwd: &mut PathBuf) -> Result<bool, RunError> {
        let mut vars = Bindings::new();
        for op in &ws.check {
            if op.is_cwd() {
                *cwd = self.change_dir(&ws.label, Phase::Check, op)?;
                continue;
            }
            let out = self.operate(&ws.label, Phase::Check, op, cwd, &mut vars)?;
            if !out.success() {
                info!(
                    "[{} check] {} exited with {}, running do",
                    ws.label, op.program, out.code
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run_do(&self, ws: &Workspace, cwd: &mut PathBuf) -> Result<(), RunError> {
        let mut vars = Bindings::new();
        for op in &ws.apply {
            if op.is_cwd() {
                *cwd = self.change_dir(&ws.label, Phase::Do, op)?;
                continue;
            }
            self.operate(&ws.label, Phase::Do, op, cwd, &mut vars)?;
        }
        Ok(())
    }

    /// Relative `cwd` arguments resolve against the initial directory, not
    /// the current override.
    fn change_dir(&self, label: &str, phase: Phase, op: &Operation) -> Result<PathBuf, RunError> {
        let dir = op.args.first().ok_or_else(|| RunError::MissingCwd {
            label: label.to_string(),
            phase,
        })?;
        let new_dir = expand_cwd(dir, self.home.as_deref(), &self.initial_dir()?)?;
        debug!("[{} {}] cwd: {}", label, phase, new_dir.display());
        Ok(new_dir)
    }

    /// Resolve, run, and bind one operation.
    fn operate(
        &self,
        label: &str,
        phase: Phase,
        op: &Operation,
        cwd: &Path,
        vars: &mut Bindings,
    ) -> Result<ProcessOutput, RunError> {
        let program = self
            .registry
            .get(&op.program)
            .ok_or_else(|| RunError::UnknownProgram {
                label: label.to_string(),
                phase,
                program: op.program.clone(),
            })?;

        let argv = resolve(program, op, vars).map_err(|source| RunError::Resolve {
            label: label.to_string(),
            phase,
            source,
        })?;

        info!("[{} {}] {}: {:?}", label, phase, op.program, argv);

        let out = self
            .runner
            .run(&argv, cwd)
            .map_err(|source| RunError::Process {
                label: label.to_string(),
                phase,
                source,
            })?;

        debug!(
            "[{} {}] {}: {:?} exit_code={} stdout={}",
            label, phase, op.program, argv, out.code, out.stdout
        );

        vars.insert(program.bind_name().to_string(), out.stdout.clone());

        if phase == Phase::Do && !out.success() {
            return Err(RunError::DoFailed {
                label: label.to_string(),
                argv,
                code: out.code,
            });
        }
        Ok(out)
    }
}
