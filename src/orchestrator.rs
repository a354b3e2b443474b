//! Ties configuration, decoding, and the workspace driver together.
//!
//! [`Orchestrator`] is built in two steps that never touch a process:
//! load the documents, then decode every workspace.  Only once the whole
//! layout is known to be well formed does [`run`](Orchestrator::run) start
//! switching workspaces and spawning children.

use crate::config::{self, Config, ConfigError, LayoutFile};
use crate::driver::{RunError, WorkspaceDriver, WorkspaceOutcome};
use crate::operation::{decode_workspace, DecodeError, Workspace};
use crate::program::ProgramRegistry;
use crate::traits::{ProcessRunner, WindowManager};
use crate::wm::Backend;
use log::info;
use std::path::Path;

/// Any error that ends a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// A fully decoded layout, ready to run.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: ProgramRegistry,
    workspaces: Vec<Workspace>,
    backend: Backend,
}

impl Orchestrator {
    /// Build the registry from `config` and decode every workspace of
    /// `layout`.
    pub fn new(config: &Config, layout: &LayoutFile) -> Result<Self, DecodeError> {
        let registry = ProgramRegistry::from_config(config);
        let workspaces = layout
            .workspaces
            .0
            .iter()
            .map(|(label, raw)| decode_workspace(label, raw, &registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            registry,
            workspaces,
            backend: config.window_manager,
        })
    }

    /// Load `<dir>/wsgator.conf` and `<dir>/layouts/<layout>.conf`.
    pub fn load(dir: &Path, layout: &str) -> Result<Self, Error> {
        let config_path = config::config_path(dir);
        let config = Config::load(&config_path)?;
        info!("loaded config from {}", config_path.display());

        let layout_path = config::layout_path(dir, layout);
        let layout = LayoutFile::load(&layout_path)?;
        info!("loaded layout from {}", layout_path.display());

        Ok(Self::new(&config, &layout)?)
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    /// Backend named in the configuration.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Run every workspace in declaration order with a driver built from
    /// `wm` and `runner`.
    ///
    /// Stops at the first error; later workspaces are not attempted.
    pub fn run<W, R>(&self, wm: W, runner: R) -> Result<Vec<(String, WorkspaceOutcome)>, RunError>
    where
        W: WindowManager,
        R: ProcessRunner,
    {
        self.run_with(&WorkspaceDriver::new(&self.registry, wm, runner))
    }

    /// Run every workspace through an existing `driver`.
    pub fn run_with<W, R>(
        &self,
        driver: &WorkspaceDriver<'_, W, R>,
    ) -> Result<Vec<(String, WorkspaceOutcome)>, RunError>
    where
        W: WindowManager,
        R: ProcessRunner,
    {
        let mut outcomes = Vec::with_capacity(self.workspaces.len());
        for ws in &self.workspaces {
            let outcome = driver.apply(ws)?;
            info!("workspace {}: {:?}", ws.label, outcome);
            outcomes.push((ws.label.clone(), outcome));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn layout(yaml: &str) -> LayoutFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn decodes_all_workspaces_in_order() {
        let cfg = config("programs: { git: { exec: [git, status] } }");
        let lay = layout("workspaces: { b: { check: [git] }, a: { do: [{sleep: [1]}] } }");
        let orch = Orchestrator::new(&cfg, &lay).unwrap();
        let labels: Vec<&str> = orch.workspaces().iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert!(orch.registry().contains("git"));
        assert!(orch.registry().contains("sleep"));
        assert_eq!(orch.backend(), Backend::I3);
    }

    #[test]
    fn decode_error_in_any_workspace_fails_construction() {
        let cfg = config("programs: {}");
        let lay = layout("workspaces: { a: { do: [sleep] }, b: { do: [missing] } }");
        let err = Orchestrator::new(&cfg, &lay).unwrap_err();
        assert_eq!(err.workspace, "b");
    }

    #[test]
    fn user_program_overrides_default() {
        let cfg = config("programs: { sleep: { exec: [busybox, sleep, <args>] } }");
        let lay = layout("workspaces: {}");
        let orch = Orchestrator::new(&cfg, &lay).unwrap();
        assert_eq!(orch.registry().get("sleep").unwrap().template().len(), 3);
    }
}
