//! Entry point for the **wsgator** command.
//!
//! Parses the command line, loads the configuration and the requested
//! layout, and runs every workspace.  Any error is logged and turns into
//! exit status 1.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use wsgator::config::config_dir;
use wsgator::driver::WorkspaceOutcome;
use wsgator::orchestrator::{Error, Orchestrator};
use wsgator::process::SystemRunner;
use wsgator::wm::hyprland::HyprlandWm;
use wsgator::wm::i3::I3Msg;
use wsgator::wm::Backend;

#[derive(Parser, Debug)]
#[command(
    name = "wsgator",
    version,
    about = "Switch to each workspace of a layout and set it up if its checks fail",
    long_about = None,
)]
struct Cli {
    /// Layout to apply, read from `<config>/layouts/<layout>.conf`.
    layout: String,

    /// Path to the configuration directory [default: $XDG_CONFIG_HOME/wsgator].
    #[arg(short, long, value_name = "DIR")]
    config: Option<PathBuf>,

    /// Window manager backend; overrides `window_manager` in the config.
    #[arg(long, value_enum)]
    wm: Option<Backend>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let dir = cli.config.unwrap_or_else(config_dir);
    let orchestrator = Orchestrator::load(&dir, &cli.layout)?;

    let backend = cli.wm.unwrap_or(orchestrator.backend());
    info!("using {} backend", backend);

    let outcomes = match backend {
        Backend::I3 => orchestrator.run(I3Msg::new(), SystemRunner)?,
        Backend::Hyprland => orchestrator.run(HyprlandWm::new(), SystemRunner)?,
    };

    let applied = outcomes
        .iter()
        .filter(|(_, o)| *o == WorkspaceOutcome::Applied)
        .count();
    info!(
        "{} workspace(s) processed, {} applied",
        outcomes.len(),
        applied
    );
    Ok(())
}
