//! **wsgator**: declarative check-then-do workspace setup.
//!
//! A *layout* names a set of window-manager workspaces.  For each one,
//! wsgator switches to it, runs a list of *check* programs, and, if any of
//! them fails (or there are none), runs a list of *do* programs that put the
//! workspace into the desired state.  Programs are templates whose arguments
//! can reference the trimmed stdout of earlier programs in the same phase.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowManager`] abstracts workspace switching so the protocol
//!   is not coupled to any specific compositor.
//! * [`traits::ProcessRunner`] abstracts running a concrete argv and
//!   capturing its output.
//!
//! Concrete implementations live in [`wm`] (i3 and Hyprland) and
//! [`process`] (real child processes).  [`driver`] implements the per-
//! workspace protocol on top of [`program`], [`operation`], and [`resolve`];
//! [`orchestrator`] loads the [`config`] and drives every workspace.

pub mod config;
pub mod driver;
pub mod operation;
pub mod orchestrator;
pub mod process;
pub mod program;
pub mod resolve;
pub mod traits;
pub mod wm;
