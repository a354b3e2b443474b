//! Workspace-switch backends.
//!
//! Each backend implements [`WindowManager`](crate::traits::WindowManager).
//! Nothing outside this module should reference a specific compositor.

pub mod hyprland;
pub mod i3;

use serde::Deserialize;
use std::fmt;

/// Which window manager to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// i3 or sway, via `i3-msg`.
    #[default]
    I3,
    /// Hyprland, via its IPC socket.
    Hyprland,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::I3 => write!(f, "i3"),
            Backend::Hyprland => write!(f, "hyprland"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(Backend::I3.to_string(), "i3");
        assert_eq!(Backend::Hyprland.to_string(), "hyprland");
        assert_eq!(serde_yaml::from_str::<Backend>("hyprland").unwrap(), Backend::Hyprland);
        assert!(serde_yaml::from_str::<Backend>("gnome").is_err());
    }
}
