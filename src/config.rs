//! Configuration and layout files.
//!
//! Both documents are YAML and live under one configuration directory
//! (`$XDG_CONFIG_HOME/wsgator` by default):
//!
//! ```text
//! wsgator/
//!   wsgator.conf          programs + optional window manager backend
//!   layouts/
//!     <layout>.conf       workspaces with their check/do lists
//! ```
//!
//! # Example
//!
//! ```yaml
//! # wsgator.conf
//! window_manager: i3
//! programs:
//!   branch:
//!     exec: [git, rev-parse, --abbrev-ref, HEAD]
//!   term:
//!     exec: [kitty, --detach, <args>]
//! ```
//!
//! ```yaml
//! # layouts/work.conf
//! workspaces:
//!   1:
//!     check:
//!       - cwd: ~/src/project
//!       - branch
//!     do:
//!       - term: [--title, project]
//! ```
//!
//! Operation entries are kept as raw YAML values here; turning them into
//! typed operations is the job of [`operation`](crate::operation).

use crate::wm::Backend;
use serde::de::{DeserializeOwned, Error as DeError, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the main configuration document.
pub const CONFIG_FILE: &str = "wsgator.conf";

/// Directory (relative to the config dir) holding layout documents.
pub const LAYOUTS_DIR: &str = "layouts";

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend used to switch workspaces unless overridden on the command
    /// line.
    #[serde(default)]
    pub window_manager: Backend,

    /// User-defined programs, laid over the built-in defaults.
    pub programs: BTreeMap<String, ProgramConfig>,
}

/// One entry of the `programs` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgramConfig {
    /// Executable followed by its argument template.
    pub exec: Vec<String>,
    /// Variable name the captured stdout is bound to.  Defaults to the
    /// program name.
    #[serde(default, alias = "bind")]
    pub assign: Option<String>,
}

/// A layout document.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutFile {
    pub workspaces: Workspaces,
}

/// Workspace definitions in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspaces(pub Vec<(String, RawWorkspace)>);

/// A workspace's check and do lists before decoding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawWorkspace {
    #[serde(default)]
    pub check: Vec<Value>,
    #[serde(default, rename = "do")]
    pub apply: Vec<Value>,
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_yaml(path)
    }
}

impl LayoutFile {
    /// Load a layout from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_yaml(path)
    }
}

/// Resolve the default config directory (`$XDG_CONFIG_HOME/wsgator`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("wsgator")
}

/// `<dir>/wsgator.conf`
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// `<dir>/layouts/<name>.conf`
pub fn layout_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(LAYOUTS_DIR).join(format!("{}.conf", name))
}

/// Textual form of a YAML scalar, or `None` for nulls and collections.
///
/// Workspace labels are often written unquoted (`1:`), so numbers and
/// booleans are accepted too.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

impl<'de> Deserialize<'de> for Workspaces {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Workspaces;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a mapping of workspace labels to check/do lists")
            }
            fn visit_map<A>(self, mut map: A) -> Result<Workspaces, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, RawWorkspace)> = Vec::new();
                while let Some(key) = map.next_key::<Value>()? {
                    let label = scalar_text(&key).ok_or_else(|| {
                        DeError::custom(format!("workspace label must be a scalar, got {:?}", key))
                    })?;
                    if entries.iter().any(|(l, _)| *l == label) {
                        return Err(DeError::custom(format!("duplicate workspace {:?}", label)));
                    }
                    // `label:` with nothing after it is an empty workspace.
                    let workspace: Option<RawWorkspace> = map.next_value()?;
                    entries.push((label, workspace.unwrap_or_default()));
                }
                Ok(Workspaces(entries))
            }
        }
        deserializer.deserialize_map(V)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let yaml = r#"
window_manager: hyprland
programs:
  branch:
    exec: [git, rev-parse, --abbrev-ref, HEAD]
  term:
    exec: [kitty, <args>]
    assign: terminal
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.window_manager, Backend::Hyprland);
        assert_eq!(cfg.programs.len(), 2);
        assert_eq!(cfg.programs["branch"].exec[0], "git");
        assert_eq!(cfg.programs["branch"].assign, None);
        assert_eq!(cfg.programs["term"].assign.as_deref(), Some("terminal"));
    }

    #[test]
    fn bind_is_an_alias_for_assign() {
        let yaml = "programs: { echo: { exec: [echo, <args>], bind: greeting } }";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.programs["echo"].assign.as_deref(), Some("greeting"));
    }

    #[test]
    fn window_manager_defaults_to_i3() {
        let cfg: Config = serde_yaml::from_str("programs: {}").unwrap();
        assert_eq!(cfg.window_manager, Backend::I3);
    }

    #[test]
    fn programs_section_is_required() {
        assert!(serde_yaml::from_str::<Config>("window_manager: i3").is_err());
    }

    #[test]
    fn workspaces_keep_declaration_order() {
        let yaml = r#"
workspaces:
  "9":
    do: [a]
  1:
    check: [b]
  "-":
    do: [c]
"#;
        let layout: LayoutFile = serde_yaml::from_str(yaml).unwrap();
        let labels: Vec<&str> = layout.workspaces.0.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["9", "1", "-"]);
        assert_eq!(layout.workspaces.0[1].1.check.len(), 1);
        assert!(layout.workspaces.0[1].1.apply.is_empty());
    }

    #[test]
    fn empty_workspace_body_is_allowed() {
        let layout: LayoutFile = serde_yaml::from_str("workspaces:\n  mail:\n").unwrap();
        assert_eq!(layout.workspaces.0, vec![("mail".to_string(), RawWorkspace::default())]);
    }

    #[test]
    fn duplicate_workspace_is_rejected() {
        let yaml = "workspaces:\n  1: {}\n  \"1\": {}\n";
        let err = serde_yaml::from_str::<LayoutFile>(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate workspace"), "got: {err}");
    }

    #[test]
    fn load_reports_path_on_missing_file() {
        let err = Config::load(Path::new("/nonexistent/wsgator.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/wsgator.conf"));
    }

    #[test]
    fn layout_path_layout() {
        let p = layout_path(Path::new("/cfg"), "work");
        assert_eq!(p, PathBuf::from("/cfg/layouts/work.conf"));
        assert_eq!(config_path(Path::new("/cfg")), PathBuf::from("/cfg/wsgator.conf"));
    }

    #[test]
    fn scalar_text_coerces_plain_scalars() {
        assert_eq!(scalar_text(&Value::from("x")), Some("x".into()));
        assert_eq!(scalar_text(&Value::from(3)), Some("3".into()));
        assert_eq!(scalar_text(&Value::from(true)), Some("true".into()));
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&Value::Sequence(vec![])), None);
    }
}
