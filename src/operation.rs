//! Operations and the decoder that builds them from layout entries.
//!
//! A layout lists each step either as a bare program name or as a mapping
//! with exactly one key, the program name, whose value holds the literal
//! arguments:
//!
//! ```yaml
//! check:
//!   - branch                      # bare
//!   - cwd: ~/src/project          # single argument
//!   - term: [--title, project]    # list of arguments
//!   - sleep: [1, s]               # mixed list, coerced to strings
//!   - sleep: "1"                  # scalar values must be strings
//! ```
//!
//! Every entry is decoded up front, before anything runs, so a typo in the
//! last workspace cannot leave the first one half configured.

use crate::config::{scalar_text, RawWorkspace};
use crate::program::{ProgramRegistry, CWD_PROGRAM};
use serde_yaml::Value;
use std::fmt;

/// The two phases of a workspace protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Probes whose failure means the workspace needs setting up.
    Check,
    /// Corrective actions whose failure aborts the run.
    Do,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Check => write!(f, "check"),
            Phase::Do => write!(f, "do"),
        }
    }
}

/// One step of a check or do list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub program: String,
    pub args: Vec<String>,
}

impl Operation {
    /// Whether this is the `cwd` pseudo-operation.
    pub fn is_cwd(&self) -> bool {
        self.program == CWD_PROGRAM
    }
}

/// A workspace whose check and do lists have been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub label: String,
    pub check: Vec<Operation>,
    pub apply: Vec<Operation>,
}

/// The argument part of a `name: value` entry, as written.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// `name: value` where the value is a string.
    Single(String),
    /// `name: [a, b]` where every element is a string.
    Many(Vec<String>),
    /// `name: [a, 1, true]`; elements are coerced when decoded.
    Mixed(Vec<Value>),
}

/// A layout entry before the program name has been checked.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSpec {
    Bare(String),
    WithArgs(String, ArgValue),
}

/// What was wrong with a single entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("unexpected entry {0}: expected a program name or a single-key mapping")]
    UnexpectedEntry(String),
    #[error("operation mapping must have exactly one key, found {0}")]
    KeyCount(usize),
    #[error("unexpected type of key {0}: program names must be strings")]
    UnexpectedKey(String),
    #[error("unexpected type of value for key {program}: {value}")]
    UnexpectedValue { program: String, value: String },
    #[error("unknown program specified: {0}")]
    UnknownProgram(String),
    #[error("cwd requires a directory argument")]
    MissingCwd,
}

/// A decoding failure, located by workspace, phase, and position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("workspace {workspace:?} {phase}[{index}]: {kind}")]
pub struct DecodeError {
    pub workspace: String,
    pub phase: Phase,
    pub index: usize,
    pub kind: DecodeErrorKind,
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

impl ArgValue {
    fn from_value(program: &str, value: &Value) -> Result<Self, DecodeErrorKind> {
        match value {
            Value::Tagged(tagged) => Self::from_value(program, &tagged.value),
            Value::Sequence(items) => {
                let strings: Option<Vec<String>> = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(match strings {
                    Some(strings) => ArgValue::Many(strings),
                    None => ArgValue::Mixed(items.clone()),
                })
            }
            Value::String(s) => Ok(ArgValue::Single(s.clone())),
            other => Err(DecodeErrorKind::UnexpectedValue {
                program: program.to_string(),
                value: render(other),
            }),
        }
    }

    /// Flatten into literal arguments.
    fn into_args(self, program: &str) -> Result<Vec<String>, DecodeErrorKind> {
        match self {
            ArgValue::Single(s) => Ok(vec![s]),
            ArgValue::Many(v) => Ok(v),
            ArgValue::Mixed(values) => values
                .iter()
                .map(|v| {
                    scalar_text(v).ok_or_else(|| DecodeErrorKind::UnexpectedValue {
                        program: program.to_string(),
                        value: render(v),
                    })
                })
                .collect(),
        }
    }
}

impl OperationSpec {
    /// Classify a raw layout entry.
    pub fn from_value(raw: &Value) -> Result<Self, DecodeErrorKind> {
        match raw {
            Value::String(name) => Ok(OperationSpec::Bare(name.clone())),
            Value::Tagged(tagged) => Self::from_value(&tagged.value),
            Value::Mapping(map) => {
                if map.len() != 1 {
                    return Err(DecodeErrorKind::KeyCount(map.len()));
                }
                let Some((key, value)) = map.iter().next() else {
                    return Err(DecodeErrorKind::KeyCount(0));
                };
                let Value::String(name) = key else {
                    return Err(DecodeErrorKind::UnexpectedKey(render(key)));
                };
                let args = ArgValue::from_value(name, value)?;
                Ok(OperationSpec::WithArgs(name.clone(), args))
            }
            other => Err(DecodeErrorKind::UnexpectedEntry(render(other))),
        }
    }

    /// Turn into an [`Operation`], checking the program against `registry`.
    pub fn decode(self, registry: &ProgramRegistry) -> Result<Operation, DecodeErrorKind> {
        let (program, args) = match self {
            OperationSpec::Bare(name) => (name, Vec::new()),
            OperationSpec::WithArgs(name, value) => {
                let args = value.into_args(&name)?;
                (name, args)
            }
        };

        if program == CWD_PROGRAM {
            if args.is_empty() {
                return Err(DecodeErrorKind::MissingCwd);
            }
        } else if !registry.contains(&program) {
            return Err(DecodeErrorKind::UnknownProgram(program));
        }

        Ok(Operation { program, args })
    }
}

/// Decode one phase's entries, preserving their order.
pub fn decode_list(
    workspace: &str,
    phase: Phase,
    raw: &[Value],
    registry: &ProgramRegistry,
) -> Result<Vec<Operation>, DecodeError> {
    raw.iter()
        .enumerate()
        .map(|(index, entry)| {
            OperationSpec::from_value(entry)
                .and_then(|spec| spec.decode(registry))
                .map_err(|kind| DecodeError {
                    workspace: workspace.to_string(),
                    phase,
                    index,
                    kind,
                })
        })
        .collect()
}

/// Decode both lists of a workspace.
pub fn decode_workspace(
    label: &str,
    raw: &RawWorkspace,
    registry: &ProgramRegistry,
) -> Result<Workspace, DecodeError> {
    Ok(Workspace {
        label: label.to_string(),
        check: decode_list(label, Phase::Check, &raw.check, registry)?,
        apply: decode_list(label, Phase::Do, &raw.apply, registry)?,
    })
}
