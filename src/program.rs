//! Program templates and the registry that holds them.
//!
//! A [`Program`] is a reusable recipe for invoking one executable.  Its
//! argument template mixes literal strings with placeholders:
//!
//! * `<args>` splices in the literal arguments of the operation that uses
//!   the program.
//! * `<name>` substitutes the trimmed stdout of an earlier operation that
//!   was bound under `name` in the same phase.
//!
//! The [`ProgramRegistry`] is built once at startup from the compiled-in
//! defaults with the user's configuration laid over them, and is never
//! mutated afterwards.

use crate::config::{Config, ProgramConfig};
use log::warn;
use std::collections::HashMap;

/// Name of the placeholder that splices an operation's literal arguments.
pub const ARGS_PLACEHOLDER: &str = "args";

/// Reserved pseudo-program that changes the working directory.
pub const CWD_PROGRAM: &str = "cwd";

/// One element of a program's argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Copied verbatim into the argument vector.
    Literal(String),
    /// `<args>`: the operation's literal arguments, in order.
    Args,
    /// `<name>`: the value bound to `name` by an earlier operation.
    Var(String),
}

impl Token {
    /// Classify a raw template element.
    ///
    /// Anything wrapped in angle brackets is a placeholder; everything else
    /// is a literal.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            Some(ARGS_PLACEHOLDER) => Token::Args,
            Some(name) => Token::Var(name.to_string()),
            None => Token::Literal(raw.to_string()),
        }
    }
}

/// A named, reusable invocation template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    name: String,
    template: Vec<Token>,
    bind: Option<String>,
}

impl Program {
    /// Build a program from its raw `exec` template and optional binding
    /// name.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, exec: &[S], bind: Option<String>) -> Self {
        Self {
            name: name.into(),
            template: exec.iter().map(|s| Token::parse(s.as_ref())).collect(),
            bind: bind.filter(|b| !b.is_empty()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &[Token] {
        &self.template
    }

    /// Key under which this program's captured stdout is stored.
    ///
    /// Falls back to the program's own name when no binding was configured.
    pub fn bind_name(&self) -> &str {
        self.bind.as_deref().unwrap_or(&self.name)
    }
}

/// Immutable lookup table of every program an operation may reference.
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, Program>,
}

impl ProgramRegistry {
    /// The compiled-in programs available without any configuration.
    pub fn defaults() -> Self {
        let programs = [
            Program::new("exec", &["<args>"], None),
            Program::new("sh", &["sh", "-c", "<args>"], None),
            Program::new("sleep", &["sleep", "<args>"], None),
            Program::new("test", &["test", "<args>"], None),
        ];
        Self {
            programs: programs
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Lay `programs` over this registry.  On a name collision the new entry
    /// wins.
    pub fn with_overrides(mut self, programs: impl IntoIterator<Item = Program>) -> Self {
        for program in programs {
            if program.name == CWD_PROGRAM {
                warn!("program {:?} is shadowed by the built-in cwd operation", CWD_PROGRAM);
            }
            self.programs.insert(program.name.clone(), program);
        }
        self
    }

    /// Defaults overlaid with every program from the user's configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::defaults().with_overrides(
            config
                .programs
                .iter()
                .map(|(name, ProgramConfig { exec, assign })| {
                    Program::new(name.as_str(), exec.as_slice(), assign.clone())
                }),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_classification() {
        assert_eq!(Token::parse("git"), Token::Literal("git".into()));
        assert_eq!(Token::parse("<args>"), Token::Args);
        assert_eq!(Token::parse("<branch>"), Token::Var("branch".into()));
        assert_eq!(Token::parse("<half"), Token::Literal("<half".into()));
        assert_eq!(Token::parse("half>"), Token::Literal("half>".into()));
        assert_eq!(Token::parse("<>"), Token::Var(String::new()));
    }

    #[test]
    fn bind_name_defaults_to_program_name() {
        let p = Program::new("git", &["git", "status"], None);
        assert_eq!(p.bind_name(), "git");

        let p = Program::new("git", &["git", "status"], Some(String::new()));
        assert_eq!(p.bind_name(), "git");

        let p = Program::new("git", &["git", "status"], Some("branch".into()));
        assert_eq!(p.bind_name(), "branch");
    }

    #[test]
    fn defaults_are_registered() {
        let reg = ProgramRegistry::defaults();
        assert!(reg.contains("exec"));
        assert!(reg.contains("sh"));
        assert!(!reg.contains(CWD_PROGRAM));
        assert_eq!(reg.get("exec").unwrap().template(), &[Token::Args]);
    }

    #[test]
    fn user_programs_override_defaults() {
        let reg = ProgramRegistry::defaults().with_overrides([
            Program::new("sleep", &["busybox", "sleep", "<args>"], None),
            Program::new("git", &["git", "<args>"], None),
        ]);
        assert_eq!(reg.len(), ProgramRegistry::defaults().len() + 1);
        assert_eq!(
            reg.get("sleep").unwrap().template()[0],
            Token::Literal("busybox".into())
        );
        assert!(reg.contains("git"));
    }
}
